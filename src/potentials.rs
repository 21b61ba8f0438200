//! Pair and bond potential arithmetic.
//!
//! Every function takes the *square* of the pair distance; nothing in here
//! ever needs the square root itself.

use serde::{Deserialize, Serialize};

/// Diameter scale applied to the stiff end-to-end pair of a trimer.
const PEDERSEN_SIGMA_SCALE: f64 = 1.35;

/// Bond flavor of the polymeric model, fixed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondModel {
    /// Plain FENE bonds along the topology.
    Flexible,
    /// FENE bonds plus the special rule for the end pair of each trimer.
    Pedersen,
}

/// Truncated and shifted Lennard-Jones pair energy.
///
/// The cutoff scales with the pair's mean diameter: the interaction stops at
/// r^2 > square_rc * sigma^2, so polydisperse pairs share a single reduced
/// cutoff. Inside the cutoff the energy is 4x(x - 1) + 4 * shift with
/// x = (sigma^2 / r^2)^3.
pub fn lj_energy(
    square_distance: f64,
    sigma_a: f64,
    sigma_b: f64,
    square_rc: f64,
    shift: f64,
) -> f64 {
    let square_sigma = (0.5 * (sigma_a + sigma_b)).powi(2);
    if square_distance > square_rc * square_sigma {
        return 0.0;
    }
    let x = (square_sigma / square_distance).powi(3);
    4.0 * x * (x - 1.0) + 4.0 * shift
}

/// Pair virial contribution -r dU/dr = 48 x (x - 1/2) of the Lennard-Jones
/// interaction, zero beyond the scaled cutoff. The shift drops out of the
/// derivative.
pub fn lj_virial(square_distance: f64, sigma_a: f64, sigma_b: f64, square_rc: f64) -> f64 {
    let square_sigma = (0.5 * (sigma_a + sigma_b)).powi(2);
    if square_distance > square_rc * square_sigma {
        return 0.0;
    }
    let x = (square_sigma / square_distance).powi(3);
    48.0 * x * (x - 0.5)
}

/// FENE bond energy.
///
/// The nominal maximum extension R0^2 rescales with the pair diameter and the
/// stiffness rescales against it. Past the maximum extension the bond is
/// broken and the energy is +inf, which the Metropolis test turns into a
/// rejection rather than an error.
pub fn fene_energy(
    square_distance: f64,
    sigma_a: f64,
    sigma_b: f64,
    square_r0: f64,
    fene_k: f64,
) -> f64 {
    let square_sigma = (0.5 * (sigma_a + sigma_b)).powi(2);
    let square_r0 = square_r0 * square_sigma;
    if square_distance >= square_r0 {
        return f64::INFINITY;
    }
    let fene_k = fene_k / square_sigma;
    -0.5 * fene_k * square_r0 * (1.0 - square_distance / square_r0).ln()
}

/// Bonded energy of the distinguished trimer end pair under the Pedersen rule.
///
/// The pair re-enters the LJ and FENE terms with a widened diameter while the
/// plain LJ already counted by the non-bonded loop is subtracted out, so the
/// rule stays additive on top of that loop.
pub fn pedersen_energy(
    square_distance: f64,
    sigma_a: f64,
    sigma_b: f64,
    square_rc: f64,
    shift: f64,
    square_r0: f64,
    fene_k: f64,
) -> f64 {
    let wide_a = PEDERSEN_SIGMA_SCALE * sigma_a;
    let wide_b = PEDERSEN_SIGMA_SCALE * sigma_b;
    lj_energy(square_distance, wide_a, wide_b, square_rc, shift)
        + fene_energy(square_distance, wide_a, wide_b, square_r0, fene_k)
        - lj_energy(square_distance, sigma_a, sigma_b, square_rc, shift)
}

/// True for the end pair of a trimer: both particles on the same triple, one
/// at offset 0 and one at offset 2.
pub fn is_trimer_end_pair(i: usize, j: usize) -> bool {
    let (low, high) = if i < j { (i, j) } else { (j, i) };
    low / 3 == high / 3 && low % 3 == 0 && high % 3 == 2
}
