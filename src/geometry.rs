use nalgebra::Vector3;

/// Cubic simulation box with periodic boundary conditions.
///
/// Coordinates are kept in `[0, L)` after every committed move, so pair
/// separations always go through [`Box3::square_distance`] and never through
/// raw coordinate differences.
#[derive(Debug, Clone, Copy)]
pub struct Box3 {
    length: f64,
    half_length: f64,
}

impl Box3 {
    pub fn new(length: f64) -> Self {
        Box3 {
            length,
            half_length: 0.5 * length,
        }
    }

    /// Box edge from particle count and number density: L = (N / rho)^(1/3).
    pub fn from_density(n_particles: usize, density: f64) -> Self {
        Box3::new((n_particles as f64 / density).powf(1.0 / 3.0))
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn half_length(&self) -> f64 {
        self.half_length
    }

    pub fn volume(&self) -> f64 {
        self.length * self.length * self.length
    }

    /// Minimum-image square distance between two pre-wrapped points.
    ///
    /// Each axis difference is folded back into `[-L/2, L/2]` before the
    /// squares are summed. Both endpoints must already lie in `[0, L)`.
    pub fn square_distance(&self, p: &Vector3<f64>, q: &Vector3<f64>) -> f64 {
        let mut square_distance = 0.0;
        for k in 0..3 {
            let mut diff = p[k] - q[k];
            if diff > self.half_length {
                diff -= self.length;
            } else if diff < -self.half_length {
                diff += self.length;
            }
            square_distance += diff * diff;
        }
        square_distance
    }

    /// Wrap a point back into `[0, L)` after a translation.
    ///
    /// Returns the wrapped point together with the image-flag increment per
    /// axis: -1 when the particle left through the low face, +1 through the
    /// high face, 0 otherwise. Applied exactly once per translation; the move
    /// distribution keeps single-step displacements below L/2.
    pub fn wrap(&self, p: &Vector3<f64>) -> (Vector3<f64>, Vector3<i32>) {
        let mut wrapped = *p;
        let mut flags = Vector3::new(0, 0, 0);
        for k in 0..3 {
            if wrapped[k] < 0.0 {
                wrapped[k] += self.length;
                flags[k] = -1;
            } else if wrapped[k] >= self.length {
                wrapped[k] -= self.length;
                flags[k] = 1;
            }
        }
        (wrapped, flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_square_distance_no_wrapping() {
        let cell = Box3::new(10.0);
        let p = Vector3::new(1.0, 2.0, 3.0);
        let q = Vector3::new(2.0, 4.0, 6.0);
        assert_relative_eq!(cell.square_distance(&p, &q), 14.0, epsilon = 1e-12);
    }

    #[test]
    fn test_square_distance_minimum_image() {
        let cell = Box3::new(10.0);
        let p = Vector3::new(0.5, 9.5, 0.0);
        let q = Vector3::new(9.5, 0.5, 0.0);
        // Both axis separations wrap to 1.0 through the boundary.
        assert_relative_eq!(cell.square_distance(&p, &q), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_square_distance_half_box_edge_case() {
        let cell = Box3::new(10.0);
        let p = Vector3::new(0.0, 0.0, 0.0);
        let q = Vector3::new(5.0, 0.0, 0.0);
        // A separation of exactly L/2 is its own minimum image.
        assert_relative_eq!(cell.square_distance(&p, &q), 25.0, epsilon = 1e-12);
    }

    #[test]
    fn test_square_distance_image_shift_invariance() {
        // Shifting one endpoint by whole box lengths before wrapping must not
        // change the minimum-image distance.
        let cell = Box3::new(8.0);
        let p = Vector3::new(1.0, 6.5, 3.0);
        let q = Vector3::new(7.5, 0.5, 4.0);
        let reference = cell.square_distance(&p, &q);
        for shift in [
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, -1.0, 2.0),
            Vector3::new(-3.0, 1.0, -1.0),
        ] {
            let (shifted, _) = cell.wrap(&(q + shift * cell.length()));
            assert_relative_eq!(
                cell.square_distance(&p, &shifted),
                reference,
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn test_wrap_low_and_high_faces() {
        let cell = Box3::new(10.0);

        let (wrapped, flags) = cell.wrap(&Vector3::new(-0.5, 10.2, 5.0));
        assert_relative_eq!(wrapped.x, 9.5, epsilon = 1e-12);
        assert_relative_eq!(wrapped.y, 0.2, epsilon = 1e-12);
        assert_relative_eq!(wrapped.z, 5.0, epsilon = 1e-12);
        assert_eq!(flags, Vector3::new(-1, 1, 0));

        // The upper face itself is outside of [0, L).
        let (wrapped, flags) = cell.wrap(&Vector3::new(10.0, 0.0, 9.999));
        assert_relative_eq!(wrapped.x, 0.0, epsilon = 1e-12);
        assert_eq!(flags, Vector3::new(1, 0, 0));
    }

    #[test]
    fn test_wrap_idempotence() {
        let cell = Box3::new(7.0);
        let p = Vector3::new(-1.5, 7.2, 3.0);
        let (once, flags) = cell.wrap(&p);
        let (twice, no_flags) = cell.wrap(&once);
        assert_relative_eq!(once.x, twice.x, epsilon = 1e-12);
        assert_relative_eq!(once.y, twice.y, epsilon = 1e-12);
        assert_relative_eq!(once.z, twice.z, epsilon = 1e-12);
        assert_eq!(flags, Vector3::new(-1, 1, 0));
        assert_eq!(no_flags, Vector3::new(0, 0, 0));
    }

    #[test]
    fn test_box_from_density() {
        let cell = Box3::from_density(1000, 1.0);
        assert_relative_eq!(cell.length(), 10.0, epsilon = 1e-12);
        assert_relative_eq!(cell.half_length(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(cell.volume(), 1000.0, epsilon = 1e-9);
    }
}
