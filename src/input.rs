//! Startup readers for the initial configuration and the bond topology.

use std::fs;
use std::path::Path;

use color_eyre::eyre::{eyre, Result, WrapErr};
use nalgebra::Vector3;

/// Parsed initial configuration: one entry of each array per particle.
#[derive(Debug, Clone)]
pub struct InitialConfiguration {
    pub molecule_types: Vec<i32>,
    pub particle_types: Vec<i32>,
    pub positions: Vec<Vector3<f64>>,
}

impl InitialConfiguration {
    pub fn n_particles(&self) -> usize {
        self.positions.len()
    }
}

/// Read the initial configuration: first line N, second line a free-form
/// comment, then N records of `molecule_type particle_type x y z`.
pub fn read_configuration(path: &Path) -> Result<InitialConfiguration> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("unable to read configuration file: {}", path.display()))?;
    let mut lines = content.lines();

    let n_particles: usize = lines
        .next()
        .ok_or_else(|| eyre!("configuration file is empty"))?
        .trim()
        .parse()
        .wrap_err("first line must be the particle count")?;
    lines
        .next()
        .ok_or_else(|| eyre!("configuration file is missing the comment line"))?;

    let mut molecule_types = Vec::with_capacity(n_particles);
    let mut particle_types = Vec::with_capacity(n_particles);
    let mut positions = Vec::with_capacity(n_particles);

    for record in 0..n_particles {
        let line = lines
            .next()
            .ok_or_else(|| eyre!("expected {} particle records, found {}", n_particles, record))?;
        let mut tokens = line.split_whitespace();
        let mut next_token = |field: &str| {
            tokens
                .next()
                .ok_or_else(|| eyre!("record {}: missing field {}", record, field))
        };
        let molecule_type: i32 = next_token("molecule_type")?
            .parse()
            .wrap_err_with(|| format!("record {}: bad molecule_type", record))?;
        let particle_type: i32 = next_token("particle_type")?
            .parse()
            .wrap_err_with(|| format!("record {}: bad particle_type", record))?;
        let mut coordinates = [0.0; 3];
        for (axis, slot) in coordinates.iter_mut().enumerate() {
            *slot = next_token("coordinate")?
                .parse()
                .wrap_err_with(|| format!("record {}: bad coordinate on axis {}", record, axis))?;
        }
        molecule_types.push(molecule_type);
        particle_types.push(particle_type);
        positions.push(Vector3::new(
            coordinates[0],
            coordinates[1],
            coordinates[2],
        ));
    }

    Ok(InitialConfiguration {
        molecule_types,
        particle_types,
        positions,
    })
}

/// Read `bonds.txt`: the particle count, the bond count, then that many index
/// pairs as a free-form whitespace token stream.
pub fn read_bonds(path: &Path, n_particles: usize) -> Result<Vec<(usize, usize)>> {
    let content = fs::read_to_string(path)
        .wrap_err_with(|| format!("unable to read bond file: {}", path.display()))?;
    let mut tokens = content.split_whitespace();
    let mut next_number = |field: &str| -> Result<usize> {
        tokens
            .next()
            .ok_or_else(|| eyre!("bond file ended early, expected {}", field))?
            .parse()
            .wrap_err_with(|| format!("bond file: bad {}", field))
    };

    let declared = next_number("particle count")?;
    if declared != n_particles {
        return Err(eyre!(
            "bond file declares {} particles but the configuration holds {}",
            declared,
            n_particles
        ));
    }
    let n_bonds = next_number("bond count")?;
    let mut edges = Vec::with_capacity(n_bonds);
    for _ in 0..n_bonds {
        let i = next_number("bond index")?;
        let j = next_number("bond index")?;
        edges.push((i, j));
    }
    Ok(edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_configuration() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "3\ntrimer melt frame 0\n1 1 0.5 0.25 0.125\n1 2 1.5 0.25 0.125\n1 3 2.5 0.25 0.125\n"
        )
        .unwrap();
        let configuration = read_configuration(file.path()).unwrap();
        assert_eq!(configuration.n_particles(), 3);
        assert_eq!(configuration.molecule_types, vec![1, 1, 1]);
        assert_eq!(configuration.particle_types, vec![1, 2, 3]);
        assert_eq!(configuration.positions[2].x, 2.5);
        assert_eq!(configuration.positions[0].z, 0.125);
    }

    #[test]
    fn test_configuration_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "3\ncomment\n1 1 0.0 0.0 0.0\n").unwrap();
        assert!(read_configuration(file.path()).is_err());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "2\ncomment\n1 1 0.0 zero 0.0\n1 1 1.0 0.0 0.0\n").unwrap();
        assert!(read_configuration(file.path()).is_err());

        assert!(read_configuration(Path::new("/nonexistent/run/init.xyz")).is_err());
    }

    #[test]
    fn test_read_bonds() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "6\n4\n0 1\n1 2\n3 4\n4 5\n").unwrap();
        let edges = read_bonds(file.path(), 6).unwrap();
        assert_eq!(edges, vec![(0, 1), (1, 2), (3, 4), (4, 5)]);
    }

    #[test]
    fn test_bond_errors() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "6\n4\n0 1\n1 2\n").unwrap();
        assert!(read_bonds(file.path(), 6).is_err());

        let mut file = NamedTempFile::new().unwrap();
        write!(file, "4\n1\n0 1\n").unwrap();
        assert!(read_bonds(file.path(), 6).is_err());
    }
}
