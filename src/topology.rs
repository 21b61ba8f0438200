//! Static bond topology.

use color_eyre::eyre::{bail, Result};

/// Undirected bond adjacency in compressed sparse form: the partners of
/// particle `i` live in `entries[offsets[i]..offsets[i + 1]]`, sorted
/// ascending. Immutable after load.
#[derive(Debug, Clone)]
pub struct BondTable {
    offsets: Vec<usize>,
    entries: Vec<usize>,
}

impl BondTable {
    /// Build the table from undirected edges, inserting both directions.
    /// Self-loops, duplicate edges and out-of-range indices are load errors.
    pub fn from_edges(n_particles: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut counts = vec![0usize; n_particles];
        for &(i, j) in edges {
            if i >= n_particles || j >= n_particles {
                bail!(
                    "bond ({}, {}) references a particle outside 0..{}",
                    i,
                    j,
                    n_particles
                );
            }
            if i == j {
                bail!("bond ({}, {}) is a self-loop", i, j);
            }
            counts[i] += 1;
            counts[j] += 1;
        }

        let mut offsets = vec![0usize; n_particles + 1];
        for i in 0..n_particles {
            offsets[i + 1] = offsets[i] + counts[i];
        }

        let mut entries = vec![0usize; offsets[n_particles]];
        let mut cursor: Vec<usize> = offsets[..n_particles].to_vec();
        for &(i, j) in edges {
            entries[cursor[i]] = j;
            cursor[i] += 1;
            entries[cursor[j]] = i;
            cursor[j] += 1;
        }

        for i in 0..n_particles {
            let row = &mut entries[offsets[i]..offsets[i + 1]];
            row.sort_unstable();
            if row.windows(2).any(|pair| pair[0] == pair[1]) {
                bail!("duplicate bond on particle {}", i);
            }
        }

        Ok(BondTable { offsets, entries })
    }

    pub fn n_particles(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn n_bonds(&self) -> usize {
        self.entries.len() / 2
    }

    /// Partners bonded to particle `i`.
    pub fn partners(&self, i: usize) -> &[usize] {
        &self.entries[self.offsets[i]..self.offsets[i + 1]]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symmetric_rows() {
        let bonds = BondTable::from_edges(6, &[(0, 1), (1, 2), (3, 4), (4, 5)]).unwrap();
        assert_eq!(bonds.n_particles(), 6);
        assert_eq!(bonds.n_bonds(), 4);
        assert_eq!(bonds.partners(0), &[1]);
        assert_eq!(bonds.partners(1), &[0, 2]);
        assert_eq!(bonds.partners(2), &[1]);
        assert_eq!(bonds.partners(4), &[3, 5]);
        for i in 0..6 {
            for &j in bonds.partners(i) {
                assert!(bonds.partners(j).contains(&i));
            }
        }
    }

    #[test]
    fn test_rows_are_sorted() {
        let bonds = BondTable::from_edges(4, &[(3, 1), (1, 0), (1, 2)]).unwrap();
        assert_eq!(bonds.partners(1), &[0, 2, 3]);
    }

    #[test]
    fn test_rejects_self_loop() {
        assert!(BondTable::from_edges(3, &[(1, 1)]).is_err());
    }

    #[test]
    fn test_rejects_duplicate_edge() {
        assert!(BondTable::from_edges(3, &[(0, 1), (1, 0)]).is_err());
        assert!(BondTable::from_edges(3, &[(0, 1), (0, 1)]).is_err());
    }

    #[test]
    fn test_rejects_out_of_range() {
        assert!(BondTable::from_edges(3, &[(0, 3)]).is_err());
    }
}
