//! Working copy of the coverage matrix plus per-element remaining demand.

use std::collections::BTreeSet;

use crate::error::{CoverError, Result};
use crate::matrix::CoverageMatrix;

/// Destructively tracks how much demand each element still has.
///
/// Owns a deep copy of the matrix rows: committing an item removes its row,
/// and every element that becomes satisfied is zeroed in all remaining rows
/// so it stops contributing benefit to any future candidate.
#[derive(Clone, Debug)]
pub struct CoverageLedger {
    rows: Vec<Option<Vec<f64>>>,
    remaining: Vec<f64>,
    unsatisfied: BTreeSet<usize>,
    k: u32,
}

impl CoverageLedger {
    pub fn new(matrix: &CoverageMatrix, k: u32) -> Result<Self> {
        if k == 0 {
            return Err(CoverError::invalid("cover multiplicity k must be positive"));
        }
        let n = matrix.element_count();
        Ok(Self {
            rows: matrix.rows().iter().cloned().map(Some).collect(),
            remaining: vec![f64::from(k); n],
            unsatisfied: (0..n).collect(),
            k,
        })
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    /// Residual coverage the item would add: sum of its revised row.
    ///
    /// Returns `None` for a committed or removed item.
    pub fn benefit(&self, item: usize) -> Option<f64> {
        self.rows
            .get(item)?
            .as_ref()
            .map(|row| row.iter().sum())
    }

    pub fn is_available(&self, item: usize) -> bool {
        self.rows.get(item).is_some_and(Option::is_some)
    }

    /// Apply the item's coverage to every unsatisfied element and retire its row.
    ///
    /// Returns the elements newly satisfied by this commit, in index order, or
    /// [`CoverError::RowUnavailable`] when the row is already gone.
    pub fn commit(&mut self, item: usize) -> Result<Vec<usize>> {
        let row = self
            .rows
            .get_mut(item)
            .and_then(Option::take)
            .ok_or(CoverError::RowUnavailable { item })?;

        let mut newly = Vec::new();
        for &e in &self.unsatisfied {
            self.remaining[e] -= row[e];
            if self.remaining[e] <= 0.0 {
                newly.push(e);
            }
        }

        for &e in &newly {
            self.unsatisfied.remove(&e);
            for other in self.rows.iter_mut().flatten() {
                other[e] = 0.0;
            }
        }
        Ok(newly)
    }

    /// Drop an item's row without applying its coverage.
    pub fn remove(&mut self, item: usize) {
        if let Some(slot) = self.rows.get_mut(item) {
            *slot = None;
        }
    }

    pub fn remaining(&self) -> &[f64] {
        &self.remaining
    }

    pub fn unsatisfied(&self) -> &BTreeSet<usize> {
        &self.unsatisfied
    }

    pub fn unsatisfied_count(&self) -> usize {
        self.unsatisfied.len()
    }

    /// `(max, min, mean)` of coverage achieved so far, as `k - remaining`.
    pub fn coverage_stats(&self) -> (f64, f64, f64) {
        let k = f64::from(self.k);
        let min_rem = self.remaining.iter().copied().fold(f64::INFINITY, f64::min);
        let max_rem = self.remaining.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean_rem = self.remaining.iter().sum::<f64>() / self.remaining.len() as f64;
        (k - min_rem, k - max_rem, k - mean_rem)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger(k: u32) -> CoverageLedger {
        let m = CoverageMatrix::from_sets(
            4,
            [("A", vec![0, 1]), ("B", vec![1, 2]), ("C", vec![3])],
        )
        .unwrap();
        CoverageLedger::new(&m, k).unwrap()
    }

    #[test]
    fn test_commit_zeroes_satisfied_elements_everywhere() {
        let mut l = ledger(1);
        assert_eq!(l.benefit(1), Some(2.0));
        let newly = l.commit(0).unwrap();
        assert_eq!(newly, vec![0, 1]);
        assert_eq!(l.benefit(0), None);
        assert_eq!(l.benefit(1), Some(1.0));
        assert_eq!(l.unsatisfied_count(), 2);
    }

    #[test]
    fn test_multiplicity_two_keeps_demand() {
        let mut l = ledger(2);
        assert!(l.commit(0).unwrap().is_empty());
        assert_eq!(l.remaining(), &[1.0, 1.0, 2.0, 2.0]);
        assert_eq!(l.commit(1).unwrap(), vec![1]);
        assert_eq!(l.benefit(2), Some(1.0));
        let (max, min, _) = l.coverage_stats();
        assert_eq!((max, min), (2.0, 0.0));
    }

    #[test]
    fn test_unavailable_rows_name_the_item() {
        let mut l = ledger(1);
        l.commit(2).unwrap();
        assert!(matches!(l.commit(2), Err(CoverError::RowUnavailable { item: 2 })));
        l.remove(1);
        assert!(!l.is_available(1));
        assert!(matches!(l.commit(1), Err(CoverError::RowUnavailable { item: 1 })));
        assert!(matches!(l.commit(9), Err(CoverError::RowUnavailable { item: 9 })));
    }

    #[test]
    fn test_zero_k_rejected() {
        let m = CoverageMatrix::from_sets(1, [("A", vec![0])]).unwrap();
        assert!(CoverageLedger::new(&m, 0).is_err());
    }
}
