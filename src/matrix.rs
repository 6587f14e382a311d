//! Item → element coverage weights.

use std::collections::BTreeMap;

use crate::error::{CoverError, Result};

/// Dense coverage matrix: one row of nonnegative weights per item.
///
/// The matrix is immutable once built. The greedy stage works on its own copy
/// (see [`CoverageLedger`](crate::CoverageLedger)).
#[derive(Clone, Debug)]
pub struct CoverageMatrix {
    items: Vec<String>,
    rows: Vec<Vec<f64>>,
    index: BTreeMap<String, usize>,
    n_elements: usize,
}

impl CoverageMatrix {
    /// Build from `(item id, weight row)` pairs. Row order is kept as item order.
    pub fn new<I, S>(rows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Vec<f64>)>,
        S: Into<String>,
    {
        let mut items = Vec::new();
        let mut weights = Vec::new();
        let mut index = BTreeMap::new();

        for (id, row) in rows {
            let id = id.into();
            if index.insert(id.clone(), items.len()).is_some() {
                return Err(CoverError::invalid(format!("duplicate item `{id}`")));
            }
            items.push(id);
            weights.push(row);
        }

        if items.is_empty() {
            return Err(CoverError::invalid("coverage matrix has no items"));
        }
        let n_elements = weights[0].len();
        if n_elements == 0 {
            return Err(CoverError::invalid("coverage matrix has no elements"));
        }

        for (id, row) in items.iter().zip(&weights) {
            if row.len() != n_elements {
                return Err(CoverError::invalid(format!(
                    "row `{id}` has {} elements, expected {n_elements}",
                    row.len()
                )));
            }
            if let Some((e, w)) = row
                .iter()
                .enumerate()
                .find(|(_, w)| !w.is_finite() || **w < 0.0)
            {
                return Err(CoverError::invalid(format!(
                    "weight {w} for item `{id}` element {e} is not a finite nonnegative number"
                )));
            }
        }

        Ok(Self {
            items,
            rows: weights,
            index,
            n_elements,
        })
    }

    /// Build an unweighted matrix from element index lists: every listed
    /// element gets weight 1.0.
    pub fn from_sets<I, S, E>(n_elements: usize, sets: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, E)>,
        S: Into<String>,
        E: IntoIterator<Item = usize>,
    {
        let mut rows = Vec::new();
        for (id, elements) in sets {
            let id = id.into();
            let mut row = vec![0.0; n_elements];
            for e in elements {
                let slot = row.get_mut(e).ok_or_else(|| {
                    CoverError::invalid(format!(
                        "item `{id}` covers element {e}, but there are only {n_elements}"
                    ))
                })?;
                *slot = 1.0;
            }
            rows.push((id, row));
        }
        Self::new(rows)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn element_count(&self) -> usize {
        self.n_elements
    }

    pub fn items(&self) -> &[String] {
        &self.items
    }

    pub fn item_id(&self, item: usize) -> &str {
        &self.items[item]
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn row(&self, item: usize) -> &[f64] {
        &self.rows[item]
    }

    /// Total weight of an item over all elements, before any revision.
    pub fn total(&self, item: usize) -> f64 {
        self.rows[item].iter().sum()
    }

    pub(crate) fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sets() {
        let m = CoverageMatrix::from_sets(4, [("A", vec![0, 1]), ("B", vec![3])]).unwrap();
        assert_eq!(m.item_count(), 2);
        assert_eq!(m.element_count(), 4);
        assert_eq!(m.row(0), &[1.0, 1.0, 0.0, 0.0]);
        assert_eq!(m.index_of("B"), Some(1));
        assert!((m.total(1) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_negative_weight() {
        let err = CoverageMatrix::new([("A", vec![0.5, -0.1])]).unwrap_err();
        assert!(matches!(err, CoverError::InvalidInput { .. }));
    }

    #[test]
    fn test_rejects_ragged_rows_and_duplicates() {
        assert!(CoverageMatrix::new([("A", vec![1.0]), ("B", vec![1.0, 0.0])]).is_err());
        assert!(CoverageMatrix::new([("A", vec![1.0]), ("A", vec![0.0])]).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(CoverageMatrix::new(Vec::<(String, Vec<f64>)>::new()).is_err());
        assert!(CoverageMatrix::new([("A", Vec::new())]).is_err());
        assert!(CoverageMatrix::from_sets(2, [("A", vec![5])]).is_err());
    }
}
