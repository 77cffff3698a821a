//! Index views over a shared cell table

use std::sync::Arc;
use tessera_model::{CellRecord, CellTable};

/// Ordered subset of a [`CellTable`]
///
/// Shares the table; only the index list is owned. Indices are strictly
/// increasing, so iteration follows the table order.
#[derive(Debug, Clone)]
pub struct CellSubset {
    table: CellTable,
    indices: Arc<[usize]>,
}

impl CellSubset {
    /// Every cell of the table
    #[must_use]
    pub fn all(table: CellTable) -> Self {
        let indices = (0..table.len()).collect();
        Self { table, indices }
    }

    /// No cells
    #[must_use]
    pub fn empty(table: CellTable) -> Self {
        Self {
            table,
            indices: Arc::from([]),
        }
    }

    /// Cells at `indices`, sorted into table order
    ///
    /// Duplicates and out-of-range positions are dropped.
    #[must_use]
    pub fn select<I>(table: CellTable, indices: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut indices: Vec<usize> = indices.into_iter().filter(|&i| i < table.len()).collect();
        indices.sort_unstable();
        indices.dedup();
        Self::from_indices(table, indices)
    }

    pub(crate) fn from_indices(table: CellTable, indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(indices.last().map_or(true, |&i| i < table.len()));
        Self {
            table,
            indices: indices.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Positions in the underlying table
    #[inline]
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Underlying table
    #[inline]
    #[must_use]
    pub fn table(&self) -> &CellTable {
        &self.table
    }

    /// `n`th cell of the subset
    #[inline]
    #[must_use]
    pub fn get(&self, n: usize) -> Option<&CellRecord> {
        self.indices.get(n).and_then(|&i| self.table.get(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &CellRecord> + '_ {
        self.indices.iter().filter_map(|&i| self.table.get(i))
    }

    /// Cell ids in subset order
    #[must_use]
    pub fn cell_ids(&self) -> Vec<&str> {
        self.iter().map(|c| c.cell_id.as_str()).collect()
    }

    /// Owned copies of the cells
    #[must_use]
    pub fn to_vec(&self) -> Vec<CellRecord> {
        self.iter().cloned().collect()
    }
}

impl PartialEq for CellSubset {
    /// Same cells in the same order
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().eq(other.iter())
    }
}

impl<'a> IntoIterator for &'a CellSubset {
    type Item = &'a CellRecord;
    type IntoIter = Box<dyn Iterator<Item = &'a CellRecord> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(n: usize) -> CellTable {
        (0..n)
            .map(|i| CellRecord::builder(format!("c{i}"), "1").build())
            .collect()
    }

    #[test]
    fn views_share_the_table() {
        let table = table(4);
        let all = CellSubset::all(table.clone());
        let some = CellSubset::from_indices(table.clone(), vec![1, 3]);

        assert_eq!(all.len(), 4);
        assert_eq!(some.cell_ids(), vec!["c1", "c3"]);
        assert_eq!(some.get(1).map(|c| c.cell_id.as_str()), Some("c3"));
        assert!(Arc::ptr_eq(some.table(), &table));
        assert!(CellSubset::empty(table.clone()).is_empty());

        let picked = CellSubset::select(table, [3, 0, 3, 9]);
        assert_eq!(picked.cell_ids(), vec!["c0", "c3"]);
    }

    #[test]
    fn equality_compares_cells() {
        let a = CellSubset::from_indices(table(3), vec![0, 2]);
        let b = CellSubset::from_indices(table(5), vec![0, 2]);
        let c = CellSubset::from_indices(table(3), vec![0, 1]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
