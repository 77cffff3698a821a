//! Gene name interning
//!
//! Transcript tiles repeat a small vocabulary of gene names millions of
//! times; points carry a [`GeneId`] into a shared [`GeneTable`] instead.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Interned gene identifier (offset into a [`GeneTable`])
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GeneId(pub u32);

impl Display for GeneId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Insertion-ordered gene name interner
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneTable {
    names: IndexSet<String>,
}

impl GeneTable {
    /// Create empty table
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a gene name, returning the existing id if already present
    pub fn intern(&mut self, name: &str) -> GeneId {
        if let Some(idx) = self.names.get_index_of(name) {
            return GeneId(idx as u32);
        }
        let (idx, _) = self.names.insert_full(name.to_string());
        GeneId(idx as u32)
    }

    /// Look up the name for an id
    #[inline]
    #[must_use]
    pub fn name(&self, id: GeneId) -> Option<&str> {
        self.names.get_index(id.0 as usize).map(String::as_str)
    }

    /// Look up the id for a name without interning it
    #[inline]
    #[must_use]
    pub fn id_of(&self, name: &str) -> Option<GeneId> {
        self.names.get_index_of(name).map(|idx| GeneId(idx as u32))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterate names in id order
    pub fn iter(&self) -> impl Iterator<Item = (GeneId, &str)> {
        self.names
            .iter()
            .enumerate()
            .map(|(idx, name)| (GeneId(idx as u32), name.as_str()))
    }
}

impl<S: AsRef<str>> FromIterator<S> for GeneTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut table = Self::new();
        for name in iter {
            table.intern(name.as_ref());
        }
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_stable() {
        let mut table = GeneTable::new();
        let a = table.intern("ACTB");
        let b = table.intern("GAPDH");
        let a_again = table.intern("ACTB");

        assert_eq!(a, a_again);
        assert_ne!(a, b);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn lookup_both_directions() {
        let table: GeneTable = ["ACTB", "GAPDH", "CD3E"].into_iter().collect();

        assert_eq!(table.name(GeneId(2)), Some("CD3E"));
        assert_eq!(table.id_of("GAPDH"), Some(GeneId(1)));
        assert_eq!(table.id_of("MISSING"), None);
        assert_eq!(table.name(GeneId(9)), None);
    }

    #[test]
    fn iter_in_insertion_order() {
        let table: GeneTable = ["B", "A"].into_iter().collect();
        let names: Vec<&str> = table.iter().map(|(_, name)| name).collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
