//! Filter predicates
//!
//! Passed by value on every recompute; nothing here is retained between
//! requests.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tessera_model::SegmentationMetadata;

/// Rectangular range used by the protein and UMAP gates
///
/// The y axis is inverted: a value passes when `y_end <= y <= y_start`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateRange {
    pub x_start: f64,
    pub x_end: f64,
    pub y_start: f64,
    pub y_end: f64,
}

impl GateRange {
    #[inline]
    #[must_use]
    pub const fn new(x_start: f64, x_end: f64, y_start: f64, y_end: f64) -> Self {
        Self {
            x_start,
            x_end,
            y_start,
            y_end,
        }
    }

    /// Closed-range test with the inverted y comparison
    #[inline]
    #[must_use]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.x_start && x <= self.x_end && y >= self.y_end && y <= self.y_start
    }
}

/// Gate over two named protein channels
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProteinGate {
    pub x_channel: Option<String>,
    pub y_channel: Option<String>,
    pub range: Option<GateRange>,
}

impl ProteinGate {
    #[must_use]
    pub fn new(x_channel: impl Into<String>, y_channel: impl Into<String>, range: GateRange) -> Self {
        Self {
            x_channel: Some(x_channel.into()),
            y_channel: Some(y_channel.into()),
            range: Some(range),
        }
    }

    /// Channel indices and range, when the gate is complete and both
    /// channels exist in `metadata`
    #[must_use]
    pub fn resolve(&self, metadata: &SegmentationMetadata) -> Option<(usize, usize, GateRange)> {
        let range = self.range?;
        let x_name = self.x_channel.as_deref()?;
        let y_name = self.y_channel.as_deref()?;

        match (metadata.protein_index(x_name), metadata.protein_index(y_name)) {
            (Some(x), Some(y)) => Some((x, y, range)),
            _ => {
                tracing::warn!(
                    x_channel = x_name,
                    y_channel = y_name,
                    "protein gate channels not found, gate skipped"
                );
                None
            }
        }
    }
}

/// Cluster allow-list
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameFilter {
    /// Every cell passes
    #[default]
    All,
    /// Cells whose cluster id is listed pass; the rest become outliers.
    /// An empty list behaves like `All`.
    Clusters(Vec<String>),
}

impl NameFilter {
    #[must_use]
    pub fn clusters<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Clusters(ids.into_iter().map(Into::into).collect())
    }

    /// Allow-set, or `None` when every cell passes
    pub(crate) fn allow_set(&self) -> Option<HashSet<&str>> {
        match self {
            Self::Clusters(ids) if !ids.is_empty() => {
                Some(ids.iter().map(String::as_str).collect())
            }
            _ => None,
        }
    }
}

/// Gene visibility for transcript points
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GeneFilter {
    #[default]
    All,
    Genes(Vec<String>),
}

impl GeneFilter {
    #[must_use]
    pub fn genes<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Genes(names.into_iter().map(Into::into).collect())
    }
}

/// Active predicates for one recompute
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterPredicateSet {
    #[serde(default)]
    pub name_filter: NameFilter,
    #[serde(default)]
    pub protein_gate: Option<ProteinGate>,
    #[serde(default)]
    pub umap_gate: Option<GateRange>,
}

impl FilterPredicateSet {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name_filter(mut self, filter: NameFilter) -> Self {
        self.name_filter = filter;
        self
    }

    #[must_use]
    pub fn with_protein_gate(mut self, gate: ProteinGate) -> Self {
        self.protein_gate = Some(gate);
        self
    }

    #[must_use]
    pub fn with_umap_gate(mut self, range: GateRange) -> Self {
        self.umap_gate = Some(range);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_y_axis_is_inverted() {
        let range = GateRange::new(0.0, 10.0, 10.0, 0.0);
        assert!(range.contains(5.0, 5.0));
        assert!(range.contains(0.0, 10.0));
        assert!(!range.contains(11.0, 5.0));
        assert!(!range.contains(5.0, 11.0));

        // A "normal" y range selects nothing
        let upright = GateRange::new(0.0, 10.0, 0.0, 10.0);
        assert!(!upright.contains(5.0, 5.0));
    }

    #[test]
    fn empty_cluster_list_allows_everything() {
        assert!(NameFilter::All.allow_set().is_none());
        assert!(NameFilter::Clusters(Vec::new()).allow_set().is_none());
        let filter = NameFilter::clusters(["1", "3"]);
        let set = filter.allow_set().unwrap();
        assert!(set.contains("3") && !set.contains("2"));
    }

    #[test]
    fn incomplete_protein_gate_does_not_resolve() {
        let metadata = SegmentationMetadata::new(vec!["CD4".into(), "CD8".into()], Vec::new());

        let gate = ProteinGate::new("CD8", "CD4", GateRange::default());
        assert_eq!(gate.resolve(&metadata).map(|(x, y, _)| (x, y)), Some((1, 0)));

        let missing_range = ProteinGate {
            range: None,
            ..gate.clone()
        };
        assert!(missing_range.resolve(&metadata).is_none());

        let unknown = ProteinGate::new("CD4", "FOXP3", GateRange::default());
        assert!(unknown.resolve(&metadata).is_none());
    }

    #[test]
    fn predicates_parse_from_json() {
        let json = r#"{
            "nameFilter": {"clusters": ["1", "2"]},
            "umapGate": {"xStart": 0.0, "xEnd": 1.0, "yStart": 1.0, "yEnd": 0.0}
        }"#;
        let set: FilterPredicateSet = serde_json::from_str(json).unwrap();
        assert_eq!(set.name_filter, NameFilter::clusters(["1", "2"]));
        assert!(set.protein_gate.is_none());
        assert_eq!(set.umap_gate, Some(GateRange::new(0.0, 1.0, 1.0, 0.0)));

        let all: FilterPredicateSet = serde_json::from_str(r#"{"nameFilter": "all"}"#).unwrap();
        assert_eq!(all, FilterPredicateSet::new());
    }
}
