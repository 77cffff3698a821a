//! Cell and transcript partitioning
//!
//! Fixed evaluation order:
//! 1. Name filter splits the table into filtered cells and outliers
//! 2. Protein gate narrows the filtered cells
//! 3. UMAP gate narrows them again
//!
//! Gated-out cells are dropped from the outcome; only the name filter
//! produces outliers. A cell without a value for a gated protein channel
//! fails the gate.

use crate::error::FilterError;
use crate::predicate::{FilterPredicateSet, GateRange, GeneFilter};
use crate::subset::CellSubset;
use rayon::prelude::*;
use std::collections::HashSet;
use tessera_model::{CellRecord, CellTable, GeneTable, PointEntry, SegmentationMetadata, TileRecord};

/// Tables at or above this size are partitioned on the rayon pool
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 50_000;

/// Result of one filter pass
#[derive(Debug, Clone, PartialEq)]
pub struct FilterOutcome {
    /// Always empty: explicit selection is not driven by predicates
    pub selected: CellSubset,
    /// Cells passing every predicate, in table order
    pub unselected: CellSubset,
    /// Cells rejected by the name filter, in table order
    pub outliers: CellSubset,
}

impl FilterOutcome {
    /// Cells still visible after filtering
    #[inline]
    #[must_use]
    pub fn visible_count(&self) -> usize {
        self.selected.len() + self.unselected.len()
    }
}

/// Partition `cells` by `predicates`
///
/// # Errors
/// None for the built-in predicates; the `Result` matches the worker's
/// reply type.
pub fn partition_cells(
    cells: &CellTable,
    metadata: &SegmentationMetadata,
    predicates: &FilterPredicateSet,
    parallel_threshold: usize,
) -> Result<FilterOutcome, FilterError> {
    let parallel = cells.len() >= parallel_threshold;

    let (mut filtered, outliers) = match predicates.name_filter.allow_set() {
        Some(allowed) => split_by_cluster(cells, &allowed, parallel),
        None => ((0..cells.len()).collect(), Vec::new()),
    };

    if let Some(gate) = &predicates.protein_gate {
        if let Some((x_idx, y_idx, range)) = gate.resolve(metadata) {
            filtered = narrow(filtered, parallel, |i| {
                let cell = &cells[i];
                match (protein(cell, x_idx), protein(cell, y_idx)) {
                    (Some(x), Some(y)) => range.contains(x, y),
                    _ => false,
                }
            });
        }
    }

    if let Some(range) = predicates.umap_gate {
        filtered = narrow(filtered, parallel, |i| umap_passes(&cells[i], &range));
    }

    tracing::debug!(
        total = cells.len(),
        visible = filtered.len(),
        outliers = outliers.len(),
        parallel,
        "partitioned cells"
    );

    Ok(FilterOutcome {
        selected: CellSubset::empty(cells.clone()),
        unselected: CellSubset::from_indices(cells.clone(), filtered),
        outliers: CellSubset::from_indices(cells.clone(), outliers),
    })
}

fn split_by_cluster(
    cells: &[CellRecord],
    allowed: &HashSet<&str>,
    parallel: bool,
) -> (Vec<usize>, Vec<usize>) {
    let matches = |&i: &usize| allowed.contains(cells[i].cluster_id.as_str());
    if parallel {
        (0..cells.len()).into_par_iter().partition(matches)
    } else {
        (0..cells.len()).partition(matches)
    }
}

fn narrow<F>(indices: Vec<usize>, parallel: bool, keep: F) -> Vec<usize>
where
    F: Fn(usize) -> bool + Sync + Send,
{
    if parallel {
        // Indexed parallel filter keeps table order
        indices.into_par_iter().filter(|&i| keep(i)).collect()
    } else {
        indices.into_iter().filter(|&i| keep(i)).collect()
    }
}

fn protein(cell: &CellRecord, index: usize) -> Option<f64> {
    let value = cell.protein_value(index).map(f64::from);
    if value.is_none() {
        tracing::trace!(
            cell = %cell.cell_id,
            values = cell.protein_values.len(),
            channel = index,
            "cell has no value for gated channel"
        );
    }
    value
}

fn umap_passes(cell: &CellRecord, range: &GateRange) -> bool {
    let (x, y) = (cell.umap.x, cell.umap.y);
    x >= range.x_start && x <= range.x_end && y <= range.y_start && y >= range.y_end
}

/// Transcript points of one tile split by gene visibility
#[derive(Debug, Clone, PartialEq)]
pub struct PointPartition<'a> {
    pub visible: Vec<&'a PointEntry>,
    pub discarded: Vec<&'a PointEntry>,
}

/// Split a tile's points by `filter`
///
/// Points whose gene id is unknown to `genes` are discarded under a gene
/// list and kept under `All`.
#[must_use]
pub fn partition_points<'a>(
    tile: &'a TileRecord,
    filter: &GeneFilter,
    genes: &GeneTable,
) -> PointPartition<'a> {
    match filter {
        GeneFilter::All => PointPartition {
            visible: tile.points().iter().collect(),
            discarded: Vec::new(),
        },
        GeneFilter::Genes(names) => {
            let wanted: HashSet<&str> = names.iter().map(String::as_str).collect();
            let (visible, discarded): (Vec<_>, Vec<_>) = tile.points().iter().partition(|p| {
                genes
                    .name(p.gene)
                    .is_some_and(|name| wanted.contains(name))
            });
            PointPartition { visible, discarded }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predicate::{NameFilter, ProteinGate};
    use std::sync::Arc;
    use tessera_model::{BoundingBox, TileKey};

    fn metadata() -> SegmentationMetadata {
        SegmentationMetadata::new(vec!["CD4".into(), "CD8".into()], vec!["ACTB".into()])
    }

    fn cell(id: &str, cluster: &str, proteins: [f32; 2], umap: (f64, f64)) -> CellRecord {
        CellRecord::builder(id, cluster)
            .proteins(proteins.to_vec())
            .umap(umap.0, umap.1)
            .build()
    }

    fn table() -> CellTable {
        Arc::from(vec![
            cell("a", "1", [5.0, 5.0], (0.5, 0.5)),
            cell("b", "2", [11.0, 5.0], (0.5, 0.5)),
            cell("c", "1", [5.0, 11.0], (2.0, 0.5)),
            cell("d", "3", [1.0, 1.0], (0.2, 0.8)),
        ])
    }

    #[test]
    fn all_keeps_every_cell_in_order() {
        let cells = table();
        let out = partition_cells(&cells, &metadata(), &FilterPredicateSet::new(), usize::MAX)
            .unwrap();
        assert_eq!(out.unselected.cell_ids(), vec!["a", "b", "c", "d"]);
        assert!(out.outliers.is_empty());
        assert!(out.selected.is_empty());
    }

    #[test]
    fn cluster_filter_produces_outliers() {
        let cells = table();
        let predicates =
            FilterPredicateSet::new().with_name_filter(NameFilter::clusters(["1", "3"]));
        let out = partition_cells(&cells, &metadata(), &predicates, usize::MAX).unwrap();
        assert_eq!(out.unselected.cell_ids(), vec!["a", "c", "d"]);
        assert_eq!(out.outliers.cell_ids(), vec!["b"]);
    }

    #[test]
    fn protein_gate_drops_cells_outside_range() {
        let cells = table();
        let predicates = FilterPredicateSet::new().with_protein_gate(ProteinGate::new(
            "CD4",
            "CD8",
            GateRange::new(0.0, 10.0, 10.0, 0.0),
        ));
        let out = partition_cells(&cells, &metadata(), &predicates, usize::MAX).unwrap();
        assert_eq!(out.unselected.cell_ids(), vec!["a", "d"]);
        // Gated cells are not outliers
        assert!(out.outliers.is_empty());
    }

    #[test]
    fn umap_gate_narrows_after_name_filter() {
        let cells = table();
        let predicates = FilterPredicateSet::new()
            .with_name_filter(NameFilter::clusters(["1"]))
            .with_umap_gate(GateRange::new(0.0, 1.0, 1.0, 0.0));
        let out = partition_cells(&cells, &metadata(), &predicates, usize::MAX).unwrap();
        assert_eq!(out.unselected.cell_ids(), vec!["a"]);
        assert_eq!(out.outliers.cell_ids(), vec!["b", "d"]);
    }

    #[test]
    fn short_protein_vector_fails_only_that_cell() {
        let cells: CellTable = Arc::from(vec![
            cell("ok", "1", [5.0, 5.0], (0.0, 0.0)),
            CellRecord::builder("short", "1").proteins(vec![5.0]).build(),
            cell("late", "2", [2.0, 3.0], (0.0, 0.0)),
        ]);
        let predicates = FilterPredicateSet::new().with_protein_gate(ProteinGate::new(
            "CD4",
            "CD8",
            GateRange::new(0.0, 10.0, 10.0, 0.0),
        ));

        for threshold in [usize::MAX, 0] {
            let out = partition_cells(&cells, &metadata(), &predicates, threshold).unwrap();
            assert_eq!(out.unselected.cell_ids(), vec!["ok", "late"]);
            assert!(out.outliers.is_empty());
        }
    }

    #[test]
    fn parallel_and_sequential_agree() {
        let cells: CellTable = (0..500)
            .map(|i| {
                let v = (i % 17) as f32;
                cell(&format!("c{i}"), &(i % 4).to_string(), [v, 16.0 - v], (f64::from(v), 0.0))
            })
            .collect();
        let predicates = FilterPredicateSet::new()
            .with_name_filter(NameFilter::clusters(["0", "2", "3"]))
            .with_protein_gate(ProteinGate::new("CD4", "CD8", GateRange::new(2.0, 12.0, 12.0, 4.0)))
            .with_umap_gate(GateRange::new(0.0, 9.0, 1.0, -1.0));

        let sequential = partition_cells(&cells, &metadata(), &predicates, usize::MAX).unwrap();
        let parallel = partition_cells(&cells, &metadata(), &predicates, 0).unwrap();
        assert_eq!(sequential.unselected.indices(), parallel.unselected.indices());
        assert_eq!(sequential.outliers.indices(), parallel.outliers.indices());
    }

    #[test]
    fn gene_filter_splits_points() {
        let mut genes = GeneTable::new();
        let actb = genes.intern("ACTB");
        let cd3 = genes.intern("CD3E");
        let tile = TileRecord::new(
            TileKey::new(0, 0, 0),
            BoundingBox::default(),
            vec![
                PointEntry::new([1.0, 1.0], actb, None),
                PointEntry::new([2.0, 2.0], cd3, None),
                PointEntry::new([3.0, 3.0], actb, None),
            ],
        );

        let all = partition_points(&tile, &GeneFilter::All, &genes);
        assert_eq!(all.visible.len(), 3);
        assert!(all.discarded.is_empty());

        let some = partition_points(&tile, &GeneFilter::genes(["ACTB"]), &genes);
        assert_eq!(some.visible.len(), 2);
        assert_eq!(some.discarded.len(), 1);
        assert_eq!(some.discarded[0].gene, cd3);
    }
}
