//! Segmented cells and their dataset-level metadata

use crate::error::ModelError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shared, immutable cell population of a dataset
///
/// Built once at decode time; filtering produces index views over it.
pub type CellTable = Arc<[CellRecord]>;

/// UMAP embedding coordinate of a cell
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct UmapPoint {
    pub x: f64,
    pub y: f64,
}

impl UmapPoint {
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// One segmented cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRecord {
    /// Polygon outline as flat `[x0, y0, x1, y1, ...]`
    pub vertices: Vec<f32>,
    pub area: u32,
    pub total_counts: u32,
    pub total_genes: u32,
    /// Unique within the dataset
    pub cell_id: String,
    /// Categorical label from upstream clustering
    pub cluster_id: String,
    /// Dense values, index-aligned to `SegmentationMetadata::protein_names`
    pub protein_values: Vec<f32>,
    /// Sparse gene expression offsets into `SegmentationMetadata::gene_names`
    pub nonzero_gene_indices: Vec<u32>,
    /// Values parallel to `nonzero_gene_indices`
    pub nonzero_gene_values: Vec<f32>,
    pub umap: UmapPoint,
}

impl CellRecord {
    /// Start building a cell with the two required identifiers
    #[inline]
    #[must_use]
    pub fn builder(cell_id: impl Into<String>, cluster_id: impl Into<String>) -> CellRecordBuilder {
        CellRecordBuilder::new(cell_id.into(), cluster_id.into())
    }

    /// Check the sparse gene invariants against a gene table of `gene_count`
    ///
    /// # Errors
    /// - `ModelError::GeneLengthMismatch` if the parallel arrays differ in length
    /// - `ModelError::GeneIndexOutOfRange` if an index is not a valid offset
    pub fn validate(&self, gene_count: usize) -> Result<(), ModelError> {
        if self.nonzero_gene_indices.len() != self.nonzero_gene_values.len() {
            return Err(ModelError::GeneLengthMismatch {
                cell_id: self.cell_id.clone(),
                indices: self.nonzero_gene_indices.len(),
                values: self.nonzero_gene_values.len(),
            });
        }

        if let Some(&index) = self
            .nonzero_gene_indices
            .iter()
            .find(|&&idx| idx as usize >= gene_count)
        {
            return Err(ModelError::GeneIndexOutOfRange {
                cell_id: self.cell_id.clone(),
                index,
                table_len: gene_count,
            });
        }

        Ok(())
    }

    /// Dense protein value at a channel index
    #[inline]
    #[must_use]
    pub fn protein_value(&self, index: usize) -> Option<f32> {
        self.protein_values.get(index).copied()
    }

    /// Sparse gene value; `None` when the gene was not detected in this cell
    #[must_use]
    pub fn gene_value(&self, index: u32) -> Option<f32> {
        self.nonzero_gene_indices
            .iter()
            .position(|&idx| idx == index)
            .and_then(|pos| self.nonzero_gene_values.get(pos).copied())
    }
}

/// Builder for [`CellRecord`]
#[derive(Debug, Clone)]
pub struct CellRecordBuilder {
    cell: CellRecord,
}

impl CellRecordBuilder {
    fn new(cell_id: String, cluster_id: String) -> Self {
        Self {
            cell: CellRecord {
                vertices: Vec::new(),
                area: 0,
                total_counts: 0,
                total_genes: 0,
                cell_id,
                cluster_id,
                protein_values: Vec::new(),
                nonzero_gene_indices: Vec::new(),
                nonzero_gene_values: Vec::new(),
                umap: UmapPoint::default(),
            },
        }
    }

    #[must_use]
    pub fn vertices(mut self, vertices: Vec<f32>) -> Self {
        self.cell.vertices = vertices;
        self
    }

    #[must_use]
    pub fn counts(mut self, area: u32, total_counts: u32, total_genes: u32) -> Self {
        self.cell.area = area;
        self.cell.total_counts = total_counts;
        self.cell.total_genes = total_genes;
        self
    }

    #[must_use]
    pub fn proteins(mut self, values: Vec<f32>) -> Self {
        self.cell.protein_values = values;
        self
    }

    #[must_use]
    pub fn genes(mut self, indices: Vec<u32>, values: Vec<f32>) -> Self {
        self.cell.nonzero_gene_indices = indices;
        self.cell.nonzero_gene_values = values;
        self
    }

    #[must_use]
    pub fn umap(mut self, x: f64, y: f64) -> Self {
        self.cell.umap = UmapPoint::new(x, y);
        self
    }

    #[must_use]
    pub fn build(self) -> CellRecord {
        self.cell
    }
}

/// Channel and gene name tables of a segmentation file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationMetadata {
    pub protein_names: Vec<String>,
    pub gene_names: Vec<String>,
}

impl SegmentationMetadata {
    /// Create new metadata
    #[inline]
    #[must_use]
    pub fn new(protein_names: Vec<String>, gene_names: Vec<String>) -> Self {
        Self {
            protein_names,
            gene_names,
        }
    }

    /// Index of a protein channel by name
    #[inline]
    #[must_use]
    pub fn protein_index(&self, name: &str) -> Option<usize> {
        self.protein_names.iter().position(|n| n == name)
    }

    /// Index of a gene by name
    #[inline]
    #[must_use]
    pub fn gene_index(&self, name: &str) -> Option<usize> {
        self.gene_names.iter().position(|n| n == name)
    }
}
