//! Per-cell value extraction

use crate::error::AggregateError;
use serde::{Deserialize, Serialize};
use tessera_model::{CellRecord, SegmentationMetadata};

/// Which table a chart value comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Gene,
    Protein,
}

/// Numeric value read from each cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellValue {
    /// Sparse gene expression; undetected genes read as `0`
    Gene(u32),
    /// Dense protein channel; missing channels read as `0`
    Protein(usize),
}

impl CellValue {
    /// Resolve a gene or protein name against the metadata tables
    ///
    /// # Errors
    /// - `AggregateError::UnknownValue` if `name` is not in the table
    pub fn resolve(
        metadata: &SegmentationMetadata,
        kind: ValueKind,
        name: &str,
    ) -> Result<Self, AggregateError> {
        let resolved = match kind {
            ValueKind::Gene => metadata
                .gene_index(name)
                .and_then(|i| u32::try_from(i).ok())
                .map(Self::Gene),
            ValueKind::Protein => metadata.protein_index(name).map(Self::Protein),
        };
        resolved.ok_or_else(|| AggregateError::UnknownValue {
            kind: match kind {
                ValueKind::Gene => "gene",
                ValueKind::Protein => "protein",
            },
            name: name.to_string(),
        })
    }

    /// Value of this cell
    #[inline]
    #[must_use]
    pub fn extract(&self, cell: &CellRecord) -> f64 {
        let value = match *self {
            Self::Gene(index) => cell.gene_value(index),
            Self::Protein(index) => cell.protein_value(index),
        };
        value.map_or(0.0, f64::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_values_read_as_zero() {
        let cell = CellRecord::builder("c", "1")
            .proteins(vec![2.5])
            .genes(vec![3], vec![7.0])
            .build();

        assert_eq!(CellValue::Gene(3).extract(&cell), 7.0);
        assert_eq!(CellValue::Gene(1).extract(&cell), 0.0);
        assert_eq!(CellValue::Protein(0).extract(&cell), 2.5);
        assert_eq!(CellValue::Protein(4).extract(&cell), 0.0);
    }

    #[test]
    fn resolve_by_name() {
        let metadata = SegmentationMetadata::new(vec!["CD4".into()], vec!["ACTB".into(), "GAPDH".into()]);
        assert_eq!(
            CellValue::resolve(&metadata, ValueKind::Gene, "GAPDH"),
            Ok(CellValue::Gene(1))
        );
        assert_eq!(
            CellValue::resolve(&metadata, ValueKind::Protein, "CD4"),
            Ok(CellValue::Protein(0))
        );
        assert!(matches!(
            CellValue::resolve(&metadata, ValueKind::Protein, "CD8"),
            Err(AggregateError::UnknownValue { kind: "protein", .. })
        ));
    }
}
