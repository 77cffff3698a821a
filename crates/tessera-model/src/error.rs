//! Error types for the data model

/// Errors raised while building or validating model values
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    /// Member path does not end in `{z}/{x}/{y}.bin`
    #[error("not a tile path: '{0}'")]
    InvalidTilePath(String),

    /// Sparse gene arrays have different lengths
    #[error("cell {cell_id}: {indices} gene indices but {values} gene values")]
    GeneLengthMismatch {
        cell_id: String,
        indices: usize,
        values: usize,
    },

    /// Sparse gene index outside the dataset gene table
    #[error("cell {cell_id}: gene index {index} out of range (table has {table_len})")]
    GeneIndexOutOfRange {
        cell_id: String,
        index: u32,
        table_len: usize,
    },

    /// Gene id not present in the table
    #[error("unknown gene id: {0}")]
    UnknownGene(u32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_error_display() {
        let err = ModelError::InvalidTilePath("a/b.bin".to_string());
        assert_eq!(err.to_string(), "not a tile path: 'a/b.bin'");

        let err = ModelError::GeneLengthMismatch {
            cell_id: "c7".to_string(),
            indices: 3,
            values: 2,
        };
        assert!(err.to_string().contains("3 gene indices but 2 gene values"));
    }
}
