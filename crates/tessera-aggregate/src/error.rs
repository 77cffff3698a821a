//! Error types for aggregation

/// Invalid aggregation request
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    /// Named gene or protein is not in the segmentation metadata
    #[error("unknown {kind} '{name}'")]
    UnknownValue { kind: &'static str, name: String },

    /// Zero bins requested
    #[error("bin count must be positive")]
    NoBins,

    /// Range with `min >= max` or non-finite bounds
    #[error("invalid range [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    /// Paired coordinate arrays differ in length
    #[error("coordinate length mismatch: {x} x values, {y} y values")]
    LengthMismatch { x: usize, y: usize },
}
