//! Error types for binary decoding
//!
//! Two levels:
//! - [`DecodeError`]: the whole payload is unusable
//! - [`RecordError`]: one record body is malformed; the decoder skips it and
//!   keeps going

use crate::schema::FieldKind;
use tessera_model::ModelError;

/// Payload-level decode failures
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Schema JSON could not be parsed
    #[error("schema parse failed: {0}")]
    SchemaJson(#[from] serde_json::Error),

    /// Schema is structurally invalid
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// Schema lacks a field the record kind needs
    #[error("schema missing required field '{field}' ({expected})")]
    MissingField { field: String, expected: FieldKind },

    /// Schema declares a required field with the wrong kind
    #[error("schema field '{field}' is {found}, expected {expected}")]
    FieldKindMismatch {
        field: String,
        expected: FieldKind,
        found: FieldKind,
    },

    /// Nothing could be salvaged from a damaged payload
    #[error("no recoverable records ({skipped} skipped, truncated: {truncated})")]
    NoRecoverableRecords { skipped: usize, truncated: bool },

    /// Cell-mask payload does not start with a readable metadata record
    #[error("cell-mask payload has no readable metadata record: {0}")]
    MissingMetadata(RecordError),

    /// Transcript member failed the gene-name sanity check
    #[error("invalid transcript file '{path}': {reason}")]
    InvalidTranscriptFile { path: String, reason: String },

    /// Gene-name pattern failed to compile
    #[error("gene name pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Failure to decode one record body
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordError {
    /// Field extends past the end of the record body
    #[error("field '{field}' needs {needed} bytes, {remaining} remaining")]
    Overrun {
        field: String,
        needed: usize,
        remaining: usize,
    },

    /// String field is not valid UTF-8
    #[error("field '{field}' is not valid UTF-8")]
    InvalidUtf8 { field: String },

    /// Optional-string presence flag other than 0 or 1
    #[error("field '{field}' has presence flag {flag}")]
    InvalidFlag { field: String, flag: u8 },

    /// Decoded value breaks a model invariant
    #[error("invariant violated: {0}")]
    Invariant(#[from] ModelError),
}

impl DecodeError {
    /// Whether the failure comes from a damaged payload rather than a bad schema
    #[inline]
    #[must_use]
    pub fn is_corrupt_payload(&self) -> bool {
        matches!(
            self,
            Self::NoRecoverableRecords { .. } | Self::MissingMetadata(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_error_display() {
        let err = DecodeError::MissingField {
            field: "geneName".to_string(),
            expected: FieldKind::String,
        };
        assert_eq!(
            err.to_string(),
            "schema missing required field 'geneName' (string)"
        );

        let err = DecodeError::NoRecoverableRecords {
            skipped: 2,
            truncated: true,
        };
        assert!(err.is_corrupt_payload());
    }

    #[test]
    fn record_error_from_model_error() {
        let err: RecordError = ModelError::UnknownGene(3).into();
        assert!(matches!(err, RecordError::Invariant(ModelError::UnknownGene(3))));
    }
}
