//! Record schema descriptors
//!
//! A [`SchemaDescriptor`] is the ordered field list of one record body. It
//! is parsed once (usually from JSON) and then shared by every decode of the
//! same file kind.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{self, Display, Formatter};

/// Wire kind of a record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    U8,
    U16,
    U32,
    F32,
    F64,
    /// `u32` byte length + UTF-8
    String,
    /// `u8` presence flag, then a `string` if the flag is 1
    OptionalString,
    /// `u32` element count + `f32` elements
    F32Array,
    F64Array,
    U32Array,
    /// `u32` count + `string` elements
    StringArray,
}

impl FieldKind {
    /// Byte width for fixed-width kinds
    #[inline]
    #[must_use]
    pub const fn fixed_width(self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::U16 => Some(2),
            Self::U32 | Self::F32 => Some(4),
            Self::F64 => Some(8),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::U32 => "u32",
            Self::F32 => "f32",
            Self::F64 => "f64",
            Self::String => "string",
            Self::OptionalString => "optional_string",
            Self::F32Array => "f32_array",
            Self::F64Array => "f64_array",
            Self::U32Array => "u32_array",
            Self::StringArray => "string_array",
        }
    }
}

impl Display for FieldKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named field of a record body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered field layout of a record body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSchema")]
pub struct SchemaDescriptor {
    fields: Vec<FieldSpec>,
}

#[derive(Deserialize)]
struct RawSchema {
    fields: Vec<FieldSpec>,
}

impl TryFrom<RawSchema> for SchemaDescriptor {
    type Error = DecodeError;

    fn try_from(raw: RawSchema) -> Result<Self, Self::Error> {
        Self::new(raw.fields)
    }
}

impl SchemaDescriptor {
    /// Create a schema from an ordered field list
    ///
    /// # Errors
    /// - `DecodeError::InvalidSchema` if the list is empty or names repeat
    pub fn new(fields: Vec<FieldSpec>) -> Result<Self, DecodeError> {
        if fields.is_empty() {
            return Err(DecodeError::InvalidSchema("no fields".to_string()));
        }

        let mut seen = HashSet::with_capacity(fields.len());
        for field in &fields {
            if !seen.insert(field.name.as_str()) {
                return Err(DecodeError::InvalidSchema(format!(
                    "duplicate field '{}'",
                    field.name
                )));
            }
        }

        Ok(Self { fields })
    }

    /// Parse a schema from `{"fields": [{"name": ..., "kind": ...}, ...]}`
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed or the field list is invalid
    pub fn from_json(text: &str) -> Result<Self, DecodeError> {
        serde_json::from_str(text).map_err(|err| {
            if err.is_data() {
                DecodeError::InvalidSchema(err.to_string())
            } else {
                DecodeError::SchemaJson(err)
            }
        })
    }

    /// Layout of a transcript point record
    #[must_use]
    pub fn transcript_default() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("x", FieldKind::F64),
                FieldSpec::new("y", FieldKind::F64),
                FieldSpec::new("geneName", FieldKind::String),
                FieldSpec::new("cellId", FieldKind::OptionalString),
            ],
        }
    }

    /// Layout of a cell-mask record
    #[must_use]
    pub fn cell_mask_default() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("vertices", FieldKind::F32Array),
                FieldSpec::new("area", FieldKind::U32),
                FieldSpec::new("totalCounts", FieldKind::U32),
                FieldSpec::new("totalGenes", FieldKind::U32),
                FieldSpec::new("cellId", FieldKind::String),
                FieldSpec::new("clusterId", FieldKind::String),
                FieldSpec::new("proteinValues", FieldKind::F32Array),
                FieldSpec::new("nonzeroGeneIndices", FieldKind::U32Array),
                FieldSpec::new("nonzeroGeneValues", FieldKind::F32Array),
                FieldSpec::new("umapX", FieldKind::F64),
                FieldSpec::new("umapY", FieldKind::F64),
            ],
        }
    }

    /// Layout of the metadata record that opens a cell-mask payload
    #[must_use]
    pub fn cell_metadata() -> Self {
        Self {
            fields: vec![
                FieldSpec::new("proteinNames", FieldKind::StringArray),
                FieldSpec::new("geneNames", FieldKind::StringArray),
            ],
        }
    }

    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Position of a field by name
    #[inline]
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Check that every `(name, kind)` pair is declared with that kind
    ///
    /// # Errors
    /// - `DecodeError::MissingField` if a name is absent
    /// - `DecodeError::FieldKindMismatch` if a name has another kind
    pub fn require(&self, required: &[(&str, FieldKind)]) -> Result<(), DecodeError> {
        for &(name, expected) in required {
            match self.fields.iter().find(|f| f.name == name) {
                None => {
                    return Err(DecodeError::MissingField {
                        field: name.to_string(),
                        expected,
                    })
                }
                Some(spec) if spec.kind != expected => {
                    return Err(DecodeError::FieldKindMismatch {
                        field: name.to_string(),
                        expected,
                        found: spec.kind,
                    })
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_schema_json() {
        let schema = SchemaDescriptor::from_json(
            r#"{"fields": [
                {"name": "x", "kind": "f64"},
                {"name": "label", "kind": "optional_string"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(schema.fields().len(), 2);
        assert_eq!(schema.fields()[1].kind, FieldKind::OptionalString);
        assert_eq!(schema.position("label"), Some(1));
    }

    #[test]
    fn reject_duplicate_fields() {
        let result = SchemaDescriptor::new(vec![
            FieldSpec::new("x", FieldKind::F64),
            FieldSpec::new("x", FieldKind::F32),
        ]);
        assert!(matches!(result, Err(DecodeError::InvalidSchema(_))));
    }

    #[test]
    fn reject_unknown_kind() {
        let result = SchemaDescriptor::from_json(r#"{"fields": [{"name": "x", "kind": "i128"}]}"#);
        assert!(matches!(result, Err(DecodeError::InvalidSchema(_))));
    }

    #[test]
    fn require_reports_missing_and_mismatched() {
        let schema = SchemaDescriptor::transcript_default();
        assert!(schema
            .require(&[("x", FieldKind::F64), ("geneName", FieldKind::String)])
            .is_ok());

        assert!(matches!(
            schema.require(&[("z", FieldKind::F64)]),
            Err(DecodeError::MissingField { .. })
        ));
        assert!(matches!(
            schema.require(&[("x", FieldKind::F32)]),
            Err(DecodeError::FieldKindMismatch {
                found: FieldKind::F64,
                ..
            })
        ));
    }

    #[test]
    fn fixed_widths() {
        assert_eq!(FieldKind::F64.fixed_width(), Some(8));
        assert_eq!(FieldKind::U16.fixed_width(), Some(2));
        assert_eq!(FieldKind::StringArray.fixed_width(), None);
    }
}
