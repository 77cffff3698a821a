//! Transcript tile decoding

use crate::error::DecodeError;
use crate::record::{read_record, Frames};
use crate::report::{decode_frames, Decoded};
use crate::schema::{FieldKind, SchemaDescriptor};
use std::sync::Arc;
use tessera_model::{GeneTable, LayerConfig, PointEntry, TileKey, TileRecord};

/// Fields a transcript schema must declare
const REQUIRED: &[(&str, FieldKind)] = &[
    ("x", FieldKind::F64),
    ("y", FieldKind::F64),
    ("geneName", FieldKind::String),
    ("cellId", FieldKind::OptionalString),
];

/// Decodes transcript tile payloads into [`TileRecord`]s
///
/// Cheap to clone; the schema is shared.
#[derive(Debug, Clone)]
pub struct TileDecoder {
    schema: Arc<SchemaDescriptor>,
    layer: LayerConfig,
}

impl TileDecoder {
    /// Create a decoder for one dataset
    ///
    /// # Errors
    /// - `DecodeError::MissingField` / `FieldKindMismatch` if the schema
    ///   cannot describe a transcript point
    pub fn new(schema: SchemaDescriptor, layer: LayerConfig) -> Result<Self, DecodeError> {
        schema.require(REQUIRED)?;
        Ok(Self {
            schema: Arc::new(schema),
            layer,
        })
    }

    /// Decoder with the default transcript layout
    #[must_use]
    pub fn with_default_schema(layer: LayerConfig) -> Self {
        Self {
            schema: Arc::new(SchemaDescriptor::transcript_default()),
            layer,
        }
    }

    #[inline]
    #[must_use]
    pub fn layer(&self) -> &LayerConfig {
        &self.layer
    }

    #[inline]
    #[must_use]
    pub fn schema(&self) -> &SchemaDescriptor {
        &self.schema
    }

    /// Decode one tile member
    ///
    /// Gene names are interned into `genes`. A damaged tail keeps every
    /// point decoded before it; see [`DecodeReport`](crate::DecodeReport).
    ///
    /// # Errors
    /// - `DecodeError::NoRecoverableRecords` if the payload was damaged and
    ///   no point survived
    pub fn decode_tile(
        &self,
        key: TileKey,
        bytes: &[u8],
        genes: &mut GeneTable,
    ) -> Result<Decoded<TileRecord>, DecodeError> {
        let label = key.to_string();
        let (points, report) = decode_frames(&label, Frames::new(bytes), |body| {
            let mut fields = read_record(body, &self.schema)?;
            let x = fields.f64("x");
            let y = fields.f64("y");
            let gene = genes.intern(&fields.string("geneName"));
            let cell_id = fields.optional_string("cellId");
            Ok(PointEntry::new([x, y], gene, cell_id))
        })?;

        let bounds = self.layer.tile_bounds(key);
        Ok(Decoded::new(TileRecord::new(key, bounds, points), report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldSpec;
    use crate::writer::{RecordBody, RecordWriter};

    fn payload() -> Vec<u8> {
        let mut writer = RecordWriter::new();
        writer
            .transcript([10.0, 20.0], "ACTB", Some("cell-1"))
            .transcript([11.0, 21.0], "CD3E", None)
            .transcript([12.0, 22.0], "ACTB", None);
        writer.finish()
    }

    #[test]
    fn decode_default_tile() {
        let decoder = TileDecoder::with_default_schema(LayerConfig::default());
        let mut genes = GeneTable::new();

        let decoded = decoder
            .decode_tile(TileKey::new(2, 1, 0), &payload(), &mut genes)
            .unwrap();
        let tile = decoded.value;

        assert_eq!(tile.point_count(), 3);
        assert_eq!(genes.len(), 2);
        assert_eq!(tile.points()[0].cell_id.as_deref(), Some("cell-1"));
        assert_eq!(tile.points()[2].gene, tile.points()[0].gene);
        assert_eq!(tile.bounds().left, 1024.0);
        assert_eq!(decoded.report.records, 3);
    }

    #[test]
    fn decode_tile_with_extra_fields() {
        let schema = SchemaDescriptor::new(vec![
            FieldSpec::new("x", FieldKind::F64),
            FieldSpec::new("quality", FieldKind::F32),
            FieldSpec::new("y", FieldKind::F64),
            FieldSpec::new("geneName", FieldKind::String),
            FieldSpec::new("cellId", FieldKind::OptionalString),
            FieldSpec::new("tags", FieldKind::StringArray),
        ])
        .unwrap();
        let decoder = TileDecoder::new(schema, LayerConfig::default()).unwrap();

        let mut body = RecordBody::new();
        body.f64(1.0)
            .f32(0.9)
            .f64(2.0)
            .string("GAPDH")
            .optional_string(None)
            .string_array(&["a", "b"]);
        let mut writer = RecordWriter::new();
        writer.record(&body);

        let mut genes = GeneTable::new();
        let tile = decoder
            .decode_tile(TileKey::new(0, 0, 0), &writer.finish(), &mut genes)
            .unwrap()
            .into_value();

        assert_eq!(tile.points()[0].position, [1.0, 2.0]);
        assert_eq!(genes.name(tile.points()[0].gene), Some("GAPDH"));
    }

    #[test]
    fn reject_schema_without_gene_name() {
        let schema = SchemaDescriptor::new(vec![
            FieldSpec::new("x", FieldKind::F64),
            FieldSpec::new("y", FieldKind::F64),
        ])
        .unwrap();
        assert!(matches!(
            TileDecoder::new(schema, LayerConfig::default()),
            Err(DecodeError::MissingField { .. })
        ));
    }
}
