//! Cell-mask decoding
//!
//! A cell-mask payload is one metadata record (protein and gene name
//! tables) followed by one record per segmented cell.

use crate::error::{DecodeError, RecordError};
use crate::record::{read_record, FrameEnd, Frames};
use crate::report::{decode_frames, DecodeReport, Decoded};
use crate::schema::{FieldKind, SchemaDescriptor};
use std::sync::Arc;
use tessera_model::{CellRecord, CellTable, SegmentationMetadata, UmapPoint};

const REQUIRED: &[(&str, FieldKind)] = &[
    ("vertices", FieldKind::F32Array),
    ("area", FieldKind::U32),
    ("totalCounts", FieldKind::U32),
    ("totalGenes", FieldKind::U32),
    ("cellId", FieldKind::String),
    ("clusterId", FieldKind::String),
    ("proteinValues", FieldKind::F32Array),
    ("nonzeroGeneIndices", FieldKind::U32Array),
    ("nonzeroGeneValues", FieldKind::F32Array),
    ("umapX", FieldKind::F64),
    ("umapY", FieldKind::F64),
];

/// Decoded cell-mask file
#[derive(Debug, Clone)]
pub struct CellBatch {
    pub metadata: SegmentationMetadata,
    pub cells: CellTable,
}

impl CellBatch {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Decodes flat cell-mask payloads
#[derive(Debug, Clone)]
pub struct CellMaskDecoder {
    schema: Arc<SchemaDescriptor>,
    metadata_schema: Arc<SchemaDescriptor>,
}

impl Default for CellMaskDecoder {
    fn default() -> Self {
        Self {
            schema: Arc::new(SchemaDescriptor::cell_mask_default()),
            metadata_schema: Arc::new(SchemaDescriptor::cell_metadata()),
        }
    }
}

impl CellMaskDecoder {
    /// Create a decoder for a cell record layout
    ///
    /// # Errors
    /// Returns an error if the schema lacks a cell field
    pub fn new(schema: SchemaDescriptor) -> Result<Self, DecodeError> {
        schema.require(REQUIRED)?;
        Ok(Self {
            schema: Arc::new(schema),
            metadata_schema: Arc::new(SchemaDescriptor::cell_metadata()),
        })
    }

    /// Decode a whole cell-mask payload
    ///
    /// Cells that violate the sparse-gene invariants are skipped like any
    /// other malformed record.
    ///
    /// # Errors
    /// - `DecodeError::MissingMetadata` if the first record is unreadable
    /// - `DecodeError::NoRecoverableRecords` if no cell survived a damaged payload
    pub fn decode(&self, bytes: &[u8]) -> Result<Decoded<CellBatch>, DecodeError> {
        let mut frames = Frames::new(bytes);

        let Some(first) = frames.next() else {
            return match frames.end() {
                Some(FrameEnd::Truncated) => Err(DecodeError::NoRecoverableRecords {
                    skipped: 0,
                    truncated: true,
                }),
                _ => Ok(Decoded::new(
                    CellBatch {
                        metadata: SegmentationMetadata::default(),
                        cells: Vec::new().into(),
                    },
                    DecodeReport::default(),
                )),
            };
        };

        let metadata = self.decode_metadata(first).map_err(DecodeError::MissingMetadata)?;
        let gene_count = metadata.gene_names.len();

        let (cells, report) = decode_frames("cell-masks", frames, |body| {
            let cell = self.decode_cell(body)?;
            cell.validate(gene_count)?;
            Ok(cell)
        })?;

        tracing::debug!(
            cells = cells.len(),
            proteins = metadata.protein_names.len(),
            genes = gene_count,
            "decoded cell masks"
        );

        Ok(Decoded::new(
            CellBatch {
                metadata,
                cells: cells.into(),
            },
            report,
        ))
    }

    fn decode_metadata(&self, body: &[u8]) -> Result<SegmentationMetadata, RecordError> {
        let mut fields = read_record(body, &self.metadata_schema)?;
        Ok(SegmentationMetadata::new(
            fields.string_array("proteinNames"),
            fields.string_array("geneNames"),
        ))
    }

    fn decode_cell(&self, body: &[u8]) -> Result<CellRecord, RecordError> {
        let mut fields = read_record(body, &self.schema)?;
        Ok(CellRecord {
            vertices: fields.f32_array("vertices"),
            area: fields.u32("area"),
            total_counts: fields.u32("totalCounts"),
            total_genes: fields.u32("totalGenes"),
            cell_id: fields.string("cellId"),
            cluster_id: fields.string("clusterId"),
            protein_values: fields.f32_array("proteinValues"),
            nonzero_gene_indices: fields.u32_array("nonzeroGeneIndices"),
            nonzero_gene_values: fields.f32_array("nonzeroGeneValues"),
            umap: UmapPoint::new(fields.f64("umapX"), fields.f64("umapY")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::writer::RecordWriter;

    fn metadata() -> SegmentationMetadata {
        SegmentationMetadata::new(
            vec!["CD4".to_string(), "CD8".to_string()],
            vec!["ACTB".to_string(), "GAPDH".to_string(), "CD3E".to_string()],
        )
    }

    fn cell(id: &str, cluster: &str) -> CellRecord {
        CellRecord::builder(id, cluster)
            .vertices(vec![0.0, 0.0, 1.0, 0.0, 1.0, 1.0])
            .counts(10, 5, 2)
            .proteins(vec![1.0, 2.0])
            .genes(vec![0, 2], vec![3.0, 4.0])
            .umap(0.5, -0.5)
            .build()
    }

    #[test]
    fn decode_cell_masks() {
        let mut writer = RecordWriter::new();
        writer
            .cell_metadata(&metadata())
            .cell(&cell("c1", "1"))
            .cell(&cell("c2", "2"));

        let decoded = CellMaskDecoder::default().decode(&writer.finish()).unwrap();
        let batch = decoded.value;

        assert_eq!(batch.metadata, metadata());
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.cells[1], cell("c2", "2"));
        assert_eq!(decoded.report.records, 2);
    }

    #[test]
    fn invariant_violations_are_skipped() {
        let mut bad = cell("bad", "1");
        bad.nonzero_gene_indices = vec![7];
        bad.nonzero_gene_values = vec![1.0];

        let mut writer = RecordWriter::new();
        writer
            .cell_metadata(&metadata())
            .cell(&cell("c1", "1"))
            .cell(&bad);

        let decoded = CellMaskDecoder::default().decode(&writer.finish()).unwrap();
        assert_eq!(decoded.value.len(), 1);
        assert_eq!(decoded.report.skipped_records, 1);
    }

    #[test]
    fn unreadable_metadata_fails() {
        let mut writer = RecordWriter::new();
        writer.raw_record(&[1, 2, 3]);
        assert!(matches!(
            CellMaskDecoder::default().decode(&writer.finish()),
            Err(DecodeError::MissingMetadata(_))
        ));
    }

    #[test]
    fn empty_payload_decodes_to_empty_batch() {
        let decoded = CellMaskDecoder::default().decode(&[]).unwrap();
        assert!(decoded.value.is_empty());
    }
}
