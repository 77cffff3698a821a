//! Record encoding, the inverse of the decoders
//!
//! Used by dataset tooling and fixtures to produce payloads in the
//! default layouts, or arbitrary layouts through [`RecordBody`].

use tessera_model::{CellRecord, SegmentationMetadata};

/// Body of one record, written field by field
#[derive(Debug, Clone, Default)]
pub struct RecordBody {
    buf: Vec<u8>,
}

impl RecordBody {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f32(&mut self, v: f32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn f64(&mut self, v: f64) -> &mut Self {
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn string(&mut self, v: &str) -> &mut Self {
        self.len(v.len());
        self.buf.extend_from_slice(v.as_bytes());
        self
    }

    pub fn optional_string(&mut self, v: Option<&str>) -> &mut Self {
        match v {
            Some(s) => self.u8(1).string(s),
            None => self.u8(0),
        }
    }

    pub fn f32_array(&mut self, values: &[f32]) -> &mut Self {
        self.len(values.len());
        for v in values {
            self.f32(*v);
        }
        self
    }

    pub fn f64_array(&mut self, values: &[f64]) -> &mut Self {
        self.len(values.len());
        for v in values {
            self.f64(*v);
        }
        self
    }

    pub fn u32_array(&mut self, values: &[u32]) -> &mut Self {
        self.len(values.len());
        for v in values {
            self.u32(*v);
        }
        self
    }

    pub fn string_array<S: AsRef<str>>(&mut self, values: &[S]) -> &mut Self {
        self.len(values.len());
        for v in values {
            self.string(v.as_ref());
        }
        self
    }

    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    // Lengths beyond u32 cannot be represented on the wire; saturate so the
    // decoder sees an overrun instead of a silently wrapped count.
    fn len(&mut self, len: usize) {
        let len = u32::try_from(len).unwrap_or(u32::MAX);
        self.u32(len);
    }
}

/// Length-prefixed payload writer
#[derive(Debug, Clone, Default)]
pub struct RecordWriter {
    buf: Vec<u8>,
}

impl RecordWriter {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a framed record
    pub fn record(&mut self, body: &RecordBody) -> &mut Self {
        self.raw_record(body.as_bytes())
    }

    /// Append a framed record from raw body bytes
    pub fn raw_record(&mut self, body: &[u8]) -> &mut Self {
        let len = u32::try_from(body.len()).unwrap_or(u32::MAX);
        self.buf.extend_from_slice(&len.to_le_bytes());
        self.buf.extend_from_slice(body);
        self
    }

    /// Append bytes with no framing (padding, corrupt tails)
    pub fn raw_bytes(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Append a transcript point in the default layout
    pub fn transcript(&mut self, position: [f64; 2], gene: &str, cell_id: Option<&str>) -> &mut Self {
        let mut body = RecordBody::new();
        body.f64(position[0])
            .f64(position[1])
            .string(gene)
            .optional_string(cell_id);
        self.record(&body)
    }

    /// Append the metadata record that opens a cell-mask payload
    pub fn cell_metadata(&mut self, metadata: &SegmentationMetadata) -> &mut Self {
        let mut body = RecordBody::new();
        body.string_array(&metadata.protein_names)
            .string_array(&metadata.gene_names);
        self.record(&body)
    }

    /// Append a cell in the default layout
    pub fn cell(&mut self, cell: &CellRecord) -> &mut Self {
        let mut body = RecordBody::new();
        body.f32_array(&cell.vertices)
            .u32(cell.area)
            .u32(cell.total_counts)
            .u32(cell.total_genes)
            .string(&cell.cell_id)
            .string(&cell.cluster_id)
            .f32_array(&cell.protein_values)
            .u32_array(&cell.nonzero_gene_indices)
            .f32_array(&cell.nonzero_gene_values)
            .f64(cell.umap.x)
            .f64(cell.umap.y);
        self.record(&body)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transcript_record_layout() {
        let mut writer = RecordWriter::new();
        writer.transcript([1.0, 2.0], "AB", None);
        let bytes = writer.finish();

        // 8 + 8 + (4 + 2) + 1
        assert_eq!(&bytes[..4], &23u32.to_le_bytes());
        assert_eq!(bytes.len(), 27);
        assert_eq!(&bytes[24..26], b"AB");
        assert_eq!(bytes[26], 0);
    }

    #[test]
    fn optional_string_present() {
        let mut body = RecordBody::new();
        body.optional_string(Some("x"));
        assert_eq!(body.as_bytes(), &[1, 1, 0, 0, 0, b'x']);
    }
}
