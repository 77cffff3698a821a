//! Record framing and field reading
//!
//! - [`Frames`]: splits a payload into `[u32 LE len][body]` records and
//!   decides where the usable part of the payload ends
//! - [`read_record`]: reads one body against a schema into [`Fields`]

use crate::error::RecordError;
use crate::schema::{FieldKind, SchemaDescriptor};

const LEN_PREFIX: usize = 4;

/// Decoded value of one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    F32(f32),
    F64(f64),
    String(String),
    OptionalString(Option<String>),
    F32Array(Vec<f32>),
    F64Array(Vec<f64>),
    U32Array(Vec<u32>),
    StringArray(Vec<String>),
}

/// Field values of one record, in schema order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Fields {
    values: Vec<(String, FieldValue)>,
}

impl Fields {
    fn take(&mut self, name: &str) -> Option<FieldValue> {
        let idx = self.values.iter().position(|(n, _)| n == name)?;
        Some(self.values.swap_remove(idx).1)
    }

    /// Take an `f64` field; schema validation guarantees the kind
    pub(crate) fn f64(&mut self, name: &str) -> f64 {
        match self.take(name) {
            Some(FieldValue::F64(v)) => v,
            _ => f64::NAN,
        }
    }

    pub(crate) fn u32(&mut self, name: &str) -> u32 {
        match self.take(name) {
            Some(FieldValue::U32(v)) => v,
            _ => 0,
        }
    }

    pub(crate) fn string(&mut self, name: &str) -> String {
        match self.take(name) {
            Some(FieldValue::String(v)) => v,
            _ => String::new(),
        }
    }

    pub(crate) fn optional_string(&mut self, name: &str) -> Option<String> {
        match self.take(name) {
            Some(FieldValue::OptionalString(v)) => v,
            _ => None,
        }
    }

    pub(crate) fn f32_array(&mut self, name: &str) -> Vec<f32> {
        match self.take(name) {
            Some(FieldValue::F32Array(v)) => v,
            _ => Vec::new(),
        }
    }

    pub(crate) fn u32_array(&mut self, name: &str) -> Vec<u32> {
        match self.take(name) {
            Some(FieldValue::U32Array(v)) => v,
            _ => Vec::new(),
        }
    }

    pub(crate) fn string_array(&mut self, name: &str) -> Vec<String> {
        match self.take(name) {
            Some(FieldValue::StringArray(v)) => v,
            _ => Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of a field by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.values.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Read one record body against a schema
///
/// Fields not needed by the caller are still consumed by their declared
/// width or length prefix. Bytes after the last schema field are ignored.
///
/// # Errors
/// Returns a [`RecordError`] if any field is malformed
pub fn read_record(body: &[u8], schema: &SchemaDescriptor) -> Result<Fields, RecordError> {
    let mut reader = BodyReader::new(body);
    let mut values = Vec::with_capacity(schema.fields().len());

    for spec in schema.fields() {
        let value = reader.read(&spec.name, spec.kind)?;
        values.push((spec.name.clone(), value));
    }

    Ok(Fields { values })
}

struct BodyReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn take(&mut self, field: &str, needed: usize) -> Result<&'a [u8], RecordError> {
        let remaining = self.buf.len() - self.pos;
        if needed > remaining {
            return Err(RecordError::Overrun {
                field: field.to_string(),
                needed,
                remaining,
            });
        }
        let slice = &self.buf[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self, field: &str) -> Result<[u8; N], RecordError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    fn u32(&mut self, field: &str) -> Result<u32, RecordError> {
        Ok(u32::from_le_bytes(self.array(field)?))
    }

    /// Element count followed by `count * width` bytes, bounds-checked up front
    fn counted(&mut self, field: &str, width: usize) -> Result<&'a [u8], RecordError> {
        let count = self.u32(field)? as usize;
        let needed = count.checked_mul(width).unwrap_or(usize::MAX);
        self.take(field, needed)
    }

    fn string(&mut self, field: &str) -> Result<String, RecordError> {
        let len = self.u32(field)? as usize;
        let bytes = self.take(field, len)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| RecordError::InvalidUtf8 {
                field: field.to_string(),
            })
    }

    fn read(&mut self, field: &str, kind: FieldKind) -> Result<FieldValue, RecordError> {
        let value = match kind {
            FieldKind::U8 => FieldValue::U8(self.array::<1>(field)?[0]),
            FieldKind::U16 => FieldValue::U16(u16::from_le_bytes(self.array(field)?)),
            FieldKind::U32 => FieldValue::U32(self.u32(field)?),
            FieldKind::F32 => FieldValue::F32(f32::from_le_bytes(self.array(field)?)),
            FieldKind::F64 => FieldValue::F64(f64::from_le_bytes(self.array(field)?)),
            FieldKind::String => FieldValue::String(self.string(field)?),
            FieldKind::OptionalString => match self.array::<1>(field)?[0] {
                0 => FieldValue::OptionalString(None),
                1 => FieldValue::OptionalString(Some(self.string(field)?)),
                flag => {
                    return Err(RecordError::InvalidFlag {
                        field: field.to_string(),
                        flag,
                    })
                }
            },
            FieldKind::F32Array => FieldValue::F32Array(
                self.counted(field, 4)?
                    .chunks_exact(4)
                    .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            FieldKind::F64Array => FieldValue::F64Array(
                self.counted(field, 8)?
                    .chunks_exact(8)
                    .map(|c| {
                        let mut b = [0u8; 8];
                        b.copy_from_slice(c);
                        f64::from_le_bytes(b)
                    })
                    .collect(),
            ),
            FieldKind::U32Array => FieldValue::U32Array(
                self.counted(field, 4)?
                    .chunks_exact(4)
                    .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                    .collect(),
            ),
            FieldKind::StringArray => {
                let count = self.u32(field)? as usize;
                // Each string needs at least its length prefix
                let remaining = self.buf.len() - self.pos;
                if count.saturating_mul(LEN_PREFIX) > remaining {
                    return Err(RecordError::Overrun {
                        field: field.to_string(),
                        needed: count.saturating_mul(LEN_PREFIX),
                        remaining,
                    });
                }
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.string(field)?);
                }
                FieldValue::StringArray(items)
            }
        };
        Ok(value)
    }
}

/// Where a payload stopped yielding records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameEnd {
    /// Consumed exactly
    Clean,
    /// Trailing zero padding or a sub-prefix remainder
    Padding,
    /// A length prefix pointed past the end of the buffer
    Truncated,
}

/// Iterator over the record bodies of a payload
#[derive(Debug)]
pub struct Frames<'a> {
    buf: &'a [u8],
    pos: usize,
    end: Option<FrameEnd>,
}

impl<'a> Frames<'a> {
    #[inline]
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            end: None,
        }
    }

    /// How iteration ended; `None` while records remain
    #[inline]
    #[must_use]
    pub fn end(&self) -> Option<FrameEnd> {
        self.end
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some() {
            return None;
        }

        let rest = &self.buf[self.pos..];
        if rest.is_empty() {
            self.end = Some(FrameEnd::Clean);
            return None;
        }
        if rest.len() < LEN_PREFIX {
            self.end = Some(FrameEnd::Padding);
            return None;
        }

        let len = u32::from_le_bytes([rest[0], rest[1], rest[2], rest[3]]) as usize;
        if len == 0 && rest.iter().all(|&b| b == 0) {
            self.end = Some(FrameEnd::Padding);
            return None;
        }
        if len > rest.len() - LEN_PREFIX {
            self.end = Some(FrameEnd::Truncated);
            return None;
        }

        self.pos += LEN_PREFIX + len;
        Some(&rest[LEN_PREFIX..LEN_PREFIX + len])
    }
}
