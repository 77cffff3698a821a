//! Tessera binary decoding
//!
//! Turns extracted archive members into typed tables:
//! - Transcript tiles → [`TileRecord`](tessera_model::TileRecord)
//! - Cell-mask files → [`CellBatch`]
//!
//! # Wire Format
//!
//! ```text
//! payload := record* padding?
//! record  := len:u32le body[len]
//! body    := field*            (in schema order)
//! ```
//!
//! Decoding is tail-tolerant: a damaged tail keeps everything decoded
//! before it, and malformed records inside the payload are skipped. Both
//! are reported through [`DecodeReport`] rather than as errors.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_decode::{RecordWriter, TileDecoder};
//! use tessera_model::{GeneTable, LayerConfig, TileKey};
//!
//! let mut writer = RecordWriter::new();
//! writer.transcript([1.0, 2.0], "ACTB", None);
//!
//! let decoder = TileDecoder::with_default_schema(LayerConfig::default());
//! let mut genes = GeneTable::new();
//! let tile = decoder.decode_tile(TileKey::new(0, 0, 0), &writer.finish(), &mut genes)?;
//! assert_eq!(tile.value.point_count(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cell;
mod error;
mod record;
mod report;
mod schema;
mod tile;
mod validate;
mod writer;

pub use cell::{CellBatch, CellMaskDecoder};
pub use error::{DecodeError, RecordError};
pub use record::{read_record, FieldValue, Fields, FrameEnd, Frames};
pub use report::{DecodeReport, Decoded};
pub use schema::{FieldKind, FieldSpec, SchemaDescriptor};
pub use tile::TileDecoder;
pub use validate::validate_transcript_members;
pub use writer::{RecordBody, RecordWriter};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
