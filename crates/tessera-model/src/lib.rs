//! Tessera data model
//!
//! Immutable, typed tables shared by every stage of the pipeline.
//!
//! # Core Concepts
//!
//! - [`TileRecord`]: decoded transcript points of one pyramid tile `(z, x, y)`
//! - [`PointEntry`]: a single transcript detection with an interned gene id
//! - [`GeneTable`]: insertion-ordered gene name interner
//! - [`CellRecord`]: one segmented cell (the `SingleMask` of the viewer)
//! - [`LayerConfig`]: pyramid geometry read from an archive's `config.json`
//! - [`ColormapEntry`]: cluster or gene color assignment
//! - [`DatasetFingerprint`]: Blake3 digest identifying a loaded archive
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_model::{GeneTable, PointEntry, TileKey, TileRecord, BoundingBox};
//!
//! let mut genes = GeneTable::new();
//! let point = PointEntry::new([10.0, 20.0], genes.intern("ACTB"), None);
//! let tile = TileRecord::new(TileKey::new(3, 1, 2), BoundingBox::default(), vec![point]);
//! assert_eq!(tile.point_count(), 1);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod cell;
mod colormap;
mod error;
mod fingerprint;
mod gene;
mod layer;
mod tile;

pub use cell::{CellRecord, CellRecordBuilder, CellTable, SegmentationMetadata, UmapPoint};
pub use colormap::ColormapEntry;
pub use error::ModelError;
pub use fingerprint::{DatasetFingerprint, FingerprintBuilder};
pub use gene::{GeneId, GeneTable};
pub use layer::{ConfigFileData, LayerConfig};
pub use tile::{BoundingBox, PointEntry, TileKey, TileRecord};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
