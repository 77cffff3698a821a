//! Tessera core service
//!
//! Ties the pipeline together behind one service object:
//! - Ingests transcript archives and cell-mask payloads
//! - Serves decoded tiles through a bounded cache
//! - Tracks zoom breakpoints and selects visible tiles
//! - Runs cell filtering on a background worker
//! - Selects transcripts and cells inside drawn regions
//! - Broadcasts progress, lifecycle and user-facing notifications
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_core::{CoreConfig, CoreEvent, SpatialCore};
//! use tessera_filter::FilterPredicateSet;
//!
//! # async fn example() -> Result<(), tessera_core::CoreError> {
//! let core = SpatialCore::new(CoreConfig::default())?;
//! let mut events = core.subscribe();
//!
//! core.ingest_archive("dataset.tar").await?;
//! core.ingest_cell_masks(std::fs::read("cells.bin").unwrap()).await?;
//!
//! let outcome = core.filter_cells(FilterPredicateSet::default()).await?;
//! println!("{} visible cells", outcome.visible_count());
//!
//! while let Ok(event) = events.try_recv() {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod colormap;
pub mod config;
mod core;
pub mod dataset;
pub mod error;
pub mod event;
pub mod flags;
pub mod source;

pub use crate::core::{PolygonDetection, RenderPoint, SpatialCore, TilePoints};
pub use config::CoreConfig;
pub use dataset::{CellData, Dataset};
pub use error::{ColormapError, ConfigError, CoreError, FlagError, Notification, NotificationLevel};
pub use event::CoreEvent;
pub use flags::PersistedFlags;
pub use source::{PhysicalSize, TileSource};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for driving the core
    pub use crate::{CoreConfig, CoreError, CoreEvent, SpatialCore, TilePoints};
    pub use tessera_filter::{
        FilterPredicateSet, GateRange, GeneFilter, NameFilter, Polygon, ProteinGate,
    };
    pub use tessera_index::Viewport;
    pub use tessera_model::TileKey;
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
