//! Tessera zoom index
//!
//! Maps a continuous viewport zoom onto the discrete levels of a tile
//! pyramid:
//! - [`TileZoomIndex`] remembers the zoom at which each level was activated
//! - [`TilePyramid`] selects the tiles of the current level that overlap a
//!   [`Viewport`]
//!
//! Malformed viewport input is never an error: it is logged at `trace` and
//! leaves state unchanged.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod breakpoint;
mod pyramid;

pub use breakpoint::{TileZoomBreakpoint, TileZoomIndex};
pub use pyramid::{LayerLimits, TilePyramid, Viewport, ZOOM_OFFSET};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
