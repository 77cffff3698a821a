//! Zoom breakpoints
//!
//! Records the continuous zoom at which each pyramid layer was last
//! activated. Two entry points that may disagree transiently:
//! - [`TileZoomIndex::update_tile_zoom_breakpoint`] forces the active layer
//! - [`TileZoomIndex::get_current_tile_index_for_zoom`] computes it from the
//!   breakpoint list
//!
//! The forced value sticks until the next update, which damps flicker while
//! the viewport is zooming rapidly.

use serde::{Deserialize, Serialize};

/// Zoom at which a layer was last switched to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileZoomBreakpoint {
    pub tile_index: u32,
    pub zoom_threshold: f64,
}

/// Breakpoint list plus the currently visible layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileZoomIndex {
    /// Sorted descending by `zoom_threshold`
    breakpoints: Vec<TileZoomBreakpoint>,
    current_visible_layer: u32,
}

impl TileZoomIndex {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with a given active layer and no breakpoints
    #[inline]
    #[must_use]
    pub fn with_initial_layer(layer: u32) -> Self {
        Self {
            breakpoints: Vec::new(),
            current_visible_layer: layer,
        }
    }

    /// Record that `tile_index` became active at `current_zoom`
    ///
    /// Re-registering the same threshold is a no-op. Any other call upserts
    /// the breakpoint and makes `tile_index` the visible layer immediately.
    /// Negative indices and non-finite zooms are viewport noise and are
    /// ignored.
    ///
    /// Returns whether the index changed.
    pub fn update_tile_zoom_breakpoint(&mut self, tile_index: i64, current_zoom: f64) -> bool {
        let Ok(tile_index) = u32::try_from(tile_index) else {
            tracing::trace!(tile_index, "ignoring invalid tile index");
            return false;
        };
        if !current_zoom.is_finite() {
            tracing::trace!(tile_index, current_zoom, "ignoring non-finite zoom");
            return false;
        }

        let existing = self
            .breakpoints
            .iter()
            .position(|b| b.tile_index == tile_index);

        match existing {
            Some(idx) if self.breakpoints[idx].zoom_threshold == current_zoom => return false,
            Some(idx) => self.breakpoints[idx].zoom_threshold = current_zoom,
            None => self.breakpoints.push(TileZoomBreakpoint {
                tile_index,
                zoom_threshold: current_zoom,
            }),
        }

        self.breakpoints
            .sort_by(|a, b| b.zoom_threshold.total_cmp(&a.zoom_threshold));
        self.current_visible_layer = tile_index;
        true
    }

    /// Layer that should be visible at `zoom`
    ///
    /// First breakpoint (in descending order) whose threshold `<= zoom`;
    /// failing that, the smallest-threshold breakpoint; with no breakpoints,
    /// the current visible layer. A non-finite zoom also yields the current
    /// visible layer.
    #[must_use]
    pub fn get_current_tile_index_for_zoom(&self, zoom: f64) -> u32 {
        if !zoom.is_finite() {
            return self.current_visible_layer;
        }

        self.breakpoints
            .iter()
            .find(|b| b.zoom_threshold <= zoom)
            .or_else(|| self.breakpoints.last())
            .map_or(self.current_visible_layer, |b| b.tile_index)
    }

    /// Layer most recently forced by an update
    #[inline]
    #[must_use]
    pub fn current_visible_layer(&self) -> u32 {
        self.current_visible_layer
    }

    /// Breakpoints, sorted descending by threshold
    #[inline]
    #[must_use]
    pub fn breakpoints(&self) -> &[TileZoomBreakpoint] {
        &self.breakpoints
    }

    /// Forget all breakpoints, keeping the visible layer
    pub fn clear(&mut self) {
        self.breakpoints.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_falls_through_to_lower_threshold() {
        let mut index = TileZoomIndex::new();
        index.update_tile_zoom_breakpoint(2, 5.0);
        index.update_tile_zoom_breakpoint(1, 8.0);

        assert_eq!(index.get_current_tile_index_for_zoom(6.0), 2);
        // The forced value still reflects the most recent update
        assert_eq!(index.current_visible_layer(), 1);
    }

    #[test]
    fn lookup_below_all_thresholds_returns_smallest() {
        let mut index = TileZoomIndex::new();
        index.update_tile_zoom_breakpoint(3, 4.0);
        index.update_tile_zoom_breakpoint(4, 2.0);
        assert_eq!(index.get_current_tile_index_for_zoom(1.0), 4);
        assert_eq!(index.get_current_tile_index_for_zoom(10.0), 3);
    }

    #[test]
    fn lookup_without_breakpoints_returns_current_layer() {
        let index = TileZoomIndex::with_initial_layer(5);
        assert_eq!(index.get_current_tile_index_for_zoom(3.0), 5);
    }

    #[test]
    fn same_threshold_is_idempotent() {
        let mut index = TileZoomIndex::new();
        assert!(index.update_tile_zoom_breakpoint(2, 5.0));
        assert!(index.update_tile_zoom_breakpoint(1, 8.0));

        // Re-registering tile 2 at 5.0 does not re-activate it
        assert!(!index.update_tile_zoom_breakpoint(2, 5.0));
        assert_eq!(index.current_visible_layer(), 1);
        assert_eq!(index.breakpoints().len(), 2);
    }

    #[test]
    fn upsert_moves_threshold_and_resorts() {
        let mut index = TileZoomIndex::new();
        index.update_tile_zoom_breakpoint(1, 8.0);
        index.update_tile_zoom_breakpoint(2, 5.0);
        index.update_tile_zoom_breakpoint(1, 3.0);

        let order: Vec<u32> = index.breakpoints().iter().map(|b| b.tile_index).collect();
        assert_eq!(order, vec![2, 1]);
        assert_eq!(index.current_visible_layer(), 1);
    }

    #[test]
    fn invalid_input_is_ignored() {
        let mut index = TileZoomIndex::new();
        index.update_tile_zoom_breakpoint(2, 5.0);

        assert!(!index.update_tile_zoom_breakpoint(-1, 4.0));
        assert!(!index.update_tile_zoom_breakpoint(3, f64::NAN));
        assert!(!index.update_tile_zoom_breakpoint(3, f64::INFINITY));

        assert_eq!(index.breakpoints().len(), 1);
        assert_eq!(index.current_visible_layer(), 2);
        assert_eq!(index.get_current_tile_index_for_zoom(f64::NAN), 2);
    }
}
