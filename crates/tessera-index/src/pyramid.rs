//! Tile pyramid geometry and visible-tile selection

use serde::{Deserialize, Serialize};
use tessera_model::{BoundingBox, LayerConfig, TileKey};

/// Levels added to the viewport zoom when picking a pyramid level
pub const ZOOM_OFFSET: i64 = 2;

/// Restriction on which levels may be shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LayerLimits {
    /// Apply `max_visible_layers`
    pub override_layers: bool,
    /// Number of finest levels kept when overriding
    pub max_visible_layers: u32,
}

impl LayerLimits {
    /// Limit to the `max_visible_layers` finest levels
    #[inline]
    #[must_use]
    pub fn finest(max_visible_layers: u32) -> Self {
        Self {
            override_layers: true,
            max_visible_layers,
        }
    }
}

/// World-space viewport rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl Viewport {
    #[inline]
    #[must_use]
    pub const fn new(left: f64, top: f64, right: f64, bottom: f64) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Finite with positive area
    #[must_use]
    pub fn is_valid(&self) -> bool {
        [self.left, self.top, self.right, self.bottom]
            .iter()
            .all(|v| v.is_finite())
            && self.right > self.left
            && self.bottom > self.top
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::new(self.left, self.top, self.right, self.bottom)
    }
}

/// Pyramid over one dataset's transcript layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TilePyramid {
    layer: LayerConfig,
    limits: LayerLimits,
}

impl TilePyramid {
    #[inline]
    #[must_use]
    pub fn new(layer: LayerConfig) -> Self {
        Self {
            layer,
            limits: LayerLimits::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_limits(mut self, limits: LayerLimits) -> Self {
        self.limits = limits;
        self
    }

    #[inline]
    #[must_use]
    pub fn layer(&self) -> &LayerConfig {
        &self.layer
    }

    /// Number of levels
    #[inline]
    #[must_use]
    pub fn levels(&self) -> u32 {
        self.layer.layers
    }

    /// Coarsest level allowed by the limits
    #[must_use]
    pub fn min_level(&self) -> u32 {
        if self.limits.override_layers {
            self.layer
                .layers
                .saturating_sub(self.limits.max_visible_layers)
        } else {
            0
        }
    }

    /// Finest level
    #[inline]
    #[must_use]
    pub fn max_level(&self) -> u32 {
        self.layer.layers.saturating_sub(1)
    }

    /// Tile edge length at level `z`
    #[inline]
    #[must_use]
    pub fn tile_extent(&self, z: u32) -> f64 {
        self.layer.tile_extent(z)
    }

    /// Bounds of a tile, clipped to the layer extent
    #[inline]
    #[must_use]
    pub fn tile_bounds(&self, key: TileKey) -> BoundingBox {
        self.layer.tile_bounds(key)
    }

    /// Grid `(columns, rows)` at level `z`
    #[inline]
    #[must_use]
    pub fn tiles_at(&self, z: u32) -> (u32, u32) {
        self.layer.grid_size(z)
    }

    /// Pyramid level shown at a viewport zoom
    ///
    /// `clamp(floor(zoom) + ZOOM_OFFSET, min_level, max_level)`; `None` for
    /// a non-finite zoom or an empty pyramid.
    #[must_use]
    pub fn level_for_zoom(&self, zoom: f64) -> Option<u32> {
        if !zoom.is_finite() || self.layer.layers == 0 {
            return None;
        }

        let min = i64::from(self.min_level().min(self.max_level()));
        let max = i64::from(self.max_level());
        let raw = (zoom.floor() as i64).saturating_add(ZOOM_OFFSET);
        u32::try_from(raw.clamp(min, max)).ok()
    }

    /// Keys of every tile at the zoom's level that overlaps the viewport
    ///
    /// Row-major (by `y`, then `x`). Invalid viewports or zooms select
    /// nothing.
    #[must_use]
    pub fn visible_tiles(&self, viewport: &Viewport, zoom: f64) -> Vec<TileKey> {
        if !viewport.is_valid() {
            tracing::trace!(?viewport, "ignoring invalid viewport");
            return Vec::new();
        }
        let Some(z) = self.level_for_zoom(zoom) else {
            tracing::trace!(zoom, "ignoring invalid zoom");
            return Vec::new();
        };

        let extent = self.tile_extent(z);
        let (cols, rows) = self.tiles_at(z);
        if cols == 0 || rows == 0 || extent <= 0.0 {
            return Vec::new();
        }

        let span = |lo: f64, hi: f64, count: u32| -> (u32, u32) {
            let first = (lo / extent).floor().max(0.0);
            let last = (hi / extent).ceil().min(f64::from(count));
            (first as u32, last as u32)
        };
        let (x0, x1) = span(viewport.left, viewport.right, cols);
        let (y0, y1) = span(viewport.top, viewport.bottom, rows);

        let view = viewport.bounds();
        let mut keys = Vec::new();
        for y in y0..y1 {
            for x in x0..x1 {
                let key = TileKey::new(z, x, y);
                if self.tile_bounds(key).intersects(&view) {
                    keys.push(key);
                }
            }
        }
        keys
    }
}
