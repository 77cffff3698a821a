//! Pyramid geometry and the archive `config.json`

use crate::colormap::ColormapEntry;
use crate::tile::{BoundingBox, TileKey};
use serde::{Deserialize, Serialize};

/// Geometry of the transcript tile pyramid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerConfig {
    /// Layer extent in world units
    pub layer_width: u32,
    pub layer_height: u32,
    /// Number of pyramid levels
    pub layers: u32,
    /// Tile edge length at level 0, in world units
    pub tile_size: u32,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            layer_width: 16_000,
            layer_height: 15_232,
            layers: 6,
            tile_size: 4096,
        }
    }
}

impl LayerConfig {
    /// Edge length of one tile at level `z`, in world units
    #[inline]
    #[must_use]
    pub fn tile_extent(&self, z: u32) -> f64 {
        f64::from(self.tile_size) / 2f64.powi(z.min(i32::MAX as u32) as i32)
    }

    /// World-space bounds of a tile, clipped to the layer extent
    #[must_use]
    pub fn tile_bounds(&self, key: TileKey) -> BoundingBox {
        let extent = self.tile_extent(key.z);
        let width = f64::from(self.layer_width);
        let height = f64::from(self.layer_height);

        let left = (f64::from(key.x) * extent).min(width);
        let top = (f64::from(key.y) * extent).min(height);
        BoundingBox::new(
            left,
            top,
            (left + extent).min(width),
            (top + extent).min(height),
        )
    }

    /// Number of tile columns and rows at level `z`
    #[must_use]
    pub fn grid_size(&self, z: u32) -> (u32, u32) {
        let extent = self.tile_extent(z);
        if extent <= 0.0 {
            return (0, 0);
        }
        let cols = (f64::from(self.layer_width) / extent).ceil() as u32;
        let rows = (f64::from(self.layer_height) / extent).ceil() as u32;
        (cols, rows)
    }
}

/// Contents of an archive's `config.json`
///
/// The colormap is optional: archives without one still load, but cluster
/// filtering has no colors to offer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigFileData {
    #[serde(flatten)]
    pub layer: LayerConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_map: Option<Vec<ColormapEntry>>,
}

impl ConfigFileData {
    /// Parse from JSON text
    ///
    /// # Errors
    /// Returns the JSON error if the document is malformed
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_layer_config() {
        let config = LayerConfig::default();
        assert_eq!(config.layers, 6);
        assert_eq!(config.tile_size, 4096);
    }

    #[test]
    fn tile_geometry_halves_per_level() {
        let config = LayerConfig::default();
        assert_eq!(config.tile_extent(0), 4096.0);
        assert_eq!(config.tile_extent(2), 1024.0);
        assert_eq!(config.grid_size(0), (4, 4));
        assert_eq!(config.grid_size(2), (16, 15));
    }

    #[test]
    fn tile_bounds_clip_to_layer() {
        let config = LayerConfig::default();
        let bounds = config.tile_bounds(TileKey::new(0, 3, 3));
        assert_eq!(bounds.left, 12_288.0);
        assert_eq!(bounds.right, 16_000.0);
        assert_eq!(bounds.bottom, 15_232.0);

        let inner = config.tile_bounds(TileKey::new(1, 1, 0));
        assert_eq!(inner, BoundingBox::new(2048.0, 0.0, 4096.0, 2048.0));
    }

    #[test]
    fn parse_config_file_with_colormap() {
        let text = r#"{
            "layer_width": 8000,
            "layer_height": 6000,
            "layers": 4,
            "tile_size": 1024,
            "color_map": [{"gene_name": "ACTB", "color": [255, 0, 0]}]
        }"#;

        let parsed = ConfigFileData::from_json(text).unwrap();
        assert_eq!(parsed.layer.layer_width, 8000);
        assert_eq!(parsed.color_map.as_ref().map(Vec::len), Some(1));
    }

    #[test]
    fn parse_config_file_without_colormap() {
        let text = r#"{"layer_width": 1, "layer_height": 1, "layers": 1, "tile_size": 1}"#;
        let parsed = ConfigFileData::from_json(text).unwrap();
        assert!(parsed.color_map.is_none());
    }

    #[test]
    fn parse_config_file_rejects_missing_geometry() {
        assert!(ConfigFileData::from_json(r#"{"layers": 3}"#).is_err());
    }
}
