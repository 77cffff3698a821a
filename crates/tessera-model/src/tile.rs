//! Tile coordinates, bounds and decoded transcript tiles

use crate::error::ModelError;
use crate::gene::GeneId;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Pyramid coordinate of a tile
///
/// `z` is the pyramid level (0 = coarsest), `x`/`y` the column and row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileKey {
    pub z: u32,
    pub x: u32,
    pub y: u32,
}

impl TileKey {
    /// Create new tile key
    #[inline]
    #[must_use]
    pub const fn new(z: u32, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Parse the key from an archive member path ending in `{z}/{x}/{y}.bin`
    ///
    /// Any prefix before the last three segments is ignored, so
    /// `dataset/transcripts/3/1/2.bin` maps to `(3, 1, 2)`.
    ///
    /// # Errors
    /// Returns `ModelError::InvalidTilePath` if the path has another shape
    pub fn from_member_path(path: &str) -> Result<Self, ModelError> {
        let invalid = || ModelError::InvalidTilePath(path.to_string());

        let stem = path.strip_suffix(".bin").ok_or_else(invalid)?;
        let mut segments = stem.rsplit('/');
        let y = segments.next().and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
        let x = segments.next().and_then(|s| s.parse().ok()).ok_or_else(invalid)?;
        let z = segments.next().and_then(|s| s.parse().ok()).ok_or_else(invalid)?;

        Ok(Self { z, x, y })
    }

    /// Member path suffix used to locate this tile in an archive
    #[inline]
    #[must_use]
    pub fn member_suffix(&self) -> String {
        format!("/{}/{}/{}.bin", self.z, self.x, self.y)
    }
}

impl Display for TileKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.z, self.x, self.y)
    }
}

impl FromStr for TileKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        let parsed: Option<Vec<u32>> = parts.iter().map(|p| p.parse().ok()).collect();
        match parsed.as_deref() {
            Some([z, x, y]) => Ok(Self::new(*z, *x, *y)),
            _ => Err(ModelError::InvalidTilePath(s.to_string())),
        }
    }
}

/// Axis-aligned bounds in world units (`top < bottom` in screen space)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
}

impl BoundingBox {
    /// Create new bounding box
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

    #[inline]
    #[must_use]
    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    #[inline]
    #[must_use]
    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    /// Check whether a position lies inside the closed box
    #[inline]
    #[must_use]
    pub fn contains(&self, position: [f64; 2]) -> bool {
        position[0] >= self.left
            && position[0] <= self.right
            && position[1] >= self.top
            && position[1] <= self.bottom
    }

    /// Check whether two boxes overlap (shared edges do not count)
    #[inline]
    #[must_use]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.left < other.right
            && other.left < self.right
            && self.top < other.bottom
            && other.top < self.bottom
    }

    /// Flat polygon `[l,t,0, r,t,0, r,b,0, l,b,0]` used by outline renderers
    #[must_use]
    pub fn outline(&self) -> [f64; 12] {
        [
            self.left, self.top, 0.0, self.right, self.top, 0.0, self.right, self.bottom, 0.0,
            self.left, self.bottom, 0.0,
        ]
    }
}

/// A single transcript detection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointEntry {
    /// World position `[x, y]`
    pub position: [f64; 2],
    /// Interned gene name
    pub gene: GeneId,
    /// Owning cell, if the transcript was assigned to one
    pub cell_id: Option<String>,
}

impl PointEntry {
    /// Create new point entry
    #[inline]
    #[must_use]
    pub fn new(position: [f64; 2], gene: GeneId, cell_id: Option<String>) -> Self {
        Self {
            position,
            gene,
            cell_id,
        }
    }
}

/// Decoded transcript points of one tile
///
/// Immutable once built; shared between the index and render boundary
/// behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct TileRecord {
    key: TileKey,
    bounds: BoundingBox,
    points: Vec<PointEntry>,
}

impl TileRecord {
    /// Create new tile record
    #[inline]
    #[must_use]
    pub fn new(key: TileKey, bounds: BoundingBox, points: Vec<PointEntry>) -> Self {
        Self {
            key,
            bounds,
            points,
        }
    }

    /// Empty tile (member missing from the archive)
    #[inline]
    #[must_use]
    pub fn empty(key: TileKey, bounds: BoundingBox) -> Self {
        Self::new(key, bounds, Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> TileKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn bounds(&self) -> &BoundingBox {
        &self.bounds
    }

    #[inline]
    #[must_use]
    pub fn points(&self) -> &[PointEntry] {
        &self.points
    }

    #[inline]
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.points.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn tile_key_from_member_path() {
        let key = TileKey::from_member_path("dataset/transcripts/3/1/2.bin").unwrap();
        assert_eq!(key, TileKey::new(3, 1, 2));

        let key = TileKey::from_member_path("0/0/0.bin").unwrap();
        assert_eq!(key, TileKey::new(0, 0, 0));
    }

    #[test]
    fn tile_key_rejects_other_paths() {
        assert!(TileKey::from_member_path("config.json").is_err());
        assert!(TileKey::from_member_path("a/1/2.bin").is_err());
        assert!(TileKey::from_member_path("1/2.bin").is_err());
        assert!(TileKey::from_member_path("1/2/3.txt").is_err());
    }

    proptest! {
        #[test]
        fn tile_key_member_suffix_matches_path(
            z in any::<u32>(),
            x in any::<u32>(),
            y in any::<u32>(),
            prefix in "([a-z0-9_]{1,8}/){0,3}[a-z0-9_]{0,8}",
        ) {
            let key = TileKey::new(z, x, y);
            let path = format!("{prefix}{}", key.member_suffix());
            prop_assert_eq!(TileKey::from_member_path(&path).unwrap(), key);
            prop_assert_eq!(key.to_string().parse::<TileKey>().unwrap(), key);
        }
    }

    #[test]
    fn tile_key_display_and_parse() {
        let key = TileKey::new(1, 2, 3);
        assert_eq!(key.to_string(), "1/2/3");
        assert_eq!("1/2/3".parse::<TileKey>().unwrap(), key);
        assert!("1/2".parse::<TileKey>().is_err());
    }

    #[test]
    fn bounding_box_geometry() {
        let bbox = BoundingBox::new(0.0, 0.0, 10.0, 20.0);
        assert_eq!(bbox.width(), 10.0);
        assert_eq!(bbox.height(), 20.0);
        assert!(bbox.contains([10.0, 20.0]));
        assert!(!bbox.contains([10.1, 5.0]));

        let right = BoundingBox::new(10.0, 0.0, 20.0, 20.0);
        assert!(!bbox.intersects(&right));
        let overlapping = BoundingBox::new(5.0, 5.0, 15.0, 15.0);
        assert!(bbox.intersects(&overlapping));
    }

    #[test]
    fn tile_record_accessors() {
        let tile = TileRecord::empty(TileKey::new(0, 0, 0), BoundingBox::default());
        assert!(tile.is_empty());
        assert_eq!(tile.point_count(), 0);
    }
}
