//! Drawn-polygon region detection
//!
//! Even-odd ray casting against a closed outline. A point exactly on an
//! edge follows the half-open convention of the crossing test: left and
//! bottom edges count as inside, right and top edges as outside.
//!
//! - Transcript points: kept when their position is inside; repeated
//!   positions across pyramid levels are reported once
//! - Cells: kept only when every outline vertex is inside; outlines with
//!   fewer than 3 vertices never match

use crate::partition::DEFAULT_PARALLEL_THRESHOLD;
use crate::subset::CellSubset;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tessera_model::{CellRecord, CellTable, GeneTable, PointEntry, TileRecord};

/// Label used when a point or cell has no gene or cluster name
pub const UNKNOWN_LABEL: &str = "unknown";

/// Closed outline in world coordinates
///
/// The closing edge from the last vertex back to the first is implied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Polygon {
    vertices: Vec<[f64; 2]>,
}

impl Polygon {
    #[inline]
    #[must_use]
    pub fn new(vertices: Vec<[f64; 2]>) -> Self {
        Self { vertices }
    }

    #[inline]
    #[must_use]
    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    /// Even-odd containment of `[x, y]`
    #[must_use]
    pub fn contains(&self, [x, y]: [f64; 2]) -> bool {
        let Some(&last) = self.vertices.last() else {
            return false;
        };

        let mut inside = false;
        let mut prev = last;
        for &vertex in &self.vertices {
            let [xi, yi] = vertex;
            let [xj, yj] = prev;
            if (yi > y) != (yj > y) && x < (xj - xi) * (y - yi) / (yj - yi) + xi {
                inside = !inside;
            }
            prev = vertex;
        }
        inside
    }

    /// Whether every vertex of a flat `[x0, y0, x1, y1, ...]` outline lies inside
    ///
    /// A trailing unpaired coordinate is ignored.
    #[must_use]
    pub fn contains_outline(&self, outline: &[f32]) -> bool {
        if outline.len() < 6 {
            return false;
        }
        outline
            .chunks_exact(2)
            .all(|pair| self.contains([f64::from(pair[0]), f64::from(pair[1])]))
    }
}

/// Points of `tiles` inside `polygon`, first occurrence of each position only
///
/// Tiles are scanned in the given order.
#[must_use]
pub fn points_in_polygon<'a, I>(tiles: I, polygon: &Polygon) -> Vec<&'a PointEntry>
where
    I: IntoIterator<Item = &'a TileRecord>,
{
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for tile in tiles {
        for point in tile.points() {
            if !polygon.contains(point.position) {
                continue;
            }
            // -0.0 and 0.0 are the same position
            let [x, y] = point.position;
            if seen.insert(((x + 0.0).to_bits(), (y + 0.0).to_bits())) {
                found.push(point);
            }
        }
    }
    found
}

/// Cells whose whole outline lies inside `polygon`, in table order
#[must_use]
pub fn cells_in_polygon(cells: &CellTable, polygon: &Polygon) -> CellSubset {
    let inside = |&i: &usize| polygon.contains_outline(&cells[i].vertices);
    let indices: Vec<usize> = if cells.len() >= DEFAULT_PARALLEL_THRESHOLD {
        (0..cells.len()).into_par_iter().filter(inside).collect()
    } else {
        (0..cells.len()).filter(inside).collect()
    };

    tracing::debug!(total = cells.len(), inside = indices.len(), "cells in polygon");
    CellSubset::from_indices(cells.clone(), indices)
}

/// Point count per gene name
#[must_use]
pub fn count_by_gene(points: &[&PointEntry], genes: &GeneTable) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for point in points {
        let name = genes
            .name(point.gene)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_LABEL);
        *counts.entry(name.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Cell count per cluster id
#[must_use]
pub fn count_by_cluster<'a, I>(cells: I) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a CellRecord>,
{
    let mut counts = BTreeMap::new();
    for cell in cells {
        let cluster = if cell.cluster_id.is_empty() {
            UNKNOWN_LABEL
        } else {
            cell.cluster_id.as_str()
        };
        *counts.entry(cluster.to_string()).or_insert(0) += 1;
    }
    counts
}
