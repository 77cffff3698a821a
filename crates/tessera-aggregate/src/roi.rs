//! Region-of-interest summaries for bar charts and heatmaps

use crate::summary::MeanAccumulator;
use crate::value::CellValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tessera_filter::CellSubset;

/// Cells captured by one region of interest
#[derive(Debug, Clone)]
pub struct RoiSelection {
    pub roi_id: u32,
    pub cells: CellSubset,
}

impl RoiSelection {
    #[inline]
    #[must_use]
    pub fn new(roi_id: u32, cells: CellSubset) -> Self {
        Self { roi_id, cells }
    }
}

/// One bar-chart trace: labels, means and sample counts
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChartSeries {
    pub name: String,
    pub x: Vec<String>,
    pub y: Vec<f64>,
    /// Sample count behind each mean
    pub customdata: Vec<usize>,
}

impl ChartSeries {
    fn from_buckets(name: String, buckets: IndexMap<String, MeanAccumulator>) -> Self {
        let mut series = Self {
            name,
            ..Self::default()
        };
        for (label, acc) in buckets {
            let summary = acc.summary();
            series.x.push(label);
            series.y.push(summary.mean);
            series.customdata.push(summary.count);
        }
        series
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.x.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }
}

/// Grouping of a two-level bar chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hue {
    /// One trace per cluster, bars per ROI
    Cluster,
    /// One trace per ROI, bars per cluster
    Roi,
}

/// Mean of `value` per ROI, in selection order
///
/// Selections without cells are left out.
#[must_use]
pub fn aggregate_by_roi(selections: &[RoiSelection], value: CellValue, name: &str) -> ChartSeries {
    let mut buckets: IndexMap<String, MeanAccumulator> = IndexMap::new();
    for selection in selections.iter().filter(|s| !s.cells.is_empty()) {
        let acc = buckets.entry(selection.roi_id.to_string()).or_default();
        for cell in &selection.cells {
            acc.push(value.extract(cell));
        }
    }
    ChartSeries::from_buckets(name.to_string(), buckets)
}

/// Mean of `value` per ROI and cluster, one series per `hue` group
///
/// Groups and bars appear in first-seen order.
#[must_use]
pub fn aggregate_by_roi_and_cluster(
    selections: &[RoiSelection],
    value: CellValue,
    hue: Hue,
) -> Vec<ChartSeries> {
    let mut groups: IndexMap<String, IndexMap<String, MeanAccumulator>> = IndexMap::new();

    for selection in selections.iter().filter(|s| !s.cells.is_empty()) {
        let roi = selection.roi_id.to_string();
        for cell in &selection.cells {
            let (group, bar) = match hue {
                Hue::Cluster => (cell.cluster_id.clone(), roi.clone()),
                Hue::Roi => (roi.clone(), cell.cluster_id.clone()),
            };
            groups
                .entry(group)
                .or_default()
                .entry(bar)
                .or_default()
                .push(value.extract(cell));
        }
    }

    groups
        .into_iter()
        .map(|(name, buckets)| ChartSeries::from_buckets(name, buckets))
        .collect()
}

/// Cluster-by-ROI matrix of means
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeatmapMatrix {
    /// ROI ids, ascending numerically
    pub x: Vec<String>,
    /// Cluster ids, ascending lexicographically
    pub y: Vec<String>,
    /// `z[row][col]`: mean for cluster `y[row]` in ROI `x[col]`; `0` when empty
    pub z: Vec<Vec<f64>>,
}

/// Mean of `value` for every (cluster, ROI) pair
#[must_use]
pub fn heatmap_matrix(selections: &[RoiSelection], value: CellValue) -> HeatmapMatrix {
    let mut rois = BTreeSet::new();
    let mut clusters = BTreeSet::new();
    let mut cells: IndexMap<(u32, String), MeanAccumulator> = IndexMap::new();

    for selection in selections.iter().filter(|s| !s.cells.is_empty()) {
        rois.insert(selection.roi_id);
        for cell in &selection.cells {
            clusters.insert(cell.cluster_id.clone());
            cells
                .entry((selection.roi_id, cell.cluster_id.clone()))
                .or_default()
                .push(value.extract(cell));
        }
    }

    let z = clusters
        .iter()
        .map(|cluster| {
            rois.iter()
                .map(|&roi| {
                    cells
                        .get(&(roi, cluster.clone()))
                        .map_or(0.0, |acc| acc.summary().mean)
                })
                .collect()
        })
        .collect();

    HeatmapMatrix {
        x: rois.iter().map(ToString::to_string).collect(),
        y: clusters.into_iter().collect(),
        z,
    }
}
