//! Tessera chart aggregation
//!
//! Pure, synchronous helpers that turn cell subsets into chart-ready
//! summaries:
//! - [`mean_by_key`] and [`Summary`]: per-bucket mean and count, `0` for
//!   empty buckets
//! - [`min_max`], [`z_score`], [`normalize_matrix`]: normalization with
//!   degenerate-input passthrough
//! - [`aggregate_by_roi`], [`aggregate_by_roi_and_cluster`],
//!   [`heatmap_matrix`]: region-of-interest bar charts and heatmaps
//! - [`histogram`], [`bin_2d`]: cytometry binning

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod binning;
mod error;
mod normalize;
mod roi;
mod summary;
mod value;

pub use binning::{bin_2d, histogram, AxisScale, Bins2d, Histogram};
pub use error::AggregateError;
pub use normalize::{min_max, normalize_matrix, z_score, Normalization, NormalizationAxis};
pub use roi::{
    aggregate_by_roi, aggregate_by_roi_and_cluster, heatmap_matrix, ChartSeries, HeatmapMatrix,
    Hue, RoiSelection,
};
pub use summary::{mean_by_key, Summary};
pub use value::{CellValue, ValueKind};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use std::sync::Arc;
    use tessera_filter::CellSubset;
    use tessera_model::{CellRecord, CellTable};

    #[test]
    fn normalized_heatmap_from_selections() {
        let table: CellTable = Arc::from(vec![
            CellRecord::builder("a", "1").genes(vec![0], vec![2.0]).build(),
            CellRecord::builder("b", "2").build(),
            CellRecord::builder("c", "1").genes(vec![0], vec![6.0]).build(),
        ]);
        let selections = vec![
            RoiSelection::new(1, CellSubset::select(table.clone(), [0, 1])),
            RoiSelection::new(2, CellSubset::select(table, [2])),
        ];

        let heatmap = heatmap_matrix(&selections, CellValue::Gene(0));
        assert_eq!(heatmap.z, vec![vec![2.0, 6.0], vec![0.0, 0.0]]);

        let normalized = normalize_matrix(&heatmap.z, Normalization::MinMax, NormalizationAxis::default());
        assert_eq!(normalized, vec![vec![1.0 / 3.0, 1.0], vec![0.0, 0.0]]);
    }
}
