//! Tessera cell filtering
//!
//! Partitions the cell population of a dataset by the active predicates:
//! - [`NameFilter`]: cluster allow-list; rejected cells become outliers
//! - [`ProteinGate`]: rectangle over two named protein channels
//! - `umap_gate`: rectangle over the UMAP embedding
//!
//! Both gates compare y inverted (`y_end <= y <= y_start`) to match the
//! screen-space selection that produces them.
//!
//! [`partition_cells`] is the pure engine. [`FilterWorker`] serves it off the
//! caller's task with per-request correlation, and [`LatestRequest`] lets a
//! caller keep only the newest of overlapping results. [`Polygon`] selects
//! points and cells inside a drawn region.
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_filter::{FilterJob, FilterPredicateSet, FilterWorker, NameFilter, WorkerConfig};
//!
//! let worker = FilterWorker::spawn(WorkerConfig::default());
//! let predicates = FilterPredicateSet::new().with_name_filter(NameFilter::clusters(["3"]));
//! let outcome = worker.filter(FilterJob::new(cells, metadata, predicates)).await?;
//! println!("{} visible, {} outliers", outcome.unselected.len(), outcome.outliers.len());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod latest;
mod partition;
mod polygon;
mod predicate;
mod subset;
mod worker;

pub use error::FilterError;
pub use latest::{LatestRequest, Ticket};
pub use partition::{
    partition_cells, partition_points, FilterOutcome, PointPartition, DEFAULT_PARALLEL_THRESHOLD,
};
pub use polygon::{
    cells_in_polygon, count_by_cluster, count_by_gene, points_in_polygon, Polygon, UNKNOWN_LABEL,
};
pub use predicate::{FilterPredicateSet, GateRange, GeneFilter, NameFilter, ProteinGate};
pub use subset::CellSubset;
pub use worker::{FilterJob, FilterRequest, FilterWorker, RequestId, WorkerConfig};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
