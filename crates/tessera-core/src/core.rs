//! The spatial core service
//!
//! [`SpatialCore`] owns the active dataset and every background service
//! around it:
//! - ingestion through the archive extractor
//! - the decoded-tile cache
//! - the zoom breakpoint index
//! - the filter worker
//!
//! State changes are announced on the event bus. A failed operation emits
//! an error notification and leaves the previous state in place.

use crate::colormap;
use crate::config::CoreConfig;
use crate::dataset::{decode_tile, CellData, Dataset};
use crate::error::{CoreError, Notification};
use crate::event::{CoreEvent, EventBus};
use crate::flags::PersistedFlags;
use futures::future::try_join_all;
use moka::future::Cache;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tessera_aggregate::{
    aggregate_by_roi, bin_2d, mean_by_key, AxisScale, Bins2d, CellValue, ChartSeries,
    RoiSelection, Summary, ValueKind,
};
use tessera_archive::{ArchiveExtractor, ArchiveFormat, ExtractOptions, ExtractionHandle};
use tessera_decode::CellMaskDecoder;
use tessera_filter::{
    cells_in_polygon, count_by_cluster, count_by_gene, partition_points, points_in_polygon,
    CellSubset, FilterError, FilterJob, FilterOutcome, FilterPredicateSet, FilterWorker,
    GeneFilter, LatestRequest, Polygon, WorkerConfig,
};
use tessera_index::{LayerLimits, TilePyramid, TileZoomIndex, Viewport};
use tessera_model::{
    BoundingBox, CellTable, ColormapEntry, DatasetFingerprint, GeneTable, LayerConfig, PointEntry,
    TileKey, TileRecord,
};
use tokio::sync::broadcast;

/// Transcript point ready for drawing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPoint {
    pub x: f64,
    pub y: f64,
    pub gene_name: String,
    pub cell_id: Option<String>,
}

/// Visible points of one tile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TilePoints {
    pub key: TileKey,
    pub bounds: BoundingBox,
    pub points: Vec<RenderPoint>,
    /// Points hidden by the gene filter
    pub discarded: usize,
}

impl RenderPoint {
    fn from_entry(point: &PointEntry, genes: &GeneTable) -> Self {
        Self {
            x: point.position[0],
            y: point.position[1],
            gene_name: genes.name(point.gene).unwrap_or_default().to_string(),
            cell_id: point.cell_id.clone(),
        }
    }
}

/// Everything a drawn region captured
#[derive(Debug, Clone)]
pub struct PolygonDetection {
    /// Transcript points inside the region, one per position
    pub points: Vec<RenderPoint>,
    pub gene_distribution: BTreeMap<String, usize>,
    /// Cells whose whole outline is inside, ready for the ROI charts
    pub cells: RoiSelection,
    pub cluster_distribution: BTreeMap<String, usize>,
}

type TileCacheKey = (DatasetFingerprint, TileKey);

/// Plain service object behind the viewer
pub struct SpatialCore {
    config: CoreConfig,
    extractor: ArchiveExtractor,
    dataset: RwLock<Option<Arc<Dataset>>>,
    colormap: RwLock<Vec<ColormapEntry>>,
    tiles: Cache<TileCacheKey, Arc<TileRecord>>,
    zoom: Mutex<TileZoomIndex>,
    limits: RwLock<LayerLimits>,
    filter: FilterWorker,
    latest_filter: LatestRequest,
    events: EventBus,
    flags: PersistedFlags,
}

impl std::fmt::Debug for SpatialCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpatialCore")
            .field("dataset", &self.dataset.read().as_ref().map(|d| d.name().to_string()))
            .field("cached_tiles", &self.tiles.entry_count())
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl SpatialCore {
    /// Start the core and its filter worker
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    /// - `CoreError::Flag` if the configured flag file cannot be read
    pub fn new(config: CoreConfig) -> Result<Self, CoreError> {
        let flags = match &config.flags_path {
            Some(path) => PersistedFlags::load(path)?,
            None => PersistedFlags::in_memory(),
        };

        let mut options = ExtractOptions::default();
        if let Some(limit) = config.max_member_bytes {
            options = options.with_max_member_bytes(limit);
        }

        let filter = FilterWorker::spawn(
            WorkerConfig::default()
                .with_queue_depth(config.worker_queue_depth)
                .with_parallel_threshold(config.filter_parallel_threshold),
        );

        tracing::info!(
            tile_cache_capacity = config.tile_cache_capacity,
            "spatial core started"
        );

        Ok(Self {
            extractor: ArchiveExtractor::new(options),
            dataset: RwLock::new(None),
            colormap: RwLock::new(Vec::new()),
            tiles: Cache::new(config.tile_cache_capacity),
            zoom: Mutex::new(TileZoomIndex::new()),
            limits: RwLock::new(config.layer_limits),
            filter,
            latest_filter: LatestRequest::new(),
            events: EventBus::new(config.event_capacity),
            flags,
            config,
        })
    }

    /// Receive every event emitted from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> &PersistedFlags {
        &self.flags
    }

    /// Active dataset, if any
    #[must_use]
    pub fn dataset(&self) -> Option<Arc<Dataset>> {
        self.dataset.read().clone()
    }

    /// Active layer geometry, falling back to the configured default
    #[must_use]
    pub fn layer(&self) -> LayerConfig {
        self.dataset()
            .map_or(self.config.default_layer_config, |d| d.layer())
    }

    #[must_use]
    pub fn layer_limits(&self) -> LayerLimits {
        *self.limits.read()
    }

    pub fn set_layer_limits(&self, limits: LayerLimits) {
        *self.limits.write() = limits;
    }

    fn current(&self) -> Result<Arc<Dataset>, CoreError> {
        self.dataset().ok_or(CoreError::NoDataset)
    }

    fn fail(&self, err: CoreError) -> CoreError {
        self.events.notify(err.notification());
        err
    }

    // ------------------------------------------------------------------
    // Ingestion
    // ------------------------------------------------------------------

    /// Load a `.tar` or `.zip` transcript archive from disk
    ///
    /// # Errors
    /// Any extraction, configuration or validation failure; the previous
    /// dataset stays active.
    pub async fn ingest_archive(&self, path: impl AsRef<Path>) -> Result<Arc<Dataset>, CoreError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        match self.extractor.open(path).await {
            Ok(handle) => self.ingest_handle(name, handle).await,
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Load an archive from any byte source
    ///
    /// # Errors
    /// As [`ingest_archive`](Self::ingest_archive).
    pub async fn ingest_archive_source<R>(
        &self,
        name: impl Into<String>,
        reader: R,
        size: u64,
        format: ArchiveFormat,
    ) -> Result<Arc<Dataset>, CoreError>
    where
        R: Read + Send + 'static,
    {
        let handle = self.extractor.spawn(reader, size, format);
        self.ingest_handle(name.into(), handle).await
    }

    async fn ingest_handle(
        &self,
        name: String,
        handle: ExtractionHandle,
    ) -> Result<Arc<Dataset>, CoreError> {
        tracing::info!(source = %name, "ingesting archive");

        let events = self.events.clone();
        let source = name.clone();
        let extracted = handle
            .wait_with_progress(|percent| {
                events.emit(CoreEvent::ExtractionProgress {
                    source: source.clone(),
                    percent,
                });
            })
            .await;

        let files = match extracted {
            Ok(files) => files,
            Err(err) => return Err(self.fail(err.into())),
        };

        let default_layer = self.config.default_layer_config;
        let build_name = name.clone();
        let built = tokio::task::spawn_blocking(move || {
            Dataset::from_members(build_name, files, default_layer)
        })
        .await
        .map_err(|err| CoreError::Join(err.to_string()))
        .and_then(|result| result);

        let dataset = match built {
            Ok(dataset) => dataset,
            Err(err) => return Err(self.fail(err)),
        };
        // Cell masks are a separate upload; a new archive keeps them
        let dataset = match self.dataset().as_deref().and_then(Dataset::cells) {
            Some(cells) => Arc::new(dataset.with_cells(cells.clone())),
            None => Arc::new(dataset),
        };

        if dataset.colormap().is_none() {
            self.events.notify(Notification::warning(
                "Missing colormap config, cell segmentation filtering will be unavailable",
            ));
        }
        self.activate(Arc::clone(&dataset));

        self.events.emit(CoreEvent::dataset_loaded(
            &dataset.fingerprint(),
            dataset.layer(),
            dataset.tile_count(),
            dataset.colormap().map_or(0, <[ColormapEntry]>::len),
        ));
        self.events.notify(Notification::info("Successfully unpacked"));
        Ok(dataset)
    }

    /// Swap in a freshly ingested archive
    fn activate(&self, dataset: Arc<Dataset>) {
        let previous = self.dataset.write().replace(Arc::clone(&dataset));
        if let Some(previous) = previous {
            tracing::debug!(previous = %previous.fingerprint().short(), "replacing dataset");
        }

        *self.colormap.write() = dataset.colormap().map(<[ColormapEntry]>::to_vec).unwrap_or_default();
        self.limits.write().max_visible_layers = dataset.layer().layers;
        *self.zoom.lock() = TileZoomIndex::new();
        self.tiles.invalidate_all();
    }

    /// Attach a flat cell-mask payload to the active dataset
    ///
    /// Without an active dataset, a tile-less one is created for the cells.
    ///
    /// # Errors
    /// - `CoreError::Decode` if the payload cannot be decoded
    pub async fn ingest_cell_masks(&self, bytes: Vec<u8>) -> Result<Arc<Dataset>, CoreError> {
        let decoded = tokio::task::spawn_blocking(move || {
            let fingerprint = DatasetFingerprint::compute(&bytes);
            CellMaskDecoder::default()
                .decode(&bytes)
                .map(|decoded| (fingerprint, decoded))
        })
        .await
        .map_err(|err| CoreError::Join(err.to_string()))
        .and_then(|result| result.map_err(CoreError::from));

        let (fingerprint, decoded) = match decoded {
            Ok(decoded) => decoded,
            Err(err) => return Err(self.fail(err)),
        };
        if decoded.report.is_lossy() {
            tracing::warn!(report = ?decoded.report, "cell masks decoded with losses");
        }

        let cells = CellData::from(decoded.into_value());
        let event = CoreEvent::CellsLoaded {
            cells: cells.cells.len(),
            proteins: cells.metadata.protein_names.len(),
            genes: cells.metadata.gene_names.len(),
        };

        let dataset = {
            let mut slot = self.dataset.write();
            let next = match slot.as_ref() {
                Some(current) => current.with_cells(cells),
                None => Dataset::empty("cells", self.config.default_layer_config, fingerprint)
                    .with_cells(cells),
            };
            let next = Arc::new(next);
            *slot = Some(Arc::clone(&next));
            next
        };

        tracing::info!(cells = dataset.cells().map_or(0, |c| c.cells.len()), "cell masks loaded");
        self.events.emit(event);
        Ok(dataset)
    }

    // ------------------------------------------------------------------
    // Tiles
    // ------------------------------------------------------------------

    /// Decoded tile, through the tile cache
    ///
    /// # Errors
    /// - `CoreError::NoDataset` without an active dataset
    /// - `CoreError::TileNotFound` if the archive has no such tile
    /// - `CoreError::Decode` if the payload is unusable
    pub async fn tile(&self, key: TileKey) -> Result<Arc<TileRecord>, CoreError> {
        let dataset = self.current()?;
        self.tile_in(&dataset, key).await
    }

    async fn tile_in(&self, dataset: &Dataset, key: TileKey) -> Result<Arc<TileRecord>, CoreError> {
        let cache_key = (dataset.fingerprint(), key);
        if let Some(tile) = self.tiles.get(&cache_key).await {
            return Ok(tile);
        }

        let job = dataset.tile_job(key).ok_or(CoreError::TileNotFound(key))?;
        let tile = decode_tile(job).await?;
        self.tiles.insert(cache_key, Arc::clone(&tile)).await;
        Ok(tile)
    }

    /// Points of every tile overlapping `viewport` at `zoom`
    ///
    /// Tiles missing from the archive are skipped. Tiles are decoded
    /// concurrently; any decode failure fails the whole call.
    ///
    /// # Errors
    /// - `CoreError::NoDataset` without an active dataset
    /// - `CoreError::Decode` if a visible tile cannot be decoded
    pub async fn visible_tiles(
        &self,
        viewport: &Viewport,
        zoom: f64,
        genes: &GeneFilter,
    ) -> Result<Vec<TilePoints>, CoreError> {
        let dataset = self.current()?;
        let pyramid = TilePyramid::new(dataset.layer()).with_limits(self.layer_limits());

        let keys: Vec<TileKey> = pyramid
            .visible_tiles(viewport, zoom)
            .into_iter()
            .filter(|key| dataset.has_tile(*key))
            .collect();

        let tiles = try_join_all(keys.iter().map(|key| self.tile_in(&dataset, *key))).await?;

        let table = dataset.genes();
        let visible = tiles
            .iter()
            .map(|tile| {
                let split = partition_points(tile, genes, &table);
                TilePoints {
                    key: tile.key(),
                    bounds: *tile.bounds(),
                    points: split
                        .visible
                        .iter()
                        .map(|p| RenderPoint::from_entry(p, &table))
                        .collect(),
                    discarded: split.discarded.len(),
                }
            })
            .collect();
        Ok(visible)
    }

    /// Record that `tile_index` became active at `zoom`
    pub fn update_tile_zoom_breakpoint(&self, tile_index: i64, zoom: f64) -> bool {
        self.zoom.lock().update_tile_zoom_breakpoint(tile_index, zoom)
    }

    /// Layer that should be visible at `zoom`
    #[must_use]
    pub fn current_tile_index_for_zoom(&self, zoom: f64) -> u32 {
        self.zoom.lock().get_current_tile_index_for_zoom(zoom)
    }

    /// Snapshot of the breakpoint index
    #[must_use]
    pub fn zoom_index(&self) -> TileZoomIndex {
        self.zoom.lock().clone()
    }

    // ------------------------------------------------------------------
    // Cells
    // ------------------------------------------------------------------

    /// Partition the loaded cells on the filter worker
    ///
    /// Only the newest call returns an outcome; older overlapping calls
    /// resolve to `FilterError::Superseded`, which is not reported.
    ///
    /// # Errors
    /// - `CoreError::NoDataset` / `CoreError::NoCells` without cells
    /// - `CoreError::Filter` if the worker fails or the call is superseded
    pub async fn filter_cells(&self, predicates: FilterPredicateSet) -> Result<FilterOutcome, CoreError> {
        let dataset = self.current()?;
        let cells = dataset.cells().ok_or(CoreError::NoCells)?;
        let job = FilterJob::new(cells.cells.clone(), Arc::clone(&cells.metadata), predicates);

        let ticket = self.latest_filter.begin();
        let result = self.filter.filter(job).await;
        match self.latest_filter.settle(ticket, result) {
            Ok(outcome) => {
                self.events.emit(CoreEvent::CellsFiltered {
                    visible: outcome.visible_count(),
                    outliers: outcome.outliers.len(),
                });
                Ok(outcome)
            }
            Err(FilterError::Superseded) => Err(FilterError::Superseded.into()),
            Err(err) => Err(self.fail(err.into())),
        }
    }

    /// Every loaded cell
    ///
    /// # Errors
    /// - `CoreError::NoDataset` / `CoreError::NoCells` without cells
    pub fn all_cells(&self) -> Result<CellSubset, CoreError> {
        let dataset = self.current()?;
        let cells = dataset.cells().ok_or(CoreError::NoCells)?;
        Ok(CellSubset::all(cells.cells.clone()))
    }

    fn resolve_value(&self, kind: ValueKind, name: &str) -> Result<CellValue, CoreError> {
        let dataset = self.current()?;
        let cells = dataset.cells().ok_or(CoreError::NoCells)?;
        Ok(CellValue::resolve(&cells.metadata, kind, name)?)
    }

    /// Mean of a gene or protein per cluster
    ///
    /// Every cluster named in the colormap gets a bucket, so clusters with
    /// no cells in `cells` report a mean of 0.
    ///
    /// # Errors
    /// - `CoreError::Aggregate` if `name` is unknown
    pub fn aggregate_cluster_means(
        &self,
        cells: &CellSubset,
        kind: ValueKind,
        name: &str,
    ) -> Result<BTreeMap<String, Summary>, CoreError> {
        let value = self.resolve_value(kind, name)?;
        let declared: Vec<String> = self
            .colormap
            .read()
            .iter()
            .filter(|entry| matches!(entry, ColormapEntry::Cluster { .. }))
            .map(|entry| entry.key().to_string())
            .collect();

        Ok(mean_by_key(
            cells.iter().map(|cell| (cell.cluster_id.clone(), value.extract(cell))),
            declared,
        ))
    }

    /// Mean of a gene or protein per region of interest
    ///
    /// # Errors
    /// - `CoreError::Aggregate` if `name` is unknown
    pub fn aggregate_by_roi(
        &self,
        selections: &[RoiSelection],
        kind: ValueKind,
        name: &str,
    ) -> Result<ChartSeries, CoreError> {
        let value = self.resolve_value(kind, name)?;
        Ok(aggregate_by_roi(selections, value, name))
    }

    /// Points and cells inside a drawn region
    ///
    /// Every tile of every pyramid level is scanned; a transcript repeated
    /// across levels is reported once. Without cell masks the cell
    /// selection is empty.
    ///
    /// # Errors
    /// - `CoreError::NoDataset` without an active dataset
    /// - `CoreError::Decode` if a tile cannot be decoded
    pub async fn detect_in_polygon(
        &self,
        roi_id: u32,
        polygon: &Polygon,
    ) -> Result<PolygonDetection, CoreError> {
        let dataset = self.current()?;
        let keys: Vec<TileKey> = dataset.tile_keys().collect();
        let tiles = match try_join_all(keys.iter().map(|key| self.tile_in(&dataset, *key))).await {
            Ok(tiles) => tiles,
            Err(err) => return Err(self.fail(err)),
        };

        let (points, gene_distribution) = {
            let table = dataset.genes();
            let found = points_in_polygon(tiles.iter().map(|tile| tile.as_ref()), polygon);
            let counts = count_by_gene(&found, &table);
            let points = found
                .iter()
                .map(|p| RenderPoint::from_entry(p, &table))
                .collect::<Vec<_>>();
            (points, counts)
        };

        let cells = match dataset.cells() {
            Some(data) => cells_in_polygon(&data.cells, polygon),
            None => CellSubset::empty(CellTable::from(Vec::new())),
        };
        let cluster_distribution = count_by_cluster(cells.iter());

        tracing::info!(
            roi_id,
            tiles = tiles.len(),
            points = points.len(),
            cells = cells.len(),
            "polygon region detected"
        );

        Ok(PolygonDetection {
            points,
            gene_distribution,
            cells: RoiSelection::new(roi_id, cells),
            cluster_distribution,
        })
    }

    /// Two-channel protein density for the cytometry gate
    ///
    /// # Errors
    /// - `CoreError::Aggregate` for unknown channels or zero bins
    pub fn cytometry_bins(
        &self,
        cells: &CellSubset,
        channels: (&str, &str),
        bins: (usize, usize),
        scale: AxisScale,
    ) -> Result<Bins2d, CoreError> {
        let x = self.resolve_value(ValueKind::Protein, channels.0)?;
        let y = self.resolve_value(ValueKind::Protein, channels.1)?;
        let xs: Vec<f64> = cells.iter().map(|cell| x.extract(cell)).collect();
        let ys: Vec<f64> = cells.iter().map(|cell| y.extract(cell)).collect();
        Ok(bin_2d(&xs, &ys, bins.0, bins.1, scale)?)
    }

    // ------------------------------------------------------------------
    // Colormap
    // ------------------------------------------------------------------

    /// Current colormap
    #[must_use]
    pub fn colormap(&self) -> Vec<ColormapEntry> {
        self.colormap.read().clone()
    }

    /// Replace the colormap with the contents of a JSON file
    ///
    /// # Errors
    /// - `CoreError::Colormap` if the file cannot be read or parsed
    pub async fn import_colormap(&self, path: impl AsRef<Path>) -> Result<Vec<ColormapEntry>, CoreError> {
        let entries = match colormap::import(path).await {
            Ok(entries) => entries,
            Err(err) => return Err(self.fail(err.into())),
        };
        self.colormap.write().clone_from(&entries);
        Ok(entries)
    }

    /// Write the current colormap as JSON
    ///
    /// # Errors
    /// - `CoreError::Colormap` if the file cannot be written
    pub async fn export_colormap(&self, path: impl AsRef<Path>) -> Result<(), CoreError> {
        let entries = self.colormap();
        colormap::export(path, &entries)
            .await
            .map_err(|err| self.fail(err.into()))
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Drop the dataset and everything derived from it
    pub fn reset(&self) {
        self.dataset.write().take();
        self.colormap.write().clear();
        *self.zoom.lock() = TileZoomIndex::new();
        self.tiles.invalidate_all();
        tracing::info!("dataset reset");
        self.events.emit(CoreEvent::DatasetReset);
    }

    /// Stop the filter worker; pending filter calls fail with `Terminated`
    pub fn shutdown(&self) {
        self.filter.terminate();
        tracing::info!("spatial core shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tessera_test_utils::{cell_mask_payload, sample_cells, sample_dataset, sample_metadata};

    async fn loaded(colormap: bool) -> SpatialCore {
        let core = SpatialCore::new(CoreConfig::default()).unwrap();
        let bytes = sample_dataset(colormap).build_tar();
        let size = bytes.len() as u64;
        core.ingest_archive_source("sample.tar", Cursor::new(bytes), size, ArchiveFormat::Tar)
            .await
            .unwrap();
        core
    }

    #[tokio::test]
    async fn ingest_sets_layer_limits_and_colormap() {
        let core = loaded(true).await;
        assert_eq!(core.layer().layers, 3);
        assert_eq!(core.layer_limits().max_visible_layers, 3);
        assert_eq!(core.colormap().len(), 3);
        // Levels 0 and 1: 4 + 16 tiles
        assert_eq!(core.dataset().unwrap().tile_count(), 20);
    }

    #[tokio::test]
    async fn tiles_are_cached_per_dataset() {
        let core = loaded(false).await;
        let key = TileKey::new(1, 1, 0);

        let first = core.tile(key).await.unwrap();
        let second = core.tile(key).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(matches!(
            core.tile(TileKey::new(2, 0, 0)).await,
            Err(CoreError::TileNotFound(_))
        ));
    }

    #[tokio::test]
    async fn visible_tiles_apply_gene_filter() {
        let core = loaded(false).await;
        // Zoom -2 maps to level 0, whose 512-unit tiles split the layer 2x2
        let viewport = Viewport::new(0.0, 0.0, 1024.0, 400.0);

        let all = core.visible_tiles(&viewport, -2.0, &GeneFilter::All).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|t| t.points.len() == 3 && t.discarded == 0));

        let only = GeneFilter::genes(["CD3E"]);
        let filtered = core.visible_tiles(&viewport, -2.0, &only).await.unwrap();
        assert!(filtered
            .iter()
            .all(|t| t.discarded == 2 && t.points.iter().all(|p| p.gene_name == "CD3E")));
    }

    #[tokio::test]
    async fn operations_without_dataset_fail_cleanly() {
        let core = SpatialCore::new(CoreConfig::default()).unwrap();
        assert!(matches!(core.tile(TileKey::new(0, 0, 0)).await, Err(CoreError::NoDataset)));
        assert!(matches!(
            core.filter_cells(FilterPredicateSet::default()).await,
            Err(CoreError::NoDataset)
        ));
        assert!(matches!(core.all_cells(), Err(CoreError::NoDataset)));
    }

    #[tokio::test]
    async fn cells_attach_to_active_dataset() {
        let core = loaded(true).await;
        let fingerprint = core.dataset().unwrap().fingerprint();

        let payload = cell_mask_payload(&sample_metadata(), &sample_cells(9));
        let dataset = core.ingest_cell_masks(payload).await.unwrap();

        assert_eq!(dataset.fingerprint(), fingerprint);
        assert_eq!(dataset.tile_count(), 20);
        assert_eq!(core.all_cells().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn cluster_means_cover_colormap_clusters() {
        let core = loaded(true).await;
        core.ingest_cell_masks(cell_mask_payload(&sample_metadata(), &sample_cells(6)))
            .await
            .unwrap();

        let outcome = core
            .filter_cells(FilterPredicateSet::default().with_name_filter(
                tessera_filter::NameFilter::clusters(["1"]),
            ))
            .await
            .unwrap();
        let means = core
            .aggregate_cluster_means(&outcome.unselected, ValueKind::Protein, "CD4")
            .unwrap();

        // Cells 0 and 3 are in cluster "1"
        assert_eq!(means["1"], Summary { mean: 1.5, count: 2 });
        assert_eq!(means["2"], Summary { mean: 0.0, count: 0 });
        assert_eq!(means.len(), 3);
    }

    #[tokio::test]
    async fn polygon_detection_feeds_roi_charts() {
        let core = loaded(false).await;
        core.ingest_cell_masks(cell_mask_payload(&sample_metadata(), &sample_cells(6)))
            .await
            .unwrap();

        let region = Polygon::new(vec![[0.0, 0.0], [5.0, 0.0], [5.0, 5.0], [0.0, 5.0]]);
        let detection = core.detect_in_polygon(7, &region).await.unwrap();

        // Levels 0 and 1 both hold (1,1), (2,2), (3,3); each is reported once
        let positions: Vec<(f64, f64)> = detection.points.iter().map(|p| (p.x, p.y)).collect();
        assert_eq!(positions, vec![(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert!(detection.gene_distribution.values().all(|&n| n == 1));
        assert_eq!(detection.gene_distribution.len(), 3);

        // Cell 4 touches the right edge at x = 5
        assert_eq!(
            detection.cells.cells.cell_ids(),
            vec!["cell-0", "cell-1", "cell-2", "cell-3"]
        );
        assert_eq!(detection.cluster_distribution["1"], 2);
        assert_eq!(detection.cluster_distribution["2"], 1);

        let series = core
            .aggregate_by_roi(&[detection.cells], ValueKind::Protein, "CD4")
            .unwrap();
        assert_eq!(series.x, vec!["7".to_string()]);
        assert_eq!(series.y, vec![1.5]);
        assert_eq!(series.customdata, vec![4]);
    }

    #[tokio::test]
    async fn polygon_detection_without_cells_selects_none() {
        let core = loaded(false).await;
        let region = Polygon::new(vec![[0.0, 0.0], [300.0, 0.0], [300.0, 300.0], [0.0, 300.0]]);
        let detection = core.detect_in_polygon(1, &region).await.unwrap();

        // One level-0 tile and four level-1 tiles overlap; 12 distinct positions
        assert_eq!(detection.points.len(), 12);
        assert!(detection.gene_distribution.values().all(|&n| n == 4));
        assert!(detection.cells.cells.is_empty());
        assert!(detection.cluster_distribution.is_empty());

        let empty = SpatialCore::new(CoreConfig::default()).unwrap();
        assert!(matches!(
            empty.detect_in_polygon(1, &region).await,
            Err(CoreError::NoDataset)
        ));
    }

    #[tokio::test]
    async fn zoom_index_resets_with_dataset() {
        let core = loaded(false).await;
        assert!(core.update_tile_zoom_breakpoint(2, 5.0));
        assert_eq!(core.current_tile_index_for_zoom(6.0), 2);

        core.reset();
        assert!(core.zoom_index().breakpoints().is_empty());
        assert!(core.dataset().is_none());
    }
}
