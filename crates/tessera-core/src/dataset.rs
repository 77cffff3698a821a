//! Loaded dataset state
//!
//! A [`Dataset`] is immutable once built. Attaching cell masks produces a
//! new value that shares the tile store and gene table of the old one.

use crate::error::CoreError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tessera_archive::ExtractedFile;
use tessera_decode::{validate_transcript_members, CellBatch, DecodeError, TileDecoder};
use tessera_model::{
    CellTable, ColormapEntry, ConfigFileData, DatasetFingerprint, FingerprintBuilder, GeneId,
    GeneTable, LayerConfig, PointEntry, SegmentationMetadata, TileKey, TileRecord,
};

/// Segmentation cells with their channel names
#[derive(Debug, Clone)]
pub struct CellData {
    pub metadata: Arc<SegmentationMetadata>,
    pub cells: CellTable,
}

impl From<CellBatch> for CellData {
    fn from(batch: CellBatch) -> Self {
        Self {
            metadata: Arc::new(batch.metadata),
            cells: batch.cells,
        }
    }
}

/// Transcript tiles and segmentation cells of one upload
#[derive(Debug)]
pub struct Dataset {
    name: String,
    fingerprint: DatasetFingerprint,
    layer: LayerConfig,
    colormap: Option<Vec<ColormapEntry>>,
    tiles: Arc<BTreeMap<TileKey, Arc<[u8]>>>,
    genes: Arc<RwLock<GeneTable>>,
    cells: Option<CellData>,
}

impl Dataset {
    /// Dataset without tiles, used when cell masks arrive first
    #[must_use]
    pub fn empty(name: impl Into<String>, layer: LayerConfig, fingerprint: DatasetFingerprint) -> Self {
        Self {
            name: name.into(),
            fingerprint,
            layer,
            colormap: None,
            tiles: Arc::new(BTreeMap::new()),
            genes: Arc::new(RwLock::new(GeneTable::new())),
            cells: None,
        }
    }

    /// Build a dataset from extracted archive members
    ///
    /// `config.json` (any member whose name ends with it) supplies the layer
    /// geometry and colormap; without one, `default_layer` is used. Members
    /// ending in `{z}/{x}/{y}.bin` become tiles, other `.bin` members are
    /// ignored.
    ///
    /// # Errors
    /// - `CoreError::InvalidConfig` if `config.json` does not parse
    /// - `CoreError::Decode` if the leading transcript members look wrong
    pub fn from_members(
        name: impl Into<String>,
        files: Vec<ExtractedFile>,
        default_layer: LayerConfig,
    ) -> Result<Self, CoreError> {
        let name = name.into();

        let mut fingerprint = FingerprintBuilder::new();
        for file in &files {
            fingerprint.member(&file.path, &file.bytes);
        }

        let config = match files.iter().find(|f| f.path.ends_with("config.json")) {
            Some(file) => Some(parse_config(&file.bytes)?),
            None => {
                tracing::warn!(dataset = %name, "archive has no config.json, using default layer");
                None
            }
        };
        let (layer, colormap) = match config {
            Some(config) => (config.layer, config.color_map),
            None => (default_layer, None),
        };

        let decoder = TileDecoder::with_default_schema(layer);
        validate_transcript_members(
            files.iter().map(|f| (f.path.as_str(), f.bytes.as_slice())),
            &decoder,
        )?;

        let mut tiles = BTreeMap::new();
        for file in files {
            if !file.path.ends_with(".bin") {
                continue;
            }
            match TileKey::from_member_path(&file.path) {
                Ok(key) => {
                    tiles.insert(key, Arc::<[u8]>::from(file.bytes));
                }
                Err(err) => tracing::debug!(path = %file.path, error = %err, "skipping member"),
            }
        }

        let fingerprint = fingerprint.finish();
        tracing::info!(
            dataset = %name,
            fingerprint = %fingerprint.short(),
            tiles = tiles.len(),
            layers = layer.layers,
            "dataset indexed"
        );

        Ok(Self {
            name,
            fingerprint,
            layer,
            colormap,
            tiles: Arc::new(tiles),
            genes: Arc::new(RwLock::new(GeneTable::new())),
            cells: None,
        })
    }

    /// Same tiles with `cells` attached
    #[must_use]
    pub fn with_cells(&self, cells: CellData) -> Self {
        Self {
            name: self.name.clone(),
            fingerprint: self.fingerprint,
            layer: self.layer,
            colormap: self.colormap.clone(),
            tiles: Arc::clone(&self.tiles),
            genes: Arc::clone(&self.genes),
            cells: Some(cells),
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn fingerprint(&self) -> DatasetFingerprint {
        self.fingerprint
    }

    #[inline]
    #[must_use]
    pub fn layer(&self) -> LayerConfig {
        self.layer
    }

    /// Colormap shipped in `config.json`, if any
    #[inline]
    #[must_use]
    pub fn colormap(&self) -> Option<&[ColormapEntry]> {
        self.colormap.as_deref()
    }

    #[inline]
    #[must_use]
    pub fn cells(&self) -> Option<&CellData> {
        self.cells.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    #[must_use]
    pub fn has_tile(&self, key: TileKey) -> bool {
        self.tiles.contains_key(&key)
    }

    /// Tile keys in `(z, x, y)` order
    pub fn tile_keys(&self) -> impl Iterator<Item = TileKey> + '_ {
        self.tiles.keys().copied()
    }

    /// Gene names interned so far, shared by every decoded tile
    #[must_use]
    pub fn genes(&self) -> parking_lot::RwLockReadGuard<'_, GeneTable> {
        self.genes.read()
    }

    pub(crate) fn tile_job(&self, key: TileKey) -> Option<TileJob> {
        let bytes = self.tiles.get(&key)?;
        Some(TileJob {
            key,
            bytes: Arc::clone(bytes),
            layer: self.layer,
            genes: Arc::clone(&self.genes),
        })
    }
}

fn parse_config(bytes: &[u8]) -> Result<ConfigFileData, CoreError> {
    let text = std::str::from_utf8(bytes).map_err(|err| CoreError::InvalidConfig(err.to_string()))?;
    ConfigFileData::from_json(text).map_err(|err| CoreError::InvalidConfig(err.to_string()))
}

/// Everything needed to decode one tile off the async runtime
pub(crate) struct TileJob {
    key: TileKey,
    bytes: Arc<[u8]>,
    layer: LayerConfig,
    genes: Arc<RwLock<GeneTable>>,
}

impl TileJob {
    /// Decode against a private gene table, then merge it into the shared one
    ///
    /// The shared table is only locked for the merge, so tiles decode in
    /// parallel.
    pub(crate) fn run(self) -> Result<TileRecord, DecodeError> {
        let decoder = TileDecoder::with_default_schema(self.layer);
        let mut local = GeneTable::new();
        let decoded = decoder.decode_tile(self.key, &self.bytes, &mut local)?;
        if decoded.report.is_lossy() {
            tracing::warn!(tile = %self.key, report = ?decoded.report, "tile decoded with losses");
        }
        let tile = decoded.into_value();

        let remap: Vec<GeneId> = {
            let mut shared = self.genes.write();
            local.iter().map(|(_, name)| shared.intern(name)).collect()
        };

        let points = tile
            .points()
            .iter()
            .map(|p| {
                let gene = usize::try_from(p.gene.0)
                    .ok()
                    .and_then(|i| remap.get(i).copied())
                    .unwrap_or(p.gene);
                PointEntry::new(p.position, gene, p.cell_id.clone())
            })
            .collect();
        Ok(TileRecord::new(tile.key(), *tile.bounds(), points))
    }
}

/// Run a [`TileJob`] on the blocking pool
pub(crate) async fn decode_tile(job: TileJob) -> Result<Arc<TileRecord>, CoreError> {
    let tile = tokio::task::spawn_blocking(move || job.run())
        .await
        .map_err(|err| CoreError::Join(err.to_string()))??;
    Ok(Arc::new(tile))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_test_utils::{config_json, sample_layer_config, sample_tile_for, transcript_tile};

    fn member(path: &str, bytes: Vec<u8>) -> ExtractedFile {
        ExtractedFile::new(path, bytes)
    }

    #[test]
    fn indexes_tiles_and_reads_config() {
        let layer = sample_layer_config();
        let colormap = [ColormapEntry::cluster("1", [1, 2, 3])];
        let key = TileKey::new(1, 1, 0);
        let files = vec![
            member("ds/config.json", config_json(&layer, Some(&colormap))),
            member("ds/transcripts/1/1/0.bin", sample_tile_for(&layer, key)),
            member("ds/cells.bin", Vec::new()),
        ];

        let dataset = Dataset::from_members("ds", files, LayerConfig::default()).unwrap();
        assert_eq!(dataset.layer(), layer);
        assert_eq!(dataset.colormap(), Some(&colormap[..]));
        assert_eq!(dataset.tile_keys().collect::<Vec<_>>(), vec![key]);
    }

    #[test]
    fn missing_config_falls_back_to_default_layer() {
        let files = vec![member("t/0/0/0.bin", transcript_tile(&[([1.0, 1.0], "ACTB", None)]))];
        let dataset = Dataset::from_members("t", files, sample_layer_config()).unwrap();
        assert_eq!(dataset.layer(), sample_layer_config());
        assert!(dataset.colormap().is_none());
    }

    #[test]
    fn broken_config_is_an_error() {
        let files = vec![member("config.json", b"{not json".to_vec())];
        assert!(matches!(
            Dataset::from_members("x", files, LayerConfig::default()),
            Err(CoreError::InvalidConfig(_))
        ));
    }

    #[test]
    fn fingerprint_depends_on_contents() {
        let a = Dataset::from_members("a", vec![member("a.json", b"1".to_vec())], LayerConfig::default())
            .unwrap();
        let b = Dataset::from_members("b", vec![member("a.json", b"2".to_vec())], LayerConfig::default())
            .unwrap();
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn tiles_share_one_gene_table() {
        let files = vec![
            member("t/0/0/0.bin", transcript_tile(&[([1.0, 1.0], "CD3E", None)])),
            member(
                "t/1/0/0.bin",
                transcript_tile(&[([1.0, 1.0], "ACTB", None), ([2.0, 2.0], "CD3E", None)]),
            ),
        ];
        let dataset = Dataset::from_members("t", files, sample_layer_config()).unwrap();

        let first = dataset.tile_job(TileKey::new(0, 0, 0)).unwrap().run().unwrap();
        let second = dataset.tile_job(TileKey::new(1, 0, 0)).unwrap().run().unwrap();

        assert_eq!(first.points()[0].gene, second.points()[1].gene);
        let genes = dataset.genes();
        assert_eq!(genes.name(second.points()[0].gene), Some("ACTB"));
        assert_eq!(genes.len(), 2);
    }
}
