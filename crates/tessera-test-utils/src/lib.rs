//! Testing utilities for the Tessera workspace
//!
//! Shared fixtures: in-memory tar/zip containers and tile/cell payloads.

#![allow(missing_docs)]

use std::io::{Cursor, Write};
use tessera_decode::RecordWriter;
use tessera_model::{CellRecord, ColormapEntry, LayerConfig, SegmentationMetadata, TileKey};

/// Genes used by the sample dataset
pub const SAMPLE_GENES: [&str; 3] = ["ACTB", "CD3E", "GAPDH"];

/// In-memory archive contents, serializable as tar or zip
#[derive(Debug, Clone, Default)]
pub struct ArchiveBuilder {
    entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
enum Entry {
    File(String, Vec<u8>),
    Dir(String),
}

impl ArchiveBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn file(mut self, path: &str, bytes: impl Into<Vec<u8>>) -> Self {
        self.entries.push(Entry::File(path.to_string(), bytes.into()));
        self
    }

    #[must_use]
    pub fn dir(mut self, path: &str) -> Self {
        self.entries.push(Entry::Dir(path.to_string()));
        self
    }

    #[must_use]
    pub fn build_tar(&self) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for entry in &self.entries {
            let mut header = tar::Header::new_gnu();
            header.set_mode(0o644);
            match entry {
                Entry::File(path, bytes) => {
                    header.set_entry_type(tar::EntryType::Regular);
                    header.set_size(bytes.len() as u64);
                    header.set_cksum();
                    builder
                        .append_data(&mut header, path, bytes.as_slice())
                        .unwrap();
                }
                Entry::Dir(path) => {
                    header.set_entry_type(tar::EntryType::Directory);
                    header.set_size(0);
                    header.set_cksum();
                    builder
                        .append_data(&mut header, path, std::io::empty())
                        .unwrap();
                }
            }
        }
        builder.into_inner().unwrap()
    }

    #[must_use]
    pub fn build_zip(&self) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Deflated);
        for entry in &self.entries {
            match entry {
                Entry::File(path, bytes) => {
                    writer.start_file(path.as_str(), options).unwrap();
                    writer.write_all(bytes).unwrap();
                }
                Entry::Dir(path) => writer.add_directory(path.as_str(), options).unwrap(),
            }
        }
        writer.finish().unwrap().into_inner()
    }
}

/// Transcript tile payload in the default layout
#[must_use]
pub fn transcript_tile(points: &[([f64; 2], &str, Option<&str>)]) -> Vec<u8> {
    let mut writer = RecordWriter::new();
    for (position, gene, cell_id) in points {
        writer.transcript(*position, gene, *cell_id);
    }
    writer.finish()
}

/// Cell-mask payload in the default layout
#[must_use]
pub fn cell_mask_payload(metadata: &SegmentationMetadata, cells: &[CellRecord]) -> Vec<u8> {
    let mut writer = RecordWriter::new();
    writer.cell_metadata(metadata);
    for cell in cells {
        writer.cell(cell);
    }
    writer.finish()
}

/// Metadata with two protein channels and the sample genes
#[must_use]
pub fn sample_metadata() -> SegmentationMetadata {
    SegmentationMetadata::new(
        vec!["CD4".to_string(), "CD8".to_string()],
        SAMPLE_GENES.iter().map(ToString::to_string).collect(),
    )
}

/// `n` cells cycling through clusters "1", "2", "3"
///
/// Cell `i` has proteins `[i, n - i]`, UMAP `(i, -i)` and gene 0 at value `i`.
#[must_use]
pub fn sample_cells(n: usize) -> Vec<CellRecord> {
    (0..n)
        .map(|i| {
            let v = i as f32;
            CellRecord::builder(format!("cell-{i}"), ((i % 3) + 1).to_string())
                .vertices(vec![v, v, v + 1.0, v, v + 1.0, v + 1.0])
                .counts(100 + i as u32, 10, 1)
                .proteins(vec![v, (n - i) as f32])
                .genes(vec![0], vec![v])
                .umap(i as f64, -(i as f64))
                .build()
        })
        .collect()
}

/// Small pyramid used by the sample dataset: 1024², 3 levels, 512 tiles
#[must_use]
pub fn sample_layer_config() -> LayerConfig {
    LayerConfig {
        layer_width: 1024,
        layer_height: 1024,
        layers: 3,
        tile_size: 512,
    }
}

/// `config.json` contents
#[must_use]
pub fn config_json(layer: &LayerConfig, colormap: Option<&[ColormapEntry]>) -> Vec<u8> {
    let mut value = serde_json::to_value(layer).unwrap();
    if let Some(entries) = colormap {
        value["color_map"] = serde_json::to_value(entries).unwrap();
    }
    serde_json::to_vec_pretty(&value).unwrap()
}

/// Three points inside a tile, one per sample gene
#[must_use]
pub fn sample_tile_for(layer: &LayerConfig, key: TileKey) -> Vec<u8> {
    let bounds = layer.tile_bounds(key);
    let points: Vec<([f64; 2], &str, Option<&str>)> = SAMPLE_GENES
        .iter()
        .enumerate()
        .map(|(i, gene)| {
            let offset = 1.0 + i as f64;
            ([bounds.left + offset, bounds.top + offset], *gene, None)
        })
        .collect();
    transcript_tile(&points)
}

/// Archive with `config.json`, every level-0 and level-1 tile, and a hidden file
#[must_use]
pub fn sample_dataset(colormap: bool) -> ArchiveBuilder {
    let layer = sample_layer_config();
    let entries = colormap.then(|| {
        vec![
            ColormapEntry::cluster("1", [255, 0, 0]),
            ColormapEntry::cluster("2", [0, 255, 0]),
            ColormapEntry::cluster("3", [0, 0, 255]),
        ]
    });

    let mut builder = ArchiveBuilder::new()
        .dir("dataset/")
        .file("dataset/config.json", config_json(&layer, entries.as_deref()))
        .file("dataset/.DS_Store", b"junk".to_vec());

    for z in 0..2 {
        let (cols, rows) = layer.grid_size(z);
        for x in 0..cols {
            for y in 0..rows {
                let key = TileKey::new(z, x, y);
                builder = builder.file(
                    &format!("dataset/transcripts{}", key.member_suffix()),
                    sample_tile_for(&layer, key),
                );
            }
        }
    }
    builder
}
