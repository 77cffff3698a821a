//! Tile loader capability

use crate::dataset::{decode_tile, Dataset};
use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tessera_model::{TileKey, TileRecord};

/// World-space extent of a tile source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalSize {
    pub width: u32,
    pub height: u32,
}

/// Anything that can hand out decoded transcript tiles
#[async_trait::async_trait]
pub trait TileSource: Send + Sync {
    /// Extent of the finest layer
    fn physical_size(&self) -> PhysicalSize;

    /// Decoded tile at `key`, or `None` if the source has no such tile
    async fn get_tile(&self, key: TileKey) -> Result<Option<Arc<TileRecord>>, CoreError>;
}

#[async_trait::async_trait]
impl TileSource for Dataset {
    fn physical_size(&self) -> PhysicalSize {
        let layer = self.layer();
        PhysicalSize {
            width: layer.layer_width,
            height: layer.layer_height,
        }
    }

    async fn get_tile(&self, key: TileKey) -> Result<Option<Arc<TileRecord>>, CoreError> {
        match self.tile_job(key) {
            Some(job) => decode_tile(job).await.map(Some),
            None => Ok(None),
        }
    }
}
