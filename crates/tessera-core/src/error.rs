//! Error types for the core service
//!
//! Every stage error converts into [`CoreError`]; callers that surface
//! failures to a user go through [`CoreError::notification`].

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tessera_aggregate::AggregateError;
use tessera_archive::ExtractError;
use tessera_decode::DecodeError;
use tessera_filter::FilterError;

/// Main core error type
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// Archive extraction failed
    #[error("extraction failed: {0}")]
    Extract(#[from] ExtractError),

    /// Tile or cell payload could not be decoded
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),

    /// Filter request failed
    #[error(transparent)]
    Filter(#[from] FilterError),

    /// Chart aggregation request was invalid
    #[error("aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),

    #[error("colormap error: {0}")]
    Colormap(#[from] ColormapError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("flag store error: {0}")]
    Flag(#[from] FlagError),

    /// `config.json` could not be parsed
    #[error("invalid config.json: {0}")]
    InvalidConfig(String),

    /// Operation needs a loaded dataset
    #[error("no dataset loaded")]
    NoDataset,

    /// Operation needs segmentation cells
    #[error("no cell masks loaded")]
    NoCells,

    /// Requested tile is not part of the dataset
    #[error("tile {0} not found")]
    TileNotFound(tessera_model::TileKey),

    /// Blocking decode task was cancelled or panicked
    #[error("decode task failed: {0}")]
    Join(String),
}

impl CoreError {
    /// Whether resubmitting the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Filter(err) => err.is_retryable(),
            Self::Join(_) => true,
            _ => false,
        }
    }

    /// User-facing message for this failure
    #[must_use]
    pub fn notification(&self) -> Notification {
        let message = match self {
            Self::Extract(err) => format!("Error unpacking: {err}"),
            Self::Decode(err) => format!("Error decoding data: {err}"),
            Self::Filter(FilterError::Partition(reason)) => {
                format!("Error filtering cells: {reason}")
            }
            Self::InvalidConfig(_) => format!("Error unpacking: {self}"),
            other => other.to_string(),
        };
        Notification::error(message)
    }
}

/// Colormap import/export failure
#[derive(Debug, thiserror::Error)]
pub enum ColormapError {
    #[error("cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid colormap JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persisted flag store failure
#[derive(Debug, thiserror::Error)]
pub enum FlagError {
    #[error("cannot access '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid flag file: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration loading failure
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Severity of a [`Notification`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

/// Message meant for the person driving the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    #[inline]
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    #[inline]
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}
