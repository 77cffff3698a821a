//! Source classification by file extension

use crate::error::ExtractError;
use std::fmt::{self, Display, Formatter};
use std::path::Path;

/// Container format of an archive source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArchiveFormat {
    Tar,
    Zip,
}

impl ArchiveFormat {
    /// Archive format from a path's extension
    ///
    /// # Errors
    /// - `ExtractError::UnsupportedExtension` for anything but `.tar`/`.zip`
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        match SourceKind::classify(path)? {
            SourceKind::Archive(format) => Ok(format),
            other => Err(ExtractError::UnsupportedExtension(other.to_string())),
        }
    }
}

impl Display for ArchiveFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tar => f.write_str("tar"),
            Self::Zip => f.write_str("zip"),
        }
    }
}

/// What a dropped source file is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Tile archive handled by the extractor
    Archive(ArchiveFormat),
    /// Multiplexed image, handed to the image loader
    Image,
    /// Configuration or colormap document
    Json,
}

impl SourceKind {
    /// Classify a path by extension (case-insensitive)
    ///
    /// # Errors
    /// - `ExtractError::UnsupportedExtension` for unknown or missing extensions
    pub fn classify(path: impl AsRef<Path>) -> Result<Self, ExtractError> {
        let ext = path
            .as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "tar" => Ok(Self::Archive(ArchiveFormat::Tar)),
            "zip" => Ok(Self::Archive(ArchiveFormat::Zip)),
            "tif" | "tiff" => Ok(Self::Image),
            "json" => Ok(Self::Json),
            _ => Err(ExtractError::UnsupportedExtension(ext)),
        }
    }
}

impl Display for SourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Archive(format) => write!(f, "{format}"),
            Self::Image => f.write_str("tiff"),
            Self::Json => f.write_str("json"),
        }
    }
}
