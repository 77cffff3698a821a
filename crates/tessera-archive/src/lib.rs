//! Tessera archive extraction
//!
//! Streams an uploaded tar or zip container on a blocking worker thread and
//! reports back through an [`ExtractionHandle`]:
//! - [`ExtractEvent::Progress`] with an integer percentage (tar: bytes
//!   consumed, zip: members decoded)
//! - [`ExtractEvent::Completed`] with every regular, non-hidden member
//! - [`ExtractEvent::Failed`] on any decode error; partial results are dropped
//!
//! # Example
//!
//! ```rust,ignore
//! use tessera_archive::ArchiveExtractor;
//!
//! # async fn example() -> Result<(), tessera_archive::ExtractError> {
//! let handle = ArchiveExtractor::default().open("dataset.tar").await?;
//! let files = handle.wait_with_progress(|p| println!("{p}%")).await?;
//! println!("{} members", files.len());
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod error;
mod extractor;
mod format;
mod handle;
mod worker;

pub use error::ExtractError;
pub use extractor::{ArchiveExtractor, ExtractOptions};
pub use format::{ArchiveFormat, SourceKind};
pub use handle::{AbortHandle, ExtractEvent, ExtractedFile, ExtractionHandle};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
