//! Blocking extraction loop
//!
//! Runs on a `spawn_blocking` thread. Events go back to the
//! [`ExtractionHandle`](crate::ExtractionHandle) through a bounded channel;
//! a closed channel or a raised cancel flag stops the loop early.

use crate::error::ExtractError;
use crate::format::ArchiveFormat;
use crate::handle::{ExtractEvent, ExtractedFile};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

pub(crate) struct WorkerContext {
    pub(crate) events: mpsc::Sender<ExtractEvent>,
    pub(crate) cancel: Arc<AtomicBool>,
    pub(crate) max_member_bytes: Option<u64>,
}

impl WorkerContext {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    fn check_size(&self, path: &str, size: u64) -> Result<(), ExtractError> {
        match self.max_member_bytes {
            Some(limit) if size > limit => Err(ExtractError::MemberTooLarge {
                path: path.to_string(),
                size,
                limit,
            }),
            _ => Ok(()),
        }
    }
}

/// Percentage reporter; only forwards changes
struct Progress {
    events: mpsc::Sender<ExtractEvent>,
    last: Option<u8>,
}

impl Progress {
    fn new(events: mpsc::Sender<ExtractEvent>) -> Self {
        Self { events, last: None }
    }

    fn report(&mut self, done: u64, total: u64) {
        if total == 0 {
            return;
        }
        let percent = ((done.min(total) * 100 + total / 2) / total) as u8;
        self.emit(percent);
    }

    fn emit(&mut self, percent: u8) {
        if self.last == Some(percent) {
            return;
        }
        self.last = Some(percent);
        // A closed channel means the handle is gone; the cancel flag stops us
        let _ = self.events.blocking_send(ExtractEvent::Progress(percent));
    }
}

/// Source wrapper that reports bytes consumed
struct CountingReader<R> {
    inner: R,
    consumed: u64,
    total: u64,
    progress: Option<Progress>,
    cancel: Arc<AtomicBool>,
}

impl<R> CountingReader<R> {
    fn new(inner: R, total: u64, progress: Option<Progress>, cancel: Arc<AtomicBool>) -> Self {
        Self {
            inner,
            consumed: 0,
            total,
            progress,
            cancel,
        }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.load(Ordering::Acquire) {
            return Err(io::Error::other("extraction aborted"));
        }
        let n = self.inner.read(buf)?;
        self.consumed += n as u64;
        if let Some(progress) = &mut self.progress {
            progress.report(self.consumed, self.total);
        }
        Ok(n)
    }
}

/// Run one extraction to completion and send the terminal event
pub(crate) fn run(
    source: Box<dyn Read + Send>,
    total_size: u64,
    format: ArchiveFormat,
    ctx: &WorkerContext,
) {
    tracing::info!(%format, total_size, "extraction started");

    let result = match format {
        ArchiveFormat::Tar => extract_tar(source, total_size, ctx),
        ArchiveFormat::Zip => extract_zip(source, ctx),
    };

    let result = result.map_err(|err| {
        if ctx.cancelled() {
            ExtractError::Aborted
        } else {
            err
        }
    });

    let event = match result {
        Ok((files, mut progress)) => {
            progress.emit(100);
            tracing::info!(%format, members = files.len(), "extraction completed");
            ExtractEvent::Completed(files)
        }
        Err(err) => {
            if err.is_aborted() {
                tracing::info!(%format, "extraction aborted");
            } else {
                tracing::error!(%format, error = %err, "extraction failed");
            }
            ExtractEvent::Failed(err)
        }
    };

    let _ = ctx.events.blocking_send(event);
}

fn extract_tar(
    source: Box<dyn Read + Send>,
    total_size: u64,
    ctx: &WorkerContext,
) -> Result<(Vec<ExtractedFile>, Progress), ExtractError> {
    let reader = CountingReader::new(
        source,
        total_size,
        Some(Progress::new(ctx.events.clone())),
        Arc::clone(&ctx.cancel),
    );
    let mut archive = tar::Archive::new(reader);
    let mut files = Vec::new();

    for entry in archive.entries().map_err(ExtractError::Tar)? {
        let mut entry = entry.map_err(ExtractError::Tar)?;
        if ctx.cancelled() {
            return Err(ExtractError::Aborted);
        }

        if !entry.header().entry_type().is_file() {
            continue;
        }

        let raw_path = entry.path().map_err(ExtractError::Tar)?.into_owned();
        let Some(path) = member_path(&raw_path) else {
            tracing::debug!(path = %raw_path.display(), "skipping hidden member");
            continue;
        };

        let size = entry.size();
        ctx.check_size(&path, size)?;

        let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
        entry.read_to_end(&mut bytes).map_err(ExtractError::Tar)?;
        files.push(ExtractedFile::new(path, bytes));
    }

    let progress = archive
        .into_inner()
        .progress
        .unwrap_or_else(|| Progress::new(ctx.events.clone()));
    Ok((files, progress))
}

fn extract_zip(
    source: Box<dyn Read + Send>,
    ctx: &WorkerContext,
) -> Result<(Vec<ExtractedFile>, Progress), ExtractError> {
    // The central directory sits at the end, so the container is buffered
    let mut buffer = Vec::new();
    CountingReader::new(source, 0, None, Arc::clone(&ctx.cancel)).read_to_end(&mut buffer)?;

    let mut archive = zip::ZipArchive::new(Cursor::new(buffer))?;
    let total = archive.len() as u64;
    let mut progress = Progress::new(ctx.events.clone());
    let mut files = Vec::new();

    for index in 0..archive.len() {
        if ctx.cancelled() {
            return Err(ExtractError::Aborted);
        }

        if let Some(file) = read_zip_member(&mut archive, index, ctx)? {
            files.push(file);
        }
        // Skipped members count toward progress
        progress.report(index as u64 + 1, total);
    }

    Ok((files, progress))
}

/// One zip member, or `None` for directories and hidden members
fn read_zip_member<R: Read + io::Seek>(
    archive: &mut zip::ZipArchive<R>,
    index: usize,
    ctx: &WorkerContext,
) -> Result<Option<ExtractedFile>, ExtractError> {
    let mut file = archive.by_index(index)?;
    if file.is_dir() {
        return Ok(None);
    }

    let raw_name = file.name().to_string();
    let Some(path) = member_path(Path::new(&raw_name)) else {
        tracing::debug!(path = %raw_name, "skipping hidden member");
        return Ok(None);
    };

    let size = file.size();
    ctx.check_size(&path, size)?;

    let mut bytes = Vec::with_capacity(usize::try_from(size).unwrap_or(0));
    file.read_to_end(&mut bytes)?;
    Ok(Some(ExtractedFile::new(path, bytes)))
}

/// Normalized `/`-joined member path, or `None` for hidden members
///
/// A member is hidden when any normal component starts with `.`.
/// `.` and `..` components are dropped.
fn member_path(path: &Path) -> Option<String> {
    let mut parts = Vec::new();
    for component in path.components() {
        if let Component::Normal(name) = component {
            let name = name.to_string_lossy();
            if name.starts_with('.') {
                return None;
            }
            parts.push(name.into_owned());
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
