//! Decode outcome reporting

use crate::error::{DecodeError, RecordError};
use crate::record::{FrameEnd, Frames};

/// What happened while decoding one payload
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DecodeReport {
    /// Records decoded successfully
    pub records: usize,
    /// In-bounds records whose body was malformed
    pub skipped_records: usize,
    /// A length prefix pointed past the end of the payload
    pub truncated: bool,
    /// The payload ended in zero padding or a partial prefix
    pub padded: bool,
}

impl DecodeReport {
    /// Whether anything was lost
    #[inline]
    #[must_use]
    pub fn is_lossy(&self) -> bool {
        self.truncated || self.skipped_records > 0
    }
}

/// A decoded value together with its [`DecodeReport`]
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    pub value: T,
    pub report: DecodeReport,
}

impl<T> Decoded<T> {
    #[inline]
    #[must_use]
    pub fn new(value: T, report: DecodeReport) -> Self {
        Self { value, report }
    }

    /// Drop the report
    #[inline]
    pub fn into_value(self) -> T {
        self.value
    }

    /// Transform the value, keeping the report
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Decoded<U> {
        Decoded {
            value: f(self.value),
            report: self.report,
        }
    }
}

/// Decode every frame of a payload, skipping malformed records
///
/// `label` only appears in log output.
pub(crate) fn decode_frames<'a, T>(
    label: &str,
    frames: Frames<'a>,
    mut decode: impl FnMut(&'a [u8]) -> Result<T, RecordError>,
) -> Result<(Vec<T>, DecodeReport), DecodeError> {
    let mut frames = frames;
    let mut out = Vec::new();
    let mut report = DecodeReport::default();

    for body in frames.by_ref() {
        match decode(body) {
            Ok(item) => {
                out.push(item);
                report.records += 1;
            }
            Err(err) => {
                report.skipped_records += 1;
                tracing::warn!(
                    payload = label,
                    record = report.records + report.skipped_records - 1,
                    error = %err,
                    "skipping malformed record"
                );
            }
        }
    }

    match frames.end() {
        Some(FrameEnd::Truncated) => report.truncated = true,
        Some(FrameEnd::Padding) => report.padded = true,
        _ => {}
    }

    if report.truncated {
        tracing::warn!(
            payload = label,
            recovered = report.records,
            "payload truncated, keeping records decoded so far"
        );
    }

    if report.records == 0 && report.is_lossy() {
        return Err(DecodeError::NoRecoverableRecords {
            skipped: report.skipped_records,
            truncated: report.truncated,
        });
    }

    tracing::debug!(
        payload = label,
        records = report.records,
        skipped = report.skipped_records,
        "decoded payload"
    );

    Ok((out, report))
}
