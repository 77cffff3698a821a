//! Persisted "don't show again" flags
//!
//! A flat JSON object of booleans. Values written by older builds as the
//! string `"true"` are accepted, as is the old misspelled tiled-layer key.

use crate::error::FlagError;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Suppresses the tiled transcript layer warning
pub const TILED_LAYER_WARNING: &str = "disableTiledLayerWarning_DSA";

/// Suppresses the cell boundary warning
pub const BOUNDARY_WARNING: &str = "disableBoundaryWarning_DSA";

const LEGACY_ALIASES: &[(&str, &str)] = &[("disableTiledLayerWarnign_DSA", TILED_LAYER_WARNING)];

/// Boolean flags, optionally backed by a file
#[derive(Debug, Default)]
pub struct PersistedFlags {
    path: Option<PathBuf>,
    values: RwLock<BTreeMap<String, bool>>,
}

impl PersistedFlags {
    /// Flags that live only as long as this value
    #[inline]
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load flags from `path`; a missing file starts empty
    ///
    /// # Errors
    /// - `FlagError::Io` if the file exists but cannot be read
    /// - `FlagError::Json` if it is not a JSON object
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, FlagError> {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => parse(&text)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(FlagError::Io { path, source }),
        };

        Ok(Self {
            path: Some(path),
            values: RwLock::new(values),
        })
    }

    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Whether `name` is set; unknown flags are unset
    #[must_use]
    pub fn get(&self, name: &str) -> bool {
        self.values.read().get(name).copied().unwrap_or(false)
    }

    /// Set a flag and write the store back
    ///
    /// The write lock is held until the file is written, so concurrent
    /// calls reach the disk in the order they updated the map.
    ///
    /// # Errors
    /// - `FlagError::Io` if the backing file cannot be written
    pub fn set(&self, name: &str, value: bool) -> Result<(), FlagError> {
        let mut values = self.values.write();
        values.insert(name.to_string(), value);
        self.persist(&values)
    }

    /// Snapshot of every flag
    #[must_use]
    pub fn all(&self) -> BTreeMap<String, bool> {
        self.values.read().clone()
    }

    fn persist(&self, values: &BTreeMap<String, bool>) -> Result<(), FlagError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = serde_json::to_string_pretty(values)?;
        std::fs::write(path, text).map_err(|source| FlagError::Io {
            path: path.clone(),
            source,
        })
    }
}

fn parse(text: &str) -> Result<BTreeMap<String, bool>, FlagError> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(text)?;

    let mut values = BTreeMap::new();
    for (key, value) in raw {
        let enabled = match &value {
            serde_json::Value::Bool(b) => *b,
            serde_json::Value::String(s) => s == "true",
            other => {
                tracing::debug!(key, value = %other, "ignoring non-boolean flag");
                continue;
            }
        };
        let key = LEGACY_ALIASES
            .iter()
            .find(|(legacy, _)| *legacy == key)
            .map_or(key.clone(), |(_, current)| (*current).to_string());
        let slot = values.entry(key).or_insert(false);
        *slot |= enabled;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_starts_empty_and_set_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");

        let flags = PersistedFlags::load(&path).unwrap();
        assert!(!flags.get(BOUNDARY_WARNING));

        flags.set(BOUNDARY_WARNING, true).unwrap();
        let reloaded = PersistedFlags::load(&path).unwrap();
        assert!(reloaded.get(BOUNDARY_WARNING));
        assert!(!reloaded.get(TILED_LAYER_WARNING));
    }

    #[test]
    fn accepts_string_values_and_legacy_key() {
        let values = parse(r#"{"disableTiledLayerWarnign_DSA": "true", "other": 3}"#).unwrap();
        assert_eq!(values.get(TILED_LAYER_WARNING), Some(&true));
        assert!(!values.contains_key("other"));
    }

    #[test]
    fn rejects_non_object() {
        assert!(matches!(parse("[true]"), Err(FlagError::Json(_))));
    }

    #[test]
    fn concurrent_sets_leave_the_latest_state_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flags.json");
        let flags = PersistedFlags::load(&path).unwrap();

        std::thread::scope(|scope| {
            for t in 0..8 {
                let flags = &flags;
                scope.spawn(move || {
                    for i in 0..25 {
                        flags.set(&format!("flag-{t}-{i}"), i % 2 == 0).unwrap();
                    }
                });
            }
        });

        let reloaded = PersistedFlags::load(&path).unwrap();
        assert_eq!(reloaded.all().len(), 200);
        assert_eq!(reloaded.all(), flags.all());
    }

    #[test]
    fn in_memory_never_touches_disk() {
        let flags = PersistedFlags::in_memory();
        flags.set(TILED_LAYER_WARNING, true).unwrap();
        assert!(flags.get(TILED_LAYER_WARNING));
        assert!(flags.path().is_none());
    }
}
