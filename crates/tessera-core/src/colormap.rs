//! Colormap import and export
//!
//! A colormap file is a JSON array of `{clusterId, color}` or
//! `{gene_name, color}` objects. Export is pretty-printed with two-space
//! indentation; importing an exported file yields the same entries.

use crate::error::ColormapError;
use std::path::Path;
use tessera_model::ColormapEntry;

/// Serialize entries as an indented JSON array
///
/// # Errors
/// - `ColormapError::Json` if serialization fails
pub fn to_json(entries: &[ColormapEntry]) -> Result<String, ColormapError> {
    Ok(serde_json::to_string_pretty(entries)?)
}

/// Parse a JSON colormap array
///
/// # Errors
/// - `ColormapError::Json` if `text` is not an array of colormap entries
pub fn from_json(text: &str) -> Result<Vec<ColormapEntry>, ColormapError> {
    let entries: Vec<ColormapEntry> = serde_json::from_str(text)?;

    let mut seen = std::collections::HashSet::new();
    for entry in &entries {
        if !seen.insert(entry.key()) {
            tracing::warn!(key = entry.key(), "duplicate colormap key");
        }
    }
    Ok(entries)
}

/// Read a colormap file
///
/// # Errors
/// - `ColormapError::Io` if the file cannot be read
/// - `ColormapError::Json` if it does not parse
pub async fn import(path: impl AsRef<Path>) -> Result<Vec<ColormapEntry>, ColormapError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| ColormapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let entries = from_json(&text)?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "imported colormap");
    Ok(entries)
}

/// Write a colormap file
///
/// # Errors
/// - `ColormapError::Io` if the file cannot be written
pub async fn export(path: impl AsRef<Path>, entries: &[ColormapEntry]) -> Result<(), ColormapError> {
    let path = path.as_ref();
    let text = to_json(entries)?;
    tokio::fs::write(path, text)
        .await
        .map_err(|source| ColormapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    tracing::debug!(path = %path.display(), entries = entries.len(), "exported colormap");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_uses_two_space_indent_and_wire_keys() {
        let text = to_json(&[
            ColormapEntry::cluster("1", [255, 0, 0]),
            ColormapEntry::gene("ACTB", [0, 0, 255]),
        ])
        .unwrap();

        assert!(text.starts_with("[\n  {\n    \""));
        assert!(text.contains("\"clusterId\": \"1\""));
        assert!(text.contains("\"gene_name\": \"ACTB\""));
    }

    #[test]
    fn rejects_non_array_documents() {
        assert!(matches!(from_json("{\"clusterId\": \"1\"}"), Err(ColormapError::Json(_))));
        assert!(matches!(
            from_json("[{\"clusterId\": \"1\", \"color\": [1, 2]}]"),
            Err(ColormapError::Json(_))
        ));
    }

    #[tokio::test]
    async fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("colormap.json");
        let entries = vec![ColormapEntry::cluster("7", [1, 2, 3])];

        export(&path, &entries).await.unwrap();
        assert_eq!(import(&path).await.unwrap(), entries);

        assert!(matches!(
            import(dir.path().join("missing.json")).await,
            Err(ColormapError::Io { .. })
        ));
    }
}
