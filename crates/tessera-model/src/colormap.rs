//! Cluster and gene color assignments

use serde::{Deserialize, Serialize};

/// One colormap entry, keyed either by cluster id or by gene name
///
/// Serialized untagged so the JSON key (`clusterId` or `gene_name`) survives
/// an import/export round trip unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColormapEntry {
    Cluster {
        #[serde(rename = "clusterId")]
        cluster_id: String,
        color: [u8; 3],
    },
    Gene {
        gene_name: String,
        color: [u8; 3],
    },
}

impl ColormapEntry {
    /// Cluster-keyed entry
    #[inline]
    #[must_use]
    pub fn cluster(cluster_id: impl Into<String>, color: [u8; 3]) -> Self {
        Self::Cluster {
            cluster_id: cluster_id.into(),
            color,
        }
    }

    /// Gene-keyed entry
    #[inline]
    #[must_use]
    pub fn gene(gene_name: impl Into<String>, color: [u8; 3]) -> Self {
        Self::Gene {
            gene_name: gene_name.into(),
            color,
        }
    }

    /// Cluster id or gene name
    #[inline]
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Cluster { cluster_id, .. } => cluster_id,
            Self::Gene { gene_name, .. } => gene_name,
        }
    }

    #[inline]
    #[must_use]
    pub fn color(&self) -> [u8; 3] {
        match self {
            Self::Cluster { color, .. } | Self::Gene { color, .. } => *color,
        }
    }

    /// `#rrggbb` form used by chart legends
    #[must_use]
    pub fn hex_color(&self) -> String {
        format!("#{}", hex::encode(self.color()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserialize_both_key_styles() {
        let json = r#"[
            {"clusterId": "4", "color": [1, 2, 3]},
            {"gene_name": "ACTB", "color": [255, 128, 0]}
        ]"#;
        let entries: Vec<ColormapEntry> = serde_json::from_str(json).unwrap();

        assert_eq!(entries[0], ColormapEntry::cluster("4", [1, 2, 3]));
        assert_eq!(entries[1], ColormapEntry::gene("ACTB", [255, 128, 0]));
    }

    #[test]
    fn serialize_preserves_key_name() {
        let json = serde_json::to_string(&ColormapEntry::cluster("7", [0, 0, 0])).unwrap();
        assert_eq!(json, r#"{"clusterId":"7","color":[0,0,0]}"#);
    }

    #[test]
    fn rejects_out_of_range_channel() {
        let json = r#"{"clusterId": "4", "color": [256, 0, 0]}"#;
        assert!(serde_json::from_str::<ColormapEntry>(json).is_err());
    }

    #[test]
    fn hex_color() {
        assert_eq!(ColormapEntry::gene("A", [255, 16, 0]).hex_color(), "#ff1000");
    }
}
