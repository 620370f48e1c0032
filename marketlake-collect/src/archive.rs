//! Raw API payload archive, for replaying a collection without the network.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CollectError;

/// One fetched payload, keyed by what was requested (page number, coin id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawItem {
    pub key: String,
    pub payload: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawArchive {
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub items: Vec<RawItem>,
}

impl RawArchive {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            fetched_at: Utc::now(),
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, key: impl Into<String>, payload: Value) {
        self.items.push(RawItem {
            key: key.into(),
            payload,
        });
    }

    pub fn write(&self, path: &Path) -> Result<(), CollectError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| CollectError::Archive {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CollectError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, json).map_err(|source| CollectError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read an archive and check it was written by the `expected` source.
    pub fn read(path: &Path, expected: &str) -> Result<Self, CollectError> {
        let text = std::fs::read_to_string(path).map_err(|source| CollectError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let archive: Self = serde_json::from_str(&text).map_err(|e| CollectError::Archive {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        if archive.source != expected {
            return Err(CollectError::Archive {
                path: path.to_path_buf(),
                reason: format!(
                    "holds '{}' payloads, expected '{expected}'",
                    archive.source
                ),
            });
        }
        Ok(archive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn written_archive_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raw").join("markets.json");
        let mut archive = RawArchive::new("coingecko_markets");
        archive.push("1", json!([{"id": "bitcoin"}]));
        archive.write(&path).unwrap();

        let back = RawArchive::read(&path, "coingecko_markets").unwrap();
        assert_eq!(back, archive);
    }

    #[test]
    fn wrong_source_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.json");
        RawArchive::new("coingecko_market_chart").write(&path).unwrap();
        assert!(matches!(
            RawArchive::read(&path, "coingecko_markets"),
            Err(CollectError::Archive { .. })
        ));
    }
}
