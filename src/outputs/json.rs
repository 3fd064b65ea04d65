//! JSON output.
//!
//! Each domain is written as a pretty-printed array of records. Absent
//! fields are written as `null` so every object has the same keys.

use crate::error::SinkError;
use serde::Serialize;
use std::path::Path;
use tokio::fs;
use tracing::{error, info, instrument};

/// Serialize `records` to `path`.
///
/// # Arguments
///
/// * `path` - Destination file, replaced if it exists
/// * `records` - Records written as one pretty-printed JSON array
///
/// # Returns
///
/// `Ok(())` once the file is written. An empty slice still produces `[]`.
#[instrument(level = "info", skip_all, fields(path = %path.display(), count = records.len()))]
pub async fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<(), SinkError> {
    let json = serde_json::to_string_pretty(records)?;

    if let Err(e) = fs::write(path, json).await {
        error!(error = %e, "Failed to write JSON");
        return Err(SinkError::Io {
            path: path.to_path_buf(),
            source: e,
        });
    }

    info!("Wrote JSON");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Anime, Origin};
    use chrono::Utc;

    #[tokio::test]
    async fn test_write_records_keeps_null_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anime.json");
        let records = vec![Anime {
            source: "anilist".to_string(),
            captured_at: Utc::now(),
            origin: Origin::Api,
            title: Some("Sousou no Frieren".to_string()),
            score: Some(91),
            episodes: None,
            image: None,
            site_url: None,
        }];

        write_records(&path, &records).await.unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0]["title"], "Sousou no Frieren");
        assert!(parsed[0]["episodes"].is_null());
        assert_eq!(parsed[0]["origin"], "api");
    }

    #[tokio::test]
    async fn test_write_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("x.json");
        let records: Vec<Anime> = Vec::new();
        assert!(matches!(
            write_records(&path, &records).await,
            Err(SinkError::Io { .. })
        ));
    }
}
