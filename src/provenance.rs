//! Provenance sidecars and content fingerprints.
//!
//! A record next to a theme song is the only proof that themerr wrote that
//! file. Its field names are shared with existing libraries and must not
//! change.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceRecord {
    #[serde(rename = "downloaded_timestamp")]
    pub fetched_at: DateTime<Utc>,
    /// Lowercase hex MD5 of the theme song. Older records omit it.
    #[serde(rename = "theme_md5", default)]
    pub content_fingerprint: String,
    #[serde(rename = "youtube_theme_url")]
    pub source_url: String,
}

impl ProvenanceRecord {
    pub fn new(source_url: impl Into<String>, content_fingerprint: impl Into<String>) -> Self {
        Self {
            fetched_at: Utc::now(),
            content_fingerprint: content_fingerprint.into(),
            source_url: source_url.into(),
        }
    }
}

/// How the asset on disk relates to the stored fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fingerprint {
    /// No record, or the record carries no fingerprint.
    Unknown,
    Match,
    Mismatch,
}

/// Observed state of one item's asset and record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalState {
    pub asset_exists: bool,
    pub record_exists: bool,
    pub fingerprint: Fingerprint,
    /// Source url from the record, when one could be read.
    pub source_url: Option<String>,
}

/// Strict load. `Ok(None)` when the file is missing.
pub(crate) async fn load_record(path: &Path) -> Result<Option<ProvenanceRecord>> {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::RecordCorrupt { path: path.to_path_buf(), reason: e.to_string() })
        }
    };
    serde_json::from_slice(&raw)
        .map(Some)
        .map_err(|e| Error::RecordCorrupt { path: path.to_path_buf(), reason: e.to_string() })
}

/// Soft load: missing, unreadable and malformed records all read as absent.
/// An unparseable record proves nothing about who wrote the asset.
pub async fn read_record(path: &Path) -> Option<ProvenanceRecord> {
    match load_record(path).await {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!("{e}; treating as absent");
            None
        }
    }
}

/// Write via a sibling temp file and rename, so readers never see a partial
/// record.
pub async fn write_record(path: &Path, record: &ProvenanceRecord) -> Result<()> {
    let fail = |source: std::io::Error| Error::WriteFailure { path: path.to_path_buf(), source };
    let payload = serde_json::to_vec_pretty(record).map_err(|e| fail(e.into()))?;
    let tmp = temp_sibling(path);
    if let Err(e) = tokio::fs::write(&tmp, &payload).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(fail(e));
    }
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(fail(e));
    }
    Ok(())
}

/// Lowercase hex MD5 of the file's bytes.
pub async fn fingerprint(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(format!("{:x}", md5::compute(&bytes)))
}

/// Remove a record. Already gone is fine.
pub async fn purge(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Read everything the decision needs about an item.
pub async fn inspect(asset: &Path, record_path: &Path) -> Result<LocalState> {
    let asset_exists = tokio::fs::try_exists(asset).await?;
    let record = read_record(record_path).await;
    let record_exists = record.is_some();

    let fingerprint = match (&record, asset_exists) {
        (Some(r), true) if !r.content_fingerprint.trim().is_empty() => {
            let live = fingerprint(asset).await?;
            if live.eq_ignore_ascii_case(r.content_fingerprint.trim()) {
                Fingerprint::Match
            } else {
                Fingerprint::Mismatch
            }
        }
        _ => Fingerprint::Unknown,
    };

    Ok(LocalState {
        asset_exists,
        record_exists,
        fingerprint,
        source_url: record.map(|r| r.source_url),
    })
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fingerprint_is_lowercase_hex_md5() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("theme.mp3");
        tokio::fs::write(&p, b"").await.unwrap();
        assert_eq!(fingerprint(&p).await.unwrap(), "d41d8cd98f00b204e9800998ecf8427e");
        tokio::fs::write(&p, b"themerr").await.unwrap();
        let fp = fingerprint(&p).await.unwrap();
        assert_eq!(fp.len(), 32);
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[tokio::test]
    async fn record_uses_sidecar_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("themerr.json");
        let rec = ProvenanceRecord::new("https://www.youtube.com/watch?v=E8nxMWr2sr4", "abc123");
        write_record(&p, &rec).await.unwrap();

        let raw: serde_json::Value = serde_json::from_slice(&std::fs::read(&p).unwrap()).unwrap();
        assert_eq!(raw["youtube_theme_url"], "https://www.youtube.com/watch?v=E8nxMWr2sr4");
        assert_eq!(raw["theme_md5"], "abc123");
        assert!(raw["downloaded_timestamp"].as_str().is_some());

        assert_eq!(read_record(&p).await, Some(rec));
    }

    #[tokio::test]
    async fn write_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("themerr.json");
        write_record(&p, &ProvenanceRecord::new("u1", "f1")).await.unwrap();
        write_record(&p, &ProvenanceRecord::new("u2", "f2")).await.unwrap();
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["themerr.json".to_string()]);
        assert_eq!(read_record(&p).await.unwrap().source_url, "u2");
    }

    #[tokio::test]
    async fn write_into_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("gone").join("themerr.json");
        let err = write_record(&p, &ProvenanceRecord::new("u", "f")).await.unwrap_err();
        assert!(matches!(err, Error::WriteFailure { .. }));
    }

    #[tokio::test]
    async fn missing_and_corrupt_records_read_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no_file.json");
        assert_eq!(read_record(&missing).await, None);
        assert!(load_record(&missing).await.unwrap().is_none());

        let empty = dir.path().join("empty.json");
        std::fs::write(&empty, b"").unwrap();
        assert_eq!(read_record(&empty).await, None);
        assert!(matches!(load_record(&empty).await, Err(Error::RecordCorrupt { .. })));

        let no_url = dir.path().join("dummy.json");
        std::fs::write(&no_url, br#"{"dummy_key": "dummy_value"}"#).unwrap();
        assert_eq!(read_record(&no_url).await, None);
    }

    #[tokio::test]
    async fn record_without_md5_has_empty_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("themerr.json");
        std::fs::write(
            &p,
            br#"{"downloaded_timestamp": "2023-09-01T12:00:00Z", "youtube_theme_url": "https://www.youtube.com/watch?v=E8nxMWr2sr4"}"#,
        )
        .unwrap();
        let rec = read_record(&p).await.unwrap();
        assert!(rec.content_fingerprint.is_empty());
    }

    #[tokio::test]
    async fn purge_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let p = dir.path().join("themerr.json");
        std::fs::write(&p, b"{}").unwrap();
        purge(&p).await.unwrap();
        assert!(!p.exists());
        purge(&p).await.unwrap();
    }

    #[tokio::test]
    async fn inspect_classifies_fingerprints() {
        let dir = tempfile::tempdir().unwrap();
        let asset = dir.path().join("theme.mp3");
        let record = dir.path().join("themerr.json");

        let s = inspect(&asset, &record).await.unwrap();
        assert!(!s.asset_exists && !s.record_exists);
        assert_eq!(s.fingerprint, Fingerprint::Unknown);

        std::fs::write(&asset, b"plugin bytes").unwrap();
        let fp = fingerprint(&asset).await.unwrap();
        write_record(&record, &ProvenanceRecord::new("u1", fp.to_uppercase())).await.unwrap();
        let s = inspect(&asset, &record).await.unwrap();
        assert_eq!(s.fingerprint, Fingerprint::Match);
        assert_eq!(s.source_url.as_deref(), Some("u1"));

        std::fs::write(&asset, b"user bytes").unwrap();
        let s = inspect(&asset, &record).await.unwrap();
        assert_eq!(s.fingerprint, Fingerprint::Mismatch);

        write_record(&record, &ProvenanceRecord::new("u1", "")).await.unwrap();
        let s = inspect(&asset, &record).await.unwrap();
        assert_eq!(s.fingerprint, Fingerprint::Unknown);
        assert!(s.record_exists);
    }
}
