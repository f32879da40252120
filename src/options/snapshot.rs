//! Option-chain snapshot persistence
//!
//! Snapshots are immutable once written: tabular rows as CSV plus a JSON
//! metadata sidecar, each written to a temp file in the destination
//! directory and renamed into place so readers never see a half-written
//! file. Filenames embed the index, a filesystem-safe expiry, and an
//! exchange-local timestamp whose lexicographic order equals
//! chronological order.

use super::chain::{BandedChain, FlatRow};
use crate::error::{AppError, Result};
use chrono::Utc;
use chrono_tz::Asia::Kolkata;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Snapshot metadata sidecar
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub created_at_utc: String,
    pub index_name: String,
    pub expiry: String,
    pub underlying_value: f64,
    pub atm_strike: f64,
    pub selected_strikes_range: (f64, f64),
    pub total_strikes: usize,
}

/// Writes and locates snapshots under one directory
///
/// A per-index async mutex serializes concurrent writers so two requests
/// for the same index cannot race to the same second-resolution filename.
pub struct SnapshotStore {
    dir: PathBuf,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SnapshotStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            dir,
            locks: Mutex::new(HashMap::new()),
        }
    }

    fn lock_for(&self, index: &str) -> Arc<tokio::sync::Mutex<()>> {
        self.locks
            .lock()
            .entry(index.to_lowercase())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Persist a banded chain; returns the metadata that was written
    pub async fn persist(
        &self,
        index: &str,
        expiry: &str,
        underlying_value: f64,
        band: &BandedChain,
    ) -> Result<SnapshotMeta> {
        let meta = SnapshotMeta {
            created_at_utc: Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            index_name: index.to_uppercase(),
            expiry: expiry.to_string(),
            underlying_value,
            atm_strike: band.atm_strike,
            selected_strikes_range: band.selected_range,
            total_strikes: band.rows.len(),
        };

        let base = base_filename(index, expiry);
        let dir = self.dir.clone();
        let rows = band.rows.clone();
        let meta_clone = meta.clone();
        let base_for_write = base.clone();

        let lock = self.lock_for(index);
        let _guard = lock.lock().await;

        // the write pair is blocking filesystem work
        tokio::task::spawn_blocking(move || write_pair(&dir, &base_for_write, &rows, &meta_clone))
            .await
            .map_err(|e| AppError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))??;

        info!(
            "Persisted snapshot {}: {} rows, strikes {} to {}",
            base,
            meta.total_strikes,
            meta.selected_strikes_range.0,
            meta.selected_strikes_range.1
        );
        Ok(meta)
    }

    /// Path of the most recent snapshot CSV for an index
    ///
    /// Selected by descending lexicographic filename order, which the
    /// timestamp component makes chronological.
    pub fn latest_csv(&self, index: &str) -> Result<PathBuf> {
        let prefix = format!("{}_", index.to_lowercase());
        let mut names: Vec<String> = std::fs::read_dir(&self.dir)
            .map_err(|_| AppError::NotFound("No option data available".to_string()))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| name.starts_with(&prefix) && name.ends_with(".csv"))
            .collect();

        names.sort();
        let latest = names
            .pop()
            .ok_or_else(|| AppError::NotFound(format!("No data found for index {}", index)))?;
        Ok(self.dir.join(latest))
    }

    /// Rows of the most recent snapshot for an index
    pub fn load_latest(&self, index: &str) -> Result<Vec<FlatRow>> {
        let path = self.latest_csv(index)?;
        read_rows(&path)
    }

    /// Metadata sidecar of the most recent snapshot for an index
    pub fn load_latest_meta(&self, index: &str) -> Result<SnapshotMeta> {
        let csv_path = self.latest_csv(index)?;
        let meta_path = csv_path.with_extension("json");
        let raw = std::fs::read_to_string(&meta_path)
            .map_err(|_| AppError::NotFound(format!("No metadata for index {}", index)))?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn base_filename(index: &str, expiry: &str) -> String {
    let timestamp = Utc::now()
        .with_timezone(&Kolkata)
        .format("%Y-%m-%d_%H-%M-%S");
    let safe_expiry = expiry.replace(' ', "_").replace('/', "-");
    format!(
        "{}_option_chain_{}_{}",
        index.to_lowercase(),
        safe_expiry,
        timestamp
    )
}

/// Write CSV + JSON, each atomically (temp file in-dir, then rename)
fn write_pair(dir: &Path, base: &str, rows: &[FlatRow], meta: &SnapshotMeta) -> Result<()> {
    std::fs::create_dir_all(dir)?;

    let csv_path = dir.join(format!("{}.csv", base));
    let mut csv_tmp = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = csv::Writer::from_writer(&mut csv_tmp);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    csv_tmp
        .persist(&csv_path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    let meta_path = dir.join(format!("{}.json", base));
    let mut meta_tmp = tempfile::NamedTempFile::new_in(dir)?;
    meta_tmp.write_all(&serde_json::to_vec_pretty(meta)?)?;
    meta_tmp
        .persist(&meta_path)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    Ok(())
}

/// Read a snapshot CSV back into flat rows
pub fn read_rows(path: &Path) -> Result<Vec<FlatRow>> {
    let mut reader = csv::Reader::from_path(path)
        .map_err(|_| AppError::NotFound("Snapshot file vanished".to_string()))?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        rows.push(record?);
    }
    Ok(rows)
}
