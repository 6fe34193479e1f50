//! Flat-file store for the daily snapshot table (`daily.csv`).

use anyhow::{Context, Result};
use std::path::Path;

use crate::types::DailySnapshotRow;

/// Read the history file. A missing file is an empty history (first run).
///
/// Empty stake cells read as missing values. Any other row that fails to parse
/// fails the whole load: the table is rewritten in full on save, so a skipped
/// row would be lost.
pub fn load_history(path: &Path) -> Result<Vec<DailySnapshotRow>> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "history file missing; starting empty");
        return Ok(Vec::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("failed to open history file {}", path.display()))?;

    let mut rows = Vec::new();
    for (idx, rec) in reader.deserialize::<DailySnapshotRow>().enumerate() {
        let row = rec.with_context(|| {
            format!("unreadable row {} in history file {}", idx + 1, path.display())
        })?;
        rows.push(row);
    }
    let incomplete = rows
        .iter()
        .filter(|r| {
            r.total_staked.is_none()
                || r.tvl_usd.is_none()
                || r.percentage_supply.is_none()
                || r.median_stake.is_none()
                || r.max_stake.is_none()
        })
        .count();
    tracing::debug!(rows = rows.len(), incomplete, "history loaded");
    Ok(rows)
}

/// Write the full table with header, replacing the file atomically.
pub fn save_history(path: &Path, rows: &[DailySnapshotRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let tmp = path.with_extension("csv.tmp");
    {
        let mut writer = csv::Writer::from_path(&tmp)
            .with_context(|| format!("failed to create {}", tmp.display()))?;
        if rows.is_empty() {
            writer.write_record(DailySnapshotRow::COLUMNS)?;
        }
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("failed to move history into {}", path.display()))?;
    tracing::debug!(rows = rows.len(), path = %path.display(), "history saved");
    Ok(())
}
