use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;

use crate::aggregation::TierBucket;
use crate::leaderboard::WalletStakeRecord;

/// `tier,wallets,total_kong`, one line per bucket.
pub fn write_tiers_csv<W: Write>(out: W, buckets: &[TierBucket]) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    for b in buckets {
        w.serialize(b)?;
    }
    w.flush()?;
    Ok(())
}

/// `user,stakedAmount,tier` for every normalized record, zero stakes included.
pub fn write_wallets_csv<W: Write>(out: W, records: &[WalletStakeRecord]) -> Result<()> {
    let mut w = csv::Writer::from_writer(out);
    for r in records {
        w.serialize(r)?;
    }
    w.flush()?;
    Ok(())
}

pub fn export_to_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(std::fs::File) -> Result<()>,
{
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write(file)?;
    tracing::info!(path = %path.display(), "export written");
    Ok(())
}
