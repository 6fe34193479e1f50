use anyhow::{Context, Result};
use chrono::NaiveDate;
use common::history::{load_history, save_history};
use common::kong::KongClient;
use common::types::{ApiLeaderboardEntry, ApiStakingSummary, DailySnapshotRow};
use std::path::Path;
use std::time::Instant;

use crate::leaderboard::{normalize_leaderboard, WalletStakeRecord};
use crate::snapshot::record_snapshot;

/// Source of raw leaderboard and summary payloads.
pub trait StakingFetcher {
    fn fetch_leaderboard(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<ApiLeaderboardEntry>>> + Send;
    fn fetch_summary(&self) -> impl std::future::Future<Output = Result<ApiStakingSummary>> + Send;
}

fn record_api_call<T>(endpoint: &'static str, start: Instant, res: &Result<T>) {
    let ms = start.elapsed().as_secs_f64() * 1000.0;
    metrics::histogram!("kong_api_latency_ms", "endpoint" => endpoint).record(ms);
    let status = if res.is_ok() { "ok" } else { "error" };
    metrics::counter!("kong_api_requests_total", "endpoint" => endpoint, "status" => status)
        .increment(1);
}

impl StakingFetcher for KongClient {
    async fn fetch_leaderboard(&self) -> Result<Vec<ApiLeaderboardEntry>> {
        let start = Instant::now();
        let res = KongClient::fetch_leaderboard(self).await;
        record_api_call("leaderboard", start, &res);
        res
    }

    async fn fetch_summary(&self) -> Result<ApiStakingSummary> {
        let start = Instant::now();
        let res = KongClient::fetch_summary(self).await;
        record_api_call("summary", start, &res);
        res
    }
}

/// Fetch and normalize the current leaderboard.
pub async fn load_records<F: StakingFetcher>(api: &F) -> Result<Vec<WalletStakeRecord>> {
    let entries = api.fetch_leaderboard().await?;
    Ok(normalize_leaderboard(&entries))
}

/// Fetch both payloads, upsert today's row into the history file and return it.
///
/// Callers must not run this concurrently for the same file.
pub async fn run_snapshot_once<F: StakingFetcher>(
    api: &F,
    history_path: &Path,
    today: NaiveDate,
) -> Result<DailySnapshotRow> {
    let (leaderboard, summary) = tokio::try_join!(api.fetch_leaderboard(), api.fetch_summary())?;
    if leaderboard.is_empty() {
        tracing::warn!(%today, "leaderboard empty; recording summary-only row");
    }

    let history = load_history(history_path)?;
    let updated = record_snapshot(&leaderboard, &summary, today, &history);
    save_history(history_path, &updated)?;

    let row = updated
        .iter()
        .find(|r| r.snapshot_date == today)
        .cloned()
        .context("snapshot row missing after upsert")?;

    metrics::counter!("kong_snapshots_recorded_total").increment(1);
    crate::metrics::record_snapshot_gauges(&row);
    tracing::info!(
        %today,
        rows = updated.len(),
        total_staked = ?row.total_staked,
        active_wallets = row.active_wallets,
        "snapshot recorded"
    );
    Ok(row)
}
