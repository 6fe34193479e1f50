use anyhow::Result;
use common::types::DailySnapshotRow;
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

pub fn describe() {
    describe_counter!(
        "kong_snapshots_recorded_total",
        "Number of daily snapshot rows written to history."
    );
    describe_gauge!(
        "kong_snapshot_total_staked",
        "Total KONG staked in the latest snapshot."
    );
    describe_gauge!("kong_snapshot_tvl_usd", "TVL (USD) in the latest snapshot.");
    describe_gauge!(
        "kong_snapshot_active_wallets",
        "Wallets with a positive stake in the latest snapshot."
    );
    describe_gauge!(
        "kong_snapshot_zero_stake_wallets",
        "Wallets with zero stake in the latest snapshot."
    );
    describe_gauge!(
        "kong_snapshot_median_stake",
        "Median stake of active wallets."
    );
    describe_gauge!("kong_snapshot_max_stake", "Largest stake of active wallets.");
    describe_gauge!(
        "kong_snapshot_tier_wallets",
        "Active wallets per stake tier (label: tier)."
    );
    describe_counter!(
        "kong_api_requests_total",
        "Number of KONG API requests made."
    );
    describe_histogram!(
        "kong_api_latency_ms",
        "KONG API request latency in milliseconds."
    );
}

/// Publish the latest snapshot row as gauges.
#[allow(clippy::cast_precision_loss)]
pub fn record_snapshot_gauges(row: &DailySnapshotRow) {
    let stakes = [
        ("kong_snapshot_total_staked", row.total_staked),
        ("kong_snapshot_tvl_usd", row.tvl_usd),
        ("kong_snapshot_median_stake", row.median_stake),
        ("kong_snapshot_max_stake", row.max_stake),
    ];
    for (name, value) in stakes {
        if let Some(v) = value {
            metrics::gauge!(name).set(v);
        }
    }
    metrics::gauge!("kong_snapshot_active_wallets").set(row.active_wallets as f64);
    metrics::gauge!("kong_snapshot_zero_stake_wallets").set(row.zero_stake_wallets as f64);
    for (tier, count) in row.tier_counts().into_iter().enumerate() {
        metrics::gauge!("kong_snapshot_tier_wallets", "tier" => tier.to_string())
            .set(count as f64);
    }
}

pub fn install_prometheus(port: u16) -> Result<PrometheusHandle> {
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    Ok(PrometheusBuilder::new()
        .with_http_listener(addr)
        .install_recorder()?)
}
