use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

mod aggregation;
mod cli;
mod export;
mod history_series;
mod jobs;
mod leaderboard;
mod metrics;
mod scheduler;
mod snapshot;
mod tier;

#[tokio::main]
async fn main() -> Result<()> {
    let config = common::config::Config::load()?;

    let dispatch = common::observability::build_dispatch("tracker", &config.general.log_level);
    tracing::dispatcher::set_global_default(dispatch).map_err(anyhow::Error::msg)?;

    let cmd = cli::parse_args(std::env::args()).map_err(anyhow::Error::msg)?;

    let api = Arc::new(common::kong::KongClient::new_with_settings(
        &config.api.leaderboard_url,
        &config.api.summary_url,
        Duration::from_secs(config.api.request_timeout_secs),
        config.api.max_retries,
        Duration::from_millis(config.api.backoff_base_ms),
    )?);

    // One-shot commands print and exit.
    if cmd != cli::Command::Run {
        return cli::run_command(api.as_ref(), &config, cmd).await;
    }

    tracing::info!(
        leaderboard_url = api.leaderboard_url(),
        history = %config.history.path,
        "kong tracker starting"
    );

    if let Some(obs) = &config.observability {
        metrics::install_prometheus(obs.prometheus_port)?;
        tracing::info!(port = obs.prometheus_port, "prometheus exporter listening");
    }
    metrics::describe();

    let (snapshot_tx, mut snapshot_rx) = tokio::sync::mpsc::channel::<()>(1);

    // Single worker loop: snapshot runs never overlap on the history file.
    tokio::spawn({
        let api = api.clone();
        let history_path = PathBuf::from(&config.history.path);
        async move {
            while snapshot_rx.recv().await.is_some() {
                let span = tracing::info_span!("job_run", job = "daily_snapshot");
                let today = chrono::Local::now().date_naive();
                match jobs::run_snapshot_once(api.as_ref(), &history_path, today)
                    .instrument(span)
                    .await
                {
                    Ok(row) => tracing::info!(
                        date = %row.snapshot_date,
                        active_wallets = row.active_wallets,
                        "daily_snapshot done"
                    ),
                    Err(e) => tracing::error!(error = %e, "daily_snapshot failed"),
                }
            }
        }
    });

    let _scheduler_handles = scheduler::start(vec![scheduler::JobSpec {
        name: "daily_snapshot".to_string(),
        interval: Duration::from_secs(config.scheduler.snapshot_interval_secs),
        tick: snapshot_tx,
        run_immediately: true,
    }]);
    tracing::info!(
        interval_secs = config.scheduler.snapshot_interval_secs,
        "scheduler started"
    );

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    Ok(())
}
