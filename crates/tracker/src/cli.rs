use anyhow::Result;
use common::config::Config;
use common::history::load_history;
use common::types::ApiStakingSummary;
use std::path::{Path, PathBuf};

use crate::aggregation::{
    aggregate_by_tier, compute_kpis, partition_active, segment, top_n, zero_fill_tiers,
    SegmentCutoffs, Segments,
};
use crate::export::{export_to_file, write_tiers_csv, write_wallets_csv};
use crate::history_series::{
    build_view, DerivedSeries, HistoryView, HistoryWindow, SeriesColumn,
};
use crate::jobs::{load_records, run_snapshot_once, StakingFetcher};
use crate::leaderboard::{normalize_leaderboard, WalletStakeRecord};
use crate::tier::tier_label;

pub const NO_DATA_MESSAGE: &str = "No data returned from the API yet.";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run,
    Snapshot,
    Tiers,
    Wallets,
    Top { n: Option<usize> },
    Segments { cutoffs: Option<SegmentCutoffs> },
    History { window: HistoryWindow },
    ExportTiers { path: PathBuf },
    ExportWallets { path: PathBuf },
}

fn parse_number<T>(raw: &str, what: &str) -> Result<T, String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e| format!("invalid {what}: {raw} ({e})"))
}

pub fn parse_args<I>(mut args: I) -> std::result::Result<Command, String>
where
    I: Iterator<Item = String>,
{
    // Drop argv[0].
    let _ = args.next();

    let Some(cmd) = args.next() else {
        return Ok(Command::Run);
    };

    match cmd.as_str() {
        "run" => Ok(Command::Run),
        "snapshot" => Ok(Command::Snapshot),
        "tiers" => Ok(Command::Tiers),
        "wallets" => Ok(Command::Wallets),
        "top" => {
            let n = args.next().map(|s| parse_number(&s, "N")).transpose()?;
            Ok(Command::Top { n })
        }
        "segments" => match (args.next(), args.next()) {
            (None, _) => Ok(Command::Segments { cutoffs: None }),
            (Some(rice), Some(whale)) => Ok(Command::Segments {
                cutoffs: Some(SegmentCutoffs {
                    rice: parse_number(&rice, "rice cutoff")?,
                    whale: parse_number(&whale, "whale cutoff")?,
                }),
            }),
            (Some(_), None) => Err("usage: tracker segments [RICE WHALE]".to_string()),
        },
        "history" => {
            let window = match args.next() {
                Some(w) => w.parse()?,
                None => HistoryWindow::Last30,
            };
            Ok(Command::History { window })
        }
        "export-tiers" => {
            let path = args
                .next()
                .ok_or_else(|| "usage: tracker export-tiers <path>".to_string())?;
            Ok(Command::ExportTiers { path: path.into() })
        }
        "export-wallets" => {
            let path = args
                .next()
                .ok_or_else(|| "usage: tracker export-wallets <path>".to_string())?;
            Ok(Command::ExportWallets { path: path.into() })
        }
        other => Err(format!("unknown command: {other}")),
    }
}

/// Fetch and normalize; `None` when the API returned no wallets.
async fn fetch_records<F: StakingFetcher>(api: &F) -> Result<Option<Vec<WalletStakeRecord>>> {
    let records = load_records(api).await?;
    if records.is_empty() {
        println!("{NO_DATA_MESSAGE}");
        return Ok(None);
    }
    Ok(Some(records))
}

/// Tiers view built from the leaderboard and summary fetched together;
/// `None` when the API returned no wallets.
pub async fn tiers_report<F: StakingFetcher>(api: &F) -> Result<Option<String>> {
    let (entries, summary) = tokio::try_join!(api.fetch_leaderboard(), api.fetch_summary())?;
    let records = normalize_leaderboard(&entries);
    if records.is_empty() {
        return Ok(None);
    }
    Ok(Some(render_tiers(&records, &summary)))
}

pub async fn run_command<F: StakingFetcher>(api: &F, cfg: &Config, cmd: Command) -> Result<()> {
    match cmd {
        Command::Run => Ok(()),
        Command::Snapshot => {
            let today = chrono::Local::now().date_naive();
            let row = run_snapshot_once(api, Path::new(&cfg.history.path), today).await?;
            println!("Snapshot {} written to {}", row.snapshot_date, cfg.history.path);
            println!(
                "  total_staked={}  tvl_usd={}  active_wallets={}  zero_stake_wallets={}",
                fmt_opt(row.total_staked, 0),
                fmt_opt(row.tvl_usd, 2),
                row.active_wallets,
                row.zero_stake_wallets
            );
            Ok(())
        }
        Command::Tiers => {
            match tiers_report(api).await? {
                Some(text) => print!("{text}"),
                None => println!("{NO_DATA_MESSAGE}"),
            }
            Ok(())
        }
        Command::Wallets => {
            if let Some(records) = fetch_records(api).await? {
                print!("{}", render_wallets("All staking wallets", &records));
            }
            Ok(())
        }
        Command::Top { n } => {
            if let Some(records) = fetch_records(api).await? {
                let n = n.unwrap_or(cfg.dashboard.top_n);
                let active = partition_active(&records).active;
                let title = format!("Top {n} wallets");
                print!("{}", render_wallets(&title, &top_n(&active, n)));
            }
            Ok(())
        }
        Command::Segments { cutoffs } => {
            let cutoffs = cutoffs.unwrap_or(SegmentCutoffs {
                rice: cfg.segments.rice_cutoff,
                whale: cfg.segments.whale_cutoff,
            });
            // Validate before fetching so a bad pair fails fast.
            cutoffs.validate()?;
            if let Some(records) = fetch_records(api).await? {
                let segments = segment(&partition_active(&records).active, cutoffs)?;
                print!("{}", render_segments(cutoffs, &segments));
            }
            Ok(())
        }
        Command::History { window } => {
            let history = load_history(Path::new(&cfg.history.path))?;
            let view = build_view(&history, window);
            print!("{}", render_history(&view));
            Ok(())
        }
        Command::ExportTiers { path } => {
            if let Some(records) = fetch_records(api).await? {
                let buckets = aggregate_by_tier(&partition_active(&records).active);
                export_to_file(&path, |f| write_tiers_csv(f, &buckets))?;
                println!("Tiers written to {}", path.display());
            }
            Ok(())
        }
        Command::ExportWallets { path } => {
            if let Some(records) = fetch_records(api).await? {
                export_to_file(&path, |f| write_wallets_csv(f, &records))?;
                println!("Wallets written to {}", path.display());
            }
            Ok(())
        }
    }
}

/// Total staked comes from the summary when it has one, else the local sum.
pub fn render_tiers(records: &[WalletStakeRecord], summary: &ApiStakingSummary) -> String {
    let partition = partition_active(records);
    let kpis = compute_kpis(&partition);
    let buckets = zero_fill_tiers(&aggregate_by_tier(&partition.active));
    let total_staked = summary.total_staked.unwrap_or(kpis.total_staked);

    let mut out = String::new();
    out.push_str("KONG staking: wallets by tier\n");
    out.push_str(&format!(
        "  wallets staking={}  total staked={:.0}  median={:.0}  max={:.0}  zero-stake wallets={}\n",
        kpis.wallets_staking,
        total_staked,
        kpis.median_stake,
        kpis.max_stake,
        kpis.zero_stake_wallets
    ));
    let mut reported = Vec::new();
    if let Some(n) = summary.total_stakers {
        reported.push(format!("stakers={n:.0}"));
    }
    if let Some(tvl) = summary.tvl_usd {
        reported.push(format!("tvl_usd={tvl:.2}"));
    }
    if let Some(pct) = summary.percentage_of_current_supply {
        reported.push(format!("supply staked={pct:.2}%"));
    }
    if !reported.is_empty() {
        out.push_str(&format!("  {}\n", reported.join("  ")));
    }
    for b in &buckets {
        out.push_str(&format!(
            "  {:<7} wallets={:>6}  total_kong={:>14.0}\n",
            tier_label(b.tier),
            b.wallet_count,
            b.total_staked
        ));
    }
    out
}

pub fn render_wallets(title: &str, records: &[WalletStakeRecord]) -> String {
    let mut out = format!("{title}:\n");
    for r in records {
        out.push_str(&format!(
            "  {:>14.2}  tier={}  {}\n",
            r.staked_amount, r.tier, r.user
        ));
    }
    out
}

pub fn render_segments(cutoffs: SegmentCutoffs, segments: &Segments) -> String {
    let line = |name: &str, rule: String, rows: &[WalletStakeRecord]| {
        let total: f64 = rows.iter().map(|r| r.staked_amount).sum();
        format!(
            "  {name:<7} {rule:<24} wallets={:>6}  total_kong={total:>14.0}\n",
            rows.len()
        )
    };
    let mut out = format!("Segments ({} active wallets):\n", segments.total());
    out.push_str(&line("rice", format!("< {}", cutoffs.rice), &segments.rice));
    out.push_str(&line(
        "retail",
        format!("{} ..= {}", cutoffs.rice, cutoffs.whale),
        &segments.retail,
    ));
    out.push_str(&line("whale", format!("> {}", cutoffs.whale), &segments.whale));
    out
}

fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    v.map_or_else(|| "-".to_string(), |x| format!("{x:.precision$}"))
}

pub fn render_history(view: &HistoryView) -> String {
    if view.is_empty() {
        return "No snapshots recorded yet.\n".to_string();
    }
    let mut out = format!(
        "History (window={}, rows={}):\n",
        view.window.as_str(),
        view.rows.len()
    );
    for d in &view.latest {
        out.push_str(&format!(
            "  {:<18} latest={:>14.2}  delta={:>+12.2}\n",
            d.column.as_str(),
            d.latest,
            d.delta
        ));
    }

    let series: Vec<&DerivedSeries> = SeriesColumn::ALL
        .iter()
        .filter_map(|&c| view.series(c))
        .collect();
    out.push_str(&format!("  {:<10}", "date"));
    for s in &series {
        out.push_str(&format!(
            "  {:>14} {:>12} {:>14}",
            s.column.as_str(),
            s.dod_label(),
            s.ma_label()
        ));
    }
    out.push('\n');
    for (i, row) in view.rows.iter().enumerate() {
        out.push_str(&format!("  {:<10}", row.snapshot_date.to_string()));
        for s in &series {
            out.push_str(&format!(
                "  {:>14} {:>12} {:>14}",
                fmt_opt(s.values[i], 0),
                fmt_opt(s.dod[i], 0),
                fmt_opt(s.ma7[i], 0)
            ));
        }
        out.push('\n');
    }
    out
}
