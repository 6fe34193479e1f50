//! Windowed views over the daily snapshot table with day-over-day deltas and
//! 7-row moving averages.

use chrono::Duration;
use common::types::DailySnapshotRow;
use std::str::FromStr;

/// Trailing window for the moving average, in rows.
pub const MOVING_AVERAGE_ROWS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryWindow {
    Last30,
    Last90,
    All,
}

impl HistoryWindow {
    pub fn days(self) -> Option<i64> {
        match self {
            Self::Last30 => Some(30),
            Self::Last90 => Some(90),
            Self::All => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Last30 => "30",
            Self::Last90 => "90",
            Self::All => "all",
        }
    }
}

impl FromStr for HistoryWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "30" | "30d" | "last30" => Ok(Self::Last30),
            "90" | "90d" | "last90" => Ok(Self::Last90),
            "all" => Ok(Self::All),
            other => Err(format!("unknown history window: {other} (expected 30, 90 or all)")),
        }
    }
}

/// Numeric columns that get deltas and moving averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesColumn {
    TotalStaked,
    TvlUsd,
    ActiveWallets,
    PercentageSupply,
    MedianStake,
    MaxStake,
}

impl SeriesColumn {
    pub const ALL: [Self; 6] = [
        Self::TotalStaked,
        Self::TvlUsd,
        Self::ActiveWallets,
        Self::PercentageSupply,
        Self::MedianStake,
        Self::MaxStake,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TotalStaked => "total_staked",
            Self::TvlUsd => "tvl_usd",
            Self::ActiveWallets => "active_wallets",
            Self::PercentageSupply => "percentage_supply",
            Self::MedianStake => "median_stake",
            Self::MaxStake => "max_stake",
        }
    }

    /// Column value for a row; empty cells and non-finite values are `None`.
    #[allow(clippy::cast_precision_loss)]
    pub fn value(self, row: &DailySnapshotRow) -> Option<f64> {
        let v = match self {
            Self::TotalStaked => row.total_staked,
            Self::TvlUsd => row.tvl_usd,
            Self::ActiveWallets => Some(row.active_wallets as f64),
            Self::PercentageSupply => row.percentage_supply,
            Self::MedianStake => row.median_stake,
            Self::MaxStake => row.max_stake,
        };
        v.filter(|x| x.is_finite())
    }
}

/// One column over the selected rows. `dod[i]` and `ma7[i]` line up with
/// `values[i]`; `None` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct DerivedSeries {
    pub column: SeriesColumn,
    pub values: Vec<Option<f64>>,
    pub dod: Vec<Option<f64>>,
    pub ma7: Vec<Option<f64>>,
}

impl DerivedSeries {
    fn build(column: SeriesColumn, rows: &[DailySnapshotRow]) -> Self {
        let values: Vec<Option<f64>> = rows.iter().map(|r| column.value(r)).collect();
        Self {
            column,
            dod: day_over_day(&values),
            ma7: trailing_mean(&values, MOVING_AVERAGE_ROWS),
            values,
        }
    }

    pub fn dod_label(&self) -> String {
        format!("{}_dod", self.column.as_str())
    }

    pub fn ma_label(&self) -> String {
        format!("{}_7dma", self.column.as_str())
    }
}

/// Latest value of a column and its change from the previous valid row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatestDelta {
    pub column: SeriesColumn,
    pub latest: f64,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryView {
    pub window: HistoryWindow,
    pub rows: Vec<DailySnapshotRow>,
    pub series: Vec<DerivedSeries>,
    pub latest: Vec<LatestDelta>,
}

impl HistoryView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn series(&self, column: SeriesColumn) -> Option<&DerivedSeries> {
        self.series.iter().find(|s| s.column == column)
    }
}

/// Rows within the window, inclusive of the boundary date, in input order.
pub fn select_window(history: &[DailySnapshotRow], window: HistoryWindow) -> Vec<DailySnapshotRow> {
    let Some(days) = window.days() else {
        return history.to_vec();
    };
    let Some(latest) = history.iter().map(|r| r.snapshot_date).max() else {
        return Vec::new();
    };
    let cutoff = latest - Duration::days(days);
    history
        .iter()
        .filter(|r| r.snapshot_date >= cutoff)
        .cloned()
        .collect()
}

/// `values[i] - values[i - 1]`; the first entry, and any entry next to a
/// missing value, has no delta.
pub fn day_over_day(values: &[Option<f64>]) -> Vec<Option<f64>> {
    std::iter::once(None)
        .chain(values.windows(2).map(|w| match (w[0], w[1]) {
            (Some(prev), Some(cur)) => Some(cur - prev),
            _ => None,
        }))
        .take(values.len())
        .collect()
}

/// Mean of the trailing `window` values; missing until a full window exists
/// and whenever the window holds a missing value.
#[allow(clippy::cast_precision_loss)]
pub fn trailing_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|i| {
            (window > 0 && i + 1 >= window)
                .then(|| values[i + 1 - window..=i].iter().copied().sum::<Option<f64>>())
                .flatten()
                .map(|total| total / window as f64)
        })
        .collect()
}

/// A row counts for latest-vs-previous reporting when its core columns are
/// present and finite.
fn is_valid_row(row: &DailySnapshotRow) -> bool {
    [row.total_staked, row.tvl_usd, row.percentage_supply]
        .iter()
        .all(|v| v.is_some_and(f64::is_finite))
}

fn latest_deltas(rows: &[DailySnapshotRow]) -> Vec<LatestDelta> {
    let valid: Vec<&DailySnapshotRow> = rows.iter().filter(|r| is_valid_row(r)).collect();
    SeriesColumn::ALL
        .iter()
        .map(|&column| match valid.as_slice() {
            [.., prev, last] => LatestDelta {
                column,
                latest: column.value(last).unwrap_or(0.0),
                delta: column
                    .value(last)
                    .zip(column.value(prev))
                    .map_or(0.0, |(cur, before)| cur - before),
            },
            [last] => LatestDelta {
                column,
                latest: column.value(last).unwrap_or(0.0),
                delta: 0.0,
            },
            [] => LatestDelta {
                column,
                latest: 0.0,
                delta: 0.0,
            },
        })
        .collect()
}

/// Build the windowed view. Rows are sorted by date before deriving series so
/// deltas always run forward in time.
pub fn build_view(history: &[DailySnapshotRow], window: HistoryWindow) -> HistoryView {
    let mut rows = select_window(history, window);
    rows.sort_by_key(|r| r.snapshot_date);
    let series = SeriesColumn::ALL
        .iter()
        .map(|&c| DerivedSeries::build(c, &rows))
        .collect();
    let latest = latest_deltas(&rows);
    tracing::debug!(window = window.as_str(), rows = rows.len(), "history view built");
    HistoryView {
        window,
        rows,
        series,
        latest,
    }
}
