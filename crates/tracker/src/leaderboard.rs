use common::types::{parse_lenient_f64, ApiLeaderboardEntry};
use serde::Serialize;
use serde_json::Value;

use crate::tier::classify_tier;

/// One leaderboard wallet after normalization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WalletStakeRecord {
    pub user: String,
    #[serde(rename = "stakedAmount")]
    pub staked_amount: f64,
    pub tier: u8,
}

impl WalletStakeRecord {
    pub fn is_active(&self) -> bool {
        self.staked_amount > 0.0
    }
}

/// Coerce a raw stake to a non-negative finite number. Anything unparsable,
/// absent or negative becomes 0.0.
pub fn coerce_stake(raw: Option<&Value>) -> f64 {
    raw.and_then(parse_lenient_f64)
        .filter(|x| *x > 0.0)
        .unwrap_or(0.0)
}

pub fn normalize_entry(entry: &ApiLeaderboardEntry) -> WalletStakeRecord {
    let staked_amount = coerce_stake(entry.staked_amount.as_ref());
    WalletStakeRecord {
        user: entry.user.clone(),
        staked_amount,
        tier: classify_tier(staked_amount),
    }
}

/// Normalize a leaderboard payload. Input order is kept and duplicate users
/// are not merged; distinct counting happens during aggregation.
pub fn normalize_leaderboard(entries: &[ApiLeaderboardEntry]) -> Vec<WalletStakeRecord> {
    let records: Vec<WalletStakeRecord> = entries.iter().map(normalize_entry).collect();
    let repaired = entries
        .iter()
        .filter(|e| {
            !matches!(
                e.staked_amount.as_ref().and_then(parse_lenient_f64),
                Some(x) if x >= 0.0
            )
        })
        .count();
    tracing::debug!(entries = entries.len(), repaired, "leaderboard normalized");
    records
}
