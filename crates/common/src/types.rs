use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Leaderboard export envelope. A body without `leaderboard` is an empty board.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiLeaderboardResponse {
    #[serde(default)]
    pub leaderboard: Vec<ApiLeaderboardEntry>,
}

/// One wallet from `/leaderboard/export`.
///
/// `stakedAmount` arrives as a string, a number, null or not at all, so it is
/// kept raw and coerced during normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiLeaderboardEntry {
    #[serde(default)]
    pub user: String,
    #[serde(rename = "stakedAmount", default)]
    pub staked_amount: Option<Value>,
}

/// Payload from `/staking-summary`. Every field is optional and non-numeric
/// values read as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct ApiStakingSummary {
    #[serde(rename = "totalStakers", default, deserialize_with = "de_lenient_f64")]
    pub total_stakers: Option<f64>,
    #[serde(rename = "totalStaked", default, deserialize_with = "de_lenient_f64")]
    pub total_staked: Option<f64>,
    #[serde(rename = "tvlUsd", default, deserialize_with = "de_lenient_f64")]
    pub tvl_usd: Option<f64>,
    #[serde(
        rename = "percentageOfCurrentSupply",
        default,
        deserialize_with = "de_lenient_f64"
    )]
    pub percentage_of_current_supply: Option<f64>,
}

/// Parse a JSON scalar as a finite number. Strings are trimmed and parsed;
/// anything else (null, bool, objects, NaN/inf text) yields `None`.
pub fn parse_lenient_f64(value: &Value) -> Option<f64> {
    let x = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    x.is_finite().then_some(x)
}

fn de_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(raw.as_ref().and_then(parse_lenient_f64))
}

/// Accepts `12` as well as `12.0`, which older history files contain.
fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let x: f64 = raw
        .trim()
        .parse()
        .map_err(|_| serde::de::Error::custom(format!("invalid count: {raw:?}")))?;
    if !x.is_finite() || x < 0.0 || x.fract() != 0.0 {
        return Err(serde::de::Error::custom(format!("invalid count: {raw:?}")));
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let count = x as u64;
    Ok(count)
}

/// One persisted day of the historical table. Field order is the file's
/// column order.
///
/// Stake columns are optional: older files carry empty cells where a value was
/// missing, and those rows must survive a load/save cycle unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySnapshotRow {
    pub snapshot_date: NaiveDate,
    pub total_staked: Option<f64>,
    pub tvl_usd: Option<f64>,
    pub percentage_supply: Option<f64>,
    #[serde(deserialize_with = "de_count")]
    pub active_wallets: u64,
    pub median_stake: Option<f64>,
    pub max_stake: Option<f64>,
    #[serde(deserialize_with = "de_count")]
    pub zero_stake_wallets: u64,
    #[serde(deserialize_with = "de_count")]
    pub tier0: u64,
    #[serde(deserialize_with = "de_count")]
    pub tier1: u64,
    #[serde(deserialize_with = "de_count")]
    pub tier2: u64,
    #[serde(deserialize_with = "de_count")]
    pub tier3: u64,
    #[serde(deserialize_with = "de_count")]
    pub tier4: u64,
}

impl DailySnapshotRow {
    pub const COLUMNS: [&'static str; 13] = [
        "snapshot_date",
        "total_staked",
        "tvl_usd",
        "percentage_supply",
        "active_wallets",
        "median_stake",
        "max_stake",
        "zero_stake_wallets",
        "tier0",
        "tier1",
        "tier2",
        "tier3",
        "tier4",
    ];

    pub fn tier_counts(&self) -> [u64; 5] {
        [self.tier0, self.tier1, self.tier2, self.tier3, self.tier4]
    }
}
