use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::leaderboard::WalletStakeRecord;
use crate::tier::TIER_COUNT;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierBucket {
    pub tier: u8,
    #[serde(rename = "wallets")]
    pub wallet_count: u64,
    #[serde(rename = "total_kong")]
    pub total_staked: f64,
}

impl TierBucket {
    fn empty(tier: u8) -> Self {
        Self {
            tier,
            wallet_count: 0,
            total_staked: 0.0,
        }
    }
}

/// Group records by tier. Only tiers with at least one record are returned,
/// ascending by tier; use [`zero_fill_tiers`] to get all five.
pub fn aggregate_by_tier(records: &[WalletStakeRecord]) -> Vec<TierBucket> {
    let mut groups: BTreeMap<u8, (HashSet<&str>, f64)> = BTreeMap::new();
    for r in records {
        let (users, total) = groups.entry(r.tier).or_default();
        users.insert(r.user.as_str());
        *total += r.staked_amount;
    }
    groups
        .into_iter()
        .map(|(tier, (users, total))| TierBucket {
            tier,
            wallet_count: users.len() as u64,
            total_staked: total,
        })
        .collect()
}

/// Expand sparse buckets to exactly one bucket per tier, missing tiers zeroed.
pub fn zero_fill_tiers(buckets: &[TierBucket]) -> [TierBucket; TIER_COUNT] {
    let mut out = [0u8, 1, 2, 3, 4].map(TierBucket::empty);
    for b in buckets {
        if let Some(slot) = out.get_mut(usize::from(b.tier)) {
            *slot = b.clone();
        }
    }
    out
}

pub fn distinct_users(records: &[WalletStakeRecord]) -> u64 {
    records
        .iter()
        .map(|r| r.user.as_str())
        .collect::<HashSet<_>>()
        .len() as u64
}

/// Split of a full record set into staking and zero-stake wallets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActivePartition {
    pub active: Vec<WalletStakeRecord>,
    pub zero: Vec<WalletStakeRecord>,
}

impl ActivePartition {
    pub fn zero_distinct_users(&self) -> u64 {
        distinct_users(&self.zero)
    }

    pub fn active_distinct_users(&self) -> u64 {
        distinct_users(&self.active)
    }
}

pub fn partition_active(records: &[WalletStakeRecord]) -> ActivePartition {
    let (active, zero) = records.iter().cloned().partition(WalletStakeRecord::is_active);
    ActivePartition { active, zero }
}

/// Median stake; 0.0 for an empty set.
pub fn median_stake(records: &[WalletStakeRecord]) -> f64 {
    let mut stakes: Vec<f64> = records.iter().map(|r| r.staked_amount).collect();
    if stakes.is_empty() {
        return 0.0;
    }
    stakes.sort_by(f64::total_cmp);
    let mid = stakes.len() / 2;
    if stakes.len() % 2 == 0 {
        (stakes[mid - 1] + stakes[mid]) / 2.0
    } else {
        stakes[mid]
    }
}

/// Largest stake; 0.0 for an empty set.
pub fn max_stake(records: &[WalletStakeRecord]) -> f64 {
    records
        .iter()
        .map(|r| r.staked_amount)
        .fold(0.0, f64::max)
}

pub fn total_staked(records: &[WalletStakeRecord]) -> f64 {
    records.iter().map(|r| r.staked_amount).sum()
}

/// Headline numbers for the tiers view, all over the active set.
#[derive(Debug, Clone, PartialEq)]
pub struct LeaderboardKpis {
    pub wallets_staking: u64,
    pub total_staked: f64,
    pub median_stake: f64,
    pub max_stake: f64,
    pub zero_stake_wallets: u64,
}

pub fn compute_kpis(partition: &ActivePartition) -> LeaderboardKpis {
    LeaderboardKpis {
        wallets_staking: partition.active_distinct_users(),
        total_staked: total_staked(&partition.active),
        median_stake: median_stake(&partition.active),
        max_stake: max_stake(&partition.active),
        zero_stake_wallets: partition.zero_distinct_users(),
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SegmentError {
    #[error("rice cutoff ({rice}) must be below whale cutoff ({whale})")]
    InvalidCutoffs { rice: f64, whale: f64 },
    #[error("cutoffs must be positive finite numbers (rice={rice}, whale={whale})")]
    NonPositiveCutoff { rice: f64, whale: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentCutoffs {
    pub rice: f64,
    pub whale: f64,
}

impl SegmentCutoffs {
    pub fn validate(&self) -> Result<(), SegmentError> {
        let Self { rice, whale } = *self;
        if !(rice.is_finite() && whale.is_finite() && rice > 0.0 && whale > 0.0) {
            return Err(SegmentError::NonPositiveCutoff { rice, whale });
        }
        if rice >= whale {
            return Err(SegmentError::InvalidCutoffs { rice, whale });
        }
        Ok(())
    }
}

/// Rice / retail / whale split of an active set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Segments {
    pub rice: Vec<WalletStakeRecord>,
    pub retail: Vec<WalletStakeRecord>,
    pub whale: Vec<WalletStakeRecord>,
}

impl Segments {
    pub fn total(&self) -> usize {
        self.rice.len() + self.retail.len() + self.whale.len()
    }
}

/// rice: `< rice`, retail: `rice..=whale`, whale: `> whale`. Nothing is
/// partitioned when the cutoffs are invalid.
pub fn segment(
    active: &[WalletStakeRecord],
    cutoffs: SegmentCutoffs,
) -> Result<Segments, SegmentError> {
    cutoffs.validate()?;
    let mut out = Segments::default();
    for r in active {
        let bucket = if r.staked_amount < cutoffs.rice {
            &mut out.rice
        } else if r.staked_amount > cutoffs.whale {
            &mut out.whale
        } else {
            &mut out.retail
        };
        bucket.push(r.clone());
    }
    Ok(out)
}

/// The `n` largest stakes, descending. Equal stakes keep input order.
pub fn top_n(records: &[WalletStakeRecord], n: usize) -> Vec<WalletStakeRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.staked_amount.total_cmp(&a.staked_amount));
    sorted.truncate(n);
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tier::classify_tier;

    fn rec(user: &str, stake: f64) -> WalletStakeRecord {
        WalletStakeRecord {
            user: user.to_string(),
            staked_amount: stake,
            tier: classify_tier(stake),
        }
    }

    #[test]
    fn test_end_to_end_scenario() {
        let records = vec![rec("A", 30_000.0), rec("B", 0.0), rec("C", 300_000.0)];
        let p = partition_active(&records);
        assert_eq!(
            p.active.iter().map(|r| r.user.as_str()).collect::<Vec<_>>(),
            vec!["A", "C"]
        );
        assert_eq!(p.zero.len(), 1);
        assert_eq!(p.zero_distinct_users(), 1);

        let buckets = aggregate_by_tier(&p.active);
        assert_eq!(
            buckets,
            vec![
                TierBucket {
                    tier: 1,
                    wallet_count: 1,
                    total_staked: 30_000.0
                },
                TierBucket {
                    tier: 4,
                    wallet_count: 1,
                    total_staked: 300_000.0
                },
            ]
        );
    }

    #[test]
    fn test_tier_counts_distinct_users_but_sums_all_rows() {
        let records = vec![rec("A", 1_000.0), rec("A", 2_000.0), rec("B", 3_000.0)];
        let buckets = aggregate_by_tier(&records);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[0].wallet_count, 2);
        assert!((buckets[0].total_staked - 6_000.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_fill_covers_all_tiers() {
        let buckets = aggregate_by_tier(&[rec("A", 70_000.0)]);
        let filled = zero_fill_tiers(&buckets);
        let counts: Vec<u64> = filled.iter().map(|b| b.wallet_count).collect();
        assert_eq!(counts, vec![0, 0, 1, 0, 0]);
        assert_eq!(filled[4].tier, 4);
    }

    #[test]
    fn test_median_and_max() {
        assert_eq!(median_stake(&[]), 0.0);
        assert_eq!(max_stake(&[]), 0.0);
        let odd = vec![rec("a", 5.0), rec("b", 1.0), rec("c", 3.0)];
        assert_eq!(median_stake(&odd), 3.0);
        let even = vec![rec("a", 4.0), rec("b", 1.0), rec("c", 3.0), rec("d", 10.0)];
        assert_eq!(median_stake(&even), 3.5);
        assert_eq!(max_stake(&even), 10.0);
    }

    #[test]
    fn test_kpis_ignore_zero_stake_wallets() {
        let records = vec![rec("A", 100.0), rec("B", 0.0), rec("C", 300.0), rec("B", 0.0)];
        let kpis = compute_kpis(&partition_active(&records));
        assert_eq!(kpis.wallets_staking, 2);
        assert_eq!(kpis.total_staked, 400.0);
        assert_eq!(kpis.median_stake, 200.0);
        assert_eq!(kpis.max_stake, 300.0);
        assert_eq!(kpis.zero_stake_wallets, 1);
    }

    #[test]
    fn test_segments_are_disjoint_and_cover_active_set() {
        let active: Vec<_> = [500.0, 10_000.0, 10_001.0, 50_000.0, 50_001.0, 1e6]
            .iter()
            .enumerate()
            .map(|(i, s)| rec(&format!("w{i}"), *s))
            .collect();
        let cutoffs = SegmentCutoffs {
            rice: 10_001.0,
            whale: 50_000.0,
        };
        let seg = segment(&active, cutoffs).unwrap();
        assert_eq!(seg.total(), active.len());
        assert_eq!(seg.rice.len(), 2);
        // both cutoffs are inclusive for retail
        assert_eq!(seg.retail.len(), 2);
        assert_eq!(seg.whale.len(), 2);

        let mut users: Vec<&str> = seg
            .rice
            .iter()
            .chain(&seg.retail)
            .chain(&seg.whale)
            .map(|r| r.user.as_str())
            .collect();
        users.sort_unstable();
        users.dedup();
        assert_eq!(users.len(), active.len());
    }

    #[test]
    fn test_inverted_cutoffs_fail_validation() {
        let active = vec![rec("A", 20_000.0)];
        let err = segment(
            &active,
            SegmentCutoffs {
                rice: 50_000.0,
                whale: 10_000.0,
            },
        )
        .unwrap_err();
        assert_eq!(
            err,
            SegmentError::InvalidCutoffs {
                rice: 50_000.0,
                whale: 10_000.0
            }
        );

        let equal = SegmentCutoffs {
            rice: 10_000.0,
            whale: 10_000.0,
        };
        assert!(matches!(
            equal.validate(),
            Err(SegmentError::InvalidCutoffs { .. })
        ));
    }

    #[test]
    fn test_non_positive_cutoffs_fail_validation() {
        let c = SegmentCutoffs {
            rice: 0.0,
            whale: 10.0,
        };
        assert!(matches!(
            c.validate(),
            Err(SegmentError::NonPositiveCutoff { .. })
        ));
        let c = SegmentCutoffs {
            rice: 1.0,
            whale: f64::INFINITY,
        };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_top_n_descending_with_stable_ties() {
        let records = vec![
            rec("a", 10.0),
            rec("b", 50.0),
            rec("c", 10.0),
            rec("d", 70.0),
            rec("e", 10.0),
        ];
        let top: Vec<String> = top_n(&records, 4).into_iter().map(|r| r.user).collect();
        assert_eq!(top, vec!["d", "b", "a", "c"]);
        assert_eq!(top_n(&records, 100).len(), 5);
        assert!(top_n(&records, 0).is_empty());
    }
}
