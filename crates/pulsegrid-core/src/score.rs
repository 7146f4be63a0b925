//! Health score computation.
//!
//! The score is a deterministic function of `(status,
//! consecutive_errors, freshness)`; the penalty and staleness
//! constants are business thresholds carried from the original
//! service, held in [`ScoreThresholds`] so deployments can tune them.

use serde::{Deserialize, Serialize};

use crate::types::SourceStatus;

/// Penalty and staleness constants for the health score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreThresholds {
    /// Penalty while status is `error`.
    pub error_penalty: u32,
    /// Penalty while status is `disconnected`.
    pub disconnected_penalty: u32,
    /// Penalty while status is `rate_limited`.
    pub rate_limited_penalty: u32,
    /// Penalty while status is `no_data`.
    pub no_data_penalty: u32,
    /// Penalty per consecutive error.
    pub per_error_penalty: u32,
    /// Data older than this (seconds) is stale.
    pub stale_after_secs: u64,
    /// Penalty once data is stale.
    pub stale_penalty: u32,
    /// Data older than this (seconds) is very stale.
    pub very_stale_after_secs: u64,
    /// Additional penalty once data is very stale (cumulative with
    /// the stale penalty).
    pub very_stale_penalty: u32,
}

impl Default for ScoreThresholds {
    fn default() -> Self {
        Self {
            error_penalty: 50,
            disconnected_penalty: 30,
            rate_limited_penalty: 20,
            no_data_penalty: 40,
            per_error_penalty: 10,
            stale_after_secs: 3600,
            stale_penalty: 20,
            very_stale_after_secs: 7200,
            very_stale_penalty: 30,
        }
    }
}

/// Compute the 0–100 health score for a source.
///
/// `freshness` is seconds since the last successful sync, or `None`
/// for a source that has never synced — which takes no staleness
/// penalty, so a freshly configured source scores 100.
pub fn health_score(
    status: SourceStatus,
    consecutive_errors: u32,
    freshness: Option<u64>,
    t: &ScoreThresholds,
) -> u8 {
    let mut score: i64 = 100;

    // At most one status penalty applies.
    score -= match status {
        SourceStatus::Error => t.error_penalty,
        SourceStatus::Disconnected => t.disconnected_penalty,
        SourceStatus::RateLimited => t.rate_limited_penalty,
        SourceStatus::NoData => t.no_data_penalty,
        _ => 0,
    } as i64;

    score -= consecutive_errors as i64 * t.per_error_penalty as i64;

    if let Some(age) = freshness {
        if age > t.stale_after_secs {
            score -= t.stale_penalty as i64;
        }
        if age > t.very_stale_after_secs {
            score -= t.very_stale_penalty as i64;
        }
    }

    score.clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_STATUSES: [SourceStatus; 8] = [
        SourceStatus::Connected,
        SourceStatus::Syncing,
        SourceStatus::Error,
        SourceStatus::Disconnected,
        SourceStatus::RateLimited,
        SourceStatus::NotConfigured,
        SourceStatus::NoData,
        SourceStatus::Unknown,
    ];

    #[test]
    fn healthy_source_scores_100() {
        let t = ScoreThresholds::default();
        assert_eq!(health_score(SourceStatus::Connected, 0, Some(10), &t), 100);
    }

    #[test]
    fn status_penalties_apply_exactly_once() {
        let t = ScoreThresholds::default();
        assert_eq!(health_score(SourceStatus::Error, 0, Some(0), &t), 50);
        assert_eq!(health_score(SourceStatus::Disconnected, 0, Some(0), &t), 70);
        assert_eq!(health_score(SourceStatus::RateLimited, 0, Some(0), &t), 80);
        assert_eq!(health_score(SourceStatus::NoData, 0, Some(0), &t), 60);
        // not_configured, syncing, unknown carry no status penalty.
        assert_eq!(health_score(SourceStatus::NotConfigured, 0, None, &t), 100);
        assert_eq!(health_score(SourceStatus::Syncing, 0, None, &t), 100);
        assert_eq!(health_score(SourceStatus::Unknown, 0, None, &t), 100);
    }

    #[test]
    fn consecutive_errors_cost_ten_each() {
        let t = ScoreThresholds::default();
        assert_eq!(health_score(SourceStatus::Connected, 2, Some(0), &t), 80);
        assert_eq!(health_score(SourceStatus::Error, 3, Some(0), &t), 20);
    }

    #[test]
    fn staleness_penalties_are_cumulative() {
        let t = ScoreThresholds::default();
        // Just at the boundary: no penalty.
        assert_eq!(health_score(SourceStatus::Connected, 0, Some(3600), &t), 100);
        // Past one hour: -20.
        assert_eq!(health_score(SourceStatus::Connected, 0, Some(3601), &t), 80);
        // At two hours: still only the first penalty.
        assert_eq!(health_score(SourceStatus::Connected, 0, Some(7200), &t), 80);
        // Past two hours: cumulative -50.
        assert_eq!(health_score(SourceStatus::Connected, 0, Some(7300), &t), 50);
    }

    #[test]
    fn never_synced_takes_no_staleness_penalty() {
        let t = ScoreThresholds::default();
        assert_eq!(health_score(SourceStatus::Connected, 0, None, &t), 100);
    }

    #[test]
    fn score_is_always_clamped_to_0_100() {
        let t = ScoreThresholds::default();
        for status in ALL_STATUSES {
            for errors in [0u32, 1, 3, 10, 100, u32::MAX] {
                for freshness in [None, Some(0), Some(3601), Some(7201), Some(u64::MAX)] {
                    let score = health_score(status, errors, freshness, &t);
                    assert!(score <= 100, "{status} {errors} {freshness:?} -> {score}");
                }
            }
        }
    }

    #[test]
    fn worst_case_bottoms_out_at_zero() {
        let t = ScoreThresholds::default();
        assert_eq!(health_score(SourceStatus::Error, 100, Some(10_000), &t), 0);
    }
}
