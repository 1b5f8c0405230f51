//! Soft-constraint weights and penalty breakdown.
//!
//! | Component | Unit | Meaning |
//! |-----------|------|---------|
//! | `gaps` | periods | Free teaching periods between a batch's first and last session of a day |
//! | `consecutive_excess` | hours | Faculty teaching beyond the consecutive-hour limit |
//! | `room_imbalance` | cells | Population std-dev of per-room occupied cells |
//! | `clustering` | sessions | Extra sessions of one subject for one batch on the same day |
//! | `preference_misses` | cells | Faculty cells outside their stated preferences |

use serde::{Deserialize, Serialize};

/// Weight of each soft component in the weighted penalty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoftWeights {
    pub gap: f64,
    pub consecutive: f64,
    pub room_balance: f64,
    pub clustering: f64,
    pub preference: f64,
}

impl Default for SoftWeights {
    fn default() -> Self {
        Self {
            gap: 1.0,
            consecutive: 2.0,
            room_balance: 0.5,
            clustering: 1.5,
            preference: 1.0,
        }
    }
}

impl SoftWeights {
    /// Whether all weights are finite and non-negative.
    pub fn is_valid(&self) -> bool {
        [
            self.gap,
            self.consecutive,
            self.room_balance,
            self.clustering,
            self.preference,
        ]
        .iter()
        .all(|w| w.is_finite() && *w >= 0.0)
    }
}

/// Soft penalty of one timetable, by component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SoftPenalty {
    pub gaps: u32,
    pub consecutive_excess: u32,
    pub room_imbalance: f64,
    pub clustering: u32,
    pub preference_misses: u32,
}

impl SoftPenalty {
    /// Weighted sum of all components.
    pub fn weighted(&self, weights: &SoftWeights) -> f64 {
        f64::from(self.gaps) * weights.gap
            + f64::from(self.consecutive_excess) * weights.consecutive
            + self.room_imbalance * weights.room_balance
            + f64::from(self.clustering) * weights.clustering
            + f64::from(self.preference_misses) * weights.preference
    }
}

/// Hours a run of `minutes` exceeds `limit_hours` by, rounded up.
pub(crate) fn excess_hours(minutes: u32, limit_hours: u32) -> u32 {
    minutes.saturating_sub(limit_hours.saturating_mul(60)).div_ceil(60)
}

/// Population standard deviation from running sums.
pub(crate) fn std_dev(sum: f64, sum_sq: f64, n: usize) -> f64 {
    if n == 0 {
        return 0.0;
    }
    let n = n as f64;
    let mean = sum / n;
    (sum_sq / n - mean * mean).max(0.0).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weighted_sum() {
        let p = SoftPenalty {
            gaps: 2,
            consecutive_excess: 1,
            room_imbalance: 2.0,
            clustering: 1,
            preference_misses: 3,
        };
        let w = SoftWeights::default();
        // 2*1.0 + 1*2.0 + 2.0*0.5 + 1*1.5 + 3*1.0
        assert!((p.weighted(&w) - 9.5).abs() < 1e-9);
        assert_eq!(SoftPenalty::default().weighted(&w), 0.0);
    }

    #[test]
    fn test_weights_validity() {
        assert!(SoftWeights::default().is_valid());
        let bad = SoftWeights {
            clustering: -1.0,
            ..Default::default()
        };
        assert!(!bad.is_valid());
        let nan = SoftWeights {
            gap: f64::NAN,
            ..Default::default()
        };
        assert!(!nan.is_valid());
    }

    #[test]
    fn test_excess_hours() {
        assert_eq!(excess_hours(180, 3), 0);
        assert_eq!(excess_hours(240, 3), 1);
        assert_eq!(excess_hours(210, 3), 1);
        assert_eq!(excess_hours(300, 0), 5);
    }

    #[test]
    fn test_std_dev() {
        // Loads 2, 4, 4, 4, 5, 5, 7, 9
        let loads = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sum: f64 = loads.iter().sum();
        let sum_sq: f64 = loads.iter().map(|x| x * x).sum();
        assert!((std_dev(sum, sum_sq, loads.len()) - 2.0).abs() < 1e-9);
        assert_eq!(std_dev(0.0, 0.0, 0), 0.0);
    }
}
