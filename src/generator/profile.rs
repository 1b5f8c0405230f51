//! Heuristic profiles.
//!
//! A profile reweights the soft components the generator optimizes while
//! placing sessions. Candidates are still scored with the configured base
//! weights, so scores from different profiles compare directly.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constraints::SoftWeights;

/// Placement bias of one generation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HeuristicProfile {
    /// Even room usage and compact days.
    Optimized,
    /// Subjects spread across the week.
    #[default]
    Balanced,
    /// Short teaching runs and preferred slots.
    FacultyFriendly,
}

impl HeuristicProfile {
    /// Rotation used by the ranker: run `i` uses `ALL[i % 3]`.
    pub const ALL: [HeuristicProfile; 3] = [
        HeuristicProfile::Optimized,
        HeuristicProfile::Balanced,
        HeuristicProfile::FacultyFriendly,
    ];

    /// Profile of run `run`.
    pub fn for_run(run: usize) -> Self {
        Self::ALL[run % Self::ALL.len()]
    }

    pub fn name(&self) -> &'static str {
        match self {
            HeuristicProfile::Optimized => "Optimized Schedule",
            HeuristicProfile::Balanced => "Balanced Schedule",
            HeuristicProfile::FacultyFriendly => "Faculty-Friendly Schedule",
        }
    }

    /// Search weights for this profile.
    pub fn adjust(&self, base: &SoftWeights) -> SoftWeights {
        let mut w = base.clone();
        match self {
            HeuristicProfile::Optimized => {
                w.room_balance *= 3.0;
                w.gap *= 1.5;
            }
            HeuristicProfile::Balanced => {
                w.clustering *= 3.0;
                w.gap *= 1.5;
            }
            HeuristicProfile::FacultyFriendly => {
                w.consecutive *= 3.0;
                w.preference *= 3.0;
            }
        }
        w
    }
}

impl fmt::Display for HeuristicProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation() {
        assert_eq!(HeuristicProfile::for_run(0), HeuristicProfile::Optimized);
        assert_eq!(HeuristicProfile::for_run(4), HeuristicProfile::Balanced);
        assert_eq!(HeuristicProfile::for_run(5), HeuristicProfile::FacultyFriendly);
    }

    #[test]
    fn test_adjust() {
        let base = SoftWeights::default();
        let w = HeuristicProfile::FacultyFriendly.adjust(&base);
        assert_eq!(w.consecutive, base.consecutive * 3.0);
        assert_eq!(w.preference, base.preference * 3.0);
        assert_eq!(w.gap, base.gap);

        let w = HeuristicProfile::Optimized.adjust(&base);
        assert_eq!(w.room_balance, base.room_balance * 3.0);
        assert_eq!(HeuristicProfile::Optimized.to_string(), "Optimized Schedule");
    }
}
