//! Multi-run generation and ranking.
//!
//! # Algorithm
//!
//! 1. Run the generator `option_count` times. Run `i` uses seed
//!    `base_seed + i` and profile `HeuristicProfile::ALL[i % 3]`. Runs share
//!    nothing mutable and execute on the rayon pool.
//! 2. Drop candidates whose assignment multiset equals an earlier run's,
//!    recording them as excluded duplicates.
//! 3. Sort by score (desc), conflict count (asc), room utilization (desc),
//!    run index (asc), and label "Option A", "Option B", ...
//! 4. Apply the optional top-N cut, recording the cut candidates.
//!
//! Seeds and profiles depend only on the run index, so the first `n` runs of
//! a larger call are the runs of a smaller one and the best score never
//! drops as `option_count` grows.

mod kpi;

pub use kpi::{FacultyLoad, TimetableKpi};

use std::collections::HashMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::generator::{CancellationToken, CandidateGenerator, HeuristicProfile};
use crate::models::{Candidate, TimetableProblem};

/// Ranked candidates of one ranking call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedTimetables {
    /// Distinct candidates, best first.
    pub candidates: Vec<Candidate>,
    /// Duplicates and candidates below the top-N cut.
    pub excluded: Vec<ExcludedCandidate>,
    /// Generation runs performed.
    pub runs: usize,
    /// Whether cancellation cut any run short.
    pub cancelled: bool,
}

impl RankedTimetables {
    /// The best candidate.
    pub fn best(&self) -> Option<&Candidate> {
        self.candidates.first()
    }

    /// Candidate by label.
    pub fn get(&self, label: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.label == label)
    }
}

/// A generated candidate left out of the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludedCandidate {
    pub run: usize,
    pub seed: u64,
    pub profile: HeuristicProfile,
    pub score: f64,
    pub reason: ExclusionReason,
}

/// Why a candidate was left out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExclusionReason {
    /// Same assignments as the candidate of run `of_run`.
    Duplicate { of_run: usize },
    /// Ranked `rank` (1-based) with only the top `top_n` kept.
    BelowTopN { rank: usize, top_n: usize },
}

/// Runs the generator repeatedly and ranks the results.
///
/// # Example
///
/// ```
/// use u_timetable::ranker::SolutionRanker;
/// use u_timetable::models::*;
///
/// let problem = TimetableProblem::new()
///     .with_classroom(Classroom::lecture_hall("R1", 40))
///     .with_classroom(Classroom::lecture_hall("R2", 40))
///     .with_faculty(Faculty::new("F1", 6, 20).with_subject("DS"))
///     .with_subject(Subject::theory("DS", 3))
///     .with_batch(Batch::new("B1", 30).with_subject("DS"));
///
/// let ranker = SolutionRanker::new(&problem).unwrap();
/// let ranked = ranker.rank(3);
/// assert_eq!(ranked.runs, 3);
/// let best = ranked.best().unwrap();
/// assert_eq!(best.label, "Option A");
/// assert!(best.is_conflict_free());
/// ```
pub struct SolutionRanker<'a> {
    generator: CandidateGenerator<'a>,
}

impl<'a> SolutionRanker<'a> {
    pub fn new(problem: &'a TimetableProblem) -> Result<Self> {
        Self::with_config(problem, EngineConfig::default())
    }

    pub fn with_config(problem: &'a TimetableProblem, config: EngineConfig) -> Result<Self> {
        Ok(Self {
            generator: CandidateGenerator::with_config(problem, config)?,
        })
    }

    pub fn generator(&self) -> &CandidateGenerator<'a> {
        &self.generator
    }

    /// Ranks `ranking.option_count` runs.
    pub fn rank_default(&self) -> RankedTimetables {
        self.rank(self.generator.config().ranking.option_count)
    }

    /// Ranks `option_count` runs.
    pub fn rank(&self, option_count: usize) -> RankedTimetables {
        self.rank_with(option_count, &CancellationToken::new())
    }

    /// Ranks `option_count` runs, stopping runs early if `cancel` is
    /// triggered. Cancelled runs are still ranked with what they placed.
    pub fn rank_with(&self, option_count: usize, cancel: &CancellationToken) -> RankedTimetables {
        let ranking = &self.generator.config().ranking;
        let run_one = |run: usize| {
            let seed = ranking.base_seed.wrapping_add(run as u64);
            self.generator
                .run(run, seed, HeuristicProfile::for_run(run), cancel)
        };
        let generated: Vec<Candidate> = if ranking.parallel {
            (0..option_count).into_par_iter().map(run_one).collect()
        } else {
            (0..option_count).map(run_one).collect()
        };

        let cancelled = cancel.is_cancelled();
        let ranked = select(generated, ranking.top_n);
        info!(
            runs = option_count,
            kept = ranked.0.len(),
            excluded = ranked.1.len(),
            best = ?ranked.0.first().map(|c| c.score),
            cancelled,
            "ranking finished"
        );
        RankedTimetables {
            candidates: ranked.0,
            excluded: ranked.1,
            runs: option_count,
            cancelled,
        }
    }
}

/// Validates `problem` and ranks `option_count` runs with default
/// configuration.
pub fn rank(problem: &TimetableProblem, option_count: usize) -> Result<RankedTimetables> {
    Ok(SolutionRanker::new(problem)?.rank(option_count))
}

/// Deduplicates, sorts, labels and cuts candidates given in run order.
fn select(
    generated: Vec<Candidate>,
    top_n: Option<usize>,
) -> (Vec<Candidate>, Vec<ExcludedCandidate>) {
    let mut excluded = Vec::new();
    let mut keep = vec![true; generated.len()];
    let mut seen: HashMap<_, usize> = HashMap::new();
    for (i, c) in generated.iter().enumerate() {
        let key = c.assignment_key();
        if let Some(&first) = seen.get(&key) {
            let of_run = generated[first].run;
            debug!(run = c.run, duplicate_of = of_run, "duplicate candidate");
            excluded.push(exclude(c, ExclusionReason::Duplicate { of_run }));
            keep[i] = false;
        } else {
            seen.insert(key, i);
        }
    }
    let mut distinct: Vec<Candidate> = generated
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .collect();

    distinct.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.conflict_count().cmp(&b.conflict_count()))
            .then(b.room_utilization.total_cmp(&a.room_utilization))
            .then(a.run.cmp(&b.run))
    });
    for (i, c) in distinct.iter_mut().enumerate() {
        c.label = option_label(i);
    }

    if let Some(n) = top_n {
        if distinct.len() > n {
            for (i, c) in distinct.iter().enumerate().skip(n) {
                excluded.push(exclude(c, ExclusionReason::BelowTopN { rank: i + 1, top_n: n }));
            }
            distinct.truncate(n);
        }
    }
    (distinct, excluded)
}

fn exclude(c: &Candidate, reason: ExclusionReason) -> ExcludedCandidate {
    ExcludedCandidate {
        run: c.run,
        seed: c.seed,
        profile: c.profile,
        score: c.score,
        reason,
    }
}

/// "Option A" ... "Option Z", "Option AA", ...
pub fn option_label(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        n = (n - 1) / 26;
    }
    letters.reverse();
    format!("Option {}", letters.into_iter().collect::<String>())
}
