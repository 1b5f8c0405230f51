//! Constructive search with chronological backtracking.
//!
//! # Algorithm
//!
//! 1. Order variables by ascending static domain size, longer sessions
//!    first on ties, then by a seeded random key.
//! 2. For each variable, enumerate (start, faculty, room) options the
//!    ledger admits and draw one with weight `exp(-g * (Δ - Δmin))`, where
//!    Δ is the soft-penalty increase. The draw is a weighted shuffle
//!    (Efraimidis-Spirakis keys), so the remaining options are kept in draw
//!    order as alternatives.
//! 3. On a dead end, pop frames and retry their next alternative. Each dead
//!    end gets `backtrack_limit` frame pops; when they run out, the state at
//!    the dead end is restored and the variable is marked unplaced.
//!
//! The frame stack is explicit, so depth is bounded only by memory.
//!
//! # Reference
//! Efraimidis & Spirakis (2006), "Weighted random sampling with a reservoir"

use std::cmp::Reverse;
use std::collections::HashSet;
use std::time::Instant;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, trace, warn};

use super::CancellationToken;
use crate::config::SearchConfig;
use crate::constraints::{Occupancy, Placement, ProblemIndex, SoftWeights};
use crate::models::{GenerationStatus, UnplacedReason};

/// One session to place.
#[derive(Debug, Clone)]
pub(crate) struct Variable {
    pub subject: usize,
    pub batch: usize,
    pub session_index: u32,
    pub duration: usize,
    pub faculty: Vec<usize>,
    pub rooms: Vec<usize>,
    /// (day, period) starts.
    pub starts: Vec<(usize, usize)>,
    /// Set when the static domain is empty.
    pub blocked: Option<UnplacedReason>,
}

impl Variable {
    pub fn domain_size(&self) -> usize {
        if self.blocked.is_some() {
            return 0;
        }
        self.faculty.len() * self.rooms.len() * self.starts.len()
    }
}

/// Result of one search.
#[derive(Debug)]
pub(crate) struct SearchOutcome {
    /// (variable, placement) pairs.
    pub placements: Vec<(usize, Placement)>,
    /// (variable, reason) pairs.
    pub unplaced: Vec<(usize, UnplacedReason)>,
    pub status: GenerationStatus,
    pub nodes: u64,
    pub backtracks: u64,
}

#[derive(Debug, Clone)]
struct Frame {
    pos: usize,
    placement: Placement,
    /// Untried options, best-drawn last.
    alternatives: Vec<Placement>,
}

#[derive(Debug, Clone)]
struct State {
    ledger: Occupancy,
    frames: Vec<Frame>,
    /// (position, reason) pairs.
    unplaced: Vec<(usize, UnplacedReason)>,
}

/// The first dead end not yet resolved.
struct Failure {
    pos: usize,
    snapshot: State,
    pops: u32,
}

pub(crate) struct Search<'s, 'a> {
    index: &'s ProblemIndex<'a>,
    variables: &'s [Variable],
    config: &'s SearchConfig,
    weights: SoftWeights,
    consecutive_limit: u32,
    cancel: &'s CancellationToken,
    rng: ChaCha8Rng,
    nodes: u64,
    backtracks: u64,
}

impl<'s, 'a> Search<'s, 'a> {
    pub fn new(
        index: &'s ProblemIndex<'a>,
        variables: &'s [Variable],
        config: &'s SearchConfig,
        weights: SoftWeights,
        consecutive_limit: u32,
        cancel: &'s CancellationToken,
        seed: u64,
    ) -> Self {
        Self {
            index,
            variables,
            config,
            weights,
            consecutive_limit,
            cancel,
            rng: ChaCha8Rng::seed_from_u64(seed),
            nodes: 0,
            backtracks: 0,
        }
    }

    pub fn run(mut self) -> SearchOutcome {
        let order = self.order();
        let variables = self.variables;
        let started = Instant::now();
        let time_limit = self.config.time_limit();

        let mut state = State {
            ledger: Occupancy::new(self.index),
            frames: Vec::new(),
            unplaced: Vec::new(),
        };
        let mut failure: Option<Failure> = None;
        let mut status = GenerationStatus::Complete;
        let mut pos = 0;

        while pos < order.len() {
            if self.cancel.is_cancelled() {
                status = GenerationStatus::Cancelled;
                break;
            }
            if self.nodes >= self.config.max_nodes
                || time_limit.is_some_and(|limit| started.elapsed() >= limit)
            {
                status = GenerationStatus::BudgetExceeded;
                break;
            }
            self.nodes += 1;

            let var = &variables[order[pos]];
            if let Some(reason) = var.blocked {
                state.unplaced.push((pos, reason));
                pos += 1;
                continue;
            }

            let mut options = self.options(var, &state.ledger);
            if let Some(placement) = options.pop() {
                trace!(pos, day = placement.day, period = placement.start, "placed");
                state.ledger.place(self.index, &placement);
                state.frames.push(Frame {
                    pos,
                    placement,
                    alternatives: options,
                });
                pos += 1;
                if failure.as_ref().is_some_and(|f| pos > f.pos) {
                    failure = None;
                }
                continue;
            }

            let mut f = failure.take().unwrap_or_else(|| Failure {
                pos,
                snapshot: state.clone(),
                pops: 0,
            });
            if let Some(resume) = self.backtrack(&mut state, &mut f) {
                debug!(dead_end = f.pos, resume, pops = f.pops, "backtracked");
                pos = resume;
                failure = Some(f);
                continue;
            }

            let var = &variables[order[f.pos]];
            warn!(
                subject = %self.index.problem.subjects[var.subject].id,
                batch = %self.index.problem.batches[var.batch].id,
                session = var.session_index,
                "no feasible placement; session left unplaced"
            );
            state = f.snapshot;
            state.unplaced.push((f.pos, UnplacedReason::NoFeasiblePlacement));
            pos = f.pos + 1;
        }

        if status != GenerationStatus::Complete {
            if let Some(f) = failure {
                if f.snapshot.frames.len() >= state.frames.len() {
                    state = f.snapshot;
                }
            }
            let reason = match status {
                GenerationStatus::Cancelled => UnplacedReason::Cancelled,
                _ => UnplacedReason::BudgetExceeded,
            };
            let covered: HashSet<usize> = state
                .frames
                .iter()
                .map(|f| f.pos)
                .chain(state.unplaced.iter().map(|u| u.0))
                .collect();
            for p in 0..order.len() {
                if !covered.contains(&p) {
                    state.unplaced.push((p, reason));
                }
            }
        }

        SearchOutcome {
            placements: state
                .frames
                .iter()
                .map(|f| (order[f.pos], f.placement))
                .collect(),
            unplaced: state
                .unplaced
                .iter()
                .map(|&(p, reason)| (order[p], reason))
                .collect(),
            status,
            nodes: self.nodes,
            backtracks: self.backtracks,
        }
    }

    /// Variable positions, most constrained first.
    fn order(&mut self) -> Vec<usize> {
        let mut keyed: Vec<(usize, Reverse<usize>, u64, usize)> = self
            .variables
            .iter()
            .enumerate()
            .map(|(i, v)| (v.domain_size(), Reverse(v.duration), self.rng.random::<u64>(), i))
            .collect();
        keyed.sort_unstable();
        keyed.into_iter().map(|k| k.3).collect()
    }

    /// Admissible options in draw order, the chosen one last. At most
    /// `max_alternatives + 1` are kept.
    fn options(&mut self, var: &Variable, ledger: &Occupancy) -> Vec<Placement> {
        let mut scored = Vec::new();
        for &(day, start) in &var.starts {
            let minutes = self.index.span_minutes(start, var.duration);
            for &faculty in &var.faculty {
                for &room in &var.rooms {
                    let p = Placement {
                        subject: var.subject,
                        batch: var.batch,
                        faculty,
                        room,
                        day,
                        start,
                        duration: var.duration,
                        minutes,
                    };
                    if ledger.admits(self.index, &p) {
                        let delta =
                            ledger.soft_delta(self.index, &p, &self.weights, self.consecutive_limit);
                        scored.push((p, delta));
                    }
                }
            }
        }
        if scored.is_empty() {
            return Vec::new();
        }

        let min = scored.iter().map(|s| s.1).fold(f64::INFINITY, f64::min);
        let greediness = self.config.selection_greediness;
        let mut keyed: Vec<(f64, Placement)> = scored
            .into_iter()
            .map(|(p, delta)| {
                let weight = (-greediness * (delta - min)).exp().max(f64::MIN_POSITIVE);
                let u = 1.0 - self.rng.random::<f64>();
                (u.ln() / weight, p)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        let keep = self.config.max_alternatives.saturating_add(1);
        if keyed.len() > keep {
            keyed.drain(..keyed.len() - keep);
        }
        keyed.into_iter().map(|k| k.1).collect()
    }

    /// Pops frames until one has an untried alternative, and binds it.
    /// Returns the position to resume from, or `None` when the stack or the
    /// dead end's budget runs out.
    fn backtrack(&mut self, state: &mut State, failure: &mut Failure) -> Option<usize> {
        while failure.pops < self.config.backtrack_limit {
            let mut frame = state.frames.pop()?;
            failure.pops += 1;
            self.nodes += 1;
            self.backtracks += 1;
            state.ledger.remove(self.index, &frame.placement);
            state.unplaced.retain(|u| u.0 < frame.pos);

            // Frames below are untouched since the alternatives were drawn,
            // so they are still admissible.
            if let Some(next) = frame.alternatives.pop() {
                state.ledger.place(self.index, &next);
                frame.placement = next;
                let resume = frame.pos + 1;
                state.frames.push(frame);
                return Some(resume);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Batch, Classroom, Day, Faculty, Period, SlotGrid, Subject, TimetableProblem};

    fn variables(index: &ProblemIndex<'_>) -> Vec<Variable> {
        let mut vars = Vec::new();
        for (b, batch) in index.problem.batches.iter().enumerate() {
            for sid in &batch.subjects {
                let s = index.subject(sid).unwrap();
                let subject = &index.problem.subjects[s];
                for k in 0..subject.sessions_per_week {
                    vars.push(Variable {
                        subject: s,
                        batch: b,
                        session_index: k,
                        duration: subject.session_duration as usize,
                        faculty: index.eligible_faculty(s),
                        rooms: index.eligible_rooms(s, b),
                        starts: index.valid_starts(subject.session_duration as usize),
                        blocked: None,
                    });
                }
            }
        }
        vars
    }

    fn search<'s, 'a>(
        index: &'s ProblemIndex<'a>,
        vars: &'s [Variable],
        config: &'s SearchConfig,
        cancel: &'s CancellationToken,
        seed: u64,
    ) -> SearchOutcome {
        Search::new(index, vars, config, SoftWeights::default(), 3, cancel, seed).run()
    }

    #[test]
    fn test_places_everything_when_feasible() {
        let p = TimetableProblem::new()
            .with_classroom(Classroom::lecture_hall("R1", 40))
            .with_faculty(Faculty::new("F1", 6, 20).with_subject("S"))
            .with_subject(Subject::theory("S", 4))
            .with_batch(Batch::new("B", 30).with_subject("S"));
        let index = ProblemIndex::new(&p);
        let vars = variables(&index);
        let config = SearchConfig::default();
        let cancel = CancellationToken::new();
        let out = search(&index, &vars, &config, &cancel, 42);
        assert_eq!(out.status, GenerationStatus::Complete);
        assert_eq!(out.placements.len(), 4);
        assert!(out.unplaced.is_empty());
    }

    #[test]
    fn test_backtracks_out_of_a_trap() {
        // S has the smaller domain and goes first. When it lands on the
        // middle period, L has no two-period start left and S must move.
        let p = TimetableProblem::new()
            .with_grid(SlotGrid::new(
                vec![Day::Monday],
                vec![Period::hours(9, 10), Period::hours(10, 11), Period::hours(11, 12)],
            ))
            .with_classroom(Classroom::lecture_hall("R1", 40))
            .with_faculty(Faculty::new("F1", 6, 20).with_subject("S").with_subject("L"))
            .with_faculty(Faculty::new("F2", 6, 20).with_subject("L"))
            .with_subject(Subject::theory("S", 1))
            .with_subject(Subject::theory("L", 1).with_duration(2))
            .with_batch(Batch::new("B", 30).with_subject("S").with_subject("L"));
        let index = ProblemIndex::new(&p);
        let vars = variables(&index);
        assert!(vars[0].domain_size() < vars[1].domain_size());
        let config = SearchConfig::default();
        let cancel = CancellationToken::new();
        for seed in 0..20 {
            let out = search(&index, &vars, &config, &cancel, seed);
            assert_eq!(out.placements.len(), 2, "seed {seed}");
            assert!(out.unplaced.is_empty());
        }
    }

    #[test]
    fn test_exhausted_session_is_unplaced() {
        let p = TimetableProblem::new()
            .with_classroom(Classroom::lecture_hall("R1", 40))
            .with_faculty(Faculty::new("F1", 6, 2).with_subject("S"))
            .with_subject(Subject::theory("S", 3))
            .with_batch(Batch::new("B", 30).with_subject("S"));
        let index = ProblemIndex::new(&p);
        let vars = variables(&index);
        let config = SearchConfig {
            backtrack_limit: 5,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let out = search(&index, &vars, &config, &cancel, 7);
        assert_eq!(out.status, GenerationStatus::Complete);
        assert_eq!(out.placements.len(), 2);
        assert_eq!(out.unplaced.len(), 1);
        assert_eq!(out.unplaced[0].1, UnplacedReason::NoFeasiblePlacement);
        assert!(out.backtracks > 0);
    }

    #[test]
    fn test_node_budget() {
        let p = TimetableProblem::new()
            .with_classroom(Classroom::lecture_hall("R1", 40))
            .with_faculty(Faculty::new("F1", 6, 20).with_subject("S"))
            .with_subject(Subject::theory("S", 5))
            .with_batch(Batch::new("B", 30).with_subject("S"));
        let index = ProblemIndex::new(&p);
        let vars = variables(&index);
        let config = SearchConfig {
            max_nodes: 2,
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let out = search(&index, &vars, &config, &cancel, 1);
        assert_eq!(out.status, GenerationStatus::BudgetExceeded);
        assert_eq!(out.placements.len(), 2);
        assert_eq!(out.unplaced.len(), 3);
        assert!(out
            .unplaced
            .iter()
            .all(|u| u.1 == UnplacedReason::BudgetExceeded));
    }

    #[test]
    fn test_cancelled_before_start() {
        let p = TimetableProblem::new()
            .with_classroom(Classroom::lecture_hall("R1", 40))
            .with_faculty(Faculty::new("F1", 6, 20).with_subject("S"))
            .with_subject(Subject::theory("S", 2))
            .with_batch(Batch::new("B", 30).with_subject("S"));
        let index = ProblemIndex::new(&p);
        let vars = variables(&index);
        let config = SearchConfig::default();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = search(&index, &vars, &config, &cancel, 1);
        assert_eq!(out.status, GenerationStatus::Cancelled);
        assert!(out.placements.is_empty());
        assert_eq!(out.unplaced.len(), 2);
        assert_eq!(out.nodes, 0);
    }
}
