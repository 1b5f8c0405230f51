//! Candidate timetable generation.
//!
//! Builds one timetable per call by constructive search with backtracking.
//! Every required (subject, batch, session) is a variable; its static
//! domain is eligible faculty × eligible rooms × valid start slots.
//!
//! Infeasible input is not an error: sessions that cannot be placed come
//! back as `UnplaceableSession` conflicts with a reason. Only malformed
//! input or configuration fails.
//!
//! # Determinism
//! A run is fully determined by the problem, the configuration, the seed
//! and the profile, unless `search.time_limit_ms` is set.

mod cancel;
mod profile;
mod search;

pub use cancel::CancellationToken;
pub use profile::HeuristicProfile;

use std::collections::HashMap;

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::constraints::ConstraintChecker;
use crate::error::Result;
use crate::models::{Candidate, Conflict, TimetableProblem, UnplacedReason, UnplacedSession};
use crate::validation::validate_problem;
use search::{Search, Variable};

/// Generates candidate timetables for one validated problem.
///
/// # Example
///
/// ```
/// use u_timetable::generator::CandidateGenerator;
/// use u_timetable::models::*;
///
/// let problem = TimetableProblem::new()
///     .with_classroom(Classroom::lecture_hall("R1", 40))
///     .with_faculty(Faculty::new("F1", 6, 20).with_subject("DS"))
///     .with_subject(Subject::theory("DS", 3))
///     .with_batch(Batch::new("B1", 30).with_subject("DS"));
///
/// let generator = CandidateGenerator::new(&problem).unwrap();
/// let candidate = generator.generate(42);
/// assert_eq!(candidate.assignment_count(), 3);
/// assert!(candidate.is_conflict_free());
/// ```
pub struct CandidateGenerator<'a> {
    checker: ConstraintChecker<'a>,
    config: EngineConfig,
    variables: Vec<Variable>,
}

impl<'a> CandidateGenerator<'a> {
    /// Validates the problem and prepares a generator with default
    /// configuration.
    pub fn new(problem: &'a TimetableProblem) -> Result<Self> {
        Self::with_config(problem, EngineConfig::default())
    }

    /// Validates the problem and configuration.
    pub fn with_config(problem: &'a TimetableProblem, config: EngineConfig) -> Result<Self> {
        config.validate()?;
        validate_problem(problem)?;

        let checker = ConstraintChecker::from_config(problem, &config);
        let variables = build_variables(&checker);
        debug!(
            variables = variables.len(),
            blocked = variables.iter().filter(|v| v.blocked.is_some()).count(),
            "generator prepared"
        );
        Ok(Self {
            checker,
            config,
            variables,
        })
    }

    pub fn problem(&self) -> &'a TimetableProblem {
        self.checker.index().problem
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn checker(&self) -> &ConstraintChecker<'a> {
        &self.checker
    }

    /// Number of sessions to place.
    pub fn session_count(&self) -> usize {
        self.variables.len()
    }

    /// Generates one candidate with the `Optimized` profile.
    pub fn generate(&self, seed: u64) -> Candidate {
        self.generate_with(seed, HeuristicProfile::Optimized, &CancellationToken::new())
    }

    /// Generates one candidate with a profile, stopping early if `cancel`
    /// is triggered.
    pub fn generate_with(
        &self,
        seed: u64,
        profile: HeuristicProfile,
        cancel: &CancellationToken,
    ) -> Candidate {
        self.run(0, seed, profile, cancel)
    }

    pub(crate) fn run(
        &self,
        run: usize,
        seed: u64,
        profile: HeuristicProfile,
        cancel: &CancellationToken,
    ) -> Candidate {
        let index = self.checker.index();
        debug!(run, seed, %profile, sessions = self.variables.len(), "generation started");

        let outcome = Search::new(
            index,
            &self.variables,
            &self.config.search,
            profile.adjust(&self.config.soft_weights),
            self.config.scoring.max_consecutive_hours,
            cancel,
            seed,
        )
        .run();

        let mut candidate = Candidate::new(run, seed, profile);
        candidate.status = outcome.status;
        candidate.nodes_explored = outcome.nodes;
        candidate.assignments = outcome
            .placements
            .iter()
            .map(|(v, p)| index.assignment(p, self.variables[*v].session_index))
            .collect();
        candidate.sort_assignments();
        candidate.conflicts = self.checker.hard_violations(&candidate.assignments);

        let problem = index.problem;
        let mut unplaced: Vec<UnplacedSession> = outcome
            .unplaced
            .iter()
            .map(|&(v, reason)| {
                let var = &self.variables[v];
                UnplacedSession {
                    subject_id: problem.subjects[var.subject].id.clone(),
                    batch_id: problem.batches[var.batch].id.clone(),
                    session_index: var.session_index,
                    reason,
                }
            })
            .collect();
        unplaced.sort_by(|a, b| {
            (&a.batch_id, &a.subject_id, a.session_index).cmp(&(
                &b.batch_id,
                &b.subject_id,
                b.session_index,
            ))
        });
        for session in unplaced {
            let label = problem
                .subject(&session.subject_id)
                .map_or(session.subject_id.as_str(), |s| s.label());
            let description = format!(
                "{label} session {} for batch {} could not be scheduled: {}",
                session.session_index + 1,
                session.batch_id,
                session.reason
            );
            candidate.conflicts.push(Conflict::unplaceable(session, description));
        }

        self.checker.evaluate(&mut candidate);
        info!(
            run,
            seed,
            %profile,
            status = ?candidate.status,
            placed = candidate.assignments.len(),
            unplaced = candidate.unplaced().count(),
            conflicts = candidate.conflict_count(),
            nodes = outcome.nodes,
            backtracks = outcome.backtracks,
            score = candidate.score,
            "generation finished"
        );
        candidate
    }
}

/// Validates `problem` and generates one candidate with default
/// configuration.
pub fn generate(problem: &TimetableProblem, seed: u64) -> Result<Candidate> {
    Ok(CandidateGenerator::new(problem)?.generate(seed))
}

/// One variable per required session, in batch then subject order.
fn build_variables(checker: &ConstraintChecker<'_>) -> Vec<Variable> {
    let index = checker.index();
    let problem = index.problem;
    let mut starts_by_duration: HashMap<usize, Vec<(usize, usize)>> = HashMap::new();
    let mut variables = Vec::new();

    for (b, batch) in problem.batches.iter().enumerate() {
        for sid in &batch.subjects {
            let Some(s) = index.subject(sid) else {
                continue;
            };
            let subject = &problem.subjects[s];
            let duration = subject.session_duration as usize;
            let faculty = index.eligible_faculty(s);
            let rooms = index.eligible_rooms(s, b);
            let starts = starts_by_duration
                .entry(duration)
                .or_insert_with(|| index.valid_starts(duration))
                .clone();

            let blocked = if faculty.is_empty() {
                Some(UnplacedReason::NoQualifiedFaculty)
            } else if rooms.is_empty() {
                Some(UnplacedReason::NoSuitableRoom)
            } else if starts.is_empty() {
                Some(UnplacedReason::NoUsableSlot)
            } else {
                None
            };

            for k in 0..subject.sessions_per_week {
                variables.push(Variable {
                    subject: s,
                    batch: b,
                    session_index: k,
                    duration,
                    faculty: faculty.clone(),
                    rooms: rooms.clone(),
                    starts: starts.clone(),
                    blocked,
                });
            }
        }
    }
    variables
}
