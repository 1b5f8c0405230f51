//! Timetable scheduling engine for academic departments.
//!
//! Assigns weekly teaching sessions to (faculty, classroom, time slot)
//! triples under hard constraints (no double booking, capacity, workload
//! caps, availability) and scores the result against soft preferences.
//! Several candidates are generated with different seeds and heuristic
//! profiles, ranked, and returned with explained conflicts.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Classroom`, `Faculty`, `Subject`, `Batch`,
//!   `SlotGrid`, `TimetableProblem`, `Candidate`, `Conflict`
//! - **`validation`**: Input integrity checks (duplicate IDs, references, grid shape)
//! - **`constraints`**: Hard constraint checking and soft penalty scoring
//! - **`generator`**: Seeded backtracking search producing one candidate
//! - **`ranker`**: Multi-run generation, deduplication, ranking and KPIs
//! - **`reporter`**: Conflict explanations with suggested remedies
//! - **`config`**: TOML-loadable engine settings
//!
//! # Architecture
//!
//! Data flows one way: `validation` → `generator` (one run per seed, each
//! consulting `constraints` at every placement) → `ranker` → `reporter`.
//! The engine performs no I/O and installs no `tracing` subscriber. Callers
//! own the reference data and persistence, and they decide how results are
//! rendered. Runs share no mutable state, so `ranker` executes them on the
//! rayon pool.
//!
//! # Quick Start
//!
//! ```
//! use u_timetable::models::{Batch, Classroom, Faculty, Subject, TimetableProblem};
//! use u_timetable::ranker;
//!
//! let problem = TimetableProblem::new()
//!     .with_classroom(Classroom::lecture_hall("R101", 60))
//!     .with_faculty(Faculty::new("F1", 4, 16).with_subject("DS"))
//!     .with_subject(Subject::theory("DS", 3))
//!     .with_batch(Batch::new("CSE-A", 45).with_subject("DS"));
//!
//! let ranked = ranker::rank(&problem, 3).unwrap();
//! let best = ranked.best().unwrap();
//! assert_eq!(best.label, "Option A");
//! assert_eq!(best.assignments.len(), 3);
//! assert!(best.is_conflict_free());
//! ```
//!
//! # References
//!
//! - Schaerf (1999), "A Survey of Automated Timetabling"
//! - Burke & Petrovic (2002), "Recent research directions in automated timetabling"
//! - Efraimidis & Spirakis (2006), "Weighted random sampling with a reservoir"

pub mod config;
pub mod constraints;
pub mod error;
pub mod generator;
pub mod models;
pub mod ranker;
pub mod reporter;
pub mod validation;

#[cfg(test)]
mod test_utils;

pub use error::{Result, TimetableError};
