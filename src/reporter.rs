//! Conflict reporting with suggested remedies.
//!
//! Re-evaluates a candidate (possibly edited by hand after generation) and
//! attaches up to two remedies to each conflict by single-change local
//! repair:
//!
//! 1. Another room at the same time with the same faculty member
//! 2. Another start slot in the same room with the same faculty member
//! 3. Another eligible faculty member, same room and time
//!
//! A remedy is offered only if the changed assignment would clash with
//! nothing else. Unplaced sessions get a search over every eligible
//! (faculty, room, start) triple instead.
//!
//! Session coverage is rechecked against each batch's subject list: a
//! required session with no assignment is reported as unplaceable, and an
//! assignment the batch doesn't need (or a second copy of one) as surplus.

use std::collections::BTreeMap;

use tracing::debug;

use crate::config::EngineConfig;
use crate::constraints::ConstraintChecker;
use crate::error::{Result, TimetableError};
use crate::models::{
    Candidate, Conflict, ConflictKind, Remedy, RemedyAction, SessionAssignment, TimeSlot,
    TimetableProblem, UnplacedReason, UnplacedSession,
};

/// Most remedies attached to one conflict.
pub const MAX_REMEDIES: usize = 2;

/// Explains the conflicts of a candidate.
pub struct ConflictReporter<'a> {
    checker: ConstraintChecker<'a>,
}

impl<'a> ConflictReporter<'a> {
    pub fn new(problem: &'a TimetableProblem) -> Self {
        Self {
            checker: ConstraintChecker::new(problem),
        }
    }

    pub fn from_config(problem: &'a TimetableProblem, config: &EngineConfig) -> Self {
        Self {
            checker: ConstraintChecker::from_config(problem, config),
        }
    }

    /// Current conflicts of `candidate`, each with up to two remedies.
    ///
    /// Every required session without an assignment is reported, keeping
    /// the reason recorded at generation when there is one.
    ///
    /// # Errors
    /// `TimetableError::UnknownReference` if an assignment names an entity
    /// the problem doesn't define.
    pub fn explain(&self, candidate: &Candidate) -> Result<Vec<Conflict>> {
        self.check_references(&candidate.assignments)?;
        let assignments = &candidate.assignments;

        let mut conflicts = self.checker.hard_violations(assignments);
        for conflict in &mut conflicts {
            if let Some(&target) = conflict.assignments.last() {
                conflict.suggestions = self.repair(assignments, target);
            }
        }

        conflicts.extend(self.coverage(candidate));

        debug!(
            candidate = %candidate.label,
            conflicts = conflicts.len(),
            with_remedies = conflicts.iter().filter(|c| !c.suggestions.is_empty()).count(),
            "conflicts explained"
        );
        Ok(conflicts)
    }

    /// Replaces the candidate's conflicts with fresh ones and refreshes its
    /// score, soft penalty and utilization.
    pub fn annotate(&self, candidate: &mut Candidate) -> Result<()> {
        candidate.conflicts = self.explain(candidate)?;
        self.checker.evaluate(candidate);
        Ok(())
    }

    /// Surplus sessions by assignment index, then missing sessions in batch
    /// and subject order.
    fn coverage(&self, candidate: &Candidate) -> Vec<Conflict> {
        let problem = self.checker.index().problem;
        let assignments = &candidate.assignments;
        let mut by_session: BTreeMap<(&str, &str, u32), Vec<usize>> = BTreeMap::new();
        for (i, a) in assignments.iter().enumerate() {
            by_session
                .entry((a.subject_id.as_str(), a.batch_id.as_str(), a.session_index))
                .or_default()
                .push(i);
        }

        let mut conflicts = Vec::new();
        let mut missing = Vec::new();
        for batch in &problem.batches {
            for subject in batch.subjects.iter().filter_map(|sid| problem.subject(sid)) {
                for session_index in 0..subject.sessions_per_week {
                    let key = (subject.id.as_str(), batch.id.as_str(), session_index);
                    match by_session.remove(&key) {
                        Some(indices) => conflicts.extend(self.surplus(
                            assignments,
                            &indices[1..],
                            Some(indices[0]),
                        )),
                        None => missing.push(self.unassigned(
                            candidate,
                            &subject.id,
                            &batch.id,
                            session_index,
                        )),
                    }
                }
            }
        }
        // Whatever is left isn't required at all
        for indices in by_session.into_values() {
            conflicts.extend(self.surplus(assignments, &indices, None));
        }
        conflicts.sort_by_key(|c| c.assignments.last().copied());
        conflicts.extend(missing);
        conflicts
    }

    /// One `SurplusSession` conflict per extra assignment. `kept` is the
    /// copy that stays, `None` if the session isn't required at all.
    fn surplus(
        &self,
        assignments: &[SessionAssignment],
        extra: &[usize],
        kept: Option<usize>,
    ) -> Vec<Conflict> {
        let problem = self.checker.index().problem;
        extra
            .iter()
            .map(|&i| {
                let a = &assignments[i];
                let what = problem.subject(&a.subject_id).map_or(a.subject_id.as_str(), |s| s.label());
                let number = a.session_index.saturating_add(1);
                let (description, involved) = match kept {
                    Some(first) => (
                        format!(
                            "Session {number} of {what} for batch {} is scheduled more than once",
                            a.batch_id
                        ),
                        vec![first, i],
                    ),
                    None => (
                        format!("Session {number} of {what} is not required for batch {}", a.batch_id),
                        vec![i],
                    ),
                };
                let mut conflict = Conflict::new(ConflictKind::SurplusSession, description)
                    .with_assignments(involved);
                conflict.suggestions.push(Remedy {
                    action: RemedyAction::Remove { assignment: i },
                    description: format!(
                        "Remove {what} for batch {} on {}",
                        a.batch_id,
                        slot_text(&self.checker, a.slot)
                    ),
                });
                conflict
            })
            .collect()
    }

    /// Unplaceable conflict for a required session with no assignment.
    fn unassigned(
        &self,
        candidate: &Candidate,
        subject_id: &str,
        batch_id: &str,
        session_index: u32,
    ) -> Conflict {
        let recorded = candidate.conflicts.iter().find(|c| {
            c.session.as_ref().is_some_and(|s| {
                s.subject_id == subject_id && s.batch_id == batch_id && s.session_index == session_index
            })
        });
        let mut conflict = match recorded {
            Some(c) => c.clone(),
            None => {
                let problem = self.checker.index().problem;
                let what = problem.subject(subject_id).map_or(subject_id, |s| s.label());
                let reason = UnplacedReason::Unassigned;
                Conflict::unplaceable(
                    UnplacedSession {
                        subject_id: subject_id.to_string(),
                        batch_id: batch_id.to_string(),
                        session_index,
                        reason,
                    },
                    format!(
                        "Session {} of {what} for batch {batch_id}: {reason}",
                        session_index + 1
                    ),
                )
            }
        };
        conflict.suggestions = match &conflict.session {
            Some(session) => self.placements(&candidate.assignments, session),
            None => Vec::new(),
        };
        conflict
    }

    fn check_references(&self, assignments: &[SessionAssignment]) -> Result<()> {
        let index = self.checker.index();
        for (i, a) in assignments.iter().enumerate() {
            let missing = if index.subject(&a.subject_id).is_none() {
                Some(("subject", &a.subject_id))
            } else if index.batch(&a.batch_id).is_none() {
                Some(("batch", &a.batch_id))
            } else if index.faculty(&a.faculty_id).is_none() {
                Some(("faculty", &a.faculty_id))
            } else if index.room(&a.classroom_id).is_none() {
                Some(("classroom", &a.classroom_id))
            } else {
                None
            };
            if let Some((entity, id)) = missing {
                return Err(TimetableError::UnknownReference {
                    index: i,
                    entity,
                    id: id.clone(),
                });
            }
        }
        Ok(())
    }

    /// Single-change fixes for `assignments[target]`.
    fn repair(&self, assignments: &[SessionAssignment], target: usize) -> Vec<Remedy> {
        let index = self.checker.index();
        let problem = index.problem;
        let original = &assignments[target];
        let others: Vec<SessionAssignment> = assignments
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != target)
            .map(|(_, a)| a.clone())
            .collect();
        let (Some(s), Some(b)) = (index.subject(&original.subject_id), index.batch(&original.batch_id))
        else {
            return Vec::new();
        };
        let mut remedies = Vec::new();

        for r in index.eligible_rooms(s, b) {
            let room = &problem.classrooms[r];
            if room.id == original.classroom_id {
                continue;
            }
            let mut moved = original.clone();
            moved.classroom_id = room.id.clone();
            if self.checker.is_feasible(&others, &moved) {
                remedies.push(Remedy {
                    action: RemedyAction::UseRoom {
                        assignment: target,
                        classroom_id: room.id.clone(),
                    },
                    description: format!("Use {}", room.label()),
                });
                break;
            }
        }

        for (d, p) in index.valid_starts(original.duration as usize) {
            let slot = TimeSlot::new(index.grid().days[d], p);
            if slot == original.slot {
                continue;
            }
            let mut moved = original.clone();
            moved.slot = slot;
            if self.checker.is_feasible(&others, &moved) {
                remedies.push(Remedy {
                    action: RemedyAction::MoveTo {
                        assignment: target,
                        slot,
                    },
                    description: format!("Move to {}", slot_text(&self.checker, slot)),
                });
                if remedies.len() == MAX_REMEDIES {
                    return remedies;
                }
                break;
            }
        }

        for f in index.eligible_faculty(s) {
            let member = &problem.faculty[f];
            if member.id == original.faculty_id {
                continue;
            }
            let mut moved = original.clone();
            moved.faculty_id = member.id.clone();
            if self.checker.is_feasible(&others, &moved) {
                remedies.push(Remedy {
                    action: RemedyAction::ReassignFaculty {
                        assignment: target,
                        faculty_id: member.id.clone(),
                    },
                    description: format!("Assign {}", member.label()),
                });
                break;
            }
        }

        remedies.truncate(MAX_REMEDIES);
        remedies
    }

    /// Feasible placements of an unplaced session.
    fn placements(&self, assignments: &[SessionAssignment], session: &UnplacedSession) -> Vec<Remedy> {
        let index = self.checker.index();
        let problem = index.problem;
        let (Some(s), Some(b)) = (index.subject(&session.subject_id), index.batch(&session.batch_id))
        else {
            return Vec::new();
        };
        let duration = problem.subjects[s].session_duration;
        let faculty = index.eligible_faculty(s);
        let rooms = index.eligible_rooms(s, b);
        let mut remedies = Vec::new();

        // At most one suggestion per start slot
        'slots: for (d, p) in index.valid_starts(duration as usize) {
            let slot = TimeSlot::new(index.grid().days[d], p);
            for &f in &faculty {
                for &r in &rooms {
                    let member = &problem.faculty[f];
                    let room = &problem.classrooms[r];
                    let placed = SessionAssignment::new(
                        session.subject_id.clone(),
                        session.batch_id.clone(),
                        member.id.clone(),
                        room.id.clone(),
                        slot,
                    )
                    .with_duration(duration)
                    .with_session_index(session.session_index);
                    if !self.checker.is_feasible(assignments, &placed) {
                        continue;
                    }
                    remedies.push(Remedy {
                        action: RemedyAction::Place {
                            faculty_id: member.id.clone(),
                            classroom_id: room.id.clone(),
                            slot,
                        },
                        description: format!(
                            "Schedule on {} in {} with {}",
                            slot_text(&self.checker, slot),
                            room.label(),
                            member.label()
                        ),
                    });
                    if remedies.len() == MAX_REMEDIES {
                        break 'slots;
                    }
                    continue 'slots;
                }
            }
        }
        remedies
    }
}

fn slot_text(checker: &ConstraintChecker<'_>, slot: TimeSlot) -> String {
    match checker.index().grid().bounds(slot) {
        Some((start, _)) => format!("{} {}", slot.day, crate::models::format_minute(start)),
        None => slot.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::generate;
    use crate::models::{ConflictKind, Day, UnplacedReason};
    use crate::test_utils::{department_problem, overloaded_faculty_problem, single_room_problem};

    fn slot(day: Day, period: usize) -> TimeSlot {
        TimeSlot::new(day, period)
    }

    /// Splits off the unplaced-session conflicts.
    fn split_unplaced(conflicts: Vec<Conflict>) -> (Vec<Conflict>, Vec<Conflict>) {
        conflicts.into_iter().partition(|c| c.session.is_none())
    }

    /// An assignable cell no assignment of `c` starts in.
    fn free_slot(problem: &TimetableProblem, c: &Candidate) -> TimeSlot {
        let used: Vec<TimeSlot> = c.assignments.iter().map(|a| a.slot).collect();
        problem
            .grid
            .slots()
            .find(|s| problem.grid.is_assignable(*s) && !used.contains(s))
            .unwrap()
    }

    #[test]
    fn test_clean_candidate_has_no_conflicts() {
        let problem = department_problem();
        let c = generate(&problem, 42).unwrap();
        let reporter = ConflictReporter::new(&problem);
        assert!(reporter.explain(&c).unwrap().is_empty());
    }

    #[test]
    fn test_room_clash_suggests_room_and_slot() {
        let problem = department_problem();
        let reporter = ConflictReporter::new(&problem);
        let mut c = Candidate::new(0, 0, crate::generator::HeuristicProfile::Balanced);
        c.assignments = vec![
            SessionAssignment::new("DS", "CSE-A", "F-ANU", "R101", slot(Day::Monday, 0)),
            SessionAssignment::new("OS", "CSE-B", "F-RAV", "R101", slot(Day::Monday, 0)),
        ];
        let (conflicts, unplaced) = split_unplaced(reporter.explain(&c).unwrap());
        assert_eq!(unplaced.len(), problem.required_sessions() - 2);
        assert_eq!(conflicts.len(), 1);
        let conflict = &conflicts[0];
        assert_eq!(conflict.kind, ConflictKind::RoomDoubleBooked);
        assert_eq!(conflict.suggestions.len(), 2);
        assert_eq!(
            conflict.suggestions[0].action,
            RemedyAction::UseRoom {
                assignment: 1,
                classroom_id: "R102".into()
            }
        );
        assert_eq!(conflict.suggestions[0].description, "Use Room 102");
        assert!(matches!(
            conflict.suggestions[1].action,
            RemedyAction::MoveTo { assignment: 1, .. }
        ));
    }

    #[test]
    fn test_overload_offers_move_and_other_faculty() {
        // F-RAV teaches five hours on Monday against a four hour cap
        let problem = department_problem();
        let reporter = ConflictReporter::new(&problem);
        let mut c = Candidate::new(0, 0, crate::generator::HeuristicProfile::Balanced);
        c.assignments = vec![
            SessionAssignment::new("OS", "CSE-A", "F-RAV", "R101", slot(Day::Monday, 0)),
            SessionAssignment::new("OS", "CSE-B", "F-RAV", "R101", slot(Day::Monday, 1)),
            SessionAssignment::new("OS", "CSE-A", "F-RAV", "R101", slot(Day::Monday, 4))
                .with_session_index(1),
            SessionAssignment::new("OS", "CSE-B", "F-RAV", "R101", slot(Day::Monday, 5))
                .with_session_index(1),
            SessionAssignment::new("DBMS", "CSE-A", "F-RAV", "R101", slot(Day::Monday, 2)),
        ];
        let (conflicts, unplaced) = split_unplaced(reporter.explain(&c).unwrap());
        assert_eq!(unplaced.len(), problem.required_sessions() - 5);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::FacultyOverload);
        assert_eq!(conflicts[0].assignments, vec![0, 1, 2, 3, 4]);

        let actions: Vec<_> = conflicts[0].suggestions.iter().map(|r| &r.action).collect();
        assert_eq!(
            actions,
            vec![
                &RemedyAction::MoveTo {
                    assignment: 4,
                    slot: slot(Day::Tuesday, 0)
                },
                &RemedyAction::ReassignFaculty {
                    assignment: 4,
                    faculty_id: "F-MEE".into()
                },
            ]
        );
        assert_eq!(conflicts[0].suggestions[0].description, "Move to Tuesday 09:00");
        assert_eq!(conflicts[0].suggestions[1].description, "Assign Dr. Meera");
    }

    #[test]
    fn test_unplaced_session_gets_placements() {
        let problem = single_room_problem();
        let mut c = generate(&problem, 42).unwrap();
        // Drop one assignment and record it as unplaced
        let removed = c.assignments.pop().unwrap();
        c.conflicts.push(Conflict::unplaceable(
            UnplacedSession {
                subject_id: removed.subject_id.clone(),
                batch_id: removed.batch_id.clone(),
                session_index: removed.session_index,
                reason: UnplacedReason::BudgetExceeded,
            },
            "budget",
        ));
        let conflicts = ConflictReporter::new(&problem).explain(&c).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(
            conflicts[0].session.as_ref().map(|s| s.reason),
            Some(UnplacedReason::BudgetExceeded)
        );
        assert_eq!(conflicts[0].suggestions.len(), 2);
        assert!(conflicts[0]
            .suggestions
            .iter()
            .all(|r| matches!(r.action, RemedyAction::Place { .. })));
    }

    #[test]
    fn test_removed_assignment_is_reported() {
        let problem = single_room_problem();
        let mut c = generate(&problem, 42).unwrap();
        let removed = c.assignments.pop().unwrap();

        let reporter = ConflictReporter::new(&problem);
        let conflicts = reporter.explain(&c).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::UnplaceableSession);
        let session = conflicts[0].session.as_ref().unwrap();
        assert_eq!(session.session_index, removed.session_index);
        assert_eq!(session.reason, UnplacedReason::Unassigned);
        assert_eq!(conflicts[0].suggestions.len(), 2);

        reporter.annotate(&mut c).unwrap();
        assert_eq!(c.unplaced().count(), 1);
        assert!(c.score <= 90.0);
    }

    #[test]
    fn test_duplicated_session_is_reported() {
        let problem = single_room_problem();
        let mut c = generate(&problem, 42).unwrap();
        let mut copy = c.assignments[0].clone();
        copy.slot = free_slot(&problem, &c);
        c.assignments.push(copy);

        let conflicts = ConflictReporter::new(&problem).explain(&c).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::SurplusSession);
        assert_eq!(conflicts[0].assignments, vec![0, 3]);
        assert!(conflicts[0].description.ends_with("scheduled more than once"));
        assert_eq!(
            conflicts[0].suggestions.iter().map(|r| &r.action).collect::<Vec<_>>(),
            vec![&RemedyAction::Remove { assignment: 3 }]
        );
    }

    #[test]
    fn test_session_beyond_weekly_count_is_reported() {
        let problem = single_room_problem();
        let mut c = generate(&problem, 42).unwrap();
        let extra = SessionAssignment::new("DS", "B1", "F1", "R1", free_slot(&problem, &c))
            .with_session_index(3);
        c.assignments.push(extra);

        let conflicts = ConflictReporter::new(&problem).explain(&c).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::SurplusSession);
        assert_eq!(conflicts[0].assignments, vec![3]);
        assert_eq!(
            conflicts[0].description,
            "Session 4 of DS is not required for batch B1"
        );
    }

    #[test]
    fn test_overloaded_faculty_has_no_placement() {
        let problem = overloaded_faculty_problem();
        let c = generate(&problem, 42).unwrap();
        let conflicts = ConflictReporter::new(&problem).explain(&c).unwrap();
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::UnplaceableSession);
        assert!(conflicts[0].suggestions.is_empty());
    }

    #[test]
    fn test_placed_session_is_dropped_after_edit() {
        let problem = overloaded_faculty_problem();
        let mut c = generate(&problem, 42).unwrap();
        let session = c.unplaced().next().cloned().unwrap();
        let free = free_slot(&problem, &c);
        c.assignments.push(
            SessionAssignment::new("DS", "B1", "F1", "R1", free)
                .with_session_index(session.session_index),
        );

        let reporter = ConflictReporter::new(&problem);
        reporter.annotate(&mut c).unwrap();
        assert_eq!(c.conflict_count(), 1);
        assert_eq!(c.conflicts[0].kind, ConflictKind::FacultyOverload);
        assert_eq!(c.unplaced().count(), 0);
        assert!(c.score <= 90.0);
    }

    #[test]
    fn test_unknown_reference() {
        let problem = single_room_problem();
        let mut c = generate(&problem, 42).unwrap();
        c.assignments[1].classroom_id = "R404".into();
        match ConflictReporter::new(&problem).explain(&c) {
            Err(TimetableError::UnknownReference { index, entity, id }) => {
                assert_eq!(index, 1);
                assert_eq!(entity, "classroom");
                assert_eq!(id, "R404");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
