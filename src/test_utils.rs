//! Shared test fixtures.

use crate::models::{
    Batch, Classroom, Day, Facility, Faculty, RoomType, Subject, TimeSlot, TimetableProblem,
};

/// One room, one batch, one faculty member, one subject with three weekly
/// sessions.
pub(crate) fn single_room_problem() -> TimetableProblem {
    TimetableProblem::new()
        .with_classroom(Classroom::lecture_hall("R1", 40))
        .with_faculty(Faculty::new("F1", 6, 20).with_subject("DS"))
        .with_subject(Subject::theory("DS", 3))
        .with_batch(Batch::new("B1", 30).with_subject("DS"))
}

/// A small computer science department: four rooms, four faculty members,
/// five subjects and two batches on the default weekly grid. Feasible.
pub(crate) fn department_problem() -> TimetableProblem {
    TimetableProblem::new()
        .with_classroom(
            Classroom::lecture_hall("R101", 60)
                .with_name("Room 101")
                .with_facility(Facility::Projector)
                .with_facility(Facility::WiFi),
        )
        .with_classroom(Classroom::lecture_hall("R102", 60).with_name("Room 102"))
        .with_classroom(
            Classroom::laboratory("L1", 50)
                .with_name("Computer Lab 1")
                .with_facility(Facility::Custom("Workstations".into())),
        )
        .with_classroom(Classroom::new("S201", RoomType::SeminarRoom, 20).with_name("Seminar 201"))
        .with_faculty(
            Faculty::new("F-ANU", 4, 16)
                .with_name("Dr. Anu")
                .with_subject("DS"),
        )
        .with_faculty(
            Faculty::new("F-RAV", 4, 18)
                .with_name("Dr. Ravi")
                .with_subject("OS")
                .with_subject("DBMS"),
        )
        .with_faculty(
            Faculty::new("F-MEE", 5, 18)
                .with_name("Dr. Meera")
                .with_subject("DS-LAB")
                .with_subject("DBMS")
                .with_preferred(Day::WEEKDAYS.iter().flat_map(|&d| {
                    [0, 1, 2].map(|p| TimeSlot::new(d, p))
                })),
        )
        .with_faculty(
            Faculty::new("F-KAR", 4, 12)
                .with_name("Prof. Karthik")
                .with_subject("MATH"),
        )
        .with_subject(Subject::theory("DS", 3).with_name("Data Structures").with_code("CS201"))
        .with_subject(Subject::theory("OS", 3).with_name("Operating Systems").with_code("CS202"))
        .with_subject(Subject::theory("DBMS", 2).with_name("Databases").with_code("CS203"))
        .with_subject(
            Subject::practical("DS-LAB", 1)
                .with_name("Data Structures Lab")
                .with_duration(2)
                .with_facility(Facility::Custom("Workstations".into()))
                .with_faculty(vec!["F-MEE".into()]),
        )
        .with_subject(Subject::theory("MATH", 2).with_name("Discrete Mathematics"))
        .with_batch(
            Batch::new("CSE-A", 45)
                .with_name("CSE 2nd Year A")
                .with_semester(3)
                .with_subject("DS")
                .with_subject("OS")
                .with_subject("DBMS")
                .with_subject("DS-LAB")
                .with_subject("MATH")
                .with_max_sessions_per_day(4),
        )
        .with_batch(
            Batch::new("CSE-B", 40)
                .with_name("CSE 2nd Year B")
                .with_semester(3)
                .with_subject("DS")
                .with_subject("OS")
                .with_subject("DS-LAB")
                .with_subject("MATH"),
        )
}

/// The sole qualified faculty member can teach only two of the subject's
/// three weekly hours.
pub(crate) fn overloaded_faculty_problem() -> TimetableProblem {
    TimetableProblem::new()
        .with_classroom(Classroom::lecture_hall("R1", 40))
        .with_faculty(Faculty::new("F1", 6, 2).with_subject("DS"))
        .with_subject(Subject::theory("DS", 3))
        .with_batch(Batch::new("B1", 30).with_subject("DS"))
}
