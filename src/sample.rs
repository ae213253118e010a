//! Demo roster: five subjects spread over 21 students, and five rooms.

use crate::model::{NewRoom, NewStudent};

const STUDENTS: &[(&str, &str, &str, &str)] = &[
    ("CS001", "Alice Johnson", "CS101", "alice.johnson@email.com"),
    ("CS002", "Bob Smith", "CS101", "bob.smith@email.com"),
    ("CS003", "Charlie Brown", "CS101", "charlie.brown@email.com"),
    ("CS004", "Diana Prince", "CS101", "diana.prince@email.com"),
    ("CS005", "Eve Wilson", "CS101", "eve.wilson@email.com"),
    ("MATH001", "Frank Miller", "MATH201", "frank.miller@email.com"),
    ("MATH002", "Grace Lee", "MATH201", "grace.lee@email.com"),
    ("MATH003", "Henry Davis", "MATH201", "henry.davis@email.com"),
    ("MATH004", "Ivy Chen", "MATH201", "ivy.chen@email.com"),
    ("PHY001", "Jack Wilson", "PHY301", "jack.wilson@email.com"),
    ("PHY002", "Kate Anderson", "PHY301", "kate.anderson@email.com"),
    ("PHY003", "Liam Taylor", "PHY301", "liam.taylor@email.com"),
    ("PHY004", "Maya Patel", "PHY301", "maya.patel@email.com"),
    ("PHY005", "Noah Garcia", "PHY301", "noah.garcia@email.com"),
    ("CHEM001", "Olivia Martinez", "CHEM401", "olivia.martinez@email.com"),
    ("CHEM002", "Peter Rodriguez", "CHEM401", "peter.rodriguez@email.com"),
    ("CHEM003", "Quinn Thompson", "CHEM401", "quinn.thompson@email.com"),
    ("BIO001", "Rachel White", "BIO501", "rachel.white@email.com"),
    ("BIO002", "Samuel Harris", "BIO501", "samuel.harris@email.com"),
    ("BIO003", "Tina Clark", "BIO501", "tina.clark@email.com"),
    ("BIO004", "Uma Lewis", "BIO501", "uma.lewis@email.com"),
];

const ROOMS: &[(&str, u32, u32)] = &[
    ("A101", 20, 10),
    ("A102", 16, 8),
    ("B201", 24, 12),
    ("B202", 18, 9),
    ("C301", 22, 11),
];

pub fn students() -> Vec<NewStudent> {
    STUDENTS
        .iter()
        .map(|&(student_id, name, subject_code, email)| NewStudent {
            student_id: student_id.into(),
            name: name.into(),
            subject_code: subject_code.into(),
            email: email.into(),
        })
        .collect()
}

pub fn rooms() -> Vec<NewRoom> {
    ROOMS
        .iter()
        .map(|&(room_number, capacity, benches)| NewRoom {
            room_number: room_number.into(),
            capacity,
            benches,
        })
        .collect()
}
