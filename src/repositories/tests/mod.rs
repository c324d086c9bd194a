//! Test utilities for repositories
//!
//! Shared fixtures: an in-memory database with the full schema, plus
//! generators producing valid creation payloads that individual tests
//! tweak into the shape they need.

use sqlx::{Pool, Sqlite};

use crate::storage::db::DatabaseManager;

mod cache_test;
mod class_repository_test;
mod indiscipline_repository_test;
mod invite_repository_test;

/// Initialize an in-memory database for testing
pub async fn setup_test_db() -> Pool<Sqlite> {
    let db = DatabaseManager::setup_test_db().await;
    db.pool.clone()
}

/// Test data generators producing valid creation payloads
pub mod generators {
    use chrono::NaiveDate;
    use uuid::Uuid;

    use crate::entities::{
        AudienceRole, CreateClass, CreateGrade, CreateIndiscipline, CreateInvite,
        CreateNotification, CreateStudent, CreateSubject, CreateTeacher, IndisciplineSeverity,
        InviteRole, NotificationPriority,
    };

    /// Digits-only suffix so generated admission/employee numbers stay
    /// format-valid and unique across a test process
    fn serial() -> String {
        use std::sync::atomic::{AtomicU32, Ordering};
        static SERIAL: AtomicU32 = AtomicU32::new(0);
        format!("{:04}", 1000 + SERIAL.fetch_add(1, Ordering::Relaxed) % 9000)
    }

    pub fn student() -> CreateStudent {
        let serial = serial();
        CreateStudent {
            admission_no: format!("ADM{serial}"),
            first_name: "Wanjiru".to_string(),
            last_name: "Kamau".to_string(),
            email: format!("wanjiru.kamau+{serial}@example.com"),
            date_of_birth: NaiveDate::from_ymd_opt(2011, 6, 2).unwrap(),
            guardian_phone: "+254711000222".to_string(),
            class_id: None,
        }
    }

    pub fn teacher() -> CreateTeacher {
        let serial = serial();
        CreateTeacher {
            employee_no: format!("EMP{serial}"),
            first_name: "Grace".to_string(),
            last_name: "Otieno".to_string(),
            email: format!("grace.otieno+{serial}@example.com"),
            phone: "0722000111".to_string(),
        }
    }

    pub fn subject() -> CreateSubject {
        let serial = serial();
        CreateSubject {
            name: format!("Mathematics {serial}"),
            code: format!("MAT{serial}"),
        }
    }

    pub fn class() -> CreateClass {
        CreateClass {
            name: format!("Class {}", serial()),
            grade_level: 7,
            stream: Some("East".to_string()),
            academic_year: 2026,
        }
    }

    pub fn grade(student_id: Uuid, class_id: Uuid, subject_id: Uuid) -> CreateGrade {
        CreateGrade {
            student_id,
            class_id,
            subject_id,
            score: 78.5,
            term: 2,
            year: 2026,
            exam_name: "Midterm".to_string(),
        }
    }

    pub fn notification() -> CreateNotification {
        CreateNotification {
            title: "Sports day".to_string(),
            message: "Sports day moved to Friday".to_string(),
            priority: NotificationPriority::Medium,
            target_audience: vec![AudienceRole::Teacher, AudienceRole::Student],
            scheduled_at: None,
            expires_at: None,
        }
    }

    pub fn indiscipline(student_id: Uuid, reported_by: Uuid) -> CreateIndiscipline {
        CreateIndiscipline {
            student_id,
            reported_by,
            incident_date: NaiveDate::from_ymd_opt(2026, 3, 10).unwrap(),
            description: "Skipped afternoon classes".to_string(),
            severity: IndisciplineSeverity::Minor,
        }
    }

    pub fn invite() -> CreateInvite {
        CreateInvite {
            email: format!("invitee+{}@example.com", serial()),
            role: InviteRole::Student,
            invited_by: Uuid::new_v4(),
            expires_at: None,
        }
    }
}
