//! Indiscipline repository tests

use chrono::{Duration, Utc};
use sqlx::{Pool, Sqlite};
use uuid::Uuid;

use crate::entities::{
    CreateIndiscipline, IndisciplineFilter, IndisciplineSeverity, IndisciplineStatus,
    UpdateIndiscipline,
};
use crate::error::AppError;
use crate::repositories::tests::{generators, setup_test_db};
use crate::repositories::{
    IndisciplineRepository, Repository, StudentRepository, TeacherRepository,
};

async fn seed_refs(pool: &Pool<Sqlite>) -> (Uuid, Uuid) {
    let student = StudentRepository::new(pool.clone())
        .create(&generators::student())
        .await
        .unwrap();
    let teacher = TeacherRepository::new(pool.clone())
        .create(&generators::teacher())
        .await
        .unwrap();
    (student.id, teacher.id)
}

#[tokio::test]
async fn create_then_get_round_trip() {
    let pool = setup_test_db().await;
    let repo = IndisciplineRepository::new(pool.clone());
    let (student_id, teacher_id) = seed_refs(&pool).await;

    let created = repo
        .create(&generators::indiscipline(student_id, teacher_id))
        .await
        .unwrap();
    assert_eq!(created.status, IndisciplineStatus::Active);
    assert!(created.remediation.is_none());

    let fetched = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(fetched.severity, IndisciplineSeverity::Minor);
    assert_eq!(fetched.reported_by, teacher_id);
}

#[tokio::test]
async fn future_incident_date_is_rejected() {
    let pool = setup_test_db().await;
    let repo = IndisciplineRepository::new(pool.clone());
    let (student_id, teacher_id) = seed_refs(&pool).await;

    let err = repo
        .create(&CreateIndiscipline {
            incident_date: (Utc::now() + Duration::days(2)).date_naive(),
            ..generators::indiscipline(student_id, teacher_id)
        })
        .await
        .unwrap_err();
    assert!(err.violations().iter().any(|v| v.field == "incidentDate"));
}

#[tokio::test]
async fn resolve_attaches_the_remediation_note() {
    let pool = setup_test_db().await;
    let repo = IndisciplineRepository::new(pool.clone());
    let (student_id, teacher_id) = seed_refs(&pool).await;

    let created = repo
        .create(&generators::indiscipline(student_id, teacher_id))
        .await
        .unwrap();
    let resolved = repo
        .resolve(&created.id, Some("Guardian meeting held".to_string()))
        .await
        .unwrap();
    assert_eq!(resolved.status, IndisciplineStatus::Resolved);
    assert_eq!(resolved.remediation.as_deref(), Some("Guardian meeting held"));
}

#[tokio::test]
async fn resolve_without_note_keeps_the_existing_one() {
    let pool = setup_test_db().await;
    let repo = IndisciplineRepository::new(pool.clone());
    let (student_id, teacher_id) = seed_refs(&pool).await;

    let created = repo
        .create(&generators::indiscipline(student_id, teacher_id))
        .await
        .unwrap();
    repo.update(
        &created.id,
        &UpdateIndiscipline {
            remediation: Some("Detention assigned".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap();

    let resolved = repo.resolve(&created.id, None).await.unwrap();
    assert_eq!(resolved.remediation.as_deref(), Some("Detention assigned"));
}

#[tokio::test]
async fn soft_delete_hides_from_reads_and_default_listing() {
    let pool = setup_test_db().await;
    let repo = IndisciplineRepository::new(pool.clone());
    let (student_id, teacher_id) = seed_refs(&pool).await;

    let created = repo
        .create(&generators::indiscipline(student_id, teacher_id))
        .await
        .unwrap();
    repo.delete(&created.id).await.unwrap();

    assert!(matches!(
        repo.get_by_id(&created.id).await.unwrap_err(),
        AppError::NotFound { .. }
    ));
    assert_eq!(
        repo.list(&IndisciplineFilter::default()).await.unwrap().total,
        0
    );
    // The row itself survives for audit
    let rows = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM indiscipline_records")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn listing_scopes_by_student_and_severity() {
    let pool = setup_test_db().await;
    let repo = IndisciplineRepository::new(pool.clone());
    let (student_id, teacher_id) = seed_refs(&pool).await;
    let (other_student, _) = seed_refs(&pool).await;

    repo.create(&generators::indiscipline(student_id, teacher_id))
        .await
        .unwrap();
    repo.create(&CreateIndiscipline {
        severity: IndisciplineSeverity::Severe,
        ..generators::indiscipline(student_id, teacher_id)
    })
    .await
    .unwrap();
    repo.create(&generators::indiscipline(other_student, teacher_id))
        .await
        .unwrap();

    let for_student = repo
        .list(&IndisciplineFilter {
            student_id: Some(student_id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(for_student.total, 2);

    let severe = repo
        .list(&IndisciplineFilter {
            student_id: Some(student_id),
            severity: Some(IndisciplineSeverity::Severe),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(severe.total, 1);
}
