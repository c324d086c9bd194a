//! Class repository tests

use uuid::Uuid;

use crate::entities::{ClassFilter, CreateClass, UpdateClass};
use crate::error::AppError;
use crate::repositories::tests::{generators, setup_test_db};
use crate::repositories::{
    ClassRepository, Repository, StudentRepository, SubjectRepository, TeacherRepository,
};

#[tokio::test]
async fn duplicate_and_missing_class_codes_are_stable() {
    let pool = setup_test_db().await;
    let repo = ClassRepository::new(pool);

    let payload = CreateClass {
        name: "Form 2B".to_string(),
        grade_level: 8,
        stream: None,
        academic_year: 2026,
    };
    repo.create(&payload).await.unwrap();

    // Same name in the same academic year collides
    let err = repo.create(&payload).await.unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_CLASS");

    let err = repo.get_by_id(&Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code(), "CLASS_NOT_FOUND");

    // Same name in a different year is a different class
    let next_year = CreateClass {
        academic_year: 2027,
        ..payload
    };
    assert!(repo.create(&next_year).await.is_ok());
}

#[tokio::test]
async fn grade_level_out_of_range_is_rejected() {
    let pool = setup_test_db().await;
    let repo = ClassRepository::new(pool);

    let err = repo
        .create(&CreateClass {
            grade_level: 0,
            ..generators::class()
        })
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation { .. }));
}

#[tokio::test]
async fn rename_onto_existing_pair_is_a_duplicate() {
    let pool = setup_test_db().await;
    let repo = ClassRepository::new(pool);

    let first = repo.create(&generators::class()).await.unwrap();
    let second = repo.create(&generators::class()).await.unwrap();

    let err = repo
        .update(
            &second.id,
            &UpdateClass {
                name: Some(first.name.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code(), "DUPLICATE_CLASS");
}

#[tokio::test]
async fn delete_refused_until_students_are_unlinked() {
    let pool = setup_test_db().await;
    let classes = ClassRepository::new(pool.clone());
    let students = StudentRepository::new(pool);

    let class = classes.create(&generators::class()).await.unwrap();
    let student = students.create(&generators::student()).await.unwrap();
    classes.add_student(&class.id, &student.id).await.unwrap();

    let err = classes.delete(&class.id).await.unwrap_err();
    assert!(matches!(err, AppError::Dependency { entity: "class", .. }));
    // Nothing was removed
    assert!(classes.exists(&class.id).await.unwrap());

    classes.remove_student(&class.id, &student.id).await.unwrap();
    classes.delete(&class.id).await.unwrap();
    assert!(!classes.exists(&class.id).await.unwrap());
}

#[tokio::test]
async fn delete_removes_assignment_rows_with_the_class() {
    let pool = setup_test_db().await;
    let classes = ClassRepository::new(pool.clone());
    let subjects = SubjectRepository::new(pool.clone());
    let teachers = TeacherRepository::new(pool.clone());

    let class = classes.create(&generators::class()).await.unwrap();
    let subject = subjects.create(&generators::subject()).await.unwrap();
    let teacher = teachers.create(&generators::teacher()).await.unwrap();
    classes.assign_subject(&class.id, &subject.id).await.unwrap();
    classes.assign_teacher(&class.id, &teacher.id).await.unwrap();

    classes.delete(&class.id).await.unwrap();

    let orphans = sqlx::query_scalar::<_, i64>(
        "SELECT (SELECT COUNT(*) FROM class_subjects WHERE class_id = ?) + \
                (SELECT COUNT(*) FROM class_teachers WHERE class_id = ?)",
    )
    .bind(class.id)
    .bind(class.id)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(orphans, 0);
}

#[tokio::test]
async fn linking_is_idempotent() {
    let pool = setup_test_db().await;
    let classes = ClassRepository::new(pool.clone());
    let students = StudentRepository::new(pool);

    let class = classes.create(&generators::class()).await.unwrap();
    let student = students.create(&generators::student()).await.unwrap();

    classes.add_student(&class.id, &student.id).await.unwrap();
    classes.add_student(&class.id, &student.id).await.unwrap();
    assert_eq!(classes.students(&class.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn linking_unknown_student_is_not_found() {
    let pool = setup_test_db().await;
    let repo = ClassRepository::new(pool);

    let class = repo.create(&generators::class()).await.unwrap();
    let err = repo.add_student(&class.id, &Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, AppError::NotFound { entity: "student", .. }));
}

#[tokio::test]
async fn list_filters_by_year_and_grade() {
    let pool = setup_test_db().await;
    let repo = ClassRepository::new(pool);

    repo.create(&CreateClass {
        grade_level: 7,
        academic_year: 2025,
        ..generators::class()
    })
    .await
    .unwrap();
    repo.create(&CreateClass {
        grade_level: 7,
        academic_year: 2026,
        ..generators::class()
    })
    .await
    .unwrap();
    repo.create(&CreateClass {
        grade_level: 9,
        academic_year: 2026,
        ..generators::class()
    })
    .await
    .unwrap();

    let page = repo
        .list(&ClassFilter {
            academic_year: Some(2026),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);

    let page = repo
        .list(&ClassFilter {
            academic_year: Some(2026),
            grade_level: Some(7),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
}
