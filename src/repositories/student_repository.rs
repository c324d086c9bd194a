//! Student repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{
    CreateStudent, Student, StudentFilter, StudentIdentifier, StudentStatus, UpdateStudent,
};
use crate::error::{map_unique_violation, AppError, Result};
use crate::repositories::base::{BaseRepository, Page, Repository};
use crate::repositories::query_builder::{
    ConditionOperator, EnhancedQueryBuilder, LogicalOperator, OrderDirection,
};
use crate::repositories::validation::StudentValidator;

/// Repository for student operations
#[derive(Clone)]
pub struct StudentRepository {
    base: BaseRepository,
}

impl StudentRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    /// Resolve a student by whichever identifier fields are present, in a
    /// fixed precedence order: id, then admission number, then email.
    /// Exactly one lookup is issued.
    #[instrument(skip(self))]
    pub async fn get_by_identifier(&self, identifier: &StudentIdentifier) -> Result<Student> {
        if let Some(id) = identifier.id {
            return self.get_by_id(&id).await;
        }
        if let Some(admission_no) = &identifier.admission_no {
            let student =
                sqlx::query_as::<_, Student>("SELECT * FROM students WHERE admission_no = ?")
                    .bind(admission_no)
                    .fetch_optional(&self.base.pool)
                    .await?;
            return student.ok_or_else(|| AppError::not_found("student", admission_no));
        }
        if let Some(email) = &identifier.email {
            let student = sqlx::query_as::<_, Student>("SELECT * FROM students WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.base.pool)
                .await?;
            return student.ok_or_else(|| AppError::not_found("student", email));
        }
        Err(AppError::invalid_field(
            "identifier",
            "at least one identifier field is required",
        ))
    }

    fn apply_filters(qb: &mut EnhancedQueryBuilder<'_>, filter: &StudentFilter) {
        qb.add_condition("status", ConditionOperator::Equal, filter.status);
        if let Some(class_id) = filter.class_id {
            qb.add_where_clause(Some(LogicalOperator::And));
            qb.builder_mut().push(
                "EXISTS (SELECT 1 FROM class_students cs \
                 WHERE cs.student_id = students.id AND cs.class_id = ",
            );
            qb.builder_mut().push_bind(class_id);
            qb.builder_mut().push(")");
        }
        if let Some(term) = &filter.search_term {
            qb.add_search(
                &["first_name", "last_name", "email", "admission_no"],
                term,
            );
        }
    }
}

#[async_trait]
impl Repository<Student, CreateStudent, UpdateStudent, StudentFilter> for StudentRepository {
    /// Create a student. When an initial class is given, the membership row
    /// is written in the same transaction, so a bad class reference leaves
    /// no student behind.
    #[instrument(skip(self, data), fields(admission_no = %data.admission_no))]
    async fn create(&self, data: &CreateStudent) -> Result<Student> {
        StudentValidator::create(data)?;

        let student = Student {
            id: Uuid::new_v4(),
            admission_no: data.admission_no.clone(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
            date_of_birth: data.date_of_birth,
            guardian_phone: data.guardian_phone.clone(),
            status: StudentStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let mut tx = self.base.pool.begin().await?;

        sqlx::query(
            "INSERT INTO students (id, admission_no, first_name, last_name, email, \
             date_of_birth, guardian_phone, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(student.id)
        .bind(&student.admission_no)
        .bind(&student.first_name)
        .bind(&student.last_name)
        .bind(&student.email)
        .bind(student.date_of_birth)
        .bind(&student.guardian_phone)
        .bind(student.status)
        .bind(student.created_at)
        .bind(student.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_unique_violation(e, "student"))?;

        if let Some(class_id) = data.class_id {
            let class_exists = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM classes WHERE id = ?")
                .bind(class_id)
                .fetch_one(&mut *tx)
                .await?;
            if class_exists == 0 {
                return Err(AppError::not_found("class", class_id));
            }
            sqlx::query(
                "INSERT INTO class_students (class_id, student_id, created_at) VALUES (?, ?, ?)",
            )
            .bind(class_id)
            .bind(student.id)
            .bind(student.created_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        debug!(student_id = %student.id, "created student");
        Ok(student)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Student> {
        sqlx::query_as::<_, Student>("SELECT * FROM students WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.base.pool)
            .await?
            .ok_or_else(|| AppError::not_found("student", id))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &Uuid, changes: &UpdateStudent) -> Result<Student> {
        let changeset = StudentValidator::update(changes)?;
        let changed = changeset.len();

        let mut qb = sqlx::QueryBuilder::new("UPDATE students SET ");
        changeset.apply(&mut qb);
        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(*id);

        let result = qb
            .build()
            .execute(&self.base.pool)
            .await
            .map_err(|e| map_unique_violation(e, "student"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("student", id));
        }

        debug!(student_id = %id, columns = changed, "updated student");
        self.get_by_id(id).await
    }

    /// Hard delete. Refused while grade or indiscipline records reference
    /// the student; class memberships are unlinked in the same transaction.
    #[instrument(skip(self))]
    async fn delete(&self, id: &Uuid) -> Result<()> {
        let grades = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM grades WHERE student_id = ?")
            .bind(id)
            .fetch_one(&self.base.pool)
            .await?;
        if grades > 0 {
            return Err(AppError::dependency(
                "student",
                format!("{grades} grade record(s) reference this student"),
            ));
        }

        let incidents = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM indiscipline_records WHERE student_id = ? AND status != 'deleted'",
        )
        .bind(id)
        .fetch_one(&self.base.pool)
        .await?;
        if incidents > 0 {
            return Err(AppError::dependency(
                "student",
                format!("{incidents} indiscipline record(s) reference this student"),
            ));
        }

        let mut tx = self.base.pool.begin().await?;
        sqlx::query("DELETE FROM class_students WHERE student_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM students WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("student", id));
        }
        tx.commit().await?;
        debug!(student_id = %id, "deleted student");
        Ok(())
    }

    async fn list(&self, filter: &StudentFilter) -> Result<Page<Student>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM students");
        Self::apply_filters(&mut qb, filter);
        qb.add_order_by("last_name", OrderDirection::Asc)
            .add_order_by("first_name", OrderDirection::Asc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<Student>()
            .fetch_all(&self.base.pool)
            .await?;

        let total = self.count(filter).await?;
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &StudentFilter) -> Result<i64> {
        let mut qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM students");
        Self::apply_filters(&mut qb, filter);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.base.pool).await?)
    }
}
