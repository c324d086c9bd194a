//! Class repository implementation
//!
//! Besides the common CRUD surface this owns the junction tables that hang
//! off a class: student membership, subject assignment, and teacher
//! assignment. Linking is idempotent; re-linking an existing pair is a
//! no-op.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{Class, ClassFilter, CreateClass, Student, UpdateClass};
use crate::error::{map_unique_violation, AppError, Result};
use crate::repositories::base::{BaseRepository, Page, Repository};
use crate::repositories::query_builder::{ConditionOperator, EnhancedQueryBuilder, OrderDirection};
use crate::repositories::validation::ClassValidator;

/// Repository for class operations
#[derive(Clone)]
pub struct ClassRepository {
    base: BaseRepository,
}

impl ClassRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    /// Link a student to this class
    #[instrument(skip(self))]
    pub async fn add_student(&self, class_id: &Uuid, student_id: &Uuid) -> Result<()> {
        self.get_by_id(class_id).await?;
        let student_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE id = ?")
                .bind(student_id)
                .fetch_one(&self.base.pool)
                .await?;
        if student_exists == 0 {
            return Err(AppError::not_found("student", student_id));
        }

        sqlx::query(
            "INSERT OR IGNORE INTO class_students (class_id, student_id, created_at) \
             VALUES (?, ?, ?)",
        )
        .bind(class_id)
        .bind(student_id)
        .bind(Utc::now())
        .execute(&self.base.pool)
        .await?;
        debug!(%class_id, %student_id, "linked student to class");
        Ok(())
    }

    /// Unlink a student from this class
    #[instrument(skip(self))]
    pub async fn remove_student(&self, class_id: &Uuid, student_id: &Uuid) -> Result<()> {
        let result =
            sqlx::query("DELETE FROM class_students WHERE class_id = ? AND student_id = ?")
                .bind(class_id)
                .bind(student_id)
                .execute(&self.base.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("class student", student_id));
        }
        debug!(%class_id, %student_id, "unlinked student from class");
        Ok(())
    }

    /// Students currently linked to this class, in roster order
    pub async fn students(&self, class_id: &Uuid) -> Result<Vec<Student>> {
        self.get_by_id(class_id).await?;
        Ok(sqlx::query_as::<_, Student>(
            "SELECT s.* FROM students s \
             JOIN class_students cs ON cs.student_id = s.id \
             WHERE cs.class_id = ? ORDER BY s.last_name, s.first_name",
        )
        .bind(class_id)
        .fetch_all(&self.base.pool)
        .await?)
    }

    /// Assign a subject to this class's timetable
    #[instrument(skip(self))]
    pub async fn assign_subject(&self, class_id: &Uuid, subject_id: &Uuid) -> Result<()> {
        self.get_by_id(class_id).await?;
        let subject_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM subjects WHERE id = ?")
                .bind(subject_id)
                .fetch_one(&self.base.pool)
                .await?;
        if subject_exists == 0 {
            return Err(AppError::not_found("subject", subject_id));
        }

        sqlx::query("INSERT OR IGNORE INTO class_subjects (class_id, subject_id) VALUES (?, ?)")
            .bind(class_id)
            .bind(subject_id)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }

    /// Assign a teacher to this class
    #[instrument(skip(self))]
    pub async fn assign_teacher(&self, class_id: &Uuid, teacher_id: &Uuid) -> Result<()> {
        self.get_by_id(class_id).await?;
        let teacher_exists =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM teachers WHERE id = ?")
                .bind(teacher_id)
                .fetch_one(&self.base.pool)
                .await?;
        if teacher_exists == 0 {
            return Err(AppError::not_found("teacher", teacher_id));
        }

        sqlx::query("INSERT OR IGNORE INTO class_teachers (class_id, teacher_id) VALUES (?, ?)")
            .bind(class_id)
            .bind(teacher_id)
            .execute(&self.base.pool)
            .await?;
        Ok(())
    }

    fn apply_filters(qb: &mut EnhancedQueryBuilder<'_>, filter: &ClassFilter) {
        qb.add_condition("grade_level", ConditionOperator::Equal, filter.grade_level);
        qb.add_condition("academic_year", ConditionOperator::Equal, filter.academic_year);
        qb.add_condition("is_active", ConditionOperator::Equal, filter.is_active);
        if let Some(term) = &filter.search_term {
            qb.add_search(&["name"], term);
        }
    }
}

#[async_trait]
impl Repository<Class, CreateClass, UpdateClass, ClassFilter> for ClassRepository {
    #[instrument(skip(self, data), fields(name = %data.name, year = data.academic_year))]
    async fn create(&self, data: &CreateClass) -> Result<Class> {
        ClassValidator::create(data)?;

        let class = Class {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            grade_level: data.grade_level,
            stream: data.stream.clone(),
            academic_year: data.academic_year,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO classes (id, name, grade_level, stream, academic_year, is_active, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(class.id)
        .bind(&class.name)
        .bind(class.grade_level)
        .bind(&class.stream)
        .bind(class.academic_year)
        .bind(class.is_active)
        .bind(class.created_at)
        .bind(class.updated_at)
        .execute(&self.base.pool)
        .await
        .map_err(|e| map_unique_violation(e, "class"))?;

        debug!(class_id = %class.id, "created class");
        Ok(class)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Class> {
        sqlx::query_as::<_, Class>("SELECT * FROM classes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.base.pool)
            .await?
            .ok_or_else(|| AppError::not_found("class", id))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &Uuid, changes: &UpdateClass) -> Result<Class> {
        let changeset = ClassValidator::update(changes)?;
        let changed = changeset.len();

        let mut qb = sqlx::QueryBuilder::new("UPDATE classes SET ");
        changeset.apply(&mut qb);
        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(*id);

        let result = qb
            .build()
            .execute(&self.base.pool)
            .await
            .map_err(|e| map_unique_violation(e, "class"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("class", id));
        }

        debug!(class_id = %id, columns = changed, "updated class");
        self.get_by_id(id).await
    }

    /// Hard delete. Refused while students are linked or grade records
    /// reference the class; subject and teacher assignments are removed in
    /// the same transaction.
    #[instrument(skip(self))]
    async fn delete(&self, id: &Uuid) -> Result<()> {
        let students =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM class_students WHERE class_id = ?")
                .bind(id)
                .fetch_one(&self.base.pool)
                .await?;
        if students > 0 {
            return Err(AppError::dependency(
                "class",
                format!("{students} student(s) are linked to this class"),
            ));
        }

        let grades = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM grades WHERE class_id = ?")
            .bind(id)
            .fetch_one(&self.base.pool)
            .await?;
        if grades > 0 {
            return Err(AppError::dependency(
                "class",
                format!("{grades} grade record(s) reference this class"),
            ));
        }

        let mut tx = self.base.pool.begin().await?;
        sqlx::query("DELETE FROM class_subjects WHERE class_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM class_teachers WHERE class_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM classes WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("class", id));
        }
        tx.commit().await?;
        debug!(class_id = %id, "deleted class");
        Ok(())
    }

    async fn list(&self, filter: &ClassFilter) -> Result<Page<Class>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM classes");
        Self::apply_filters(&mut qb, filter);
        qb.add_order_by("academic_year", OrderDirection::Desc)
            .add_order_by("grade_level", OrderDirection::Asc)
            .add_order_by("name", OrderDirection::Asc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<Class>()
            .fetch_all(&self.base.pool)
            .await?;

        let total = self.count(filter).await?;
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &ClassFilter) -> Result<i64> {
        let mut qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM classes");
        Self::apply_filters(&mut qb, filter);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.base.pool).await?)
    }
}
