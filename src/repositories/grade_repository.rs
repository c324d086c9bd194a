//! Grade repository implementation
//!
//! Referential validity of the student, class, and subject references is
//! enforced by foreign keys; a bad reference surfaces as a storage error.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{CreateGrade, Grade, GradeFilter, UpdateGrade};
use crate::error::{AppError, Result};
use crate::repositories::base::{BaseRepository, Page, Repository};
use crate::repositories::query_builder::{ConditionOperator, EnhancedQueryBuilder, OrderDirection};
use crate::repositories::validation::GradeValidator;

/// Repository for grade-record operations
#[derive(Clone)]
pub struct GradeRepository {
    base: BaseRepository,
}

impl GradeRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    fn apply_filters(qb: &mut EnhancedQueryBuilder<'_>, filter: &GradeFilter) {
        qb.add_condition("student_id", ConditionOperator::Equal, filter.student_id);
        qb.add_condition("class_id", ConditionOperator::Equal, filter.class_id);
        qb.add_condition("subject_id", ConditionOperator::Equal, filter.subject_id);
        qb.add_condition("term", ConditionOperator::Equal, filter.term);
        qb.add_condition("year", ConditionOperator::Equal, filter.year);
    }
}

#[async_trait]
impl Repository<Grade, CreateGrade, UpdateGrade, GradeFilter> for GradeRepository {
    #[instrument(skip(self, data), fields(student_id = %data.student_id))]
    async fn create(&self, data: &CreateGrade) -> Result<Grade> {
        GradeValidator::create(data)?;

        let grade = Grade {
            id: Uuid::new_v4(),
            student_id: data.student_id,
            class_id: data.class_id,
            subject_id: data.subject_id,
            score: data.score,
            term: data.term,
            year: data.year,
            exam_name: data.exam_name.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO grades (id, student_id, class_id, subject_id, score, term, year, \
             exam_name, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(grade.id)
        .bind(grade.student_id)
        .bind(grade.class_id)
        .bind(grade.subject_id)
        .bind(grade.score)
        .bind(grade.term)
        .bind(grade.year)
        .bind(&grade.exam_name)
        .bind(grade.created_at)
        .bind(grade.updated_at)
        .execute(&self.base.pool)
        .await?;

        debug!(grade_id = %grade.id, "recorded grade");
        Ok(grade)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Grade> {
        sqlx::query_as::<_, Grade>("SELECT * FROM grades WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.base.pool)
            .await?
            .ok_or_else(|| AppError::not_found("grade", id))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &Uuid, changes: &UpdateGrade) -> Result<Grade> {
        let changeset = GradeValidator::update(changes)?;
        let changed = changeset.len();

        let mut qb = sqlx::QueryBuilder::new("UPDATE grades SET ");
        changeset.apply(&mut qb);
        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(*id);

        let result = qb.build().execute(&self.base.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("grade", id));
        }

        debug!(grade_id = %id, columns = changed, "updated grade");
        self.get_by_id(id).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM grades WHERE id = ?")
            .bind(id)
            .execute(&self.base.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("grade", id));
        }
        debug!(grade_id = %id, "deleted grade");
        Ok(())
    }

    async fn list(&self, filter: &GradeFilter) -> Result<Page<Grade>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM grades");
        Self::apply_filters(&mut qb, filter);
        qb.add_order_by("year", OrderDirection::Desc)
            .add_order_by("term", OrderDirection::Asc)
            .add_order_by("created_at", OrderDirection::Desc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<Grade>()
            .fetch_all(&self.base.pool)
            .await?;

        let total = self.count(filter).await?;
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &GradeFilter) -> Result<i64> {
        let mut qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM grades");
        Self::apply_filters(&mut qb, filter);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.base.pool).await?)
    }
}
