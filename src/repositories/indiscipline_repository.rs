//! Indiscipline repository implementation
//!
//! Records are soft-deleted; `resolve` is the usual exit path and keeps the
//! row visible with its remediation note.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{
    CreateIndiscipline, IndisciplineFilter, IndisciplineRecord, IndisciplineStatus,
    UpdateIndiscipline,
};
use crate::error::{AppError, Result};
use crate::repositories::base::{BaseRepository, Page, Repository};
use crate::repositories::query_builder::{ConditionOperator, EnhancedQueryBuilder, OrderDirection};
use crate::repositories::validation::IndisciplineValidator;

/// Repository for indiscipline-record operations
#[derive(Clone)]
pub struct IndisciplineRepository {
    base: BaseRepository,
}

impl IndisciplineRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    /// Mark a record resolved, optionally attaching a remediation note
    #[instrument(skip(self, remediation))]
    pub async fn resolve(
        &self,
        id: &Uuid,
        remediation: Option<String>,
    ) -> Result<IndisciplineRecord> {
        let result = sqlx::query(
            "UPDATE indiscipline_records \
             SET status = 'resolved', remediation = COALESCE(?, remediation), updated_at = ? \
             WHERE id = ? AND status != 'deleted'",
        )
        .bind(remediation)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.base.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("indiscipline record", id));
        }
        self.get_by_id(id).await
    }

    fn apply_filters(qb: &mut EnhancedQueryBuilder<'_>, filter: &IndisciplineFilter) {
        qb.add_condition("student_id", ConditionOperator::Equal, filter.student_id);
        qb.add_condition("reported_by", ConditionOperator::Equal, filter.reported_by);
        qb.add_condition("severity", ConditionOperator::Equal, filter.severity);
        match filter.status {
            Some(status) => {
                qb.add_condition("status", ConditionOperator::Equal, Some(status));
            }
            None => {
                qb.add_raw_condition("status != 'deleted'");
            }
        }
        qb.add_condition(
            "incident_date",
            ConditionOperator::GreaterThanOrEqual,
            filter.incident_after,
        );
        qb.add_condition(
            "incident_date",
            ConditionOperator::LessThanOrEqual,
            filter.incident_before,
        );
    }
}

#[async_trait]
impl Repository<IndisciplineRecord, CreateIndiscipline, UpdateIndiscipline, IndisciplineFilter>
    for IndisciplineRepository
{
    #[instrument(skip(self, data), fields(student_id = %data.student_id))]
    async fn create(&self, data: &CreateIndiscipline) -> Result<IndisciplineRecord> {
        IndisciplineValidator::create(data)?;

        let record = IndisciplineRecord {
            id: Uuid::new_v4(),
            student_id: data.student_id,
            reported_by: data.reported_by,
            incident_date: data.incident_date,
            description: data.description.clone(),
            severity: data.severity,
            status: IndisciplineStatus::Active,
            remediation: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO indiscipline_records (id, student_id, reported_by, incident_date, \
             description, severity, status, remediation, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(record.id)
        .bind(record.student_id)
        .bind(record.reported_by)
        .bind(record.incident_date)
        .bind(&record.description)
        .bind(record.severity)
        .bind(record.status)
        .bind(&record.remediation)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&self.base.pool)
        .await?;

        debug!(record_id = %record.id, "created indiscipline record");
        Ok(record)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<IndisciplineRecord> {
        sqlx::query_as::<_, IndisciplineRecord>(
            "SELECT * FROM indiscipline_records WHERE id = ? AND status != 'deleted'",
        )
        .bind(id)
        .fetch_optional(&self.base.pool)
        .await?
        .ok_or_else(|| AppError::not_found("indiscipline record", id))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &Uuid, changes: &UpdateIndiscipline) -> Result<IndisciplineRecord> {
        let changeset = IndisciplineValidator::update(changes)?;
        let changed = changeset.len();

        let mut qb = sqlx::QueryBuilder::new("UPDATE indiscipline_records SET ");
        changeset.apply(&mut qb);
        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(*id);
        qb.push(" AND status != 'deleted'");

        let result = qb.build().execute(&self.base.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("indiscipline record", id));
        }

        debug!(record_id = %id, columns = changed, "updated indiscipline record");
        self.get_by_id(id).await
    }

    /// Soft delete: the row stays for audit but disappears from reads
    #[instrument(skip(self))]
    async fn delete(&self, id: &Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE indiscipline_records SET status = 'deleted', updated_at = ? \
             WHERE id = ? AND status != 'deleted'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.base.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("indiscipline record", id));
        }
        debug!(record_id = %id, "soft-deleted indiscipline record");
        Ok(())
    }

    async fn list(&self, filter: &IndisciplineFilter) -> Result<Page<IndisciplineRecord>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM indiscipline_records");
        Self::apply_filters(&mut qb, filter);
        qb.add_order_by("incident_date", OrderDirection::Desc)
            .add_order_by("created_at", OrderDirection::Desc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<IndisciplineRecord>()
            .fetch_all(&self.base.pool)
            .await?;

        let total = self.count(filter).await?;
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &IndisciplineFilter) -> Result<i64> {
        let mut qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM indiscipline_records");
        Self::apply_filters(&mut qb, filter);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.base.pool).await?)
    }
}
