//! Notification repository implementation
//!
//! Notifications are soft-deleted: `delete` transitions status to the
//! terminal `deleted` value and every read path excludes those rows.
//! Expiry is batch-driven by the maintenance sweep via [`expire_due`].
//!
//! [`expire_due`]: NotificationRepository::expire_due

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::entities::{
    CreateNotification, Notification, NotificationFilter, NotificationStatus, UpdateNotification,
};
use crate::error::{AppError, Result};
use crate::repositories::base::{BaseRepository, Page, Repository};
use crate::repositories::query_builder::{ConditionOperator, EnhancedQueryBuilder, OrderDirection};
use crate::repositories::validation::NotificationValidator;

/// Repository for notification operations
#[derive(Clone)]
pub struct NotificationRepository {
    base: BaseRepository,
}

impl NotificationRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    /// Transition every active notification whose expiry has passed to
    /// `expired`. Returns the number of rows swept.
    #[instrument(skip(self))]
    pub async fn expire_due(&self, now: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'expired', updated_at = ? \
             WHERE status = 'active' AND expires_at IS NOT NULL AND expires_at <= ?",
        )
        .bind(now)
        .bind(now)
        .execute(&self.base.pool)
        .await?;

        let swept = result.rows_affected();
        if swept > 0 {
            info!(swept, "expired due notifications");
        }
        Ok(swept)
    }

    fn apply_filters(qb: &mut EnhancedQueryBuilder<'_>, filter: &NotificationFilter) {
        match filter.status {
            Some(status) => {
                qb.add_condition("status", ConditionOperator::Equal, Some(status));
            }
            None => {
                qb.add_raw_condition("status != 'deleted'");
            }
        }
        qb.add_condition("priority", ConditionOperator::Equal, filter.priority);
        if let Some(role) = filter.audience_role {
            // Audience is a JSON array of role strings; containment is a
            // substring match on the quoted role name
            let pattern = format!("%\"{}\"%", role.as_str());
            qb.add_condition("target_audience", ConditionOperator::Like, Some(pattern));
        }
        qb.add_condition(
            "created_at",
            ConditionOperator::GreaterThanOrEqual,
            filter.created_after,
        );
        qb.add_condition(
            "created_at",
            ConditionOperator::LessThanOrEqual,
            filter.created_before,
        );
        if let Some(term) = &filter.search_term {
            qb.add_search(&["title", "message"], term);
        }
    }
}

#[async_trait]
impl Repository<Notification, CreateNotification, UpdateNotification, NotificationFilter>
    for NotificationRepository
{
    #[instrument(skip(self, data), fields(title = %data.title))]
    async fn create(&self, data: &CreateNotification) -> Result<Notification> {
        NotificationValidator::create(data)?;

        let notification = Notification {
            id: Uuid::new_v4(),
            title: data.title.clone(),
            message: data.message.clone(),
            priority: data.priority,
            target_audience: Json(data.target_audience.clone()),
            status: NotificationStatus::Active,
            scheduled_at: data.scheduled_at,
            expires_at: data.expires_at,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO notifications (id, title, message, priority, target_audience, status, \
             scheduled_at, expires_at, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(notification.id)
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.priority)
        .bind(serde_json::to_string(&notification.target_audience.0)?)
        .bind(notification.status)
        .bind(notification.scheduled_at)
        .bind(notification.expires_at)
        .bind(notification.created_at)
        .bind(notification.updated_at)
        .execute(&self.base.pool)
        .await?;

        debug!(notification_id = %notification.id, "created notification");
        Ok(notification)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Notification> {
        sqlx::query_as::<_, Notification>(
            "SELECT * FROM notifications WHERE id = ? AND status != 'deleted'",
        )
        .bind(id)
        .fetch_optional(&self.base.pool)
        .await?
        .ok_or_else(|| AppError::not_found("notification", id))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &Uuid, changes: &UpdateNotification) -> Result<Notification> {
        let changeset = NotificationValidator::update(changes)?;
        let changed = changeset.len();

        let mut qb = sqlx::QueryBuilder::new("UPDATE notifications SET ");
        changeset.apply(&mut qb);
        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(*id);
        qb.push(" AND status != 'deleted'");

        let result = qb.build().execute(&self.base.pool).await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("notification", id));
        }

        debug!(notification_id = %id, columns = changed, "updated notification");
        self.get_by_id(id).await
    }

    /// Soft delete: the row stays for audit but disappears from reads
    #[instrument(skip(self))]
    async fn delete(&self, id: &Uuid) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notifications SET status = 'deleted', updated_at = ? \
             WHERE id = ? AND status != 'deleted'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.base.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("notification", id));
        }
        debug!(notification_id = %id, "soft-deleted notification");
        Ok(())
    }

    async fn list(&self, filter: &NotificationFilter) -> Result<Page<Notification>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM notifications");
        Self::apply_filters(&mut qb, filter);
        qb.add_order_by("created_at", OrderDirection::Desc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<Notification>()
            .fetch_all(&self.base.pool)
            .await?;

        let total = self.count(filter).await?;
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<i64> {
        let mut qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM notifications");
        Self::apply_filters(&mut qb, filter);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.base.pool).await?)
    }
}
