//! Invite repository implementation
//!
//! Acceptance is written as one conditional UPDATE so two concurrent
//! accepts of the same token produce exactly one winner; the store's
//! isolation is the only coordination mechanism.

use chrono::{DateTime, Duration, Utc};
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{CreateInvite, Invite, InviteFilter, InviteStatus};
use crate::error::{map_unique_violation, AppError, Result};
use crate::repositories::base::{BaseRepository, Page};
use crate::repositories::query_builder::{ConditionOperator, EnhancedQueryBuilder, OrderDirection};
use crate::repositories::validation::InviteValidator;

/// Invites expire this long after creation unless the payload overrides it
const DEFAULT_EXPIRY_DAYS: i64 = 7;

/// Repository for invite operations
#[derive(Clone)]
pub struct InviteRepository {
    base: BaseRepository,
}

impl InviteRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn create(&self, data: &CreateInvite) -> Result<Invite> {
        InviteValidator::create(data)?;

        let now = Utc::now();
        let invite = Invite {
            id: Uuid::new_v4(),
            email: data.email.clone(),
            role: data.role,
            invited_by: data.invited_by,
            status: InviteStatus::Pending,
            token: generate_token(),
            expires_at: data
                .expires_at
                .unwrap_or(now + Duration::days(DEFAULT_EXPIRY_DAYS)),
            accepted_at: None,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            "INSERT INTO invites (id, email, role, invited_by, status, token, expires_at, \
             accepted_at, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(invite.id)
        .bind(&invite.email)
        .bind(invite.role)
        .bind(invite.invited_by)
        .bind(invite.status)
        .bind(&invite.token)
        .bind(invite.expires_at)
        .bind(invite.accepted_at)
        .bind(invite.created_at)
        .bind(invite.updated_at)
        .execute(&self.base.pool)
        .await
        .map_err(|e| map_unique_violation(e, "invite"))?;

        debug!(invite_id = %invite.id, "created invite");
        Ok(invite)
    }

    pub async fn get_by_id(&self, id: &Uuid) -> Result<Invite> {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.base.pool)
            .await?
            .ok_or_else(|| AppError::not_found("invite", id))
    }

    pub async fn get_by_token(&self, token: &str) -> Result<Invite> {
        sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE token = ?")
            .bind(token)
            .fetch_optional(&self.base.pool)
            .await?
            .ok_or_else(|| AppError::not_found("invite", token))
    }

    /// Accept a pending, unexpired invite. The transition is one
    /// conditional UPDATE; when it affects zero rows the invite is re-read
    /// to report why the caller lost.
    #[instrument(skip(self))]
    pub async fn accept(&self, id: &Uuid, now: DateTime<Utc>) -> Result<Invite> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'accepted', accepted_at = ?, updated_at = ? \
             WHERE id = ? AND status = 'pending' AND expires_at > ?",
        )
        .bind(now)
        .bind(now)
        .bind(id)
        .bind(now)
        .execute(&self.base.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.base.pool)
                .await?
            {
                Some(invite) if invite.status != InviteStatus::Pending => {
                    Err(AppError::already_processed("invite", id))
                }
                // Pending but past expiry, or row gone
                _ => Err(AppError::not_found("invite", id)),
            };
        }

        debug!(invite_id = %id, "accepted invite");
        self.get_by_id(id).await
    }

    /// Cancel a pending invite
    #[instrument(skip(self))]
    pub async fn cancel(&self, id: &Uuid) -> Result<Invite> {
        let result = sqlx::query(
            "UPDATE invites SET status = 'cancelled', updated_at = ? \
             WHERE id = ? AND status = 'pending'",
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.base.pool)
        .await?;

        if result.rows_affected() == 0 {
            return match sqlx::query_as::<_, Invite>("SELECT * FROM invites WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.base.pool)
                .await?
            {
                Some(_) => Err(AppError::already_processed("invite", id)),
                None => Err(AppError::not_found("invite", id)),
            };
        }

        debug!(invite_id = %id, "cancelled invite");
        self.get_by_id(id).await
    }

    pub async fn list(&self, filter: &InviteFilter) -> Result<Page<Invite>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM invites");
        Self::apply_filters(&mut qb, filter);
        qb.add_order_by("created_at", OrderDirection::Desc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<Invite>()
            .fetch_all(&self.base.pool)
            .await?;

        let mut count_qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM invites");
        Self::apply_filters(&mut count_qb, filter);
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.base.pool)
            .await?;

        Ok(Page { items, total })
    }

    fn apply_filters(qb: &mut EnhancedQueryBuilder<'_>, filter: &InviteFilter) {
        qb.add_condition("email", ConditionOperator::Equal, filter.email.clone());
        qb.add_condition("role", ConditionOperator::Equal, filter.role);
        qb.add_condition("status", ConditionOperator::Equal, filter.status);
        qb.add_condition("invited_by", ConditionOperator::Equal, filter.invited_by);
    }
}

/// Opaque URL-safe token; random enough that guessing is impractical.
/// Token signing is out of scope here.
fn generate_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_and_url_safe() {
        let a = generate_token();
        let b = generate_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
