//! Scheduled maintenance
//!
//! A daily sweep transitions overdue active notifications to `expired`.
//! The sweep is guarded by a store-level lease row so concurrent processes
//! sharing a database file stay single-flight: only the holder that
//! atomically wins the lease proceeds. A failed run logs and waits for the
//! next tick; there is no in-run retry.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::{Pool, Sqlite};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::repositories::NotificationRepository;

const LEASE_NAME: &str = "notification_expiry";

/// Sweeps due notifications to `expired` under a store-level lease
pub struct NotificationExpiryJob {
    pool: Pool<Sqlite>,
    /// Unique per job instance; ties lease rows to their owner
    holder: String,
    lease_ttl: ChronoDuration,
}

impl NotificationExpiryJob {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            holder: Uuid::new_v4().to_string(),
            // Generous bound on a single sweep; a crashed holder's lease
            // lapses after this and the next tick takes over
            lease_ttl: ChronoDuration::minutes(10),
        }
    }

    pub fn with_lease_ttl(mut self, ttl: ChronoDuration) -> Self {
        self.lease_ttl = ttl;
        self
    }

    /// Atomically take the lease: insert it, or steal it only if the
    /// previous holder's expiry has passed. Zero affected rows means
    /// another holder is live.
    async fn acquire_lease(&self, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO maintenance_leases (name, holder, acquired_at, expires_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (name) DO UPDATE SET \
               holder = excluded.holder, \
               acquired_at = excluded.acquired_at, \
               expires_at = excluded.expires_at \
             WHERE maintenance_leases.expires_at <= excluded.acquired_at",
        )
        .bind(LEASE_NAME)
        .bind(&self.holder)
        .bind(now)
        .bind(now + self.lease_ttl)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn release_lease(&self) -> Result<()> {
        sqlx::query("DELETE FROM maintenance_leases WHERE name = ? AND holder = ?")
            .bind(LEASE_NAME)
            .bind(&self.holder)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// One sweep attempt. `Ok(None)` means the lease was held elsewhere
    /// and nothing ran; `Ok(Some(n))` is the number of rows expired.
    #[instrument(skip(self), fields(holder = %self.holder))]
    pub async fn run_once(&self) -> Result<Option<u64>> {
        let now = Utc::now();
        if !self.acquire_lease(now).await? {
            debug!("lease held elsewhere, skipping sweep");
            return Ok(None);
        }

        let swept = NotificationRepository::new(self.pool.clone())
            .expire_due(now)
            .await;

        // Release even when the sweep failed; holding a dead lease only
        // delays the next attempt
        if let Err(err) = self.release_lease().await {
            warn!(%err, "failed to release maintenance lease");
        }

        swept.map(Some)
    }

    /// Run the sweep on a fixed interval until the task is aborted
    pub fn spawn(self, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                match self.run_once().await {
                    Ok(Some(swept)) => info!(swept, "notification expiry sweep finished"),
                    Ok(None) => info!("notification expiry sweep skipped"),
                    Err(err) => warn!(%err, "notification expiry sweep failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{AudienceRole, CreateNotification, NotificationPriority, NotificationStatus};
    use crate::repositories::tests::setup_test_db;
    use crate::repositories::Repository;

    async fn seed_notification(
        pool: &Pool<Sqlite>,
        expires_at: Option<DateTime<Utc>>,
    ) -> crate::entities::Notification {
        NotificationRepository::new(pool.clone())
            .create(&CreateNotification {
                title: "Sweep target".to_string(),
                message: "body".to_string(),
                priority: NotificationPriority::Low,
                target_audience: vec![AudienceRole::Admin],
                scheduled_at: None,
                expires_at,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn sweep_expires_only_due_notifications() {
        let pool = setup_test_db().await;
        let repo = NotificationRepository::new(pool.clone());

        let due = seed_notification(&pool, Some(Utc::now() - ChronoDuration::hours(1))).await;
        let future = seed_notification(&pool, Some(Utc::now() + ChronoDuration::hours(1))).await;
        let open_ended = seed_notification(&pool, None).await;

        let job = NotificationExpiryJob::new(pool.clone());
        let swept = job.run_once().await.unwrap();
        assert_eq!(swept, Some(1));

        assert_eq!(
            repo.get_by_id(&due.id).await.unwrap().status,
            NotificationStatus::Expired
        );
        assert_eq!(
            repo.get_by_id(&future.id).await.unwrap().status,
            NotificationStatus::Active
        );
        assert_eq!(
            repo.get_by_id(&open_ended.id).await.unwrap().status,
            NotificationStatus::Active
        );
    }

    #[tokio::test]
    async fn sweep_is_idempotent() {
        let pool = setup_test_db().await;
        seed_notification(&pool, Some(Utc::now() - ChronoDuration::hours(1))).await;

        let job = NotificationExpiryJob::new(pool.clone());
        assert_eq!(job.run_once().await.unwrap(), Some(1));
        assert_eq!(job.run_once().await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn live_lease_blocks_a_second_holder() {
        let pool = setup_test_db().await;
        seed_notification(&pool, Some(Utc::now() - ChronoDuration::hours(1))).await;

        let first = NotificationExpiryJob::new(pool.clone());
        assert!(first.acquire_lease(Utc::now()).await.unwrap());

        // Second holder loses while the first lease is live
        let second = NotificationExpiryJob::new(pool.clone());
        assert_eq!(second.run_once().await.unwrap(), None);

        first.release_lease().await.unwrap();
        assert_eq!(second.run_once().await.unwrap(), Some(1));
    }

    #[tokio::test]
    async fn lapsed_lease_can_be_stolen() {
        let pool = setup_test_db().await;

        let crashed = NotificationExpiryJob::new(pool.clone())
            .with_lease_ttl(ChronoDuration::seconds(-1));
        assert!(crashed.acquire_lease(Utc::now()).await.unwrap());

        let successor = NotificationExpiryJob::new(pool.clone());
        assert_eq!(successor.run_once().await.unwrap(), Some(0));
    }
}
