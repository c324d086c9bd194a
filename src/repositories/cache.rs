//! Caching for repositories
//!
//! A string-addressed key/value backend (`"<domain>:<prefix>:<id>"` keys,
//! JSON string values) plus a look-aside decorator over the notification
//! read path. The decorator is the one component allowed to swallow
//! errors: a failing backend degrades to a cache miss, logged and ignored,
//! so a broken cache never breaks a read.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::entities::{
    CreateNotification, Notification, NotificationFilter, UpdateNotification,
};
use crate::error::Result;
use crate::repositories::base::{Page, Repository};
use crate::repositories::notification_repository::NotificationRepository;

/// Default time-to-live for cached entries
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// A swappable key/value cache backend. Values are JSON strings so an
/// external store can be dropped in without touching the decorator.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value, `None` on miss or expiry
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set a value with a time-to-live
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Remove a single key
    async fn remove(&self, key: &str) -> Result<()>;

    /// Remove every key starting with the given prefix
    async fn remove_prefix(&self, prefix: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: String,
    expires_at: Instant,
}

/// In-process cache backend backed by a `tokio::sync::RwLock` map
#[derive(Default)]
pub struct MemoryCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.expires_at > Instant::now())
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        // Expired entries are dropped here rather than on a timer
        let now = Instant::now();
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }

    async fn remove_prefix(&self, prefix: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .retain(|key, _| !key.starts_with(prefix));
        Ok(())
    }
}

/// Look-aside cache decorator over [`NotificationRepository`]. Reads check
/// the backend first; every write invalidates the whole notification
/// prefix so list results never go stale.
pub struct CachedNotifications {
    inner: NotificationRepository,
    backend: Arc<dyn CacheBackend>,
    ttl: Duration,
}

impl CachedNotifications {
    pub fn new(inner: NotificationRepository, backend: Arc<dyn CacheBackend>, ttl: Duration) -> Self {
        Self { inner, backend, ttl }
    }

    fn entity_key(id: &Uuid) -> String {
        format!("notifications:id:{id}")
    }

    fn list_key(filter: &NotificationFilter) -> String {
        let fingerprint = serde_json::to_string(filter).unwrap_or_default();
        format!("notifications:list:{fingerprint}")
    }

    /// Backend read that degrades to a miss on any failure
    async fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.backend.get(key).await {
            Ok(Some(json)) => match serde_json::from_str(&json) {
                Ok(value) => {
                    debug!(key, "cache hit");
                    Some(value)
                }
                Err(err) => {
                    warn!(key, %err, "dropping undecodable cache entry");
                    let _ = self.backend.remove(key).await;
                    None
                }
            },
            Ok(None) => None,
            Err(err) => {
                warn!(key, %err, "cache backend read failed, treating as miss");
                None
            }
        }
    }

    /// Backend write; failures are logged and ignored
    async fn store<T: Serialize>(&self, key: &str, value: &T) {
        let Ok(json) = serde_json::to_string(value) else {
            return;
        };
        if let Err(err) = self.backend.set(key, json, self.ttl).await {
            warn!(key, %err, "cache backend write failed");
        }
    }

    async fn invalidate(&self) {
        if let Err(err) = self.backend.remove_prefix("notifications:").await {
            warn!(%err, "cache invalidation failed");
        }
    }
}

#[async_trait]
impl Repository<Notification, CreateNotification, UpdateNotification, NotificationFilter>
    for CachedNotifications
{
    async fn create(&self, data: &CreateNotification) -> Result<Notification> {
        let created = self.inner.create(data).await?;
        self.invalidate().await;
        Ok(created)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &Uuid) -> Result<Notification> {
        let key = Self::entity_key(id);
        if let Some(hit) = self.cached::<Notification>(&key).await {
            return Ok(hit);
        }
        let notification = self.inner.get_by_id(id).await?;
        self.store(&key, &notification).await;
        Ok(notification)
    }

    async fn update(&self, id: &Uuid, changes: &UpdateNotification) -> Result<Notification> {
        let updated = self.inner.update(id, changes).await?;
        self.invalidate().await;
        Ok(updated)
    }

    async fn delete(&self, id: &Uuid) -> Result<()> {
        self.inner.delete(id).await?;
        self.invalidate().await;
        Ok(())
    }

    #[instrument(skip(self, filter))]
    async fn list(&self, filter: &NotificationFilter) -> Result<Page<Notification>> {
        let key = Self::list_key(filter);
        if let Some(hit) = self.cached::<Page<Notification>>(&key).await {
            return Ok(hit);
        }
        let page = self.inner.list(filter).await?;
        self.store(&key, &page).await;
        Ok(page)
    }

    async fn count(&self, filter: &NotificationFilter) -> Result<i64> {
        self.inner.count(filter).await
    }
}
