//! Cache backend and decorator tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::entities::{NotificationFilter, UpdateNotification};
use crate::error::{AppError, Result};
use crate::repositories::cache::{CacheBackend, CachedNotifications, MemoryCache, DEFAULT_TTL};
use crate::repositories::tests::{generators, setup_test_db};
use crate::repositories::{NotificationRepository, Repository};

/// Backend that fails every operation; the decorator must shrug it off
struct BrokenBackend;

#[async_trait]
impl CacheBackend for BrokenBackend {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(AppError::external_service("cache down"))
    }
    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
        Err(AppError::external_service("cache down"))
    }
    async fn remove(&self, _key: &str) -> Result<()> {
        Err(AppError::external_service("cache down"))
    }
    async fn remove_prefix(&self, _prefix: &str) -> Result<()> {
        Err(AppError::external_service("cache down"))
    }
}

#[tokio::test]
async fn memory_cache_honors_ttl_and_prefix_removal() {
    let cache = MemoryCache::new();
    cache
        .set("notifications:id:a", "1".to_string(), Duration::from_millis(20))
        .await
        .unwrap();
    cache
        .set("notifications:list:{}", "2".to_string(), DEFAULT_TTL)
        .await
        .unwrap();
    cache
        .set("other:id:b", "3".to_string(), DEFAULT_TTL)
        .await
        .unwrap();

    assert_eq!(
        cache.get("notifications:id:a").await.unwrap(),
        Some("1".to_string())
    );
    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(cache.get("notifications:id:a").await.unwrap(), None);

    cache.remove_prefix("notifications:").await.unwrap();
    assert_eq!(cache.get("notifications:list:{}").await.unwrap(), None);
    assert_eq!(cache.get("other:id:b").await.unwrap(), Some("3".to_string()));
}

#[tokio::test]
async fn second_read_is_served_from_the_cache() {
    let pool = setup_test_db().await;
    let backend = Arc::new(MemoryCache::new());
    let repo = CachedNotifications::new(
        NotificationRepository::new(pool.clone()),
        backend,
        DEFAULT_TTL,
    );

    let created = repo.create(&generators::notification()).await.unwrap();
    let first = repo.get_by_id(&created.id).await.unwrap();

    // Change the row behind the decorator's back; a cached read won't see it
    sqlx::query("UPDATE notifications SET title = 'changed underneath' WHERE id = ?")
        .bind(created.id)
        .execute(&pool)
        .await
        .unwrap();

    let second = repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(second.title, first.title);
}

#[tokio::test]
async fn writes_invalidate_cached_reads() {
    let pool = setup_test_db().await;
    let backend = Arc::new(MemoryCache::new());
    let repo =
        CachedNotifications::new(NotificationRepository::new(pool), backend, DEFAULT_TTL);

    let created = repo.create(&generators::notification()).await.unwrap();
    repo.get_by_id(&created.id).await.unwrap();
    assert_eq!(repo.list(&NotificationFilter::default()).await.unwrap().total, 1);

    let updated = repo
        .update(
            &created.id,
            &UpdateNotification {
                title: Some("Fresh title".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.title, "Fresh title");

    // Both the entity key and the list prefix were dropped
    assert_eq!(repo.get_by_id(&created.id).await.unwrap().title, "Fresh title");
    let page = repo.list(&NotificationFilter::default()).await.unwrap();
    assert_eq!(page.items[0].title, "Fresh title");
}

#[tokio::test]
async fn soft_delete_through_the_decorator_drops_the_cached_entity() {
    let pool = setup_test_db().await;
    let backend = Arc::new(MemoryCache::new());
    let repo =
        CachedNotifications::new(NotificationRepository::new(pool), backend, DEFAULT_TTL);

    let created = repo.create(&generators::notification()).await.unwrap();
    repo.get_by_id(&created.id).await.unwrap();

    repo.delete(&created.id).await.unwrap();
    assert!(matches!(
        repo.get_by_id(&created.id).await.unwrap_err(),
        AppError::NotFound { .. }
    ));
}

#[tokio::test]
async fn broken_backend_degrades_to_plain_reads() {
    let pool = setup_test_db().await;
    let repo = CachedNotifications::new(
        NotificationRepository::new(pool),
        Arc::new(BrokenBackend),
        DEFAULT_TTL,
    );

    let created = repo.create(&generators::notification()).await.unwrap();
    // Every backend call fails, yet reads and writes still work
    assert_eq!(repo.get_by_id(&created.id).await.unwrap().id, created.id);
    assert_eq!(repo.list(&NotificationFilter::default()).await.unwrap().total, 1);
    repo.delete(&created.id).await.unwrap();
}

#[tokio::test]
async fn distinct_filters_cache_distinct_pages() {
    let pool = setup_test_db().await;
    let backend = Arc::new(MemoryCache::new());
    let repo = CachedNotifications::new(
        NotificationRepository::new(pool),
        backend.clone(),
        DEFAULT_TTL,
    );

    repo.create(&generators::notification()).await.unwrap();
    repo.list(&NotificationFilter::default()).await.unwrap();
    repo.list(&NotificationFilter {
        search_term: Some("sports".to_string()),
        ..Default::default()
    })
    .await
    .unwrap();

    // One entry per distinct filter fingerprint
    assert_eq!(backend.len().await, 2);
}
