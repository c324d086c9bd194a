//! Base repository trait and implementations
//!
//! This module provides the base repository trait that defines the common
//! interface for all entity repositories. Lookups for a missing row return
//! `AppError::NotFound` rather than an optional, so callers never have to
//! invent their own not-found error at the boundary.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use sqlx::{Pool, Sqlite};
use std::fmt::Debug;
use uuid::Uuid;

use crate::error::{AppError, Result};

/// One page of a filtered listing, with the total matching-row count
/// computed from the same predicate
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
}

/// Base repository trait that defines common operations for all repositories
#[async_trait]
pub trait Repository<T, C, U, F>
where
    T: Serialize + DeserializeOwned + Send + Sync + Debug,
    C: Send + Sync + Debug,
    U: Send + Sync + Debug,
    F: Send + Sync + Debug,
{
    /// Create a new entity from a validated payload
    async fn create(&self, data: &C) -> Result<T>;

    /// Get the entity by ID
    async fn get_by_id(&self, id: &Uuid) -> Result<T>;

    /// Apply a partial update and return the updated entity
    async fn update(&self, id: &Uuid, changes: &U) -> Result<T>;

    /// Delete an entity by ID
    async fn delete(&self, id: &Uuid) -> Result<()>;

    /// List entities with optional filtering and pagination
    async fn list(&self, filter: &F) -> Result<Page<T>>;

    /// Count entities matching the filter, ignoring pagination
    async fn count(&self, filter: &F) -> Result<i64>;

    /// Check if an entity exists by ID
    async fn exists(&self, id: &Uuid) -> Result<bool> {
        match self.get_by_id(id).await {
            Ok(_) => Ok(true),
            Err(AppError::NotFound { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Base repository implementation that provides common functionality
#[derive(Clone)]
pub struct BaseRepository {
    /// Database connection pool
    pub pool: Pool<Sqlite>,
}

impl BaseRepository {
    /// Create a new base repository
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}
