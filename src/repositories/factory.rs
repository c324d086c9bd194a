//! Repository factory
//!
//! Central construction point so callers hold one handle instead of a pool
//! plus eight constructors. Repositories are cheap to create; the factory
//! hands out fresh instances sharing the injected pool.

use std::sync::Arc;

use sqlx::{Pool, Sqlite};

use crate::repositories::cache::{CacheBackend, CachedNotifications, DEFAULT_TTL};
use crate::repositories::class_repository::ClassRepository;
use crate::repositories::grade_repository::GradeRepository;
use crate::repositories::indiscipline_repository::IndisciplineRepository;
use crate::repositories::invite_repository::InviteRepository;
use crate::repositories::notification_repository::NotificationRepository;
use crate::repositories::student_repository::StudentRepository;
use crate::repositories::subject_repository::SubjectRepository;
use crate::repositories::teacher_repository::TeacherRepository;

/// Factory for creating repositories from one injected pool
#[derive(Clone)]
pub struct RepositoryFactory {
    pool: Pool<Sqlite>,
}

impl RepositoryFactory {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub fn students(&self) -> StudentRepository {
        StudentRepository::new(self.pool.clone())
    }

    pub fn teachers(&self) -> TeacherRepository {
        TeacherRepository::new(self.pool.clone())
    }

    pub fn subjects(&self) -> SubjectRepository {
        SubjectRepository::new(self.pool.clone())
    }

    pub fn classes(&self) -> ClassRepository {
        ClassRepository::new(self.pool.clone())
    }

    pub fn grades(&self) -> GradeRepository {
        GradeRepository::new(self.pool.clone())
    }

    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository::new(self.pool.clone())
    }

    /// Notification repository wrapped in the look-aside cache decorator
    pub fn cached_notifications(&self, backend: Arc<dyn CacheBackend>) -> CachedNotifications {
        CachedNotifications::new(self.notifications(), backend, DEFAULT_TTL)
    }

    pub fn indiscipline(&self) -> IndisciplineRepository {
        IndisciplineRepository::new(self.pool.clone())
    }

    pub fn invites(&self) -> InviteRepository {
        InviteRepository::new(self.pool.clone())
    }
}
