//! Repository layer
//!
//! Each entity has one repository that owns all of its SQL. Repositories
//! are constructed from an injected pool, validate through the validation
//! layer, and map store-level failures to the application error taxonomy.

pub mod base;
pub mod cache;
pub mod class_repository;
pub mod factory;
pub mod grade_repository;
pub mod indiscipline_repository;
pub mod invite_repository;
pub mod notification_repository;
pub mod query_builder;
pub mod student_repository;
pub mod subject_repository;
pub mod teacher_repository;
pub mod validation;

pub use base::{BaseRepository, Page, Repository};
pub use cache::{CacheBackend, CachedNotifications, MemoryCache};
pub use class_repository::ClassRepository;
pub use factory::RepositoryFactory;
pub use grade_repository::GradeRepository;
pub use indiscipline_repository::IndisciplineRepository;
pub use invite_repository::InviteRepository;
pub use notification_repository::NotificationRepository;
pub use student_repository::StudentRepository;
pub use subject_repository::SubjectRepository;
pub use teacher_repository::TeacherRepository;

#[cfg(test)]
pub mod tests;
