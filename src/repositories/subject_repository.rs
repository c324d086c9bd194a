//! Subject repository implementation
//!
//! Deliberately minimal: subjects are reference data for grade records and
//! the class/teacher junction tables.

use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{CreateSubject, Subject, SubjectFilter};
use crate::error::{map_unique_violation, AppError, Result};
use crate::repositories::base::{BaseRepository, Page};
use crate::repositories::query_builder::{EnhancedQueryBuilder, OrderDirection};
use crate::repositories::validation::SubjectValidator;

/// Repository for subject reference data
#[derive(Clone)]
pub struct SubjectRepository {
    base: BaseRepository,
}

impl SubjectRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    #[instrument(skip(self, data), fields(code = %data.code))]
    pub async fn create(&self, data: &CreateSubject) -> Result<Subject> {
        SubjectValidator::create(data)?;

        let subject = Subject {
            id: Uuid::new_v4(),
            name: data.name.clone(),
            code: data.code.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO subjects (id, name, code, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(subject.id)
        .bind(&subject.name)
        .bind(&subject.code)
        .bind(subject.created_at)
        .bind(subject.updated_at)
        .execute(&self.base.pool)
        .await
        .map_err(|e| map_unique_violation(e, "subject"))?;

        debug!(subject_id = %subject.id, "created subject");
        Ok(subject)
    }

    pub async fn get_by_id(&self, id: &Uuid) -> Result<Subject> {
        sqlx::query_as::<_, Subject>("SELECT * FROM subjects WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.base.pool)
            .await?
            .ok_or_else(|| AppError::not_found("subject", id))
    }

    pub async fn list(&self, filter: &SubjectFilter) -> Result<Page<Subject>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM subjects");
        if let Some(term) = &filter.search_term {
            qb.add_search(&["name", "code"], term);
        }
        qb.add_order_by("name", OrderDirection::Asc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<Subject>()
            .fetch_all(&self.base.pool)
            .await?;

        let mut count_qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM subjects");
        if let Some(term) = &filter.search_term {
            count_qb.add_search(&["name", "code"], term);
        }
        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.base.pool)
            .await?;

        Ok(Page { items, total })
    }
}
