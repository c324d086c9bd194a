//! Teacher repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, Sqlite};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::entities::{
    CreateTeacher, Teacher, TeacherFilter, TeacherIdentifier, TeacherStatus, UpdateTeacher,
};
use crate::error::{map_unique_violation, AppError, Result};
use crate::repositories::base::{BaseRepository, Page, Repository};
use crate::repositories::query_builder::{ConditionOperator, EnhancedQueryBuilder, OrderDirection};
use crate::repositories::validation::TeacherValidator;

/// Repository for teacher operations
#[derive(Clone)]
pub struct TeacherRepository {
    base: BaseRepository,
}

impl TeacherRepository {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            base: BaseRepository::new(pool),
        }
    }

    /// Resolve a teacher by whichever identifier fields are present, in a
    /// fixed precedence order: id, then employee number, then email
    #[instrument(skip(self))]
    pub async fn get_by_identifier(&self, identifier: &TeacherIdentifier) -> Result<Teacher> {
        if let Some(id) = identifier.id {
            return self.get_by_id(&id).await;
        }
        if let Some(employee_no) = &identifier.employee_no {
            let teacher =
                sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE employee_no = ?")
                    .bind(employee_no)
                    .fetch_optional(&self.base.pool)
                    .await?;
            return teacher.ok_or_else(|| AppError::not_found("teacher", employee_no));
        }
        if let Some(email) = &identifier.email {
            let teacher = sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE email = ?")
                .bind(email)
                .fetch_optional(&self.base.pool)
                .await?;
            return teacher.ok_or_else(|| AppError::not_found("teacher", email));
        }
        Err(AppError::invalid_field(
            "identifier",
            "at least one identifier field is required",
        ))
    }

    fn apply_filters(qb: &mut EnhancedQueryBuilder<'_>, filter: &TeacherFilter) {
        qb.add_condition("status", ConditionOperator::Equal, filter.status);
        if let Some(term) = &filter.search_term {
            qb.add_search(&["first_name", "last_name", "email", "employee_no"], term);
        }
    }
}

#[async_trait]
impl Repository<Teacher, CreateTeacher, UpdateTeacher, TeacherFilter> for TeacherRepository {
    #[instrument(skip(self, data), fields(employee_no = %data.employee_no))]
    async fn create(&self, data: &CreateTeacher) -> Result<Teacher> {
        TeacherValidator::create(data)?;

        let teacher = Teacher {
            id: Uuid::new_v4(),
            employee_no: data.employee_no.clone(),
            first_name: data.first_name.clone(),
            last_name: data.last_name.clone(),
            email: data.email.clone(),
            phone: data.phone.clone(),
            status: TeacherStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO teachers (id, employee_no, first_name, last_name, email, phone, \
             status, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(teacher.id)
        .bind(&teacher.employee_no)
        .bind(&teacher.first_name)
        .bind(&teacher.last_name)
        .bind(&teacher.email)
        .bind(&teacher.phone)
        .bind(teacher.status)
        .bind(teacher.created_at)
        .bind(teacher.updated_at)
        .execute(&self.base.pool)
        .await
        .map_err(|e| map_unique_violation(e, "teacher"))?;

        debug!(teacher_id = %teacher.id, "created teacher");
        Ok(teacher)
    }

    async fn get_by_id(&self, id: &Uuid) -> Result<Teacher> {
        sqlx::query_as::<_, Teacher>("SELECT * FROM teachers WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.base.pool)
            .await?
            .ok_or_else(|| AppError::not_found("teacher", id))
    }

    #[instrument(skip(self, changes))]
    async fn update(&self, id: &Uuid, changes: &UpdateTeacher) -> Result<Teacher> {
        let changeset = TeacherValidator::update(changes)?;
        let changed = changeset.len();

        let mut qb = sqlx::QueryBuilder::new("UPDATE teachers SET ");
        changeset.apply(&mut qb);
        qb.push(", updated_at = ");
        qb.push_bind(Utc::now());
        qb.push(" WHERE id = ");
        qb.push_bind(*id);

        let result = qb
            .build()
            .execute(&self.base.pool)
            .await
            .map_err(|e| map_unique_violation(e, "teacher"))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("teacher", id));
        }

        debug!(teacher_id = %id, columns = changed, "updated teacher");
        self.get_by_id(id).await
    }

    /// Hard delete. Refused while indiscipline records name the teacher as
    /// reporter; class and subject assignments are unlinked in the same
    /// transaction.
    #[instrument(skip(self))]
    async fn delete(&self, id: &Uuid) -> Result<()> {
        let reports = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM indiscipline_records WHERE reported_by = ?",
        )
        .bind(id)
        .fetch_one(&self.base.pool)
        .await?;
        if reports > 0 {
            return Err(AppError::dependency(
                "teacher",
                format!("{reports} indiscipline record(s) were reported by this teacher"),
            ));
        }

        let mut tx = self.base.pool.begin().await?;
        sqlx::query("DELETE FROM class_teachers WHERE teacher_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM teacher_subjects WHERE teacher_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let result = sqlx::query("DELETE FROM teachers WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("teacher", id));
        }
        tx.commit().await?;
        debug!(teacher_id = %id, "deleted teacher");
        Ok(())
    }

    async fn list(&self, filter: &TeacherFilter) -> Result<Page<Teacher>> {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM teachers");
        Self::apply_filters(&mut qb, filter);
        qb.add_order_by("last_name", OrderDirection::Asc)
            .add_order_by("first_name", OrderDirection::Asc)
            .add_pagination(filter.limit, filter.offset);
        let items = qb
            .build_query_as::<Teacher>()
            .fetch_all(&self.base.pool)
            .await?;

        let total = self.count(filter).await?;
        Ok(Page { items, total })
    }

    async fn count(&self, filter: &TeacherFilter) -> Result<i64> {
        let mut qb = EnhancedQueryBuilder::new("SELECT COUNT(*) FROM teachers");
        Self::apply_filters(&mut qb, filter);
        Ok(qb.build_query_scalar::<i64>().fetch_one(&self.base.pool).await?)
    }
}
