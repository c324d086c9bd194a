//! Specialized query builder for repositories
//!
//! Wraps `sqlx::QueryBuilder` so list and count queries can share one
//! filter-application path. Every value travels through `push_bind`;
//! filters never interpolate into the SQL text.

use sqlx::{QueryBuilder, Sqlite};
use std::fmt::Debug;

/// Condition operator for query building
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionOperator {
    /// Equal (=)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Greater than or equal (>=)
    GreaterThanOrEqual,
    /// Less than or equal (<=)
    LessThanOrEqual,
    /// Like (LIKE)
    Like,
}

impl ConditionOperator {
    /// Get the SQL representation of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Equal => "=",
            Self::NotEqual => "!=",
            Self::GreaterThanOrEqual => ">=",
            Self::LessThanOrEqual => "<=",
            Self::Like => "LIKE",
        }
    }
}

/// Logical operator for combining conditions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOperator {
    /// AND
    And,
    /// OR
    Or,
}

impl LogicalOperator {
    /// Get the SQL representation of the operator
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

/// Order direction for sorting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl OrderDirection {
    /// Get the SQL representation of the direction
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Query builder with conditional WHERE assembly. Conditions on absent
/// filter fields are skipped, so a default filter produces the bare base
/// query.
pub struct EnhancedQueryBuilder<'a> {
    builder: QueryBuilder<'a, Sqlite>,
    has_where: bool,
    has_order_by: bool,
}

impl<'a> EnhancedQueryBuilder<'a> {
    /// Create a new query builder with the given base query
    pub fn new(base_query: &str) -> Self {
        Self {
            builder: QueryBuilder::new(base_query),
            has_where: false,
            has_order_by: false,
        }
    }

    /// Add a WHERE clause if one hasn't been added yet, otherwise add the
    /// given logical operator
    pub fn add_where_clause(&mut self, logical_op: Option<LogicalOperator>) -> &mut Self {
        if !self.has_where {
            self.builder.push(" WHERE ");
            self.has_where = true;
        } else if let Some(op) = logical_op {
            self.builder.push(format!(" {} ", op.as_sql()));
        }
        self
    }

    /// Add a condition to the query; skipped entirely when `value` is None
    pub fn add_condition<T>(
        &mut self,
        field: &str,
        op: ConditionOperator,
        value: Option<T>,
    ) -> &mut Self
    where
        T: Debug + sqlx::Encode<'a, Sqlite> + sqlx::Type<Sqlite> + Send + 'a,
    {
        let Some(value) = value else {
            return self;
        };

        self.add_where_clause(Some(LogicalOperator::And));
        self.builder.push(format!("{} {} ", field, op.as_sql()));
        self.builder.push_bind(value);
        self
    }

    /// Add a condition whose SQL carries no bound value, e.g. a fixed
    /// status exclusion
    pub fn add_raw_condition(&mut self, condition: &str) -> &mut Self {
        self.add_where_clause(Some(LogicalOperator::And));
        self.builder.push(condition);
        self
    }

    /// Add a grouped case-insensitive LIKE across several columns:
    /// `(col1 LIKE ? OR col2 LIKE ?)` with `%term%` bound for each
    pub fn add_search(&mut self, columns: &[&str], term: &str) -> &mut Self {
        if columns.is_empty() || term.is_empty() {
            return self;
        }

        let pattern = format!("%{term}%");
        self.add_where_clause(Some(LogicalOperator::And));
        self.builder.push("(");
        for (i, column) in columns.iter().enumerate() {
            if i > 0 {
                self.builder.push(format!(" {} ", LogicalOperator::Or.as_sql()));
            }
            self.builder
                .push(format!("{column} {} ", ConditionOperator::Like.as_sql()));
            self.builder.push_bind(pattern.clone());
        }
        self.builder.push(")");
        self
    }

    /// Add an ORDER BY clause
    pub fn add_order_by(&mut self, field: &str, direction: OrderDirection) -> &mut Self {
        if !self.has_order_by {
            self.builder.push(" ORDER BY ");
            self.has_order_by = true;
        } else {
            self.builder.push(", ");
        }

        self.builder.push(format!("{} {}", field, direction.as_sql()));
        self
    }

    /// Add LIMIT and OFFSET clauses from optional pagination fields
    pub fn add_pagination(&mut self, limit: Option<u32>, offset: Option<u32>) -> &mut Self {
        if let Some(limit) = limit {
            self.builder.push(" LIMIT ");
            self.builder.push_bind(i64::from(limit));
        }
        if let Some(offset) = offset {
            self.builder.push(" OFFSET ");
            self.builder.push_bind(i64::from(offset));
        }
        self
    }

    /// Build the query as a specific type
    pub fn build_query_as<T>(
        &mut self,
    ) -> sqlx::query::QueryAs<'_, Sqlite, T, sqlx::sqlite::SqliteArguments<'a>>
    where
        T: for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow> + Send + Unpin,
    {
        self.builder.build_query_as()
    }

    /// Build the query for single-column scalar results
    pub fn build_query_scalar<T>(
        &mut self,
    ) -> sqlx::query::QueryScalar<'_, Sqlite, T, sqlx::sqlite::SqliteArguments<'a>>
    where
        (T,): for<'r> sqlx::FromRow<'r, sqlx::sqlite::SqliteRow>,
        T: Send + Unpin,
    {
        self.builder.build_query_scalar()
    }

    /// Get a mutable reference to the underlying SQLx query builder
    pub fn builder_mut(&mut self) -> &mut QueryBuilder<'a, Sqlite> {
        &mut self.builder
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conditions_join_with_and_after_first_where() {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM students");
        qb.add_condition("status", ConditionOperator::Equal, Some("active"))
            .add_condition("grade_level", ConditionOperator::GreaterThanOrEqual, Some(9i64));
        assert_eq!(
            qb.builder_mut().sql(),
            "SELECT * FROM students WHERE status = ? AND grade_level >= ?"
        );
    }

    #[test]
    fn absent_values_leave_the_query_untouched() {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM students");
        qb.add_condition::<String>("status", ConditionOperator::Equal, None);
        assert_eq!(qb.builder_mut().sql(), "SELECT * FROM students");
    }

    #[test]
    fn search_groups_columns_with_or() {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM students");
        qb.add_search(&["first_name", "last_name"], "ami");
        assert_eq!(
            qb.builder_mut().sql(),
            "SELECT * FROM students WHERE (first_name LIKE ? OR last_name LIKE ?)"
        );
    }

    #[test]
    fn pagination_is_bound_not_interpolated() {
        let mut qb = EnhancedQueryBuilder::new("SELECT * FROM students");
        qb.add_pagination(Some(10), Some(20));
        assert_eq!(qb.builder_mut().sql(), "SELECT * FROM students LIMIT ? OFFSET ?");
    }
}
