use std::str::FromStr;
use std::sync::Arc;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    Pool, Sqlite,
};
use tracing::{info, instrument};

use crate::error::Result;

/// DatabaseManager handles SQLite connection pooling and schema migrations
#[derive(Clone)]
pub struct DatabaseManager {
    /// Connection pool for SQLite
    pub pool: Pool<Sqlite>,
    /// Path to the database file
    pub db_path: Arc<str>,
}

impl DatabaseManager {
    /// Creates a new DatabaseManager with a connection pool to the specified database
    #[instrument(err)]
    pub async fn new(db_path: &str) -> Result<Self> {
        info!("Initializing database at: {}", db_path);

        let pool = Pool::connect_with(
            SqliteConnectOptions::from_str(db_path)?
                .foreign_keys(true)
                // Create the database if it doesn't exist
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                // Only use NORMAL if WAL mode is enabled
                // as it provides extra performance benefits
                // at the cost of durability
                .synchronous(SqliteSynchronous::Normal),
        )
        .await?;

        Ok(Self {
            pool,
            db_path: db_path.into(),
        })
    }

    /// Get database path
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// Apply all pending migrations from the embedded `migrations/` directory
    #[instrument(skip(self))]
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("Migrations up to date");
        Ok(())
    }

    /// Set up an in-memory database with the full schema for tests.
    /// The pool is capped at one connection: every pooled connection to
    /// `:memory:` would otherwise see its own empty database.
    pub async fn setup_test_db() -> DatabaseManager {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .expect("Invalid connection string")
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .expect("Failed to initialize database");
        let db = Self {
            pool,
            db_path: "sqlite::memory:".into(),
        };
        db.run_migrations()
            .await
            .expect("Failed to apply migrations");
        db
    }
}
