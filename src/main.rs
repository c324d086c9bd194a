use color_eyre::eyre::Result;
use tracing::info;

use schoolhub::config::AppConfig;
use schoolhub::services::NotificationExpiryJob;
use schoolhub::storage::DatabaseManager;
use schoolhub::{logging, repositories::RepositoryFactory};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    logging::init();

    let config = AppConfig::from_env()?;
    let db = DatabaseManager::new(&config.database_url).await?;
    db.run_migrations().await?;

    let factory = RepositoryFactory::new(db.pool.clone());
    info!(db_path = db.db_path(), "repositories ready");

    let sweeper = NotificationExpiryJob::new(factory.pool().clone());
    let handle = sweeper.spawn(config.maintenance_interval);

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    handle.abort();
    Ok(())
}
