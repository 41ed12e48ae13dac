use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::Config;

mod financial;
mod milestones;
mod projects;
mod resources;
mod users;

pub use financial::{ExpenseFilter, InvoiceFilter};
pub use milestones::MilestoneFilter;
pub use resources::AllocationFilter;

/// Database connection pool
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new Database instance with a connection pool
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(config.database_url())
            .await?;

        Ok(Self { pool })
    }

    /// A pool that only connects on first use.
    #[cfg(test)]
    pub fn lazy(url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(1).connect_lazy(url)?;
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the embedded migrations under `migrations/`
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!().run(&self.pool).await?;
        tracing::info!("migrations applied");
        Ok(())
    }
}

/// Connect using the loaded configuration
pub async fn init(config: &Config) -> Result<Database> {
    let db = Database::new(config).await?;
    tracing::info!(max_connections = config.db_max_connections, "database pool ready");
    Ok(db)
}
