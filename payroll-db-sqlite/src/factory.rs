use async_trait::async_trait;
use payroll_core::db::{DbConfig, RepositoryFactory};
use payroll_core::{PayrollRepository, RepositoryError};
use tracing::info;

use crate::repository::SqliteRepository;

/// Turns a [`DbConfig::connection_string`] into a sqlx URL.
///
/// * `""` or `":memory:"` opens an in-memory database.
/// * A value already starting with `sqlite:` is used as is.
/// * Anything else is a file path, created if it does not exist.
pub fn connection_url(connection_string: &str) -> String {
    let value = connection_string.trim();
    if value.is_empty() || value == ":memory:" {
        "sqlite::memory:".to_string()
    } else if value.starts_with("sqlite:") {
        value.to_string()
    } else {
        format!("sqlite:{value}?mode=rwc")
    }
}

/// [`RepositoryFactory`] for SQLite.
///
/// Register this with a [`payroll_core::db::RepositoryRegistry`] to make the
/// `"sqlite"` backend available:
///
/// ```rust,no_run
/// use payroll_core::db::RepositoryRegistry;
/// use payroll_db_sqlite::SqliteRepositoryFactory;
///
/// let mut registry = RepositoryRegistry::new();
/// registry.register(Box::new(SqliteRepositoryFactory));
/// ```
pub struct SqliteRepositoryFactory;

#[async_trait]
impl RepositoryFactory for SqliteRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    /// Opens the database and applies pending migrations.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
        let url = connection_url(&config.connection_string);
        let repo = SqliteRepository::new(&url).await?;
        repo.run_migrations().await?;
        info!(url = %url, "sqlite repository ready");
        Ok(Box::new(repo))
    }
}
