use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::repository::{PayrollRepository, RepositoryError};

/// Which payroll store to open, read from the `[database]` config section.
///
/// | backend  | connection_string                          |
/// |----------|--------------------------------------------|
/// | `sqlite` | file path, `sqlite:` URL, or `:memory:`     |
/// | `memory` | ignored                                    |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    pub backend: String,
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// Opens a [`PayrollRepository`] for one storage backend.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Lowercase name matched against [`DbConfig::backend`].
    fn backend_name(&self) -> &'static str;

    /// Open the store and bring its schema up to date.
    async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError>;
}

/// Payroll storage backends known to the process, keyed by name.
#[derive(Default)]
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a backend. A later registration under the same name wins.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Opens the repository named by `config.backend`.
    ///
    /// An unregistered backend is a [`RepositoryError::Configuration`] that
    /// lists what is available; factory errors pass through unchanged.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
        let Some(factory) = self.factories.get(config.backend.as_str()) else {
            return Err(RepositoryError::Configuration(format!(
                "unknown payroll backend '{}'; available: {:?}",
                config.backend,
                self.available_backends()
            )));
        };
        factory.create(config).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::memory::{InMemoryRepository, MemoryRepositoryFactory};
    use crate::models::{NewAccount, PaystubLimit};

    /// Counts how often the registry opened it.
    struct CountingFactory {
        name: &'static str,
        opened: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RepositoryFactory for CountingFactory {
        fn backend_name(&self) -> &'static str {
            self.name
        }

        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
            self.opened.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(InMemoryRepository::new()))
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl RepositoryFactory for UnreachableStore {
        fn backend_name(&self) -> &'static str {
            "unreachable"
        }

        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
            Err(RepositoryError::Connection("store offline".to_string()))
        }
    }

    fn counting(name: &'static str) -> (Box<dyn RepositoryFactory>, Arc<AtomicUsize>) {
        let opened = Arc::new(AtomicUsize::new(0));
        (
            Box::new(CountingFactory {
                name,
                opened: opened.clone(),
            }),
            opened,
        )
    }

    fn backend(name: &str) -> DbConfig {
        DbConfig {
            backend: name.to_string(),
            ..DbConfig::default()
        }
    }

    #[test]
    fn default_config_is_in_memory_sqlite() {
        assert_eq!(
            DbConfig::default(),
            DbConfig {
                backend: "sqlite".to_string(),
                connection_string: ":memory:".to_string(),
            }
        );
    }

    #[test]
    fn backends_are_listed_sorted_and_deduplicated() {
        let mut registry = RepositoryRegistry::new();
        registry.register(counting("sqlite").0);
        registry.register(Box::new(MemoryRepositoryFactory));
        registry.register(counting("sqlite").0);

        assert_eq!(registry.available_backends(), vec!["memory", "sqlite"]);
    }

    #[tokio::test]
    async fn opens_only_the_configured_backend() {
        let mut registry = RepositoryRegistry::new();
        let (sqlite, sqlite_opened) = counting("sqlite");
        let (other, other_opened) = counting("postgres");
        registry.register(sqlite);
        registry.register(other);

        registry.create(&backend("sqlite")).await.unwrap();

        assert_eq!(sqlite_opened.load(Ordering::SeqCst), 1);
        assert_eq!(other_opened.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn memory_backend_is_usable_through_the_registry() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(MemoryRepositoryFactory));

        let repo = registry.create(&backend("memory")).await.unwrap();
        let account = repo
            .create_account(NewAccount {
                company_name: "Registry Co".to_string(),
                paystub_limit: PaystubLimit::Unlimited,
            })
            .await
            .unwrap();

        assert_eq!(repo.get_account(account.id).await.unwrap(), account);
    }

    #[tokio::test]
    async fn unknown_backend_lists_what_is_available() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(MemoryRepositoryFactory));

        match registry.create(&backend("postgres")).await {
            Err(RepositoryError::Configuration(msg)) => {
                assert!(msg.contains("postgres"));
                assert!(msg.contains("memory"));
            }
            Err(other) => panic!("expected a configuration error, got {other:?}"),
            Ok(_) => panic!("expected a configuration error, got a repository"),
        }
    }

    #[tokio::test]
    async fn factory_errors_pass_through() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(UnreachableStore));

        let result = registry.create(&backend("unreachable")).await;

        assert!(matches!(
            result,
            Err(RepositoryError::Connection(msg)) if msg == "store offline"
        ));
    }
}
