// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use std::sync::Arc;

use anyhow::Result;
use tally::application::{EngineConfig, LedgerEngine, UserDirectory};
use tally::domain::User;
use tally::storage::{InMemoryStore, LedgerStore, SqliteStore};
use tempfile::TempDir;

/// An engine plus the directory sharing its store. Holds the temp dir for SQLite runs.
pub struct Ledger {
    pub engine: Arc<LedgerEngine>,
    pub users: UserDirectory,
    pub store: Arc<dyn LedgerStore>,
    _temp: Option<TempDir>,
}

impl Ledger {
    fn from_store(
        store: Arc<dyn LedgerStore>,
        config: EngineConfig,
        temp: Option<TempDir>,
    ) -> Self {
        Self {
            engine: Arc::new(LedgerEngine::new(Arc::clone(&store), config)),
            users: UserDirectory::new(Arc::clone(&store)),
            store,
            _temp: temp,
        }
    }

    /// Register a user whose email is derived from the name.
    pub async fn user(&self, name: &str) -> Result<User> {
        let email = format!("{}@example.com", name.to_lowercase());
        Ok(self.users.register(name, &email, "hash").await?)
    }
}

/// Ledger over the in-memory store
pub fn memory_ledger(config: EngineConfig) -> Ledger {
    Ledger::from_store(Arc::new(InMemoryStore::new()), config, None)
}

/// Ledger over a SQLite database in a temporary directory
pub async fn sqlite_ledger(config: EngineConfig) -> Result<Ledger> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let store = SqliteStore::init(&db_path).await?;
    Ok(Ledger::from_store(Arc::new(store), config, Some(temp_dir)))
}

/// Run a scenario `async fn(Ledger) -> anyhow::Result<()>` against both stores.
#[allow(unused_macros)]
macro_rules! against_both_stores {
    ($scenario:ident) => {
        mod $scenario {
            #[tokio::test]
            async fn memory() -> anyhow::Result<()> {
                super::$scenario(crate::common::memory_ledger(Default::default())).await
            }

            #[tokio::test]
            async fn sqlite() -> anyhow::Result<()> {
                super::$scenario(crate::common::sqlite_ledger(Default::default()).await?).await
            }
        }
    };
}
