pub mod application;
pub mod cli;
pub mod domain;
pub mod logging;
pub mod storage;

pub use application::{Balance, EngineConfig, LedgerEngine, LedgerError, UserDirectory};
pub use domain::*;
pub use storage::{InMemoryStore, LedgerStore, SqliteStore};
