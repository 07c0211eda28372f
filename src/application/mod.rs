// Application layer: admission rules, account locking, and the engine that composes
// them over a ledger store.

mod config;
mod engine;
mod error;
mod locks;
mod users;
mod validator;

pub use config::*;
pub use engine::*;
pub use error::*;
pub use locks::*;
pub use users::*;
pub use validator::*;
