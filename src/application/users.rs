use std::sync::Arc;

use tracing::info;

use crate::domain::{User, UserId, normalize_email};
use crate::storage::LedgerStore;

use super::LedgerError;

/// Signup and profile lookup for account holders.
///
/// Credentials arrive already hashed; this type never sees a plaintext password.
pub struct UserDirectory {
    store: Arc<dyn LedgerStore>,
}

impl UserDirectory {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Register a new user. Emails are unique (case-insensitive).
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<User, LedgerError> {
        let email = normalize_email(email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(LedgerError::UserAlreadyExists(email));
        }

        let user = User::new(name.trim(), email, password_hash);
        // The store's uniqueness check closes the race between lookup and insert.
        if !self.store.insert_user(&user).await? {
            return Err(LedgerError::UserAlreadyExists(user.email));
        }

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    pub async fn profile(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or(LedgerError::UserNotFound)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<User, LedgerError> {
        self.store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(LedgerError::UserNotFound)
    }
}
