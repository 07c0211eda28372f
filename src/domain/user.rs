use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type UserId = Uuid;

/// An account holder. Users are created once at signup and never mutated by the ledger;
/// the engine only ever asks whether one exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Unique across all users
    pub email: String,
    /// Opaque credential produced by the identity subsystem; never rendered.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            name: name.into(),
            email: normalize_email(&email.into()),
            password_hash: password_hash.into(),
            // Microseconds are all the SQLite store keeps.
            created_at: Utc::now().trunc_subsecs(6),
        }
    }
}

/// Emails compare case-insensitively and without surrounding whitespace.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes_email() {
        let user = User::new("Ada", "  Ada@Example.COM ", "hash");
        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.name, "Ada");
    }

    #[test]
    fn test_password_hash_is_not_serialized() {
        let user = User::new("Ada", "ada@example.com", "secret-hash");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password_hash"));
    }
}
