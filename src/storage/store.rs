use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};

use crate::domain::{Cents, Operation, OperationDraft, OperationId, User, UserId, compute_balance};

/// Durable keyed storage for users and ledger operations.
///
/// Every method is a single atomic step: an append is either fully recorded or not at
/// all, and reads observe a consistent snapshot. Errors are infrastructure faults; the
/// stores never decide whether an operation is allowed.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    // === Users ===

    /// Persist a new user. Returns `false` (and stores nothing) when the email is taken.
    async fn insert_user(&self, user: &User) -> Result<bool>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    // === Operations ===

    /// Assign `id` and `created_at` to the draft and persist it.
    async fn append_operation(&self, draft: OperationDraft) -> Result<Operation>;

    /// Operations the user owns or receives, ascending by `created_at` then `id`.
    async fn list_operations(&self, user_id: UserId) -> Result<Vec<Operation>>;

    async fn find_operation(&self, id: OperationId) -> Result<Option<Operation>>;

    /// Current balance of the user.
    async fn balance_of(&self, user_id: UserId) -> Result<Cents> {
        let operations = self.list_operations(user_id).await?;
        Ok(compute_balance(user_id, &operations))
    }
}

/// Commit timestamp for a new operation, truncated to the microsecond precision the
/// SQLite store persists so a committed record equals the one read back.
pub(crate) fn commit_timestamp() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
