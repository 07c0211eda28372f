use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{
    Cents, Operation, OperationId, OperationRequest, UserId, compute_balance, format_cents,
};
use crate::storage::LedgerStore;

use super::{AccountLocks, EngineConfig, LedgerError, OperationValidator};

/// Current balance plus the statement it was derived from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    #[serde(with = "crate::domain::decimal")]
    pub balance: Cents,
    /// Ascending by creation time
    pub statement: Vec<Operation>,
}

/// The ledger consistency engine. This is the primary interface for any client
/// (CLI, API, tests) that moves money or reads balances.
///
/// Mutations of the same account are serialized: validation and append run while the
/// account's lock is held, so two withdrawals can never both pass a funds check against
/// the same stale balance. Reads take no lock.
pub struct LedgerEngine {
    store: Arc<dyn LedgerStore>,
    validator: OperationValidator,
    locks: AccountLocks,
    config: EngineConfig,
}

impl LedgerEngine {
    pub fn new(store: Arc<dyn LedgerStore>, config: EngineConfig) -> Self {
        Self {
            store,
            validator: OperationValidator::new(config),
            locks: AccountLocks::new(),
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn LedgerStore> {
        &self.store
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // ========================
    // Mutations
    // ========================

    pub async fn deposit(
        &self,
        user_id: UserId,
        amount: Cents,
        description: impl Into<String>,
    ) -> Result<Operation, LedgerError> {
        self.submit(OperationRequest::Deposit {
            user_id,
            amount,
            description: description.into(),
        })
        .await
    }

    pub async fn withdraw(
        &self,
        user_id: UserId,
        amount: Cents,
        description: impl Into<String>,
    ) -> Result<Operation, LedgerError> {
        self.submit(OperationRequest::Withdraw {
            user_id,
            amount,
            description: description.into(),
        })
        .await
    }

    /// Record a single transfer record owned by the sender; both balances derive from it.
    pub async fn transfer(
        &self,
        sender_id: UserId,
        receiver_id: Option<UserId>,
        amount: Cents,
        description: impl Into<String>,
    ) -> Result<Operation, LedgerError> {
        self.submit(OperationRequest::Transfer {
            sender_id,
            receiver_id,
            amount,
            description: description.into(),
        })
        .await
    }

    /// Validate and append one operation while holding every affected account.
    pub async fn submit(&self, request: OperationRequest) -> Result<Operation, LedgerError> {
        let kind = request.kind();
        let _guard = self.locks.acquire(&request.accounts()).await;

        let draft = match self.validator.validate(self.store.as_ref(), &request).await {
            Ok(draft) => draft,
            Err(err) => {
                if err.is_validation() {
                    debug!(%kind, code = err.code(), "operation rejected");
                } else {
                    warn!(%kind, error = %err, "operation validation failed");
                }
                return Err(err);
            }
        };

        let operation = self.store.append_operation(draft).await?;
        info!(
            operation_id = %operation.id,
            %kind,
            user_id = %operation.user_id,
            receiver_id = ?operation.receiver_id,
            amount = %format_cents(operation.amount),
            "operation committed"
        );
        Ok(operation)
    }

    // ========================
    // Queries
    // ========================

    /// Balance and statement for a user, computed from one read of the log.
    pub async fn get_balance(&self, user_id: UserId) -> Result<Balance, LedgerError> {
        self.require_user(user_id).await?;

        let statement = self.store.list_operations(user_id).await?;
        let balance = compute_balance(user_id, &statement);
        Ok(Balance { balance, statement })
    }

    /// Look up a single operation.
    ///
    /// Unless ownership is enforced, any existing operation resolves for any existing
    /// user; with enforcement, foreign operations are indistinguishable from missing ones.
    pub async fn get_operation(
        &self,
        user_id: UserId,
        operation_id: OperationId,
    ) -> Result<Operation, LedgerError> {
        self.require_user(user_id).await?;

        let operation = self
            .store
            .find_operation(operation_id)
            .await?
            .ok_or(LedgerError::StatementNotFound)?;

        if self.config.enforce_ownership && !operation.involves(user_id) {
            debug!(%user_id, %operation_id, "operation hidden from non-participant");
            return Err(LedgerError::StatementNotFound);
        }
        Ok(operation)
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), LedgerError> {
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::UserNotFound),
        }
    }
}
