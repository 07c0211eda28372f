use crate::domain::{Cents, OperationDraft, OperationRequest, UserId};
use crate::storage::LedgerStore;

use super::{EngineConfig, LedgerError};

/// Admission rules for ledger operations.
///
/// Validation reads through the store but never writes. Callers that need the result to
/// still hold at append time must serialize on the affected accounts first.
pub struct OperationValidator {
    config: EngineConfig,
}

impl OperationValidator {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Check a request against the current ledger state and turn it into a draft.
    pub async fn validate(
        &self,
        store: &dyn LedgerStore,
        request: &OperationRequest,
    ) -> Result<OperationDraft, LedgerError> {
        let amount = request.amount();
        if amount <= 0 {
            return Err(LedgerError::InvalidAmount(amount));
        }

        match request {
            OperationRequest::Deposit {
                user_id,
                description,
                ..
            } => {
                Self::require_user(store, *user_id).await?;
                Self::require_headroom(store, *user_id, amount).await?;
                Ok(OperationDraft::deposit(*user_id, amount, description.clone()))
            }

            OperationRequest::Withdraw {
                user_id,
                description,
                ..
            } => {
                Self::require_user(store, *user_id).await?;
                Self::require_funds(store, *user_id, amount).await?;
                Ok(OperationDraft::withdraw(*user_id, amount, description.clone()))
            }

            OperationRequest::Transfer {
                sender_id,
                receiver_id,
                description,
                ..
            } => {
                let receiver_id = self
                    .validate_transfer(store, *sender_id, *receiver_id, amount)
                    .await?;
                Ok(OperationDraft::transfer(
                    *sender_id,
                    receiver_id,
                    amount,
                    description.clone(),
                ))
            }
        }
    }

    /// Transfer checks run in a fixed order so that a caller always learns about a
    /// missing receiver before a missing sender, and about either before funds.
    async fn validate_transfer(
        &self,
        store: &dyn LedgerStore,
        sender_id: UserId,
        receiver_id: Option<UserId>,
        amount: Cents,
    ) -> Result<UserId, LedgerError> {
        let sender = store.find_user(sender_id).await?;

        let receiver_id = receiver_id.ok_or(LedgerError::ReceiverNotFound)?;
        if store.find_user(receiver_id).await?.is_none() {
            return Err(LedgerError::ReceiverNotFound);
        }

        if sender.is_none() {
            return Err(LedgerError::SenderNotFound);
        }

        if sender_id == receiver_id && !self.config.allow_self_transfer {
            return Err(LedgerError::SelfTransfer);
        }

        Self::require_funds(store, sender_id, amount).await?;
        // A self-transfer leaves the balance unchanged.
        if receiver_id != sender_id {
            Self::require_headroom(store, receiver_id, amount).await?;
        }
        Ok(receiver_id)
    }

    async fn require_user(store: &dyn LedgerStore, user_id: UserId) -> Result<(), LedgerError> {
        match store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::UserNotFound),
        }
    }

    async fn require_funds(
        store: &dyn LedgerStore,
        user_id: UserId,
        amount: Cents,
    ) -> Result<(), LedgerError> {
        let balance = store.balance_of(user_id).await?;
        if balance < amount {
            return Err(LedgerError::InsufficientFunds {
                balance,
                required: amount,
            });
        }
        Ok(())
    }

    /// The credited balance must stay representable.
    async fn require_headroom(
        store: &dyn LedgerStore,
        user_id: UserId,
        amount: Cents,
    ) -> Result<(), LedgerError> {
        let balance = store.balance_of(user_id).await?;
        if balance.checked_add(amount).is_none() {
            return Err(LedgerError::AmountTooLarge { balance, amount });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::*;
    use crate::domain::{OperationKind, User};
    use crate::storage::InMemoryStore;

    async fn setup() -> (InMemoryStore, User, User) {
        let store = InMemoryStore::new();
        let alice = User::new("Alice", "alice@example.com", "hash");
        let bob = User::new("Bob", "bob@example.com", "hash");
        store.insert_user(&alice).await.unwrap();
        store.insert_user(&bob).await.unwrap();
        store
            .append_operation(OperationDraft::deposit(alice.id, 5000, "seed"))
            .await
            .unwrap();
        (store, alice, bob)
    }

    fn transfer(sender_id: UserId, receiver_id: Option<UserId>, amount: Cents) -> OperationRequest {
        OperationRequest::Transfer {
            sender_id,
            receiver_id,
            amount,
            description: "test".into(),
        }
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let (store, alice, _) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());

        for amount in [0, -100] {
            let request = OperationRequest::Deposit {
                user_id: alice.id,
                amount,
                description: String::new(),
            };
            let err = validator.validate(&store, &request).await.unwrap_err();
            assert!(matches!(err, LedgerError::InvalidAmount(a) if a == amount));
        }
    }

    #[tokio::test]
    async fn test_deposit_requires_user() {
        let (store, _, _) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());
        let request = OperationRequest::Deposit {
            user_id: Uuid::now_v7(),
            amount: 100,
            description: String::new(),
        };

        let err = validator.validate(&store, &request).await.unwrap_err();
        assert!(matches!(err, LedgerError::UserNotFound));
    }

    #[tokio::test]
    async fn test_withdraw_checks_funds() {
        let (store, alice, _) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());

        let ok = OperationRequest::Withdraw {
            user_id: alice.id,
            amount: 5000,
            description: String::new(),
        };
        let draft = validator.validate(&store, &ok).await.unwrap();
        assert_eq!(draft.kind, OperationKind::Withdraw);

        let too_much = OperationRequest::Withdraw {
            user_id: alice.id,
            amount: 5001,
            description: String::new(),
        };
        let err = validator.validate(&store, &too_much).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InsufficientFunds {
                balance: 5000,
                required: 5001
            }
        ));
    }

    #[tokio::test]
    async fn test_transfer_missing_receiver_wins_over_everything() {
        let (store, _, _) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());

        // Unknown sender and absurd amount, yet the receiver is reported first.
        let request = transfer(Uuid::now_v7(), None, 1_000_000);
        let err = validator.validate(&store, &request).await.unwrap_err();
        assert!(matches!(err, LedgerError::ReceiverNotFound));

        let request = transfer(Uuid::now_v7(), Some(Uuid::now_v7()), 1_000_000);
        let err = validator.validate(&store, &request).await.unwrap_err();
        assert!(matches!(err, LedgerError::ReceiverNotFound));
    }

    #[tokio::test]
    async fn test_transfer_unknown_sender_before_funds() {
        let (store, _, bob) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());

        let request = transfer(Uuid::now_v7(), Some(bob.id), 1_000_000);
        let err = validator.validate(&store, &request).await.unwrap_err();
        assert!(matches!(err, LedgerError::SenderNotFound));
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds() {
        let (store, alice, bob) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());

        let request = transfer(bob.id, Some(alice.id), 1);
        let err = validator.validate(&store, &request).await.unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientFunds { balance: 0, .. }));
    }

    #[tokio::test]
    async fn test_self_transfer_policy() {
        let (store, alice, _) = setup().await;
        let request = transfer(alice.id, Some(alice.id), 100);

        let strict = OperationValidator::new(EngineConfig::default());
        let err = strict.validate(&store, &request).await.unwrap_err();
        assert!(matches!(err, LedgerError::SelfTransfer));

        let lenient =
            OperationValidator::new(EngineConfig::default().with_allow_self_transfer(true));
        let draft = lenient.validate(&store, &request).await.unwrap();
        assert_eq!(draft.receiver_id, Some(alice.id));
    }

    #[tokio::test]
    async fn test_valid_transfer_draft() {
        let (store, alice, bob) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());

        let draft = validator
            .validate(&store, &transfer(alice.id, Some(bob.id), 3000))
            .await
            .unwrap();
        assert_eq!(draft, OperationDraft::transfer(alice.id, bob.id, 3000, "test"));
    }

    #[tokio::test]
    async fn test_credit_cannot_overflow_balance() {
        let (store, alice, bob) = setup().await;
        let validator = OperationValidator::new(EngineConfig::default());
        store
            .append_operation(OperationDraft::deposit(bob.id, i64::MAX - 10, "jackpot"))
            .await
            .unwrap();

        let deposit = OperationRequest::Deposit {
            user_id: bob.id,
            amount: 11,
            description: String::new(),
        };
        let err = validator.validate(&store, &deposit).await.unwrap_err();
        assert!(matches!(
            err,
            LedgerError::AmountTooLarge {
                balance,
                amount: 11
            } if balance == i64::MAX - 10
        ));

        let err = validator
            .validate(&store, &transfer(alice.id, Some(bob.id), 11))
            .await
            .unwrap_err();
        assert!(matches!(err, LedgerError::AmountTooLarge { .. }));

        // Exactly filling the balance is still allowed
        validator
            .validate(&store, &transfer(alice.id, Some(bob.id), 10))
            .await
            .unwrap();
    }
}
