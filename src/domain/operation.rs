use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Cents, UserId};

pub type OperationId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    /// Money entering the owner's account
    Deposit,
    /// Money leaving the owner's account
    Withdraw,
    /// Money moving from the owner (sender) to the receiver
    Transfer,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdraw",
            OperationKind::Transfer => "transfer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "deposit" => Some(OperationKind::Deposit),
            "withdraw" => Some(OperationKind::Withdraw),
            "transfer" => Some(OperationKind::Transfer),
            _ => None,
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An operation that passed validation but has not been committed yet.
/// The store assigns `id` and `created_at` when it appends the draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationDraft {
    pub user_id: UserId,
    pub receiver_id: Option<UserId>,
    pub kind: OperationKind,
    pub amount: Cents,
    pub description: String,
}

impl OperationDraft {
    pub fn deposit(user_id: UserId, amount: Cents, description: impl Into<String>) -> Self {
        Self {
            user_id,
            receiver_id: None,
            kind: OperationKind::Deposit,
            amount,
            description: description.into(),
        }
    }

    pub fn withdraw(user_id: UserId, amount: Cents, description: impl Into<String>) -> Self {
        Self {
            user_id,
            receiver_id: None,
            kind: OperationKind::Withdraw,
            amount,
            description: description.into(),
        }
    }

    pub fn transfer(
        sender_id: UserId,
        receiver_id: UserId,
        amount: Cents,
        description: impl Into<String>,
    ) -> Self {
        Self {
            user_id: sender_id,
            receiver_id: Some(receiver_id),
            kind: OperationKind::Transfer,
            amount,
            description: description.into(),
        }
    }

    /// Positive amount, and a receiver exactly when the kind is a transfer.
    pub fn is_well_formed(&self) -> bool {
        self.amount > 0 && self.receiver_id.is_some() == (self.kind == OperationKind::Transfer)
    }

    /// Turn the draft into a committed record.
    pub fn commit(self, id: OperationId, created_at: DateTime<Utc>) -> Operation {
        Operation {
            id,
            user_id: self.user_id,
            receiver_id: self.receiver_id,
            kind: self.kind,
            amount: self.amount,
            description: self.description,
            created_at,
        }
    }
}

/// A committed ledger entry. Operations are immutable: the ledger only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    /// Account debited or credited; the sender for transfers
    pub user_id: UserId,
    /// Counterpart account, only for transfers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver_id: Option<UserId>,
    #[serde(rename = "type")]
    pub kind: OperationKind,
    #[serde(with = "super::money::decimal")]
    pub amount: Cents,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Operation {
    /// Whether the user is the owner or the receiving side of this operation.
    pub fn involves(&self, user_id: UserId) -> bool {
        self.user_id == user_id || self.receiver_id == Some(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        for kind in [
            OperationKind::Deposit,
            OperationKind::Withdraw,
            OperationKind::Transfer,
        ] {
            assert_eq!(OperationKind::from_str(kind.as_str()), Some(kind));
        }
        assert_eq!(OperationKind::from_str("refund"), None);
    }

    #[test]
    fn test_draft_constructors_are_well_formed() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();

        assert!(OperationDraft::deposit(a, 100, "salary").is_well_formed());
        assert!(OperationDraft::withdraw(a, 100, "rent").is_well_formed());
        assert!(OperationDraft::transfer(a, b, 100, "split").is_well_formed());
    }

    #[test]
    fn test_malformed_drafts() {
        let a = Uuid::now_v7();

        assert!(!OperationDraft::deposit(a, 0, "zero").is_well_formed());

        let mut draft = OperationDraft::deposit(a, 100, "with receiver");
        draft.receiver_id = Some(Uuid::now_v7());
        assert!(!draft.is_well_formed());

        let mut draft = OperationDraft::transfer(a, Uuid::now_v7(), 100, "no receiver");
        draft.receiver_id = None;
        assert!(!draft.is_well_formed());
    }

    #[test]
    fn test_operation_json_shape() {
        let sender = Uuid::now_v7();
        let receiver = Uuid::now_v7();
        let op = OperationDraft::transfer(sender, receiver, 3000, "dinner")
            .commit(Uuid::now_v7(), Utc::now());

        let value = serde_json::to_value(&op).unwrap();
        assert_eq!(value["type"], "transfer");
        assert_eq!(value["amount"], "30.00");
        assert_eq!(value["user_id"], sender.to_string());
        assert_eq!(value["receiver_id"], receiver.to_string());

        let deposit =
            OperationDraft::deposit(sender, 100, "tip").commit(Uuid::now_v7(), Utc::now());
        let value = serde_json::to_value(&deposit).unwrap();
        assert_eq!(value["type"], "deposit");
        assert!(value.get("receiver_id").is_none());
    }

    #[test]
    fn test_involves() {
        let sender = Uuid::now_v7();
        let receiver = Uuid::now_v7();
        let stranger = Uuid::now_v7();
        let op =
            OperationDraft::transfer(sender, receiver, 1, "x").commit(Uuid::now_v7(), Utc::now());

        assert!(op.involves(sender));
        assert!(op.involves(receiver));
        assert!(!op.involves(stranger));
    }
}
