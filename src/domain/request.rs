use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::{Cents, OperationKind, UserId};

/// A caller's request to move money. Each variant is validated by the kind-specific
/// rules before it can become an [`OperationDraft`](super::OperationDraft).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OperationRequest {
    Deposit {
        user_id: UserId,
        #[serde(with = "super::money::decimal")]
        amount: Cents,
        #[serde(default)]
        description: String,
    },
    Withdraw {
        user_id: UserId,
        #[serde(with = "super::money::decimal")]
        amount: Cents,
        #[serde(default)]
        description: String,
    },
    Transfer {
        sender_id: UserId,
        /// Missing, blank, or unparseable ids all mean "no receiver".
        #[serde(default, deserialize_with = "lenient_user_id")]
        receiver_id: Option<UserId>,
        #[serde(with = "super::money::decimal")]
        amount: Cents,
        #[serde(default)]
        description: String,
    },
}

impl OperationRequest {
    pub fn kind(&self) -> OperationKind {
        match self {
            OperationRequest::Deposit { .. } => OperationKind::Deposit,
            OperationRequest::Withdraw { .. } => OperationKind::Withdraw,
            OperationRequest::Transfer { .. } => OperationKind::Transfer,
        }
    }

    pub fn amount(&self) -> Cents {
        match self {
            OperationRequest::Deposit { amount, .. }
            | OperationRequest::Withdraw { amount, .. }
            | OperationRequest::Transfer { amount, .. } => *amount,
        }
    }

    /// Every account whose balance this request can change.
    pub fn accounts(&self) -> Vec<UserId> {
        match self {
            OperationRequest::Deposit { user_id, .. }
            | OperationRequest::Withdraw { user_id, .. } => vec![*user_id],
            OperationRequest::Transfer {
                sender_id,
                receiver_id,
                ..
            } => std::iter::once(*sender_id).chain(*receiver_id).collect(),
        }
    }
}

fn lenient_user_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<UserId>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| Uuid::parse_str(s.trim()).ok()))
}
