use thiserror::Error;

use crate::domain::{Cents, format_cents};

/// Failures surfaced by the ledger engine.
///
/// Every variant except `Storage` is a terminal validation outcome: retrying the same
/// request against the same ledger state fails the same way.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("User not found")]
    UserNotFound,

    #[error("Sender not found")]
    SenderNotFound,

    #[error("Receiver not found")]
    ReceiverNotFound,

    #[error("Statement not found")]
    StatementNotFound,

    #[error(
        "Insufficient funds: balance {}, required {}",
        money(.balance),
        money(.required)
    )]
    InsufficientFunds { balance: Cents, required: Cents },

    #[error("Invalid amount: {}", money(.0))]
    InvalidAmount(Cents),

    #[error(
        "Amount too large: balance {} cannot take {} more",
        money(.balance),
        money(.amount)
    )]
    AmountTooLarge { balance: Cents, amount: Cents },

    #[error("Cannot transfer to the same account")]
    SelfTransfer,

    #[error("User already exists: {0}")]
    UserAlreadyExists(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

fn money(cents: &Cents) -> String {
    format_cents(*cents)
}

impl LedgerError {
    /// Stable machine-readable identity of the failure.
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::UserNotFound => "user_not_found",
            LedgerError::SenderNotFound => "sender_not_found",
            LedgerError::ReceiverNotFound => "receiver_not_found",
            LedgerError::StatementNotFound => "statement_not_found",
            LedgerError::InsufficientFunds { .. } => "insufficient_funds",
            LedgerError::InvalidAmount(_) => "invalid_amount",
            LedgerError::AmountTooLarge { .. } => "amount_too_large",
            LedgerError::SelfTransfer => "self_transfer",
            LedgerError::UserAlreadyExists(_) => "user_already_exists",
            LedgerError::Storage(_) => "storage_failure",
        }
    }

    /// HTTP-style status the transport layer relays for this failure.
    pub fn status_code(&self) -> u16 {
        match self {
            LedgerError::UserNotFound
            | LedgerError::SenderNotFound
            | LedgerError::ReceiverNotFound
            | LedgerError::StatementNotFound => 404,
            LedgerError::InsufficientFunds { .. }
            | LedgerError::InvalidAmount(_)
            | LedgerError::AmountTooLarge { .. }
            | LedgerError::SelfTransfer
            | LedgerError::UserAlreadyExists(_) => 400,
            LedgerError::Storage(_) => 500,
        }
    }

    /// True for caller-facing validation failures, false for infrastructure faults.
    pub fn is_validation(&self) -> bool {
        !matches!(self, LedgerError::Storage(_))
    }
}
