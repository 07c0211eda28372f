use super::{Cents, Operation, OperationKind, UserId};

/// Compute the balance for a single user from their operations.
/// Balance = deposits + incoming transfers - withdrawals - outgoing transfers
///
/// Operations that do not involve the user are ignored, so the full log can be passed in.
/// Saturates at the `Cents` bounds; admitted operations never get there.
pub fn compute_balance(user_id: UserId, operations: &[Operation]) -> Cents {
    operations.iter().fold(0, |balance: Cents, op| {
        balance.saturating_add(balance_effect(user_id, op))
    })
}

/// The signed effect a single operation has on the user's balance.
pub fn balance_effect(user_id: UserId, op: &Operation) -> Cents {
    match op.kind {
        OperationKind::Deposit if op.user_id == user_id => op.amount,
        OperationKind::Withdraw if op.user_id == user_id => op.amount.saturating_neg(),
        OperationKind::Transfer => {
            let mut effect: Cents = 0;
            if op.user_id == user_id {
                effect = op.amount.saturating_neg();
            }
            if op.receiver_id == Some(user_id) {
                effect = effect.saturating_add(op.amount);
            }
            effect
        }
        _ => 0,
    }
}
