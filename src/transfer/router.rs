//! Request routing: transaction type to wallet pair.
//!
//! Every transfer has the treasury on exactly one side. TOP_UP and BONUS
//! move funds treasury -> user; SPEND moves funds user -> treasury. The
//! caller-facing balance is always the requesting user's wallet.

use uuid::Uuid;

use crate::models::TransactionType;
use crate::transfer::error::TransferError;

/// Resolved counterparties for one transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub from_user_id: Uuid,
    pub to_user_id: Uuid,
}

impl Route {
    /// Map (user, type) to an ordered (from, to) pair with the treasury as
    /// counterparty. Rejects transfers where both endpoints would be the
    /// same user (the treasury topping itself up).
    pub fn resolve(
        treasury_user_id: Uuid,
        user_id: Uuid,
        tx_type: TransactionType,
    ) -> Result<Self, TransferError> {
        if user_id == treasury_user_id {
            return Err(TransferError::SameUser);
        }

        let route = match tx_type {
            TransactionType::TopUp | TransactionType::Bonus => Route {
                from_user_id: treasury_user_id,
                to_user_id: user_id,
            },
            TransactionType::Spend => Route {
                from_user_id: user_id,
                to_user_id: treasury_user_id,
            },
        };

        Ok(route)
    }

    /// Lock acquisition order: both user ids sorted ascending. Any two
    /// concurrent transfers touching the same pair agree on this order,
    /// so no circular wait can form.
    pub fn lock_order(&self) -> (Uuid, Uuid) {
        if self.from_user_id <= self.to_user_id {
            (self.from_user_id, self.to_user_id)
        } else {
            (self.to_user_id, self.from_user_id)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_top_up_and_bonus_flow_from_treasury() {
        let treasury = Uuid::new_v4();
        let user = Uuid::new_v4();

        for tx_type in [TransactionType::TopUp, TransactionType::Bonus] {
            let route = Route::resolve(treasury, user, tx_type).unwrap();
            assert_eq!(route.from_user_id, treasury);
            assert_eq!(route.to_user_id, user);
        }
    }

    #[test]
    fn test_spend_flows_to_treasury() {
        let treasury = Uuid::new_v4();
        let user = Uuid::new_v4();

        let route = Route::resolve(treasury, user, TransactionType::Spend).unwrap();
        assert_eq!(route.from_user_id, user);
        assert_eq!(route.to_user_id, treasury);
    }

    #[test]
    fn test_treasury_cannot_transfer_to_itself() {
        let treasury = Uuid::new_v4();
        let result = Route::resolve(treasury, treasury, TransactionType::TopUp);
        assert!(matches!(result, Err(TransferError::SameUser)));
    }

    #[test]
    fn test_lock_order_is_symmetric() {
        let treasury = Uuid::new_v4();
        let user = Uuid::new_v4();

        let top_up = Route::resolve(treasury, user, TransactionType::TopUp).unwrap();
        let spend = Route::resolve(treasury, user, TransactionType::Spend).unwrap();
        assert_eq!(top_up.lock_order(), spend.lock_order());

        let (a, b) = top_up.lock_order();
        assert!(a <= b);
    }
}
