//! Holder position for a (user, token) pair.

use crate::domain::{Decimal, TimeMs, TokenId, UserId};
use serde::{Deserialize, Serialize};

/// A holder's balance and cost basis in one token.
///
/// A zero balance is "flat": `avg_cost` is stale and the next buy resets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub user_id: UserId,
    pub token_id: TokenId,
    pub balance: Decimal,
    /// Weighted-average acquisition price of the current balance.
    pub avg_cost: Decimal,
    /// Gains locked in by sells, accumulated over the position's life.
    pub realized_pnl: Decimal,
    /// Time of the last trade applied.
    pub updated_at: TimeMs,
}

impl Position {
    /// A flat position with no history.
    pub fn empty(user_id: UserId, token_id: TokenId) -> Self {
        Self {
            user_id,
            token_id,
            balance: Decimal::zero(),
            avg_cost: Decimal::zero(),
            realized_pnl: Decimal::zero(),
            updated_at: TimeMs::new(0),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.balance.is_zero()
    }

    /// Cost basis of the current balance; `None` past the decimal range.
    pub fn cost_basis(&self) -> Option<Decimal> {
        if self.is_flat() {
            Some(Decimal::zero())
        } else {
            self.balance.checked_mul(&self.avg_cost)
        }
    }
}
