//! Circulating supply derived from a token's trade ledger.
//!
//! Supply is never stored on its own: it is `Σ buys - Σ sells` over the ledger, either
//! folded from scratch or maintained incrementally by `SupplyLedger`. Both paths use the
//! same exact decimal additions in ledger order and therefore agree bit-for-bit.

use crate::domain::{Decimal, Side, TokenId, Trade};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SupplyError {
    #[error("trade for token {found} applied to ledger of {expected}")]
    TokenMismatch { expected: TokenId, found: TokenId },
    #[error("buy of {amount} would take supply {supply} past cap {cap}")]
    SupplyExceeded {
        supply: Decimal,
        amount: Decimal,
        cap: Decimal,
    },
    #[error("sell of {amount} exceeds circulating supply {supply}")]
    InsufficientSupply { supply: Decimal, amount: Decimal },
    #[error("arithmetic overflow in supply ledger")]
    Overflow,
}

/// Fold the full ledger for `token_id` into its circulating supply.
///
/// `trades` must already be in ledger order; trades of other tokens are skipped.
pub fn current_supply<'a, I>(token_id: &TokenId, trades: I) -> Decimal
where
    I: IntoIterator<Item = &'a Trade>,
{
    trades
        .into_iter()
        .filter(|t| &t.token_id == token_id)
        .fold(Decimal::zero(), |supply, t| supply + t.signed_amount())
}

/// Supply after a trade of `amount` on `side`, rejecting any result outside `[0, cap]`.
pub fn next_supply(
    supply: &Decimal,
    cap: &Decimal,
    side: Side,
    amount: &Decimal,
) -> Result<Decimal, SupplyError> {
    match side {
        Side::Buy => {
            let next = supply.checked_add(amount).ok_or(SupplyError::Overflow)?;
            if &next > cap {
                return Err(SupplyError::SupplyExceeded {
                    supply: supply.clone(),
                    amount: amount.clone(),
                    cap: cap.clone(),
                });
            }
            Ok(next)
        }
        Side::Sell => {
            if amount > supply {
                return Err(SupplyError::InsufficientSupply {
                    supply: supply.clone(),
                    amount: amount.clone(),
                });
            }
            supply.checked_sub(amount).ok_or(SupplyError::Overflow)
        }
    }
}

/// Running supply counter for one token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupplyLedger {
    token_id: TokenId,
    cap: Decimal,
    supply: Decimal,
    trade_count: u64,
}

impl SupplyLedger {
    /// A counter for a token with no trades yet.
    pub fn new(token_id: TokenId, cap: Decimal) -> Self {
        Self {
            token_id,
            cap,
            supply: Decimal::zero(),
            trade_count: 0,
        }
    }

    /// Rebuild the counter by admitting every trade of `token_id` in ledger order.
    ///
    /// # Errors
    /// Fails if any prefix of the history leaves `[0, cap]`.
    pub fn from_trades<'a, I>(
        token_id: TokenId,
        cap: Decimal,
        trades: I,
    ) -> Result<Self, SupplyError>
    where
        I: IntoIterator<Item = &'a Trade>,
    {
        let mut ledger = Self::new(token_id.clone(), cap);
        for trade in trades.into_iter().filter(|t| t.token_id == token_id) {
            ledger.admit(trade)?;
        }
        Ok(ledger)
    }

    pub fn supply(&self) -> &Decimal {
        &self.supply
    }

    pub fn cap(&self) -> &Decimal {
        &self.cap
    }

    pub fn remaining(&self) -> Decimal {
        &self.cap - &self.supply
    }

    pub fn trade_count(&self) -> u64 {
        self.trade_count
    }

    /// Supply after `side`/`amount` would be applied, checked against `[0, cap]`.
    pub fn check(&self, side: Side, amount: &Decimal) -> Result<Decimal, SupplyError> {
        next_supply(&self.supply, &self.cap, side, amount)
    }

    /// Validate and apply one trade, the incremental counterpart of `current_supply`.
    pub fn admit(&mut self, trade: &Trade) -> Result<Decimal, SupplyError> {
        if trade.token_id != self.token_id {
            return Err(SupplyError::TokenMismatch {
                expected: self.token_id.clone(),
                found: trade.token_id.clone(),
            });
        }
        self.supply = self.check(trade.side, &trade.amount)?;
        self.trade_count += 1;
        Ok(self.supply.clone())
    }
}
