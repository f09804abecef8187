//! Cost-basis accounting for holder positions.
//!
//! Positions are updated one trade at a time in ledger order. Buys move the weighted
//! average cost; sells realize PnL against it and leave it untouched.

use crate::domain::{Decimal, Position, Side, Trade};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("trade ({trade_user}, {trade_token}) does not belong to position ({user}, {token})")]
    PositionMismatch {
        user: String,
        token: String,
        trade_user: String,
        trade_token: String,
    },
    #[error("insufficient balance to sell ({amount} > {balance})")]
    InsufficientBalance { balance: Decimal, amount: Decimal },
    #[error("division by zero updating average cost")]
    DivisionByZero,
    #[error("arithmetic overflow in position update")]
    Overflow,
}

/// Mark-to-market view of a position at a given spot price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionValuation {
    /// `balance * spot`.
    pub value: Decimal,
    /// `balance * avg_cost`.
    pub cost: Decimal,
    /// `value - cost`.
    pub unrealized_pnl: Decimal,
    /// `unrealized_pnl / cost * 100`, truncated to two places; zero when cost is zero.
    pub pnl_pct: Decimal,
}

impl Position {
    pub fn valuation(&self, spot: &Decimal) -> Result<PositionValuation, PositionError> {
        let value = self
            .balance
            .checked_mul(spot)
            .ok_or(PositionError::Overflow)?;
        let cost = self.cost_basis().ok_or(PositionError::Overflow)?;
        let unrealized_pnl = value.checked_sub(&cost).ok_or(PositionError::Overflow)?;
        let pnl_pct = pct_of(&unrealized_pnl, &cost)?;
        Ok(PositionValuation {
            value,
            cost,
            unrealized_pnl,
            pnl_pct,
        })
    }
}

/// `numerator / denominator * 100` truncated to two places, zero for a non-positive denominator.
pub(crate) fn pct_of(
    numerator: &Decimal,
    denominator: &Decimal,
) -> Result<Decimal, PositionError> {
    if !denominator.is_positive() {
        return Ok(Decimal::zero());
    }
    numerator
        .checked_div(denominator)
        .and_then(|v| v.checked_mul(Decimal::hundred()))
        .map(|v| v.trunc_percent())
        .ok_or(PositionError::Overflow)
}

/// Apply one trade to the holder's current position.
///
/// `position` is `None` when the holder has never traded the token. Returns the new
/// position; the input is never mutated, so a rejected trade leaves state untouched.
pub fn apply_trade(position: Option<Position>, trade: &Trade) -> Result<Position, PositionError> {
    let current = match position {
        Some(p) => {
            if p.user_id != trade.user_id || p.token_id != trade.token_id {
                return Err(PositionError::PositionMismatch {
                    user: p.user_id.to_string(),
                    token: p.token_id.to_string(),
                    trade_user: trade.user_id.to_string(),
                    trade_token: trade.token_id.to_string(),
                });
            }
            p
        }
        None => match trade.side {
            Side::Buy => Position::empty(trade.user_id.clone(), trade.token_id.clone()),
            Side::Sell => {
                return Err(PositionError::InsufficientBalance {
                    balance: Decimal::zero(),
                    amount: trade.amount.clone(),
                })
            }
        },
    };

    match trade.side {
        Side::Buy => apply_buy(current, trade),
        Side::Sell => apply_sell(current, trade),
    }
}

fn apply_buy(mut position: Position, trade: &Trade) -> Result<Position, PositionError> {
    if position.is_flat() {
        position.balance = trade.amount.clone();
        position.avg_cost = trade.price.clone();
        position.updated_at = trade.time_ms;
        return Ok(position);
    }

    let new_balance = position
        .balance
        .checked_add(&trade.amount)
        .ok_or(PositionError::Overflow)?;
    if new_balance.is_zero() {
        return Err(PositionError::DivisionByZero);
    }
    let total_cost = position
        .balance
        .checked_mul(&position.avg_cost)
        .and_then(|held| {
            trade
                .amount
                .checked_mul(&trade.price)
                .and_then(|bought| held.checked_add(bought))
        })
        .ok_or(PositionError::Overflow)?;

    position.avg_cost = total_cost
        .checked_div(&new_balance)
        .ok_or(PositionError::Overflow)?;
    position.balance = new_balance;
    position.updated_at = trade.time_ms;
    Ok(position)
}

fn apply_sell(mut position: Position, trade: &Trade) -> Result<Position, PositionError> {
    if trade.amount > position.balance {
        return Err(PositionError::InsufficientBalance {
            balance: position.balance,
            amount: trade.amount.clone(),
        });
    }
    let realized = trade
        .price
        .checked_sub(&position.avg_cost)
        .and_then(|per_unit| trade.amount.checked_mul(per_unit))
        .and_then(|gain| position.realized_pnl.checked_add(gain))
        .ok_or(PositionError::Overflow)?;

    position.balance = position
        .balance
        .checked_sub(&trade.amount)
        .ok_or(PositionError::Overflow)?;
    position.realized_pnl = realized;
    position.updated_at = trade.time_ms;
    Ok(position)
}

/// Fold a holder's ordered trade history into their final position.
///
/// Returns `None` for an empty history.
pub fn replay<'a, I>(trades: I) -> Result<Option<Position>, PositionError>
where
    I: IntoIterator<Item = &'a Trade>,
{
    trades
        .into_iter()
        .try_fold(None, |position, trade| apply_trade(position, trade).map(Some))
}
