//! Portfolio valuation across a holder's positions.

use super::position_ledger::{pct_of, PositionError};
use crate::domain::{Decimal, Position, Token, TokenId, UserId};
use serde::Serialize;

/// One open position valued at its token's current spot price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Holding {
    pub token_id: TokenId,
    pub token_name: String,
    pub token_symbol: String,
    pub balance: Decimal,
    pub avg_cost: Decimal,
    pub current_price: Decimal,
    pub value: Decimal,
    pub cost: Decimal,
    pub pnl: Decimal,
    pub pnl_pct: Decimal,
    pub realized_pnl: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PortfolioSummary {
    pub user_id: UserId,
    pub total_value: Decimal,
    pub total_pnl: Decimal,
    pub total_pnl_pct: Decimal,
    /// Realized PnL over every position, flat ones included.
    pub total_realized_pnl: Decimal,
    pub holdings: Vec<Holding>,
}

impl PortfolioSummary {
    pub fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            total_value: Decimal::zero(),
            total_pnl: Decimal::zero(),
            total_pnl_pct: Decimal::zero(),
            total_realized_pnl: Decimal::zero(),
            holdings: Vec::new(),
        }
    }
}

/// Value every `(position, token, spot_price)` entry and total them.
///
/// Flat positions are excluded from holdings but their realized PnL still counts.
/// Holdings are ordered by value, largest first, ties by token id.
pub fn value_portfolio<'a, I>(user_id: UserId, entries: I) -> Result<PortfolioSummary, PositionError>
where
    I: IntoIterator<Item = (&'a Position, &'a Token, Decimal)>,
{
    let mut summary = PortfolioSummary::empty(user_id);

    for (position, token, spot) in entries {
        summary.total_realized_pnl = summary
            .total_realized_pnl
            .checked_add(&position.realized_pnl)
            .ok_or(PositionError::Overflow)?;
        if !position.balance.is_positive() {
            continue;
        }

        let valuation = position.valuation(&spot)?;
        summary.total_value = summary
            .total_value
            .checked_add(&valuation.value)
            .ok_or(PositionError::Overflow)?;
        summary.total_pnl = summary
            .total_pnl
            .checked_add(&valuation.unrealized_pnl)
            .ok_or(PositionError::Overflow)?;

        summary.holdings.push(Holding {
            token_id: token.token_id.clone(),
            token_name: token.name.clone(),
            token_symbol: token.symbol.clone(),
            balance: position.balance.clone(),
            avg_cost: position.avg_cost.clone(),
            current_price: spot,
            value: valuation.value,
            cost: valuation.cost,
            pnl: valuation.unrealized_pnl,
            pnl_pct: valuation.pnl_pct,
            realized_pnl: position.realized_pnl.clone(),
        });
    }

    let total_cost = summary
        .total_value
        .checked_sub(&summary.total_pnl)
        .ok_or(PositionError::Overflow)?;
    summary.total_pnl_pct = pct_of(&summary.total_pnl, &total_cost)?;
    summary.holdings.sort_by(|a, b| {
        b.value
            .cmp(&a.value)
            .then_with(|| a.token_id.cmp(&b.token_id))
    });
    Ok(summary)
}
