use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use super::{parse_id, AppState};
use crate::domain::units::format_token_amount;
use crate::domain::{Decimal, UserId};
use crate::engine::{market_snapshot, value_portfolio};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingDto {
    pub token_id: String,
    pub token_name: String,
    pub token_symbol: String,
    pub balance: String,
    pub balance_display: String,
    pub avg_buy_price: String,
    pub current_price: String,
    pub value: String,
    pub pnl: String,
    pub pnl_percentage: String,
    pub realized_pnl: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioDto {
    pub user_id: String,
    pub total_value: String,
    pub total_pnl: String,
    pub total_pnl_percentage: String,
    pub total_realized_pnl: String,
    pub tokens: Vec<HoldingDto>,
}

pub async fn get_portfolio(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<PortfolioDto>, AppError> {
    let user_id: UserId = parse_id("user id", &user_id)?;
    let positions = state.store.user_positions(&user_id).await?;

    let mut entries = Vec::with_capacity(positions.len());
    for position in positions {
        let Some(token) = state.store.get_token(&position.token_id).await? else {
            tracing::warn!(user_id = %user_id, token_id = %position.token_id, "position references unknown token");
            continue;
        };
        let spot = if position.balance.is_positive() {
            let trades = state.store.token_trades(&token.token_id).await?;
            market_snapshot(&token, &trades)?.spot_price
        } else {
            Decimal::zero()
        };
        entries.push((position, token, spot));
    }

    let summary = value_portfolio(
        user_id,
        entries.iter().map(|(p, t, spot)| (p, t, spot.clone())),
    )?;

    let decimals = state.config.token_decimals;
    let mut tokens = Vec::with_capacity(summary.holdings.len());
    for h in &summary.holdings {
        tokens.push(HoldingDto {
            token_id: h.token_id.to_string(),
            token_name: h.token_name.clone(),
            token_symbol: h.token_symbol.clone(),
            balance: h.balance.to_canonical_string(),
            balance_display: format_token_amount(&h.balance, decimals)
                .map_err(|e| AppError::Internal(e.to_string()))?,
            avg_buy_price: h.avg_cost.to_canonical_string(),
            current_price: h.current_price.to_canonical_string(),
            value: h.value.to_canonical_string(),
            pnl: h.pnl.to_canonical_string(),
            pnl_percentage: h.pnl_pct.to_canonical_string(),
            realized_pnl: h.realized_pnl.to_canonical_string(),
        });
    }

    Ok(Json(PortfolioDto {
        user_id: summary.user_id.to_string(),
        total_value: summary.total_value.to_canonical_string(),
        total_pnl: summary.total_pnl.to_canonical_string(),
        total_pnl_percentage: summary.total_pnl_pct.to_canonical_string(),
        total_realized_pnl: summary.total_realized_pnl.to_canonical_string(),
        tokens,
    }))
}
