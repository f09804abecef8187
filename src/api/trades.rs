use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::tokens::QuoteDto;
use super::{parse_decimal, parse_id, parse_side, AppState};
use crate::domain::units::parse_token_amount;
use crate::domain::{Position, Side, TokenId, Trade, UserId};
use crate::error::AppError;
use crate::orchestration::TradeOrder;

const DEFAULT_PAGE_SIZE: usize = 20;
const MAX_PAGE_SIZE: usize = 100;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeRequest {
    pub token_id: String,
    pub user_id: String,
    pub side: String,
    /// Amount in smallest units.
    pub amount: Option<String>,
    /// Amount in display units, converted with the configured token decimals.
    pub display_amount: Option<String>,
    pub max_slippage: Option<String>,
    pub tx_hash: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeDto {
    pub trade_key: String,
    pub token_id: String,
    pub user_id: String,
    pub side: Side,
    pub amount: String,
    pub price: String,
    /// `amount * price`; null past the decimal range.
    pub value: Option<String>,
    pub time_ms: i64,
    pub seq: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl From<&Trade> for TradeDto {
    fn from(t: &Trade) -> Self {
        Self {
            trade_key: t.trade_key.clone(),
            token_id: t.token_id.to_string(),
            user_id: t.user_id.to_string(),
            side: t.side,
            amount: t.amount.to_canonical_string(),
            price: t.price.to_canonical_string(),
            value: t.notional().map(|v| v.to_canonical_string()),
            time_ms: t.time_ms.as_i64(),
            seq: t.seq,
            tx_hash: t.tx_hash.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionDto {
    pub user_id: String,
    pub token_id: String,
    pub balance: String,
    pub avg_cost: String,
    pub realized_pnl: String,
    pub updated_at: i64,
}

impl From<&Position> for PositionDto {
    fn from(p: &Position) -> Self {
        Self {
            user_id: p.user_id.to_string(),
            token_id: p.token_id.to_string(),
            balance: p.balance.to_canonical_string(),
            avg_cost: p.avg_cost.to_canonical_string(),
            realized_pnl: p.realized_pnl.to_canonical_string(),
            updated_at: p.updated_at.as_i64(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionDto {
    pub trade: TradeDto,
    pub position: PositionDto,
    pub quote: QuoteDto,
}

pub async fn post_trade(
    State(state): State<AppState>,
    Json(body): Json<TradeRequest>,
) -> Result<(StatusCode, Json<ExecutionDto>), AppError> {
    let amount = match (body.amount.as_deref(), body.display_amount.as_deref()) {
        (Some(raw), None) => parse_decimal("amount", raw)?,
        (None, Some(raw)) => parse_token_amount(raw, state.config.token_decimals)
            .map_err(|e| AppError::BadRequest(e.to_string()))?,
        _ => {
            return Err(AppError::BadRequest(
                "exactly one of amount or displayAmount is required".to_string(),
            ))
        }
    };
    let max_slippage_pct = body
        .max_slippage
        .as_deref()
        .map(|raw| parse_decimal("maxSlippage", raw))
        .transpose()?;

    let order = TradeOrder {
        token_id: parse_id("tokenId", &body.token_id)?,
        user_id: parse_id("userId", &body.user_id)?,
        side: parse_side(&body.side)?,
        amount,
        max_slippage_pct,
        tx_hash: body.tx_hash.filter(|h| !h.trim().is_empty()),
    };

    let receipt = state.executor.execute(order).await?;
    Ok((
        StatusCode::CREATED,
        Json(ExecutionDto {
            trade: TradeDto::from(&receipt.trade),
            position: PositionDto::from(&receipt.position),
            quote: QuoteDto::from(&receipt.quote),
        }),
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesQuery {
    pub user: String,
    pub token_id: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TradesResponse {
    pub trades: Vec<TradeDto>,
    pub page: usize,
    pub limit: usize,
    pub total: usize,
}

/// A user's trades, newest first.
pub async fn get_trades(
    Query(params): Query<TradesQuery>,
    State(state): State<AppState>,
) -> Result<Json<TradesResponse>, AppError> {
    let user: UserId = parse_id("user", &params.user)?;
    let token_id: Option<TokenId> = match params.token_id.as_deref() {
        Some("") | None => None,
        Some(raw) => Some(parse_id("tokenId", raw)?),
    };
    let page = params.page.unwrap_or(1).max(1);
    let limit = params
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);

    let trades = state.store.user_trades(&user, token_id.as_ref()).await?;
    let total = trades.len();
    let trades = trades
        .iter()
        .rev()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .map(TradeDto::from)
        .collect();

    Ok(Json(TradesResponse {
        trades,
        page,
        limit,
        total,
    }))
}
