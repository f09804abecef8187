use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{parse_decimal, parse_id, parse_side, AppState};
use crate::domain::units::format_token_amount;
use crate::domain::{CurveParams, Decimal, Side, TimeMs, Token, TokenId, Trade, UserId};
use crate::engine::{
    market_snapshot, quote_token, token_analytics, top_holders, AnalyticsPeriod, MarketSnapshot,
    Quote, QuoteRequest,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTokenRequest {
    pub name: String,
    pub symbol: String,
    pub creator_id: String,
    pub total_supply: String,
    pub base_price: String,
    pub slope: String,
    pub protocol_fee_rate: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenDto {
    pub token_id: String,
    pub name: String,
    pub symbol: String,
    pub creator_id: String,
    pub contract_address: String,
    pub total_supply: String,
    pub base_price: String,
    pub slope: String,
    pub protocol_fee_rate: String,
    pub created_at: i64,
    pub current_supply: String,
    pub current_supply_display: String,
    pub remaining_supply: String,
    pub spot_price: String,
}

impl TokenDto {
    fn new(token: &Token, market: &MarketSnapshot, decimals: u32) -> Result<Self, AppError> {
        let current_supply_display = format_token_amount(&market.supply, decimals)
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(Self {
            token_id: token.token_id.to_string(),
            name: token.name.clone(),
            symbol: token.symbol.clone(),
            creator_id: token.creator_id.to_string(),
            contract_address: token.contract_address.clone(),
            total_supply: token.total_supply.to_canonical_string(),
            base_price: token.curve.base_price().to_canonical_string(),
            slope: token.curve.slope().to_canonical_string(),
            protocol_fee_rate: token.curve.protocol_fee_rate().to_canonical_string(),
            created_at: token.created_at.as_i64(),
            current_supply: market.supply.to_canonical_string(),
            current_supply_display,
            remaining_supply: market.remaining.to_canonical_string(),
            spot_price: market.spot_price.to_canonical_string(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementDto {
    pub to: String,
    pub data: String,
    pub value: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteDto {
    pub side: Side,
    pub amount: String,
    pub spot_price: String,
    /// Cost of a buy or value of a sell, before fees.
    pub gross: String,
    pub average_price: String,
    pub protocol_fee: String,
    pub net: String,
    pub slippage_pct: String,
    pub price_impact_pct: String,
    pub supply_before: String,
    pub supply_after: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settlement: Option<SettlementDto>,
}

impl From<&Quote> for QuoteDto {
    fn from(q: &Quote) -> Self {
        Self {
            side: q.side,
            amount: q.amount.to_canonical_string(),
            spot_price: q.spot_price.to_canonical_string(),
            gross: q.gross.to_canonical_string(),
            average_price: q.average_price.to_canonical_string(),
            protocol_fee: q.protocol_fee.to_canonical_string(),
            net: q.net.to_canonical_string(),
            slippage_pct: q.slippage_pct.trunc_percent().to_canonical_string(),
            price_impact_pct: q.price_impact_pct.trunc_percent().to_canonical_string(),
            supply_before: q.supply_before.to_canonical_string(),
            supply_after: q.supply_after.to_canonical_string(),
            settlement: q.settlement.as_ref().map(|s| SettlementDto {
                to: s.to.clone(),
                data: s.data.clone(),
                value: s.value.to_canonical_string(),
            }),
        }
    }
}

async fn load_token(state: &AppState, raw_id: &str) -> Result<(Token, Vec<Trade>), AppError> {
    let token_id: TokenId = parse_id("token id", raw_id)?;
    let token = state
        .store
        .get_token(&token_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("token not found: {}", token_id)))?;
    let trades = state.store.token_trades(&token_id).await?;
    Ok((token, trades))
}

pub async fn create_token(
    State(state): State<AppState>,
    Json(body): Json<CreateTokenRequest>,
) -> Result<(StatusCode, Json<TokenDto>), AppError> {
    let creator_id: UserId = parse_id("creatorId", &body.creator_id)?;
    let fee_rate = match body.protocol_fee_rate.as_deref() {
        Some(raw) => parse_decimal("protocolFeeRate", raw)?,
        None => state.config.default_fee_rate.clone(),
    };
    let curve = CurveParams::new(
        parse_decimal("basePrice", &body.base_price)?,
        parse_decimal("slope", &body.slope)?,
        fee_rate,
    )?;
    let token = Token::new(
        TokenId::generate(),
        body.name,
        body.symbol,
        creator_id,
        parse_decimal("totalSupply", &body.total_supply)?,
        curve,
        TimeMs::now(),
    )?;

    state.store.insert_token(token.clone()).await?;
    tracing::info!(token_id = %token.token_id, symbol = %token.symbol, "token created");

    let market = market_snapshot(&token, std::iter::empty())?;
    let dto = TokenDto::new(&token, &market, state.config.token_decimals)?;
    Ok((StatusCode::CREATED, Json(dto)))
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub tokens: Vec<TokenDto>,
}

pub async fn list_tokens(State(state): State<AppState>) -> Result<Json<TokensResponse>, AppError> {
    let mut tokens = Vec::new();
    for token in state.store.list_tokens().await? {
        let trades = state.store.token_trades(&token.token_id).await?;
        let market = market_snapshot(&token, &trades)?;
        tokens.push(TokenDto::new(&token, &market, state.config.token_decimals)?);
    }
    Ok(Json(TokensResponse { tokens }))
}

pub async fn get_token(
    Path(token_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<TokenDto>, AppError> {
    let (token, trades) = load_token(&state, &token_id).await?;
    let market = market_snapshot(&token, &trades)?;
    Ok(Json(TokenDto::new(&token, &market, state.config.token_decimals)?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub side: String,
    pub amount: String,
    pub user: Option<String>,
    pub max_slippage: Option<String>,
}

pub async fn get_quote(
    Path(token_id): Path<String>,
    Query(params): Query<QuoteQuery>,
    State(state): State<AppState>,
) -> Result<Json<QuoteDto>, AppError> {
    let side = parse_side(&params.side)?;
    let amount = parse_decimal("amount", &params.amount)?;
    let token_id: TokenId = parse_id("token id", &token_id)?;

    let mut request = QuoteRequest::new(side, amount);
    if let Some(raw) = params.max_slippage.as_deref() {
        request = request.with_max_slippage(parse_decimal("maxSlippage", raw)?);
    }
    if let (Side::Sell, Some(user)) = (side, params.user.as_deref()) {
        let user_id: UserId = parse_id("user", user)?;
        let balance = state
            .store
            .get_position(&user_id, &token_id)
            .await?
            .map(|p| p.balance)
            .unwrap_or_else(Decimal::zero);
        request = request.with_holder_balance(balance);
    }

    let token = state.store.get_token(&token_id).await?;
    let trades = state.store.token_trades(&token_id).await?;
    let quote = quote_token(&token_id, token.as_ref(), &trades, &request)?;
    Ok(Json(QuoteDto::from(&quote)))
}

#[derive(Debug, Deserialize)]
pub struct AnalyticsQuery {
    pub period: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsDto {
    pub token_id: String,
    pub period: AnalyticsPeriod,
    pub window_start: i64,
    pub total_volume: String,
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    pub price_change: String,
    pub price_change_pct: String,
}

pub async fn get_analytics(
    Path(token_id): Path<String>,
    Query(params): Query<AnalyticsQuery>,
    State(state): State<AppState>,
) -> Result<Json<AnalyticsDto>, AppError> {
    let (token, trades) = load_token(&state, &token_id).await?;
    let period = AnalyticsPeriod::parse_or_default(params.period.as_deref());
    let a = token_analytics(&trades, period, TimeMs::now())?;
    Ok(Json(AnalyticsDto {
        token_id: token.token_id.to_string(),
        period: a.period,
        window_start: a.window_start.as_i64(),
        total_volume: a.total_volume.to_canonical_string(),
        total_trades: a.total_trades,
        buy_trades: a.buy_trades,
        sell_trades: a.sell_trades,
        price_change: a.price_change.to_canonical_string(),
        price_change_pct: a.price_change_pct.to_canonical_string(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct HoldersQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HolderDto {
    pub rank: usize,
    pub user_id: String,
    pub balance: String,
    pub realized_pnl: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldersResponse {
    pub token_id: String,
    pub symbol: String,
    pub holders: Vec<HolderDto>,
}

pub async fn get_holders(
    Path(token_id): Path<String>,
    Query(params): Query<HoldersQuery>,
    State(state): State<AppState>,
) -> Result<Json<HoldersResponse>, AppError> {
    let token_id: TokenId = parse_id("token id", &token_id)?;
    let token = state
        .store
        .get_token(&token_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("token not found: {}", token_id)))?;
    let limit = params.limit.unwrap_or(state.config.leaderboard_limit);
    let positions = state.store.token_positions(&token_id).await?;

    let holders = top_holders(&positions, limit)
        .into_iter()
        .map(|h| HolderDto {
            rank: h.rank,
            user_id: h.user_id.to_string(),
            balance: h.balance.to_canonical_string(),
            realized_pnl: h.realized_pnl.to_canonical_string(),
        })
        .collect();

    Ok(Json(HoldersResponse {
        token_id: token.token_id.to_string(),
        symbol: token.symbol,
        holders,
    }))
}
