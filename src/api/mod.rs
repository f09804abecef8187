pub mod health;
pub mod portfolio;
pub mod quests;
pub mod tokens;
pub mod trades;

use crate::config::Config;
use crate::domain::{Decimal, Side};
use crate::error::AppError;
use crate::orchestration::TradeExecutor;
use crate::store::MarketStore;
use axum::{
    routing::{get, patch, post},
    Router,
};
use std::str::FromStr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketStore>,
    pub executor: TradeExecutor,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn MarketStore>, config: Config) -> Self {
        Self {
            executor: TradeExecutor::new(store.clone()),
            store,
            config,
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health::health))
        .route("/ready", get(health::ready))
        .route("/v1/tokens", post(tokens::create_token).get(tokens::list_tokens))
        .route("/v1/tokens/:token_id", get(tokens::get_token))
        .route("/v1/tokens/:token_id/quote", get(tokens::get_quote))
        .route("/v1/tokens/:token_id/analytics", get(tokens::get_analytics))
        .route("/v1/tokens/:token_id/holders", get(tokens::get_holders))
        .route("/v1/trades", post(trades::post_trade).get(trades::get_trades))
        .route("/v1/portfolio/:user_id", get(portfolio::get_portfolio))
        .route("/v1/quests", post(quests::create_quest).get(quests::list_quests))
        .route("/v1/quests/score", post(quests::score_allocation))
        .route("/v1/quests/:quest_id", get(quests::get_quest))
        .route("/v1/quests/:quest_id/status", patch(quests::set_status))
        .route(
            "/v1/quests/:quest_id/submissions",
            post(quests::submit_allocation),
        )
        .route("/v1/quests/:quest_id/leaderboard", get(quests::get_leaderboard))
        .route(
            "/v1/users/:user_id/submissions",
            get(quests::get_user_submissions),
        )
        .layer(cors)
        .with_state(state)
}

pub(crate) fn parse_decimal(field: &str, raw: &str) -> Result<Decimal, AppError> {
    Decimal::from_str_canonical(raw)
        .map_err(|_| AppError::BadRequest(format!("{} must be a decimal number, got {:?}", field, raw)))
}

pub(crate) fn parse_id<T: FromStr>(field: &str, raw: &str) -> Result<T, AppError> {
    raw.parse::<T>()
        .map_err(|_| AppError::BadRequest(format!("invalid {}: {:?}", field, raw)))
}

pub(crate) fn parse_side(raw: &str) -> Result<Side, AppError> {
    Side::from_str(raw)
        .map_err(|_| AppError::BadRequest(format!("side must be buy or sell, got {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::UserId;

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_side("BUY").unwrap(), Side::Buy);
        assert!(matches!(parse_side("hold"), Err(AppError::BadRequest(_))));
        assert!(matches!(
            parse_decimal("amount", "1e"),
            Err(AppError::BadRequest(_))
        ));
        assert_eq!(
            parse_id::<UserId>("user", " alice ").unwrap().as_str(),
            "alice"
        );
        assert!(parse_id::<UserId>("user", "").is_err());
    }
}
