use axum::extract::State;
use axum::Json;

use super::AppState;
use crate::error::AppError;

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Ready once the store answers; reports what it currently holds.
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    let tokens = state.store.list_tokens().await?.len();
    let quests = state.store.list_quests(None).await?.len();
    Ok(Json(serde_json::json!({
        "status": "ready",
        "tokens": tokens,
        "quests": quests,
    })))
}
