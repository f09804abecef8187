use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{parse_decimal, parse_id, AppState};
use crate::domain::{
    Allocation, Decimal, Quest, QuestId, QuestStatus, QuestSubmission, TimeMs, TokenId, UserId,
};
use crate::engine::{
    rank_submissions, score, validate_new_quest, validate_submission, PriceHistory,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestRequest {
    pub title: String,
    pub description: Option<String>,
    pub token_slate: Vec<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub prize_pool: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestDto {
    pub quest_id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub token_slate: Vec<String>,
    pub start_ms: i64,
    pub end_ms: i64,
    pub prize_pool: String,
    pub status: QuestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub participant_count: Option<usize>,
}

impl From<&Quest> for QuestDto {
    fn from(q: &Quest) -> Self {
        Self {
            quest_id: q.quest_id.to_string(),
            title: q.title.clone(),
            description: q.description.clone(),
            token_slate: q.token_slate.iter().map(|t| t.to_string()).collect(),
            start_ms: q.start_ms.as_i64(),
            end_ms: q.end_ms.as_i64(),
            prize_pool: q.prize_pool.to_canonical_string(),
            status: q.status,
            participant_count: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionDto {
    pub quest_id: String,
    pub user_id: String,
    pub allocation: BTreeMap<String, String>,
    pub score: String,
    pub submitted_at: i64,
}

impl From<&QuestSubmission> for SubmissionDto {
    fn from(s: &QuestSubmission) -> Self {
        Self {
            quest_id: s.quest_id.to_string(),
            user_id: s.user_id.to_string(),
            allocation: s
                .allocation
                .iter()
                .map(|(t, pct)| (t.to_string(), pct.to_canonical_string()))
                .collect(),
            score: s.score.to_canonical_string(),
            submitted_at: s.submitted_at.as_i64(),
        }
    }
}

async fn load_quest(state: &AppState, raw_id: &str) -> Result<Quest, AppError> {
    let quest_id: QuestId = parse_id("quest id", raw_id)?;
    state
        .store
        .get_quest(&quest_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("quest not found: {}", quest_id)))
}

fn parse_allocation(raw: &BTreeMap<String, String>) -> Result<Allocation, AppError> {
    raw.iter()
        .map(|(token, pct)| {
            let token_id: TokenId = parse_id("allocation token", token)?;
            let pct = parse_decimal("allocation percentage", pct)?;
            Ok((token_id, pct))
        })
        .collect()
}

pub async fn create_quest(
    State(state): State<AppState>,
    Json(body): Json<CreateQuestRequest>,
) -> Result<(StatusCode, Json<QuestDto>), AppError> {
    if body.title.trim().is_empty() {
        return Err(AppError::BadRequest("title must not be empty".to_string()));
    }
    let slate = body
        .token_slate
        .iter()
        .map(|raw| parse_id::<TokenId>("token slate entry", raw))
        .collect::<Result<Vec<_>, _>>()?;
    let start_ms = TimeMs::new(body.start_ms);
    let end_ms = TimeMs::new(body.end_ms);
    validate_new_quest(&slate, start_ms, end_ms, TimeMs::now())?;

    for token_id in &slate {
        if state.store.get_token(token_id).await?.is_none() {
            return Err(AppError::BadRequest(format!(
                "invalid token slate: token {} does not exist",
                token_id
            )));
        }
    }

    let prize_pool = match body.prize_pool.as_deref() {
        Some(raw) => parse_decimal("prizePool", raw)?,
        None => Decimal::zero(),
    };
    if prize_pool.is_negative() {
        return Err(AppError::BadRequest("prizePool must be >= 0".to_string()));
    }

    let quest = Quest {
        quest_id: QuestId::generate(),
        title: body.title.trim().to_string(),
        description: body.description.filter(|d| !d.trim().is_empty()),
        token_slate: slate,
        start_ms,
        end_ms,
        prize_pool,
        status: QuestStatus::Active,
    };
    state.store.insert_quest(quest.clone()).await?;
    tracing::info!(quest_id = %quest.quest_id, tokens = quest.token_slate.len(), "quest created");

    Ok((StatusCode::CREATED, Json(QuestDto::from(&quest))))
}

#[derive(Debug, Deserialize)]
pub struct QuestsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QuestsResponse {
    pub quests: Vec<QuestDto>,
}

pub async fn list_quests(
    Query(params): Query<QuestsQuery>,
    State(state): State<AppState>,
) -> Result<Json<QuestsResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .map(parse_status)
        .transpose()?;
    let quests = state.store.list_quests(status).await?;
    Ok(Json(QuestsResponse {
        quests: quests.iter().map(QuestDto::from).collect(),
    }))
}

fn parse_status(raw: &str) -> Result<QuestStatus, AppError> {
    raw.parse::<QuestStatus>().map_err(|_| {
        AppError::BadRequest(
            "invalid status: must be 'active', 'completed', or 'cancelled'".to_string(),
        )
    })
}

pub async fn get_quest(
    Path(quest_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<QuestDto>, AppError> {
    let quest = load_quest(&state, &quest_id).await?;
    let participants = state.store.quest_submissions(&quest.quest_id).await?.len();
    let mut dto = QuestDto::from(&quest);
    dto.participant_count = Some(participants);
    Ok(Json(dto))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
}

pub async fn set_status(
    Path(quest_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<StatusRequest>,
) -> Result<Json<QuestDto>, AppError> {
    let quest_id: QuestId = parse_id("quest id", &quest_id)?;
    let status = parse_status(&body.status)?;
    let quest = state.store.set_quest_status(&quest_id, status).await?;
    tracing::info!(quest_id = %quest_id, status = %status, "quest status updated");
    Ok(Json(QuestDto::from(&quest)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionRequest {
    pub user_id: String,
    pub allocation: BTreeMap<String, String>,
}

/// Recent trade prices for each token in `allocation`, in ledger order.
async fn price_history(state: &AppState, allocation: &Allocation) -> Result<PriceHistory, AppError> {
    let fetches = allocation.keys().map(|token_id| async move {
        let trades = state.store.token_trades(token_id).await?;
        let prices: Vec<Decimal> = trades.iter().map(|t| t.price.clone()).collect();
        Ok::<_, AppError>((token_id.clone(), prices))
    });
    Ok(try_join_all(fetches).await?.into_iter().collect())
}

pub async fn submit_allocation(
    Path(quest_id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionDto>), AppError> {
    let quest = load_quest(&state, &quest_id).await?;
    let user_id: UserId = parse_id("userId", &body.user_id)?;
    let allocation = parse_allocation(&body.allocation)?;
    let now = TimeMs::now();

    let already_submitted = state
        .store
        .get_submission(&quest.quest_id, &user_id)
        .await?
        .is_some();
    validate_submission(&quest, &allocation, now, already_submitted)?;

    let history = price_history(&state, &allocation).await?;
    let submission = QuestSubmission {
        quest_id: quest.quest_id.clone(),
        user_id,
        score: score(&allocation, &history)?,
        allocation,
        submitted_at: now,
    };
    state.store.insert_submission(submission.clone()).await?;
    tracing::info!(
        quest_id = %submission.quest_id,
        user_id = %submission.user_id,
        score = %submission.score,
        "quest submission recorded"
    );

    Ok((StatusCode::CREATED, Json(SubmissionDto::from(&submission))))
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub score: String,
    pub submitted_at: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub quest_id: String,
    pub entries: Vec<LeaderboardEntry>,
}

pub async fn get_leaderboard(
    Path(quest_id): Path<String>,
    Query(params): Query<LeaderboardQuery>,
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, AppError> {
    let quest = load_quest(&state, &quest_id).await?;
    let limit = params.limit.unwrap_or(state.config.leaderboard_limit);
    let submissions = state.store.quest_submissions(&quest.quest_id).await?;

    let entries = rank_submissions(&submissions, limit)
        .into_iter()
        .map(|r| LeaderboardEntry {
            rank: r.rank,
            user_id: r.user_id.to_string(),
            score: r.score.to_canonical_string(),
            submitted_at: r.submitted_at.as_i64(),
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        quest_id: quest.quest_id.to_string(),
        entries,
    }))
}

#[derive(Debug, Serialize)]
pub struct SubmissionsResponse {
    pub submissions: Vec<SubmissionDto>,
}

pub async fn get_user_submissions(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<SubmissionsResponse>, AppError> {
    let user_id: UserId = parse_id("user id", &user_id)?;
    let submissions = state.store.user_submissions(&user_id).await?;
    Ok(Json(SubmissionsResponse {
        submissions: submissions.iter().map(SubmissionDto::from).collect(),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRequest {
    pub allocation: BTreeMap<String, String>,
    pub price_history: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    pub score: String,
}

/// Score an allocation against caller-supplied price histories without storing anything.
pub async fn score_allocation(Json(body): Json<ScoreRequest>) -> Result<Json<ScoreResponse>, AppError> {
    let allocation = parse_allocation(&body.allocation)?;
    let mut history = PriceHistory::new();
    for (token, prices) in &body.price_history {
        let token_id: TokenId = parse_id("price history token", token)?;
        let prices = prices
            .iter()
            .map(|p| parse_decimal("price", p))
            .collect::<Result<Vec<_>, _>>()?;
        history.insert(token_id, prices);
    }
    let value = score(&allocation, &history)?;
    Ok(Json(ScoreResponse {
        score: value.to_canonical_string(),
    }))
}
