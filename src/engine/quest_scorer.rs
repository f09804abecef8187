//! Quest scoring, submission validation and ranking.
//!
//! A submission's score is the allocation-weighted price momentum of its tokens, where
//! momentum is the percent change between each token's two most recent prices.
//! Weights are normalized by the total allocated percentage, so a partial allocation
//! scores the same as a full one spread in the same proportions.

use crate::domain::{Allocation, Decimal, Quest, QuestStatus, QuestSubmission, TimeMs, TokenId, UserId};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

/// Observed prices per token, oldest first.
pub type PriceHistory = HashMap<TokenId, Vec<Decimal>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuestError {
    #[error("quest is not active")]
    NotActive,
    #[error("quest has not started yet")]
    NotStarted,
    #[error("quest has ended")]
    Ended,
    #[error("portfolio already submitted for this quest")]
    AlreadySubmitted,
    #[error("allocation must contain at least one token")]
    EmptyAllocation,
    #[error("allocation for {0} must be > 0 and <= 100")]
    InvalidPercentage(TokenId),
    #[error("allocations sum to {0}%, more than 100%")]
    AllocationOverflow(Decimal),
    #[error("invalid tokens in portfolio: {}", join_ids(.0))]
    TokenNotInSlate(Vec<TokenId>),
    #[error("token slate must not be empty")]
    EmptySlate,
    #[error("duplicate token in slate: {0}")]
    DuplicateSlateToken(TokenId),
    #[error("start date must be in the future")]
    StartNotInFuture,
    #[error("end date must be after start date")]
    EndBeforeStart,
    #[error("arithmetic overflow in quest score")]
    Overflow,
}

fn join_ids(ids: &[TokenId]) -> String {
    ids.iter()
        .map(TokenId::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Percent change between the last two prices, or `None` if it cannot be measured.
fn momentum(prices: &[Decimal]) -> Result<Option<Decimal>, QuestError> {
    let [.., previous, latest] = prices else {
        return Ok(None);
    };
    if previous.is_zero() {
        return Ok(None);
    }
    latest
        .checked_sub(previous)
        .and_then(|delta| delta.checked_div(previous))
        .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
        .map(Some)
        .ok_or(QuestError::Overflow)
}

/// Score an allocation against recent price history.
///
/// Tokens with fewer than two prices, or whose previous price is zero, contribute
/// nothing to either the weighted sum or the total weight. Returns zero when no weight
/// remains.
pub fn score(allocation: &Allocation, history: &PriceHistory) -> Result<Decimal, QuestError> {
    let mut weighted = Decimal::zero();
    let mut total_weight = Decimal::zero();

    for (token_id, pct) in allocation {
        let Some(prices) = history.get(token_id) else {
            continue;
        };
        let Some(change) = momentum(prices)? else {
            continue;
        };
        let contribution = pct
            .checked_div(Decimal::hundred())
            .and_then(|w| change.checked_mul(w))
            .ok_or(QuestError::Overflow)?;
        weighted = weighted
            .checked_add(contribution)
            .ok_or(QuestError::Overflow)?;
        total_weight = total_weight.checked_add(pct).ok_or(QuestError::Overflow)?;
    }

    if !total_weight.is_positive() {
        return Ok(Decimal::zero());
    }
    total_weight
        .checked_div(Decimal::hundred())
        .and_then(|norm| weighted.checked_div(norm))
        .ok_or(QuestError::Overflow)
}

/// Check a new quest's slate and schedule.
pub fn validate_new_quest(
    slate: &[TokenId],
    start_ms: TimeMs,
    end_ms: TimeMs,
    now: TimeMs,
) -> Result<(), QuestError> {
    if slate.is_empty() {
        return Err(QuestError::EmptySlate);
    }
    for (i, token_id) in slate.iter().enumerate() {
        if slate[..i].contains(token_id) {
            return Err(QuestError::DuplicateSlateToken(token_id.clone()));
        }
    }
    if start_ms <= now {
        return Err(QuestError::StartNotInFuture);
    }
    if end_ms <= start_ms {
        return Err(QuestError::EndBeforeStart);
    }
    Ok(())
}

/// Check that `allocation` may be submitted to `quest` at `now`.
///
/// Order: status, schedule, slate membership, duplicate submission, then the
/// allocation's own shape.
pub fn validate_submission(
    quest: &Quest,
    allocation: &Allocation,
    now: TimeMs,
    already_submitted: bool,
) -> Result<(), QuestError> {
    if quest.status != QuestStatus::Active {
        return Err(QuestError::NotActive);
    }
    if now < quest.start_ms {
        return Err(QuestError::NotStarted);
    }
    if now > quest.end_ms {
        return Err(QuestError::Ended);
    }

    let foreign: Vec<TokenId> = allocation
        .keys()
        .filter(|id| !quest.in_slate(id))
        .cloned()
        .collect();
    if !foreign.is_empty() {
        return Err(QuestError::TokenNotInSlate(foreign));
    }
    if already_submitted {
        return Err(QuestError::AlreadySubmitted);
    }

    if allocation.is_empty() {
        return Err(QuestError::EmptyAllocation);
    }
    let mut total = Decimal::zero();
    for (token_id, pct) in allocation {
        if !pct.is_positive() || pct > &Decimal::hundred() {
            return Err(QuestError::InvalidPercentage(token_id.clone()));
        }
        total = total.checked_add(pct).ok_or(QuestError::Overflow)?;
    }
    if total > Decimal::hundred() {
        return Err(QuestError::AllocationOverflow(total));
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSubmission {
    pub rank: usize,
    pub user_id: UserId,
    pub score: Decimal,
    pub submitted_at: TimeMs,
}

/// Order submissions best first: higher score, then earlier submission, then user id.
pub fn rank_submissions(submissions: &[QuestSubmission], limit: usize) -> Vec<RankedSubmission> {
    let mut ordered: Vec<&QuestSubmission> = submissions.iter().collect();
    ordered.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.submitted_at.cmp(&b.submitted_at))
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    ordered
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, s)| RankedSubmission {
            rank: i + 1,
            user_id: s.user_id.clone(),
            score: s.score.clone(),
            submitted_at: s.submitted_at,
        })
        .collect()
}
