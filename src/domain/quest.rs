//! Quest competitions and the allocations users submit to them.

use crate::domain::{Decimal, QuestId, TimeMs, TokenId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Percentage weight per token, e.g. `{"tok-a": 60, "tok-b": 40}`.
///
/// Ordered so that iteration (and therefore scoring) is deterministic.
pub type Allocation = BTreeMap<TokenId, Decimal>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestStatus {
    Active,
    Completed,
    Cancelled,
}

impl std::str::FromStr for QuestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(QuestStatus::Active),
            "completed" => Ok(QuestStatus::Completed),
            "cancelled" => Ok(QuestStatus::Cancelled),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for QuestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QuestStatus::Active => write!(f, "active"),
            QuestStatus::Completed => write!(f, "completed"),
            QuestStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// A time-boxed competition over a fixed slate of tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quest {
    pub quest_id: QuestId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub token_slate: Vec<TokenId>,
    pub start_ms: TimeMs,
    pub end_ms: TimeMs,
    pub prize_pool: Decimal,
    pub status: QuestStatus,
}

impl Quest {
    pub fn in_slate(&self, token_id: &TokenId) -> bool {
        self.token_slate.contains(token_id)
    }
}

/// A user's scored entry into a quest. Immutable; one per (quest, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestSubmission {
    pub quest_id: QuestId,
    pub user_id: UserId,
    pub allocation: Allocation,
    pub score: Decimal,
    pub submitted_at: TimeMs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn quest_status_parse_and_display() {
        assert_eq!(QuestStatus::from_str("Active").unwrap(), QuestStatus::Active);
        assert_eq!(QuestStatus::Cancelled.to_string(), "cancelled");
        assert!(QuestStatus::from_str("paused").is_err());
    }

    #[test]
    fn allocation_serializes_as_map() {
        let mut allocation = Allocation::new();
        allocation.insert(TokenId::new("b".to_string()), Decimal::from(40i64));
        allocation.insert(TokenId::new("a".to_string()), Decimal::from(60i64));
        let json = serde_json::to_string(&allocation).unwrap();
        assert_eq!(json, r#"{"a":"60","b":"40"}"#);
    }
}
