//! Storage abstraction for tokens, the trade ledger, positions and quests.

use crate::domain::{
    Position, Quest, QuestId, QuestStatus, QuestSubmission, Token, TokenId, Trade, UserId,
};
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

pub mod memory;
pub mod seed;

pub use memory::MemoryStore;
pub use seed::{SeedData, TokenSeed};

/// Persistence collaborator for the engine.
///
/// Implementations must return each token's trades in ledger order `(time_ms, seq)` and
/// assign `seq` on append. `commit_trade` must apply the trade and the holder's new
/// position together or not at all.
#[async_trait]
pub trait MarketStore: Send + Sync + fmt::Debug {
    async fn get_token(&self, token_id: &TokenId) -> Result<Option<Token>, StoreError>;

    /// Insert a new token. Symbols are unique across the store.
    async fn insert_token(&self, token: Token) -> Result<(), StoreError>;

    async fn list_tokens(&self) -> Result<Vec<Token>, StoreError>;

    /// The token's full ledger in order.
    async fn token_trades(&self, token_id: &TokenId) -> Result<Vec<Trade>, StoreError>;

    /// A user's trades across tokens (or one token), oldest first.
    async fn user_trades(
        &self,
        user_id: &UserId,
        token_id: Option<&TokenId>,
    ) -> Result<Vec<Trade>, StoreError>;

    /// Append `trade` to its token's ledger and store `position`. Returns the trade as
    /// recorded, with `seq` and key assigned.
    async fn commit_trade(&self, trade: Trade, position: Position) -> Result<Trade, StoreError>;

    async fn get_position(
        &self,
        user_id: &UserId,
        token_id: &TokenId,
    ) -> Result<Option<Position>, StoreError>;

    async fn user_positions(&self, user_id: &UserId) -> Result<Vec<Position>, StoreError>;

    async fn token_positions(&self, token_id: &TokenId) -> Result<Vec<Position>, StoreError>;

    async fn get_quest(&self, quest_id: &QuestId) -> Result<Option<Quest>, StoreError>;

    async fn insert_quest(&self, quest: Quest) -> Result<(), StoreError>;

    async fn set_quest_status(
        &self,
        quest_id: &QuestId,
        status: QuestStatus,
    ) -> Result<Quest, StoreError>;

    /// Quests newest first, optionally filtered by status.
    async fn list_quests(&self, status: Option<QuestStatus>) -> Result<Vec<Quest>, StoreError>;

    async fn get_submission(
        &self,
        quest_id: &QuestId,
        user_id: &UserId,
    ) -> Result<Option<QuestSubmission>, StoreError>;

    /// Insert a submission; at most one per (quest, user).
    async fn insert_submission(&self, submission: QuestSubmission) -> Result<(), StoreError>;

    async fn quest_submissions(&self, quest_id: &QuestId)
        -> Result<Vec<QuestSubmission>, StoreError>;

    async fn user_submissions(&self, user_id: &UserId) -> Result<Vec<QuestSubmission>, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("token already exists: {0}")]
    DuplicateToken(TokenId),
    #[error("symbol already taken: {0}")]
    DuplicateSymbol(String),
    #[error("trade already recorded: {0}")]
    DuplicateTrade(String),
    #[error("quest already exists: {0}")]
    DuplicateQuest(QuestId),
    #[error("user {user_id} already submitted to quest {quest_id}")]
    DuplicateSubmission { quest_id: QuestId, user_id: UserId },
    #[error("token not found: {0}")]
    TokenNotFound(TokenId),
    #[error("quest not found: {0}")]
    QuestNotFound(QuestId),
    #[error("invalid seed data: {0}")]
    Seed(String),
}
