pub mod api;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod orchestration;
pub mod store;

pub use config::Config;
pub use domain::{
    Allocation, CurveParams, Decimal, Position, Quest, QuestId, QuestStatus, QuestSubmission,
    Side, TimeMs, Token, TokenId, Trade, UserId,
};
pub use error::AppError;
pub use orchestration::{TradeExecutor, TradeOrder};
pub use store::{MarketStore, MemoryStore, SeedData, StoreError};
