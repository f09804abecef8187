//! Domain types and determinism layer for the curve ledger.
//!
//! This module provides:
//! - Lossless numeric handling via the shared Decimal wrapper
//! - Domain primitives: TimeMs, UserId, TokenId, QuestId, Side
//! - Token, Trade, Position and Quest records with serde serialization
//! - Stable trade ordering key helper for deterministic ledger folds

pub mod decimal;
pub mod ordering;
pub mod position;
pub mod primitives;
pub mod quest;
pub mod token;
pub mod trade;
pub mod units;

pub use decimal::Decimal;
pub use ordering::TradeOrderingKey;
pub use position::Position;
pub use primitives::{IdParseError, QuestId, Side, TimeMs, TokenId, UserId};
pub use quest::{Allocation, Quest, QuestStatus, QuestSubmission};
pub use token::{CurveParams, Token, TokenError};
pub use trade::Trade;
