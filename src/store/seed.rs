//! JSON seed file for preloading tokens and quests into a `MemoryStore`.

use super::{MemoryStore, StoreError};
use crate::domain::{CurveParams, Decimal, Quest, TimeMs, Token, TokenId, UserId};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSeed {
    #[serde(default)]
    pub token_id: Option<TokenId>,
    pub name: String,
    pub symbol: String,
    pub creator_id: UserId,
    pub total_supply: Decimal,
    pub curve: CurveParams,
    #[serde(default)]
    pub created_at: Option<TimeMs>,
}

impl TokenSeed {
    fn into_token(self, now: TimeMs) -> Result<Token, StoreError> {
        let symbol = self.symbol.clone();
        Token::new(
            self.token_id.unwrap_or_else(TokenId::generate),
            self.name,
            self.symbol,
            self.creator_id,
            self.total_supply,
            self.curve,
            self.created_at.unwrap_or(now),
        )
        .map_err(|e| StoreError::Seed(format!("token {symbol}: {e}")))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub tokens: Vec<TokenSeed>,
    #[serde(default)]
    pub quests: Vec<Quest>,
}

impl SeedData {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Seed(format!("{}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| StoreError::Seed(format!("{}: {e}", path.display())))
    }

    /// Build a store holding every seeded token and quest.
    pub fn into_store(self, now: TimeMs) -> Result<MemoryStore, StoreError> {
        let mut store = MemoryStore::new();
        for seed in self.tokens {
            store = store.with_token(seed.into_token(now)?)?;
        }
        for quest in self.quests {
            store = store.with_quest(quest)?;
        }
        Ok(store)
    }
}
