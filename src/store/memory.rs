//! In-memory `MarketStore` used by the server and tests.

use super::{MarketStore, StoreError};
use crate::domain::ordering::sort_trades_deterministic;
use crate::domain::{
    Position, Quest, QuestId, QuestStatus, QuestSubmission, Token, TokenId, Trade, UserId,
};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Inner {
    tokens: HashMap<TokenId, Token>,
    symbols: HashSet<String>,
    trades: HashMap<TokenId, Vec<Trade>>,
    trade_keys: HashSet<String>,
    last_seq: u64,
    positions: HashMap<(UserId, TokenId), Position>,
    quests: HashMap<QuestId, Quest>,
    submissions: HashMap<QuestId, Vec<QuestSubmission>>,
}

impl Inner {
    fn insert_token(&mut self, token: Token) -> Result<(), StoreError> {
        if self.tokens.contains_key(&token.token_id) {
            return Err(StoreError::DuplicateToken(token.token_id));
        }
        if !self.symbols.insert(token.symbol.clone()) {
            return Err(StoreError::DuplicateSymbol(token.symbol));
        }
        self.trades.entry(token.token_id.clone()).or_default();
        self.tokens.insert(token.token_id.clone(), token);
        Ok(())
    }

    fn insert_quest(&mut self, quest: Quest) -> Result<(), StoreError> {
        if self.quests.contains_key(&quest.quest_id) {
            return Err(StoreError::DuplicateQuest(quest.quest_id));
        }
        self.quests.insert(quest.quest_id.clone(), quest);
        Ok(())
    }

    fn commit_trade(&mut self, trade: Trade, position: Position) -> Result<Trade, StoreError> {
        if !self.tokens.contains_key(&trade.token_id) {
            return Err(StoreError::TokenNotFound(trade.token_id));
        }
        let trade = trade.with_seq(self.last_seq + 1);
        if !self.trade_keys.insert(trade.trade_key.clone()) {
            return Err(StoreError::DuplicateTrade(trade.trade_key));
        }
        self.last_seq = trade.seq;
        self.trades
            .entry(trade.token_id.clone())
            .or_default()
            .push(trade.clone());
        self.positions.insert(
            (position.user_id.clone(), position.token_id.clone()),
            position,
        );
        Ok(trade)
    }
}

/// Thread-safe store keeping everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preload a token.
    pub fn with_token(mut self, token: Token) -> Result<Self, StoreError> {
        self.inner.get_mut().insert_token(token)?;
        Ok(self)
    }

    /// Preload a quest.
    pub fn with_quest(mut self, quest: Quest) -> Result<Self, StoreError> {
        self.inner.get_mut().insert_quest(quest)?;
        Ok(self)
    }

    /// Preload a recorded trade and the position it leaves behind.
    pub fn with_trade(mut self, trade: Trade, position: Position) -> Result<Self, StoreError> {
        self.inner.get_mut().commit_trade(trade, position)?;
        Ok(self)
    }
}

#[async_trait]
impl MarketStore for MemoryStore {
    async fn get_token(&self, token_id: &TokenId) -> Result<Option<Token>, StoreError> {
        Ok(self.inner.read().await.tokens.get(token_id).cloned())
    }

    async fn insert_token(&self, token: Token) -> Result<(), StoreError> {
        self.inner.write().await.insert_token(token)
    }

    async fn list_tokens(&self) -> Result<Vec<Token>, StoreError> {
        let inner = self.inner.read().await;
        let mut tokens: Vec<Token> = inner.tokens.values().cloned().collect();
        tokens.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.token_id.cmp(&b.token_id))
        });
        Ok(tokens)
    }

    async fn token_trades(&self, token_id: &TokenId) -> Result<Vec<Trade>, StoreError> {
        let mut trades = self
            .inner
            .read()
            .await
            .trades
            .get(token_id)
            .cloned()
            .unwrap_or_default();
        sort_trades_deterministic(&mut trades);
        Ok(trades)
    }

    async fn user_trades(
        &self,
        user_id: &UserId,
        token_id: Option<&TokenId>,
    ) -> Result<Vec<Trade>, StoreError> {
        let inner = self.inner.read().await;
        let mut trades: Vec<Trade> = inner
            .trades
            .iter()
            .filter(|(id, _)| token_id.map_or(true, |wanted| *id == wanted))
            .flat_map(|(_, ledger)| ledger.iter())
            .filter(|t| &t.user_id == user_id)
            .cloned()
            .collect();
        sort_trades_deterministic(&mut trades);
        Ok(trades)
    }

    async fn commit_trade(&self, trade: Trade, position: Position) -> Result<Trade, StoreError> {
        self.inner.write().await.commit_trade(trade, position)
    }

    async fn get_position(
        &self,
        user_id: &UserId,
        token_id: &TokenId,
    ) -> Result<Option<Position>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .positions
            .get(&(user_id.clone(), token_id.clone()))
            .cloned())
    }

    async fn user_positions(&self, user_id: &UserId) -> Result<Vec<Position>, StoreError> {
        let inner = self.inner.read().await;
        let mut positions: Vec<Position> = inner
            .positions
            .values()
            .filter(|p| &p.user_id == user_id)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.token_id.cmp(&b.token_id));
        Ok(positions)
    }

    async fn token_positions(&self, token_id: &TokenId) -> Result<Vec<Position>, StoreError> {
        let inner = self.inner.read().await;
        let mut positions: Vec<Position> = inner
            .positions
            .values()
            .filter(|p| &p.token_id == token_id)
            .cloned()
            .collect();
        positions.sort_by(|a, b| a.user_id.cmp(&b.user_id));
        Ok(positions)
    }

    async fn get_quest(&self, quest_id: &QuestId) -> Result<Option<Quest>, StoreError> {
        Ok(self.inner.read().await.quests.get(quest_id).cloned())
    }

    async fn insert_quest(&self, quest: Quest) -> Result<(), StoreError> {
        self.inner.write().await.insert_quest(quest)
    }

    async fn set_quest_status(
        &self,
        quest_id: &QuestId,
        status: QuestStatus,
    ) -> Result<Quest, StoreError> {
        let mut inner = self.inner.write().await;
        let quest = inner
            .quests
            .get_mut(quest_id)
            .ok_or_else(|| StoreError::QuestNotFound(quest_id.clone()))?;
        quest.status = status;
        Ok(quest.clone())
    }

    async fn list_quests(&self, status: Option<QuestStatus>) -> Result<Vec<Quest>, StoreError> {
        let inner = self.inner.read().await;
        let mut quests: Vec<Quest> = inner
            .quests
            .values()
            .filter(|q| status.map_or(true, |s| q.status == s))
            .cloned()
            .collect();
        quests.sort_by(|a, b| {
            b.start_ms
                .cmp(&a.start_ms)
                .then_with(|| a.quest_id.cmp(&b.quest_id))
        });
        Ok(quests)
    }

    async fn get_submission(
        &self,
        quest_id: &QuestId,
        user_id: &UserId,
    ) -> Result<Option<QuestSubmission>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .submissions
            .get(quest_id)
            .and_then(|subs| subs.iter().find(|s| &s.user_id == user_id))
            .cloned())
    }

    async fn insert_submission(&self, submission: QuestSubmission) -> Result<(), StoreError> {
        let mut inner = self.inner.write().await;
        if !inner.quests.contains_key(&submission.quest_id) {
            return Err(StoreError::QuestNotFound(submission.quest_id));
        }
        let subs = inner
            .submissions
            .entry(submission.quest_id.clone())
            .or_default();
        if subs.iter().any(|s| s.user_id == submission.user_id) {
            return Err(StoreError::DuplicateSubmission {
                quest_id: submission.quest_id,
                user_id: submission.user_id,
            });
        }
        subs.push(submission);
        Ok(())
    }

    async fn quest_submissions(
        &self,
        quest_id: &QuestId,
    ) -> Result<Vec<QuestSubmission>, StoreError> {
        Ok(self
            .inner
            .read()
            .await
            .submissions
            .get(quest_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn user_submissions(&self, user_id: &UserId) -> Result<Vec<QuestSubmission>, StoreError> {
        let inner = self.inner.read().await;
        let mut subs: Vec<QuestSubmission> = inner
            .submissions
            .values()
            .flat_map(|subs| subs.iter())
            .filter(|s| &s.user_id == user_id)
            .cloned()
            .collect();
        subs.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(subs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CurveParams, Decimal, Side, TimeMs};

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn token(id: &str, symbol: &str) -> Token {
        Token::new(
            TokenId::new(id.to_string()),
            "Test".to_string(),
            symbol.to_string(),
            UserId::new("creator".to_string()),
            d("1000"),
            CurveParams::new(d("1"), d("1"), d("0.01")).unwrap(),
            TimeMs::new(0),
        )
        .unwrap()
    }

    fn buy(token: &str, user: &str, t: i64, tx: Option<&str>) -> (Trade, Position) {
        let trade = Trade::new(
            TokenId::new(token.to_string()),
            UserId::new(user.to_string()),
            Side::Buy,
            d("1"),
            d("1"),
            TimeMs::new(t),
            tx.map(str::to_string),
        );
        let position = crate::engine::apply_trade(None, &trade).unwrap();
        (trade, position)
    }

    #[tokio::test]
    async fn symbols_are_unique() {
        let store = MemoryStore::new().with_token(token("a", "AAA")).unwrap();
        let err = store.insert_token(token("b", "AAA")).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateSymbol("AAA".to_string()));
        assert!(store.get_token(&TokenId::new("b".to_string())).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn commit_assigns_increasing_seq() {
        let store = MemoryStore::new().with_token(token("a", "AAA")).unwrap();
        let (t1, p1) = buy("a", "alice", 5, None);
        let (t2, p2) = buy("a", "bob", 5, None);
        let r1 = store.commit_trade(t1, p1).await.unwrap();
        let r2 = store.commit_trade(t2, p2).await.unwrap();
        assert!(r1.seq < r2.seq);

        let ledger = store.token_trades(&TokenId::new("a".to_string())).await.unwrap();
        assert_eq!(ledger, vec![r1, r2]);
        let bob = store
            .get_position(&UserId::new("bob".to_string()), &TokenId::new("a".to_string()))
            .await
            .unwrap();
        assert_eq!(bob.unwrap().balance, d("1"));
    }

    #[tokio::test]
    async fn duplicate_tx_hash_rejected() {
        let store = MemoryStore::new().with_token(token("a", "AAA")).unwrap();
        let (t1, p1) = buy("a", "alice", 5, Some("0xABC"));
        let (t2, p2) = buy("a", "alice", 6, Some("0xabc"));
        store.commit_trade(t1, p1).await.unwrap();
        let err = store.commit_trade(t2, p2).await.unwrap_err();
        assert_eq!(err, StoreError::DuplicateTrade("0xabc".to_string()));
    }

    #[tokio::test]
    async fn rejected_duplicate_leaves_no_seq_gap() {
        let store = MemoryStore::new().with_token(token("a", "AAA")).unwrap();
        let (t1, p1) = buy("a", "alice", 5, Some("0xabc"));
        let (t2, p2) = buy("a", "alice", 6, Some("0xabc"));
        let (t3, p3) = buy("a", "bob", 7, None);
        assert_eq!(store.commit_trade(t1, p1).await.unwrap().seq, 1);
        assert!(store.commit_trade(t2, p2).await.is_err());
        assert_eq!(store.commit_trade(t3, p3).await.unwrap().seq, 2);
    }

    #[tokio::test]
    async fn token_trades_come_back_in_ledger_order() {
        let (late, late_position) = buy("a", "alice", 9, None);
        let (early, early_position) = buy("a", "bob", 3, None);
        let store = MemoryStore::new()
            .with_token(token("a", "AAA"))
            .unwrap()
            .with_trade(late, late_position)
            .unwrap()
            .with_trade(early, early_position)
            .unwrap();

        let ledger = store.token_trades(&TokenId::new("a".to_string())).await.unwrap();
        let order: Vec<(i64, u64)> = ledger
            .iter()
            .map(|t| (t.time_ms.as_i64(), t.seq))
            .collect();
        assert_eq!(order, vec![(3, 2), (9, 1)]);
    }

    #[tokio::test]
    async fn trade_for_unknown_token_rejected() {
        let store = MemoryStore::new();
        let (t, p) = buy("missing", "alice", 1, None);
        assert!(matches!(
            store.commit_trade(t, p).await,
            Err(StoreError::TokenNotFound(_))
        ));
    }

    #[tokio::test]
    async fn one_submission_per_user() {
        let quest = Quest {
            quest_id: QuestId::new("q1".to_string()),
            title: "Q".to_string(),
            description: None,
            token_slate: vec![TokenId::new("a".to_string())],
            start_ms: TimeMs::new(0),
            end_ms: TimeMs::new(10),
            prize_pool: d("0"),
            status: QuestStatus::Active,
        };
        let store = MemoryStore::new().with_quest(quest).unwrap();
        let sub = QuestSubmission {
            quest_id: QuestId::new("q1".to_string()),
            user_id: UserId::new("alice".to_string()),
            allocation: Default::default(),
            score: d("1"),
            submitted_at: TimeMs::new(1),
        };
        store.insert_submission(sub.clone()).await.unwrap();
        assert!(matches!(
            store.insert_submission(sub).await,
            Err(StoreError::DuplicateSubmission { .. })
        ));
        assert_eq!(
            store
                .quest_submissions(&QuestId::new("q1".to_string()))
                .await
                .unwrap()
                .len(),
            1
        );
    }
}
