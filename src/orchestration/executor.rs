use crate::domain::{Decimal, Position, Side, TimeMs, TokenId, Trade, UserId};
use crate::engine::{apply_trade, quote_token, PositionError, Quote, QuoteError, QuoteRequest};
use crate::store::{MarketStore, StoreError};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

/// A trade the caller wants executed against a token's curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeOrder {
    pub token_id: TokenId,
    pub user_id: UserId,
    pub side: Side,
    pub amount: Decimal,
    pub max_slippage_pct: Option<Decimal>,
    /// Settlement hash reported by the payment rail, if already settled.
    pub tx_hash: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub quote: Quote,
    pub trade: Trade,
    pub position: Position,
}

#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error(transparent)]
    Quote(#[from] QuoteError),
    #[error(transparent)]
    Position(#[from] PositionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Executes trades, serializing writers per token.
///
/// The token lock is held across "read ledger → quote → append → update position", so
/// the supply a quote was priced at is the supply the trade is appended to.
#[derive(Clone)]
pub struct TradeExecutor {
    store: Arc<dyn MarketStore>,
    locks: Arc<Mutex<HashMap<TokenId, Arc<Mutex<()>>>>>,
}

impl TradeExecutor {
    pub fn new(store: Arc<dyn MarketStore>) -> Self {
        Self {
            store,
            locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    async fn token_lock(&self, token_id: &TokenId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(token_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    pub async fn execute(&self, order: TradeOrder) -> Result<ExecutionReceipt, ExecutionError> {
        self.execute_at(order, TimeMs::now()).await
    }

    /// Execute `order` stamped at `now`.
    ///
    /// A `now` older than the token's last trade is clamped to that trade's time, so the
    /// ledger stays in `(time_ms, seq)` order.
    pub async fn execute_at(
        &self,
        order: TradeOrder,
        now: TimeMs,
    ) -> Result<ExecutionReceipt, ExecutionError> {
        let lock = self.token_lock(&order.token_id).await;
        let _guard = lock.lock().await;

        let token = self.store.get_token(&order.token_id).await?;
        let trades = self.store.token_trades(&order.token_id).await?;
        let position = self
            .store
            .get_position(&order.user_id, &order.token_id)
            .await?;

        let stamped_at = trades.last().map_or(now, |tail| now.max(tail.time_ms));
        if stamped_at != now {
            tracing::debug!(
                token_id = %order.token_id,
                requested = now.as_i64(),
                stamped = stamped_at.as_i64(),
                "trade time clamped to ledger tail"
            );
        }

        let mut request = QuoteRequest::new(order.side, order.amount);
        if order.side == Side::Sell {
            let balance = position
                .as_ref()
                .map(|p| p.balance.clone())
                .unwrap_or_else(Decimal::zero);
            request = request.with_holder_balance(balance);
        }
        if let Some(max) = order.max_slippage_pct {
            request = request.with_max_slippage(max);
        }

        let quote = quote_token(&order.token_id, token.as_ref(), &trades, &request)?;
        let trade = quote.to_trade(
            order.token_id.clone(),
            order.user_id.clone(),
            stamped_at,
            order.tx_hash,
        );
        let position = apply_trade(position, &trade)?;
        let trade = self.store.commit_trade(trade, position.clone()).await?;

        tracing::info!(
            token_id = %trade.token_id,
            user_id = %trade.user_id,
            side = %trade.side,
            amount = %trade.amount,
            price = %trade.price,
            seq = trade.seq,
            supply_after = %quote.supply_after,
            "trade executed"
        );

        Ok(ExecutionReceipt {
            quote,
            trade,
            position,
        })
    }
}
