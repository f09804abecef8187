//! Stable trade ordering for deterministic ledger folds.

use crate::domain::Trade;

/// Stable ordering key for trades.
///
/// Ordering: time_ms -> seq (insertion order) -> trade_key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TradeOrderingKey {
    /// Time in milliseconds (primary sort).
    pub time_ms: i64,
    /// Ledger insertion order (secondary sort).
    pub seq: u64,
    /// Trade key (fallback sort).
    pub trade_key: String,
}

impl TradeOrderingKey {
    pub fn from_trade(trade: &Trade) -> Self {
        TradeOrderingKey {
            time_ms: trade.time_ms.as_i64(),
            seq: trade.seq,
            trade_key: trade.trade_key.clone(),
        }
    }
}

/// Sort trades into ledger order.
pub fn sort_trades_deterministic(trades: &mut [Trade]) {
    trades.sort_by_cached_key(TradeOrderingKey::from_trade);
}
