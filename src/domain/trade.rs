//! Trade type representing a single execution against a token's curve.

use crate::domain::{Decimal, Side, TimeMs, TokenId, UserId};
use serde::{Deserialize, Serialize};

/// A single executed trade. Append-only: never mutated once recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    /// Stable unique identifier for this trade.
    pub trade_key: String,
    pub token_id: TokenId,
    pub user_id: UserId,
    pub side: Side,
    /// Token amount in smallest units.
    pub amount: Decimal,
    /// Execution (average) price per unit.
    pub price: Decimal,
    /// Time of the trade in milliseconds since Unix epoch.
    pub time_ms: TimeMs,
    /// Insertion order within the token's ledger; breaks timestamp ties.
    pub seq: u64,
    /// Settlement transaction hash, when the rail reported one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
}

impl Trade {
    /// Create a new Trade with `seq = 0`; the ledger assigns the real position on append.
    pub fn new(
        token_id: TokenId,
        user_id: UserId,
        side: Side,
        amount: Decimal,
        price: Decimal,
        time_ms: TimeMs,
        tx_hash: Option<String>,
    ) -> Self {
        let tx_hash = normalize_tx_hash(tx_hash);
        let mut trade = Trade {
            trade_key: String::new(),
            token_id,
            user_id,
            side,
            amount,
            price,
            time_ms,
            seq: 0,
            tx_hash,
        };
        trade.trade_key = trade.compute_trade_key();
        trade
    }

    /// Place the trade at `seq` in its ledger, refreshing a hash-derived key.
    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = seq;
        self.trade_key = self.compute_trade_key();
        self
    }

    /// Signed supply delta of this trade: `+amount` for buys, `-amount` for sells.
    pub fn signed_amount(&self) -> Decimal {
        match self.side {
            Side::Buy => self.amount.clone(),
            Side::Sell => -self.amount.clone(),
        }
    }

    /// Notional value (`amount * price`); `None` past the decimal range.
    pub fn notional(&self) -> Option<Decimal> {
        self.amount.checked_mul(&self.price)
    }

    /// Generate a stable unique key for this trade.
    ///
    /// Priority: `tx_hash` (if present) > hash of deterministic fields.
    pub fn compute_trade_key(&self) -> String {
        if let Some(tx) = &self.tx_hash {
            return tx.clone();
        }

        use sha2::{Digest, Sha256};

        fn hash_var(hasher: &mut Sha256, data: &str) {
            hasher.update((data.len() as u32).to_le_bytes());
            hasher.update(data.as_bytes());
        }

        let mut hasher = Sha256::new();
        hash_var(&mut hasher, self.token_id.as_str());
        hash_var(&mut hasher, self.user_id.as_str());
        hasher.update(self.time_ms.as_i64().to_le_bytes());
        hasher.update(self.seq.to_le_bytes());
        hasher.update(if self.side == Side::Buy { b"B" } else { b"S" });
        hash_var(&mut hasher, &self.amount.to_canonical_string());
        hash_var(&mut hasher, &self.price.to_canonical_string());
        let hash = hasher.finalize();
        format!("hash:{}", hex::encode(&hash[..16]))
    }
}

fn normalize_tx_hash(tx_hash: Option<String>) -> Option<String> {
    tx_hash
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_lowercase())
}
