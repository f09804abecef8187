//! Windowed trading statistics and holder rankings for a single token.

use crate::domain::{Decimal, Position, Side, TimeMs, Trade, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const HOUR_MS: i64 = 60 * 60 * 1000;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnalyticsPeriod {
    #[serde(rename = "1h")]
    Hour,
    #[default]
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
}

impl AnalyticsPeriod {
    /// Lenient parse: anything unrecognised is a 24h window.
    pub fn parse_or_default(s: Option<&str>) -> Self {
        match s.map(str::trim) {
            Some("1h") => AnalyticsPeriod::Hour,
            Some("7d") => AnalyticsPeriod::Week,
            Some("30d") => AnalyticsPeriod::Month,
            _ => AnalyticsPeriod::Day,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        match self {
            AnalyticsPeriod::Hour => HOUR_MS,
            AnalyticsPeriod::Day => 24 * HOUR_MS,
            AnalyticsPeriod::Week => 7 * 24 * HOUR_MS,
            AnalyticsPeriod::Month => 30 * 24 * HOUR_MS,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalyticsPeriod::Hour => "1h",
            AnalyticsPeriod::Day => "24h",
            AnalyticsPeriod::Week => "7d",
            AnalyticsPeriod::Month => "30d",
        }
    }
}

impl std::fmt::Display for AnalyticsPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalyticsError {
    #[error("arithmetic overflow in token analytics")]
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAnalytics {
    pub period: AnalyticsPeriod,
    pub window_start: TimeMs,
    /// Σ `amount * price` over the window.
    pub total_volume: Decimal,
    pub total_trades: usize,
    pub buy_trades: usize,
    pub sell_trades: usize,
    /// Last trade price minus first trade price in the window.
    pub price_change: Decimal,
    pub price_change_pct: Decimal,
}

/// Summarize one token's trades with `time_ms >= now - period`.
///
/// `trades` must be that token's ledger in order.
pub fn token_analytics<'a, I>(
    trades: I,
    period: AnalyticsPeriod,
    now: TimeMs,
) -> Result<TokenAnalytics, AnalyticsError>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let window_start = now.saturating_sub_ms(period.duration_ms());
    let mut analytics = TokenAnalytics {
        period,
        window_start,
        total_volume: Decimal::zero(),
        total_trades: 0,
        buy_trades: 0,
        sell_trades: 0,
        price_change: Decimal::zero(),
        price_change_pct: Decimal::zero(),
    };

    let mut first_price: Option<&Decimal> = None;
    let mut last_price: Option<&Decimal> = None;
    for trade in trades.into_iter().filter(|t| t.time_ms >= window_start) {
        analytics.total_volume = trade
            .notional()
            .and_then(|notional| analytics.total_volume.checked_add(notional))
            .ok_or(AnalyticsError::Overflow)?;
        analytics.total_trades += 1;
        match trade.side {
            Side::Buy => analytics.buy_trades += 1,
            Side::Sell => analytics.sell_trades += 1,
        }
        first_price.get_or_insert(&trade.price);
        last_price = Some(&trade.price);
    }

    if let (Some(first), Some(last)) = (first_price, last_price) {
        analytics.price_change = last.checked_sub(first).ok_or(AnalyticsError::Overflow)?;
        if first.is_positive() {
            analytics.price_change_pct = analytics
                .price_change
                .checked_div(first)
                .and_then(|ratio| ratio.checked_mul(Decimal::hundred()))
                .ok_or(AnalyticsError::Overflow)?
                .trunc_percent();
        }
    }
    Ok(analytics)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HolderRank {
    pub rank: usize,
    pub user_id: UserId,
    pub balance: Decimal,
    pub realized_pnl: Decimal,
}

/// Largest holders first; ties by user id; flat positions excluded.
pub fn top_holders(positions: &[Position], limit: usize) -> Vec<HolderRank> {
    let mut holders: Vec<&Position> = positions.iter().filter(|p| p.balance.is_positive()).collect();
    holders.sort_by(|a, b| {
        b.balance
            .cmp(&a.balance)
            .then_with(|| a.user_id.cmp(&b.user_id))
    });
    holders
        .into_iter()
        .take(limit)
        .enumerate()
        .map(|(i, p)| HolderRank {
            rank: i + 1,
            user_id: p.user_id.clone(),
            balance: p.balance.clone(),
            realized_pnl: p.realized_pnl.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TokenId;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn trade(side: Side, amount: &str, price: &str, t: i64) -> Trade {
        Trade::new(
            TokenId::new("tok".to_string()),
            UserId::new("alice".to_string()),
            side,
            d(amount),
            d(price),
            TimeMs::new(t),
            None,
        )
    }

    #[test]
    fn period_parsing_defaults_to_day() {
        assert_eq!(AnalyticsPeriod::parse_or_default(Some("7d")), AnalyticsPeriod::Week);
        assert_eq!(AnalyticsPeriod::parse_or_default(Some("2w")), AnalyticsPeriod::Day);
        assert_eq!(AnalyticsPeriod::parse_or_default(None), AnalyticsPeriod::Day);
        assert_eq!(serde_json::to_string(&AnalyticsPeriod::Month).unwrap(), "\"30d\"");
    }

    #[test]
    fn window_excludes_older_trades() {
        let now = TimeMs::new(10 * HOUR_MS);
        let trades = vec![
            trade(Side::Buy, "100", "999", 0),
            trade(Side::Buy, "10", "100", 9 * HOUR_MS),
            trade(Side::Sell, "4", "90", 9 * HOUR_MS + 1),
            trade(Side::Buy, "2", "130", 10 * HOUR_MS),
        ];
        let a = token_analytics(&trades, AnalyticsPeriod::Hour, now).unwrap();
        assert_eq!(a.total_trades, 3);
        assert_eq!(a.buy_trades, 2);
        assert_eq!(a.sell_trades, 1);
        assert_eq!(a.total_volume, d("1620"));
        assert_eq!(a.price_change, d("30"));
        assert_eq!(a.price_change_pct, d("30"));
    }

    #[test]
    fn empty_window_and_zero_first_price() {
        let a = token_analytics(&Vec::<Trade>::new(), AnalyticsPeriod::Day, TimeMs::new(0)).unwrap();
        assert_eq!(a.total_trades, 0);
        assert_eq!(a.price_change_pct, Decimal::zero());

        let trades = vec![trade(Side::Buy, "1", "0", 5), trade(Side::Buy, "1", "3", 6)];
        let a = token_analytics(&trades, AnalyticsPeriod::Day, TimeMs::new(10)).unwrap();
        assert_eq!(a.price_change, d("3"));
        assert_eq!(a.price_change_pct, Decimal::zero());
    }

    #[test]
    fn large_volumes_accumulate_without_panicking() {
        let trades = vec![
            trade(Side::Buy, "50000000000000000000000000000", "1", 1),
            trade(Side::Buy, "50000000000000000000000000000", "1", 2),
        ];
        let a = token_analytics(&trades, AnalyticsPeriod::Day, TimeMs::new(10)).unwrap();
        assert_eq!(a.total_volume, d("100000000000000000000000000000"));
        assert_eq!(a.total_trades, 2);
    }

    #[test]
    fn volume_past_decimal_range_is_an_error() {
        let huge = "1000000000000000000000000000000000000000000000000000000000000";
        let trades = vec![
            trade(Side::Buy, huge, huge, 1),
            trade(Side::Buy, "1", "1", 2),
        ];
        assert_eq!(
            token_analytics(&trades, AnalyticsPeriod::Day, TimeMs::new(10)),
            Err(AnalyticsError::Overflow)
        );
    }

    #[test]
    fn holders_ranked_by_balance() {
        let mk = |user: &str, balance: &str| {
            let mut p = Position::empty(
                UserId::new(user.to_string()),
                TokenId::new("tok".to_string()),
            );
            p.balance = d(balance);
            p
        };
        let positions = vec![mk("carol", "5"), mk("bob", "9"), mk("alice", "9"), mk("dave", "0")];
        let ranked = top_holders(&positions, 10);
        let users: Vec<&str> = ranked.iter().map(|r| r.user_id.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
        assert_eq!(top_holders(&positions, 1).len(), 1);
    }
}
