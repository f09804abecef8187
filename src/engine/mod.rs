//! Pure computation engine for curve pricing and ledger accounting.
//!
//! Everything here is synchronous and side-effect free: callers pass in consistent
//! snapshots (curve params, ordered trade history, current position) and persist the
//! results themselves.

pub mod analytics;
pub mod curve;
pub mod portfolio;
pub mod position_ledger;
pub mod quest_scorer;
pub mod quote;
pub mod supply;

pub use analytics::{
    token_analytics, top_holders, AnalyticsError, AnalyticsPeriod, HolderRank, TokenAnalytics,
};
pub use curve::{CurveError, CurvePricing, LinearCurve, PricingCurve, Slippage};
pub use portfolio::{value_portfolio, Holding, PortfolioSummary};
pub use position_ledger::{apply_trade, replay, PositionError, PositionValuation};
pub use quest_scorer::{
    rank_submissions, score, validate_new_quest, validate_submission, PriceHistory, QuestError,
    RankedSubmission,
};
pub use quote::{
    market_snapshot, quote, quote_token, quote_with, MarketSnapshot, Quote, QuoteError,
    QuoteRequest, SettlementCall,
};
pub use supply::{current_supply, next_supply, SupplyError, SupplyLedger};
