//! Coordination between the engine and the store.

pub mod executor;

pub use executor::{ExecutionError, ExecutionReceipt, TradeExecutor, TradeOrder};
