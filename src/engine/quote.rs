//! Buy/sell quotes against a token's curve.
//!
//! A quote is a pure function of `(curve params, cap, supply, side, amount)`, so the quote
//! shown to a user can later be recomputed exactly and reconciled with the recorded trade.

use super::curve::{CurveError, LinearCurve, PricingCurve};
use super::supply::{current_supply, next_supply, SupplyError};
use crate::domain::{CurveParams, Decimal, Side, TimeMs, Token, TokenId, Trade, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    #[error("trade amount must be greater than 0")]
    InvalidAmount,
    #[error("token not found: {0}")]
    TokenNotFound(TokenId),
    #[error("trade would exceed maximum supply ({supply} + {amount} > {cap})")]
    SupplyExceeded {
        supply: Decimal,
        amount: Decimal,
        cap: Decimal,
    },
    #[error("insufficient token supply to sell ({amount} > {supply})")]
    InsufficientSupply { supply: Decimal, amount: Decimal },
    #[error("insufficient user balance ({amount} > {balance})")]
    InsufficientBalance { balance: Decimal, amount: Decimal },
    #[error("slippage {slippage_pct}% exceeds tolerance {max_slippage_pct}%")]
    SlippageExceeded {
        slippage_pct: Decimal,
        max_slippage_pct: Decimal,
    },
    #[error(transparent)]
    Curve(#[from] CurveError),
}

impl From<SupplyError> for QuoteError {
    fn from(err: SupplyError) -> Self {
        match err {
            SupplyError::SupplyExceeded {
                supply,
                amount,
                cap,
            } => QuoteError::SupplyExceeded {
                supply,
                amount,
                cap,
            },
            SupplyError::InsufficientSupply { supply, amount } => {
                QuoteError::InsufficientSupply { supply, amount }
            }
            SupplyError::Overflow | SupplyError::TokenMismatch { .. } => {
                QuoteError::Curve(CurveError::Overflow)
            }
        }
    }
}

/// What the caller wants priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRequest {
    pub side: Side,
    pub amount: Decimal,
    /// The seller's known holding; sells beyond it are rejected.
    pub holder_balance: Option<Decimal>,
    /// Upper bound on `slippage_pct` the caller accepts.
    pub max_slippage_pct: Option<Decimal>,
}

impl QuoteRequest {
    pub fn new(side: Side, amount: Decimal) -> Self {
        Self {
            side,
            amount,
            holder_balance: None,
            max_slippage_pct: None,
        }
    }

    pub fn with_holder_balance(mut self, balance: Decimal) -> Self {
        self.holder_balance = Some(balance);
        self
    }

    pub fn with_max_slippage(mut self, max_slippage_pct: Decimal) -> Self {
        self.max_slippage_pct = Some(max_slippage_pct);
        self
    }
}

/// Call the external settlement collaborator executes. Opaque to the engine: built once
/// per quote and passed through unmodified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementCall {
    /// Curve contract address.
    pub to: String,
    /// `0x` + 4-byte selector + 32-byte big-endian amount word.
    pub data: String,
    /// Native value attached to the call: the truncated cost for buys, zero for sells.
    pub value: Decimal,
}

impl SettlementCall {
    pub fn encode(
        contract_address: &str,
        side: Side,
        amount: &Decimal,
        value: &Decimal,
    ) -> Option<Self> {
        use sha2::{Digest, Sha256};

        let units = amount.to_u128_units()?;
        let selector = Sha256::digest(side.contract_signature().as_bytes());
        let mut word = [0u8; 32];
        word[16..].copy_from_slice(&units.to_be_bytes());
        Some(Self {
            to: contract_address.to_string(),
            data: format!("0x{}{}", hex::encode(&selector[..4]), hex::encode(word)),
            value: value.trunc_units(),
        })
    }
}

/// A fully priced buy or sell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub side: Side,
    pub amount: Decimal,
    /// Unit price before the trade.
    pub spot_price: Decimal,
    /// Total cost of a buy or total value of a sell.
    pub gross: Decimal,
    pub average_price: Decimal,
    pub protocol_fee: Decimal,
    /// `gross - protocol_fee`.
    pub net: Decimal,
    pub slippage_pct: Decimal,
    pub price_impact_pct: Decimal,
    pub supply_before: Decimal,
    pub supply_after: Decimal,
    pub settlement: Option<SettlementCall>,
}

impl Quote {
    /// The ledger record for executing this quote; price is truncated to whole units.
    pub fn to_trade(
        &self,
        token_id: TokenId,
        user_id: UserId,
        time_ms: TimeMs,
        tx_hash: Option<String>,
    ) -> Trade {
        Trade::new(
            token_id,
            user_id,
            self.side,
            self.amount.clone(),
            self.average_price.trunc_units(),
            time_ms,
            tx_hash,
        )
    }
}

/// Circulating supply and unit price of a token at the end of its ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSnapshot {
    pub supply: Decimal,
    pub spot_price: Decimal,
    /// Units still mintable before the cap.
    pub remaining: Decimal,
}

pub fn market_snapshot<'a, I>(token: &Token, trades: I) -> Result<MarketSnapshot, CurveError>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let supply = current_supply(&token.token_id, trades);
    let spot_price = LinearCurve::new(token.curve.clone()).spot_price(&supply)?;
    Ok(MarketSnapshot {
        remaining: &token.total_supply - &supply,
        supply,
        spot_price,
    })
}

/// Price `side`/`amount` at `supply` with no balance or slippage constraints.
pub fn quote(
    params: &CurveParams,
    cap: &Decimal,
    supply: &Decimal,
    side: Side,
    amount: &Decimal,
) -> Result<Quote, QuoteError> {
    quote_with(params, cap, supply, &QuoteRequest::new(side, amount.clone()))
}

/// Validate and price a request at `supply`.
///
/// Validation order: amount, then supply bounds, then holder balance, then slippage.
pub fn quote_with(
    params: &CurveParams,
    cap: &Decimal,
    supply: &Decimal,
    request: &QuoteRequest,
) -> Result<Quote, QuoteError> {
    let QuoteRequest {
        side,
        amount,
        holder_balance,
        max_slippage_pct,
    } = request;
    let side = *side;

    if !amount.is_positive() {
        return Err(QuoteError::InvalidAmount);
    }

    let supply_after = next_supply(supply, cap, side, amount)?;

    if let (Side::Sell, Some(balance)) = (side, holder_balance) {
        if amount > balance {
            return Err(QuoteError::InsufficientBalance {
                balance: balance.clone(),
                amount: amount.clone(),
            });
        }
    }

    let curve = LinearCurve::new(params.clone());
    let spot_price = curve.spot_price(supply)?;
    let pricing = match side {
        Side::Buy => curve.buy_cost(amount, supply)?,
        Side::Sell => curve.sell_value(amount, supply)?,
    };
    let slippage = curve.slippage(amount, supply, side)?;

    if let Some(max_slippage_pct) = max_slippage_pct {
        if &slippage.slippage_pct > max_slippage_pct {
            return Err(QuoteError::SlippageExceeded {
                slippage_pct: slippage.slippage_pct,
                max_slippage_pct: max_slippage_pct.clone(),
            });
        }
    }

    Ok(Quote {
        side,
        amount: amount.clone(),
        spot_price,
        gross: pricing.gross,
        average_price: pricing.average_price,
        protocol_fee: pricing.protocol_fee,
        net: pricing.net,
        slippage_pct: slippage.slippage_pct,
        price_impact_pct: slippage.price_impact_pct,
        supply_before: supply.clone(),
        supply_after,
        settlement: None,
    })
}

/// Quote against a token looked up by the caller, deriving supply from its ledger.
///
/// `trades` is the token's ledger in order. The quote carries the settlement call for
/// the token's curve contract.
pub fn quote_token<'a, I>(
    token_id: &TokenId,
    token: Option<&Token>,
    trades: I,
    request: &QuoteRequest,
) -> Result<Quote, QuoteError>
where
    I: IntoIterator<Item = &'a Trade>,
{
    let token = token.ok_or_else(|| QuoteError::TokenNotFound(token_id.clone()))?;
    if !request.amount.is_positive() {
        return Err(QuoteError::InvalidAmount);
    }
    let supply = current_supply(&token.token_id, trades);
    let mut quote = quote_with(&token.curve, &token.total_supply, &supply, request)?;

    let value = match quote.side {
        Side::Buy => quote.gross.clone(),
        Side::Sell => Decimal::zero(),
    };
    quote.settlement = Some(
        SettlementCall::encode(&token.contract_address, quote.side, &quote.amount, &value)
            .ok_or(QuoteError::Curve(CurveError::Overflow))?,
    );
    Ok(quote)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn params() -> CurveParams {
        CurveParams::new(d("1000"), d("10"), d("0.01")).unwrap()
    }

    #[test]
    fn rejects_non_positive_amount_first() {
        let err = quote(&params(), &d("0"), &d("0"), Side::Buy, &d("0")).unwrap_err();
        assert_eq!(err, QuoteError::InvalidAmount);
        let err = quote(&params(), &d("1000"), &d("0"), Side::Sell, &d("-1")).unwrap_err();
        assert_eq!(err, QuoteError::InvalidAmount);
    }

    #[test]
    fn buy_quote_carries_all_fields() {
        let q = quote(&params(), &d("1000"), &d("0"), Side::Buy, &d("100")).unwrap();
        assert_eq!(q.spot_price, d("1000"));
        assert_eq!(q.gross, d("150000"));
        assert_eq!(q.average_price, d("1500"));
        assert_eq!(q.protocol_fee, d("1500"));
        assert_eq!(q.slippage_pct, d("100"));
        assert_eq!(q.price_impact_pct, d("50"));
        assert_eq!(q.supply_after, d("100"));
        assert!(q.settlement.is_none());
    }

    #[test]
    fn balance_checked_after_supply() {
        let req = QuoteRequest::new(Side::Sell, d("60")).with_holder_balance(d("50"));
        let err = quote_with(&params(), &d("1000"), &d("100"), &req).unwrap_err();
        assert_eq!(
            err,
            QuoteError::InsufficientBalance {
                balance: d("50"),
                amount: d("60"),
            }
        );

        let req = QuoteRequest::new(Side::Sell, d("101")).with_holder_balance(d("50"));
        let err = quote_with(&params(), &d("1000"), &d("100"), &req).unwrap_err();
        assert!(matches!(err, QuoteError::InsufficientSupply { .. }));
    }

    #[test]
    fn holder_balance_ignored_for_buys() {
        let req = QuoteRequest::new(Side::Buy, d("10")).with_holder_balance(d("0"));
        assert!(quote_with(&params(), &d("1000"), &d("0"), &req).is_ok());
    }

    #[test]
    fn slippage_tolerance_enforced() {
        let req = QuoteRequest::new(Side::Buy, d("100")).with_max_slippage(d("99.99"));
        let err = quote_with(&params(), &d("1000"), &d("0"), &req).unwrap_err();
        assert!(matches!(err, QuoteError::SlippageExceeded { .. }));

        let req = QuoteRequest::new(Side::Buy, d("100")).with_max_slippage(d("100"));
        assert!(quote_with(&params(), &d("1000"), &d("0"), &req).is_ok());
    }

    #[test]
    fn settlement_call_encoding() {
        let call = SettlementCall::encode("0xabc", Side::Buy, &d("255"), &d("10.9")).unwrap();
        assert_eq!(call.to, "0xabc");
        assert_eq!(call.value, d("10"));
        assert!(call.data.starts_with("0x"));
        assert_eq!(call.data.len(), 2 + 8 + 64);
        assert!(call.data.ends_with("ff"));

        let sell = SettlementCall::encode("0xabc", Side::Sell, &d("255"), &d("0")).unwrap();
        assert_ne!(call.data[..10], sell.data[..10]);
    }

    #[test]
    fn to_trade_truncates_price() {
        let q = quote(&params(), &d("1000"), &d("0"), Side::Buy, &d("3")).unwrap();
        // 3 * (1000 + 15) = 3045, avg 1015
        assert_eq!(q.average_price, d("1015"));
        let t = q.to_trade(
            TokenId::new("tok".to_string()),
            UserId::new("alice".to_string()),
            TimeMs::new(5),
            None,
        );
        assert_eq!(t.price, d("1015"));
        assert_eq!(t.amount, d("3"));
        assert_eq!(t.side, Side::Buy);
    }
}
