//! Linear bonding curve pricing.
//!
//! `price(supply) = base_price + supply * slope`
//!
//! Buys are priced with the closed-form integral over `[supply, supply + amount]`.
//! Sells use the execution price `price(supply) - amount * slope / 2` rather than the
//! integral over `[supply - amount, supply]`, so a sell of `amount` at supply `s` pays out
//! `amount² * slope` less than a buy of `amount` at the same `s` costs. Trade economics
//! depend on this exact formula.

use crate::domain::{CurveParams, Decimal, Side};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CurveError {
    #[error("division by zero in curve pricing")]
    DivisionByZero,
    #[error("arithmetic overflow in curve pricing")]
    Overflow,
}

/// Priced side of a trade against the curve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurvePricing {
    /// Total cost (buy) or total value (sell), before fees are split out.
    pub gross: Decimal,
    /// `gross / amount`.
    pub average_price: Decimal,
    /// `gross * protocol_fee_rate`.
    pub protocol_fee: Decimal,
    /// `gross - protocol_fee`.
    pub net: Decimal,
}

/// Deviation of a trade from the pre-trade spot price, in percent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slippage {
    /// `amount * slope / spot * 100`: how far the marginal price moves across the order.
    pub slippage_pct: Decimal,
    /// `(execution_price - spot) / spot * 100`; negative for sells.
    pub price_impact_pct: Decimal,
}

/// Pricing interface of a bonding curve.
pub trait PricingCurve {
    /// Unit price at `supply`.
    fn spot_price(&self, supply: &Decimal) -> Result<Decimal, CurveError>;
    /// Cost of minting `amount` starting at `supply`.
    fn buy_cost(&self, amount: &Decimal, supply: &Decimal) -> Result<CurvePricing, CurveError>;
    /// Value of burning `amount` at `supply`.
    fn sell_value(&self, amount: &Decimal, supply: &Decimal)
        -> Result<CurvePricing, CurveError>;
    /// Slippage and price impact of an order of `amount` on `side` at `supply`.
    fn slippage(&self, amount: &Decimal, supply: &Decimal, side: Side)
        -> Result<Slippage, CurveError>;
}

/// The linear curve defined by a token's `CurveParams`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearCurve {
    params: CurveParams,
}

impl LinearCurve {
    pub fn new(params: CurveParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CurveParams {
        &self.params
    }

    /// `amount * slope / 2`, the distance between spot and execution price.
    fn half_move(&self, amount: &Decimal) -> Result<Decimal, CurveError> {
        amount
            .checked_mul(self.params.slope())
            .and_then(|v| v.checked_div(Decimal::two()))
            .ok_or(CurveError::Overflow)
    }

    /// Split `gross` into average price, fee and net.
    fn price_out(&self, amount: &Decimal, gross: Decimal) -> Result<CurvePricing, CurveError> {
        if amount.is_zero() {
            return Err(CurveError::DivisionByZero);
        }
        let average_price = gross.checked_div(amount).ok_or(CurveError::Overflow)?;
        let protocol_fee = gross
            .checked_mul(self.params.protocol_fee_rate())
            .ok_or(CurveError::Overflow)?;
        let net = gross
            .checked_sub(&protocol_fee)
            .ok_or(CurveError::Overflow)?;
        Ok(CurvePricing {
            gross,
            average_price,
            protocol_fee,
            net,
        })
    }

    /// `numerator / spot * 100`, or zero when the curve sits at a zero price.
    fn pct_of_spot(numerator: &Decimal, spot: &Decimal) -> Result<Decimal, CurveError> {
        if spot.is_zero() {
            return Ok(Decimal::zero());
        }
        numerator
            .checked_div(spot)
            .and_then(|v| v.checked_mul(Decimal::hundred()))
            .ok_or(CurveError::Overflow)
    }
}

impl PricingCurve for LinearCurve {
    fn spot_price(&self, supply: &Decimal) -> Result<Decimal, CurveError> {
        supply
            .checked_mul(self.params.slope())
            .and_then(|v| v.checked_add(self.params.base_price()))
            .ok_or(CurveError::Overflow)
    }

    fn buy_cost(&self, amount: &Decimal, supply: &Decimal) -> Result<CurvePricing, CurveError> {
        let execution_price = self
            .spot_price(supply)?
            .checked_add(self.half_move(amount)?)
            .ok_or(CurveError::Overflow)?;
        let cost = amount
            .checked_mul(&execution_price)
            .ok_or(CurveError::Overflow)?;
        self.price_out(amount, cost)
    }

    fn sell_value(
        &self,
        amount: &Decimal,
        supply: &Decimal,
    ) -> Result<CurvePricing, CurveError> {
        let execution_price = self
            .spot_price(supply)?
            .checked_sub(self.half_move(amount)?)
            .ok_or(CurveError::Overflow)?;
        let value = amount
            .checked_mul(&execution_price)
            .ok_or(CurveError::Overflow)?;
        self.price_out(amount, value)
    }

    fn slippage(
        &self,
        amount: &Decimal,
        supply: &Decimal,
        side: Side,
    ) -> Result<Slippage, CurveError> {
        let spot = self.spot_price(supply)?;
        let half_move = self.half_move(amount)?;
        let full_move = amount
            .checked_mul(self.params.slope())
            .ok_or(CurveError::Overflow)?;
        let impact = match side {
            Side::Buy => half_move,
            Side::Sell => -half_move,
        };
        Ok(Slippage {
            slippage_pct: Self::pct_of_spot(&full_move, &spot)?,
            price_impact_pct: Self::pct_of_spot(&impact, &spot)?,
        })
    }
}
