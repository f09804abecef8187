//! Token definition and its immutable bonding-curve parameters.

use crate::domain::{Decimal, TimeMs, TokenId, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("base price must be >= 0")]
    NegativeBasePrice,
    #[error("slope must be >= 0")]
    NegativeSlope,
    #[error("protocol fee rate must be in [0, 1)")]
    FeeRateOutOfRange,
    #[error("total supply must be > 0")]
    NonPositiveSupply,
    #[error("symbol must be 3-10 characters, uppercase alphanumeric only")]
    InvalidSymbol,
    #[error("name must not be empty")]
    EmptyName,
}

/// Parameters of the linear curve `price(supply) = base_price + supply * slope`.
///
/// Validated on construction and on deserialization; immutable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawCurveParams")]
pub struct CurveParams {
    base_price: Decimal,
    slope: Decimal,
    protocol_fee_rate: Decimal,
}

#[derive(Deserialize)]
struct RawCurveParams {
    base_price: Decimal,
    slope: Decimal,
    protocol_fee_rate: Decimal,
}

impl TryFrom<RawCurveParams> for CurveParams {
    type Error = TokenError;

    fn try_from(raw: RawCurveParams) -> Result<Self, Self::Error> {
        CurveParams::new(raw.base_price, raw.slope, raw.protocol_fee_rate)
    }
}

impl CurveParams {
    pub fn new(
        base_price: Decimal,
        slope: Decimal,
        protocol_fee_rate: Decimal,
    ) -> Result<Self, TokenError> {
        if base_price.is_negative() {
            return Err(TokenError::NegativeBasePrice);
        }
        if slope.is_negative() {
            return Err(TokenError::NegativeSlope);
        }
        if protocol_fee_rate.is_negative() || protocol_fee_rate >= Decimal::one() {
            return Err(TokenError::FeeRateOutOfRange);
        }
        Ok(Self {
            base_price,
            slope,
            protocol_fee_rate,
        })
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price.clone()
    }

    pub fn slope(&self) -> Decimal {
        self.slope.clone()
    }

    pub fn protocol_fee_rate(&self) -> Decimal {
        self.protocol_fee_rate.clone()
    }
}

/// A token traded against its own bonding curve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub token_id: TokenId,
    pub name: String,
    pub symbol: String,
    pub creator_id: UserId,
    /// Address of the curve contract the settlement collaborator calls.
    pub contract_address: String,
    /// Supply cap; circulating supply never exceeds it.
    pub total_supply: Decimal,
    pub curve: CurveParams,
    pub created_at: TimeMs,
}

impl Token {
    /// Create a token, validating its symbol and supply cap.
    pub fn new(
        token_id: TokenId,
        name: String,
        symbol: String,
        creator_id: UserId,
        total_supply: Decimal,
        curve: CurveParams,
        created_at: TimeMs,
    ) -> Result<Self, TokenError> {
        if name.trim().is_empty() {
            return Err(TokenError::EmptyName);
        }
        if !is_valid_symbol(&symbol) {
            return Err(TokenError::InvalidSymbol);
        }
        if !total_supply.is_positive() {
            return Err(TokenError::NonPositiveSupply);
        }
        let contract_address = derive_contract_address(&token_id, &symbol, &creator_id);
        Ok(Self {
            token_id,
            name: name.trim().to_string(),
            symbol,
            creator_id,
            contract_address,
            total_supply,
            curve,
            created_at,
        })
    }
}

fn is_valid_symbol(symbol: &str) -> bool {
    (3..=10).contains(&symbol.len())
        && symbol
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
}

/// Placeholder address until deployment reports the real one: first 20 bytes of
/// SHA-256 over the token identity.
fn derive_contract_address(token_id: &TokenId, symbol: &str, creator_id: &UserId) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    for part in [token_id.as_str(), symbol, creator_id.as_str()] {
        hasher.update((part.len() as u32).to_le_bytes());
        hasher.update(part.as_bytes());
    }
    let hash = hasher.finalize();
    format!("0x{}", hex::encode(&hash[..20]))
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
    fn curve_params_reject_out_of_range() {
        assert_eq!(
            CurveParams::new(d("-1"), d("1"), d("0")),
            Err(TokenError::NegativeBasePrice)
        );
        assert_eq!(
            CurveParams::new(d("1"), d("-1"), d("0")),
            Err(TokenError::NegativeSlope)
        );
        assert_eq!(
            CurveParams::new(d("1"), d("1"), d("1")),
            Err(TokenError::FeeRateOutOfRange)
        );
        assert!(CurveParams::new(d("0"), d("0"), d("0.999")).is_ok());
    }

    #[test]
    fn curve_params_deserialization_validates() {
        let ok: CurveParams = serde_json::from_str(
            r#"{"base_price":"1000","slope":"10","protocol_fee_rate":"0.01"}"#,
        )
        .unwrap();
        assert_eq!(ok, params());

        let bad = serde_json::from_str::<CurveParams>(
            r#"{"base_price":"1000","slope":"10","protocol_fee_rate":"1.5"}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn token_symbol_rules() {
        let mk = |symbol: &str| {
            Token::new(
                TokenId::new("t1".to_string()),
                "Curve".to_string(),
                symbol.to_string(),
                UserId::new("alice".to_string()),
                d("1000000"),
                params(),
                TimeMs::new(0),
            )
        };
        assert!(mk("CRV").is_ok());
        assert!(mk("ABCDEFGHIJ").is_ok());
        assert_eq!(mk("AB").unwrap_err(), TokenError::InvalidSymbol);
        assert_eq!(mk("crv").unwrap_err(), TokenError::InvalidSymbol);
        assert_eq!(mk("ABCDEFGHIJK").unwrap_err(), TokenError::InvalidSymbol);
    }

    #[test]
    fn token_contract_address_is_deterministic() {
        let a = derive_contract_address(
            &TokenId::new("t1".to_string()),
            "CRV",
            &UserId::new("alice".to_string()),
        );
        let b = derive_contract_address(
            &TokenId::new("t1".to_string()),
            "CRV",
            &UserId::new("alice".to_string()),
        );
        assert_eq!(a, b);
        assert!(a.starts_with("0x"));
        assert_eq!(a.len(), 42);
    }

    #[test]
    fn token_rejects_zero_supply() {
        let err = Token::new(
            TokenId::new("t1".to_string()),
            "Curve".to_string(),
            "CRV".to_string(),
            UserId::new("alice".to_string()),
            Decimal::zero(),
            params(),
            TimeMs::new(0),
        )
        .unwrap_err();
        assert_eq!(err, TokenError::NonPositiveSupply);
    }
}
