use curvefolio::engine::{
    market_snapshot, quote, quote_token, quote_with, CurveError, LinearCurve, PricingCurve,
    QuoteError, QuoteRequest,
};
use curvefolio::domain::units::parse_token_amount;
use curvefolio::{CurveParams, Decimal, Side, TimeMs, Token, TokenId, Trade, UserId};

fn d(s: &str) -> Decimal {
    Decimal::from_str_canonical(s).unwrap()
}

fn params() -> CurveParams {
    CurveParams::new(d("1000"), d("10"), d("0.01")).unwrap()
}

fn token(cap: &str) -> Token {
    Token::new(
        TokenId::new("tok".to_string()),
        "Curve".to_string(),
        "CURV".to_string(),
        UserId::new("creator".to_string()),
        d(cap),
        params(),
        TimeMs::new(0),
    )
    .unwrap()
}

fn trade(side: Side, amount: &str, seq: u64) -> Trade {
    Trade::new(
        TokenId::new("tok".to_string()),
        UserId::new("alice".to_string()),
        side,
        d(amount),
        d("0"),
        TimeMs::new(seq as i64),
        None,
    )
    .with_seq(seq)
}

#[test]
fn test_buy_hundred_from_empty_curve() {
    let q = quote(&params(), &d("1000000"), &d("0"), Side::Buy, &d("100")).unwrap();
    assert_eq!(q.spot_price, d("1000"));
    assert_eq!(q.gross, d("150000"));
    assert_eq!(q.average_price, d("1500"));
    assert_eq!(q.protocol_fee, d("1500"));
    assert_eq!(q.net, d("148500"));
    assert_eq!(q.supply_after, d("100"));
    assert_eq!(q.slippage_pct, d("100"));
    assert_eq!(q.price_impact_pct, d("50"));
}

#[test]
fn test_sell_half_after_buy() {
    let q = quote(&params(), &d("1000000"), &d("100"), Side::Sell, &d("50")).unwrap();
    assert_eq!(q.spot_price, d("2000"));
    assert_eq!(q.gross, d("87500"));
    assert_eq!(q.average_price, d("1750"));
    assert_eq!(q.protocol_fee, d("875"));
    assert_eq!(q.net, d("86625"));
    assert_eq!(q.supply_after, d("50"));
    assert_eq!(q.slippage_pct, d("25"));
    assert_eq!(q.price_impact_pct, d("-12.5"));
}

#[test]
fn test_full_liquidation_then_empty() {
    let all = quote(&params(), &d("1000000"), &d("100"), Side::Sell, &d("100")).unwrap();
    assert_eq!(all.supply_after, Decimal::zero());
    assert_eq!(all.gross, d("150000"));

    let err = quote(&params(), &d("1000000"), &d("0"), Side::Sell, &d("1")).unwrap_err();
    assert_eq!(
        err,
        QuoteError::InsufficientSupply {
            supply: d("0"),
            amount: d("1")
        }
    );
}

#[test]
fn test_buy_exactly_to_cap() {
    let q = quote(&params(), &d("100"), &d("40"), Side::Buy, &d("60")).unwrap();
    assert_eq!(q.supply_after, d("100"));

    let err = quote(&params(), &d("100"), &d("40"), Side::Buy, &d("61")).unwrap_err();
    assert!(matches!(err, QuoteError::SupplyExceeded { .. }));
}

#[test]
fn test_validation_order() {
    // Amount is checked before anything else.
    let req = QuoteRequest::new(Side::Sell, d("-1")).with_holder_balance(d("0"));
    assert_eq!(
        quote_with(&params(), &d("10"), &d("0"), &req).unwrap_err(),
        QuoteError::InvalidAmount
    );

    // Supply bounds before holder balance.
    let req = QuoteRequest::new(Side::Sell, d("5")).with_holder_balance(d("1"));
    assert!(matches!(
        quote_with(&params(), &d("10"), &d("2"), &req).unwrap_err(),
        QuoteError::InsufficientSupply { .. }
    ));

    // Holder balance before slippage.
    let req = QuoteRequest::new(Side::Sell, d("5"))
        .with_holder_balance(d("1"))
        .with_max_slippage(d("0"));
    assert!(matches!(
        quote_with(&params(), &d("10"), &d("10"), &req).unwrap_err(),
        QuoteError::InsufficientBalance { .. }
    ));

    let req = QuoteRequest::new(Side::Buy, d("10")).with_max_slippage(d("9.99"));
    assert!(matches!(
        quote_with(&params(), &d("1000"), &d("0"), &req).unwrap_err(),
        QuoteError::SlippageExceeded { .. }
    ));
    let req = QuoteRequest::new(Side::Buy, d("10")).with_max_slippage(d("10"));
    assert!(quote_with(&params(), &d("1000"), &d("0"), &req).is_ok());
}

#[test]
fn test_free_curve_has_zero_slippage() {
    let free = CurveParams::new(d("0"), d("0"), d("0")).unwrap();
    let q = quote(&free, &d("100"), &d("0"), Side::Buy, &d("10")).unwrap();
    assert_eq!(q.gross, Decimal::zero());
    assert_eq!(q.slippage_pct, Decimal::zero());
    assert_eq!(q.price_impact_pct, Decimal::zero());
}

#[test]
fn test_curve_overflow_is_reported() {
    let curve = LinearCurve::new(params());
    let huge = Decimal::ten_pow(60);
    assert_eq!(curve.buy_cost(&huge, &huge).unwrap_err(), CurveError::Overflow);
}

#[test]
fn test_one_whole_eighteen_decimal_token() {
    let params = CurveParams::new(d("1000000000000000"), d("1"), d("0.01")).unwrap();
    let amount = parse_token_amount("1", 18).unwrap();
    assert_eq!(amount, d("1000000000000000000"));

    let q = quote(
        &params,
        &d("1000000000000000000000000"),
        &d("0"),
        Side::Buy,
        &amount,
    )
    .unwrap();
    assert_eq!(q.spot_price, d("1000000000000000"));
    assert_eq!(q.average_price, d("501000000000000000"));
    assert_eq!(q.gross, d("501000000000000000000000000000000000"));
    assert_eq!(q.protocol_fee, d("5010000000000000000000000000000000"));
    assert_eq!(q.net, d("495990000000000000000000000000000000"));
    assert_eq!(q.supply_after, amount);
    assert_eq!(q.slippage_pct, d("100000"));
    assert_eq!(q.price_impact_pct, d("50000"));
}

#[test]
fn test_large_eighteen_decimal_order_on_flat_curve() {
    let params = CurveParams::new(d("1000000000000000"), d("0"), d("0")).unwrap();
    let amount = parse_token_amount("100000", 18).unwrap();
    let q = quote(&params, &amount, &d("0"), Side::Buy, &amount).unwrap();
    assert_eq!(q.gross, d("100000000000000000000000000000000000000"));
    assert_eq!(q.average_price, d("1000000000000000"));
    assert_eq!(q.supply_after, amount);
}

#[test]
fn test_quote_token_uses_ledger_supply() {
    let token = token("1000000");
    let trades = vec![
        trade(Side::Buy, "120", 1),
        trade(Side::Sell, "20", 2),
    ];

    let snapshot = market_snapshot(&token, &trades).unwrap();
    assert_eq!(snapshot.supply, d("100"));
    assert_eq!(snapshot.spot_price, d("2000"));
    assert_eq!(snapshot.remaining, d("999900"));

    let q = quote_token(
        &token.token_id,
        Some(&token),
        &trades,
        &QuoteRequest::new(Side::Sell, d("50")),
    )
    .unwrap();
    assert_eq!(q.average_price, d("1750"));
    let settlement = q.settlement.unwrap();
    assert_eq!(settlement.to, token.contract_address);
    assert_eq!(settlement.value, Decimal::zero());
    // 50 as the trailing byte of the amount word.
    assert!(settlement.data.ends_with("32"));
}

#[test]
fn test_quote_token_unknown_token() {
    let missing = TokenId::new("missing".to_string());
    let err = quote_token(
        &missing,
        None,
        std::iter::empty(),
        &QuoteRequest::new(Side::Buy, d("1")),
    )
    .unwrap_err();
    assert_eq!(err, QuoteError::TokenNotFound(missing));
}
