use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::allocation::{calculate_percentage_return, calculate_portfolio_value};
use crate::error::CryptofolioError;
use crate::types::*;
use crate::CryptofolioResult;

/// Column header of the asset allocation section.
pub const ASSET_HEADER: &str =
    "Symbol,Name,Units,Entry Price,Current Price,Current Value,Allocation %,Gain/Loss";

/// Render the portfolio report as newline-joined CSV-like text.
///
/// Sections, in order: title and timestamp, portfolio overview, asset
/// allocation (one row per asset) and risk assessment. Totals and the
/// allocation column are recomputed from `assets`; the stored
/// `allocation` field is not read.
pub fn generate_csv(
    portfolio_name: &str,
    assets: &[PortfolioAsset],
    risk: &RiskAssessment,
    timestamp: DateTime<Utc>,
) -> CryptofolioResult<String> {
    let portfolio_value = calculate_portfolio_value(assets);
    if portfolio_value.is_zero() && !assets.is_empty() {
        return Err(CryptofolioError::DivisionByZero {
            context: "report allocation column for a zero-value portfolio".into(),
        });
    }

    let mut lines = vec![
        format!("Portfolio Report: {}", portfolio_name),
        format!("Generated: {}", timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ")),
        String::new(),
        "PORTFOLIO OVERVIEW".to_string(),
        format!("Total Value: ${}", fmt2(portfolio_value)),
        format!(
            "Percentage Return: {}%",
            fmt2(calculate_percentage_return(assets).value())
        ),
        String::new(),
        "ASSET ALLOCATION".to_string(),
        ASSET_HEADER.to_string(),
    ];

    for holding in assets {
        let current_value = holding.current_value();
        let share = current_value / portfolio_value * Decimal::ONE_HUNDRED;
        lines.push(format!(
            "{},{},{},${},${},${},{}%,${}",
            holding.asset.symbol,
            holding.asset.name,
            fmt2(holding.units),
            fmt2(holding.entry_price),
            fmt2(holding.asset.current_price),
            fmt2(current_value),
            fmt2(share),
            fmt2(holding.gain_loss()),
        ));
    }

    lines.push(String::new());
    lines.push("RISK ASSESSMENT".to_string());
    lines.push(format!("Risk Score,{}", fmt2(risk.risk_score)));
    lines.push(format!("Volatility,{}", fmt2(risk.volatility)));
    lines.push(format!("Expected Annual Return,{}%", fmt2(risk.predicted_return)));
    lines.push(format!("Sharpe Ratio,{}", fmt2(risk.sharpe_ratio)));

    Ok(lines.join("\n"))
}

/// `<name with whitespace runs as "_">_report_<YYYY-MM-DD>.csv`
pub fn suggested_filename(portfolio_name: &str, date: NaiveDate) -> String {
    let mut stem = String::with_capacity(portfolio_name.len());
    let mut in_space = false;
    for c in portfolio_name.chars() {
        if c.is_whitespace() {
            if !in_space {
                stem.push('_');
            }
            in_space = true;
        } else {
            stem.push(c);
            in_space = false;
        }
    }
    format!("{}_report_{}.csv", stem, date.format("%Y-%m-%d"))
}

/// Leading `max_chars` characters of a report, suffixed with `...` only when cut.
pub fn report_preview(report: &str, max_chars: usize) -> String {
    match report.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &report[..idx]),
        None => report.to_string(),
    }
}

/// Two decimal places, half away from zero, no separators.
///
/// A negative value keeps its sign even when it rounds to zero (`-0.00`).
fn fmt2(value: Decimal) -> String {
    let rounded = value
        .abs()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if value.is_sign_negative() && !value.is_zero() { "-" } else { "" };
    format!("{}{:.2}", sign, rounded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn sample_assets() -> Vec<PortfolioAsset> {
        vec![
            PortfolioAsset {
                asset: Asset {
                    symbol: "BTC".into(),
                    name: "Bitcoin".into(),
                    current_price: dec!(45000),
                    historical_prices: vec![],
                },
                units: dec!(0.5),
                entry_price: dec!(40000),
                allocation: Fraction::new(dec!(0.5)),
            },
            PortfolioAsset {
                asset: Asset {
                    symbol: "ETH".into(),
                    name: "Ethereum".into(),
                    current_price: dec!(2500),
                    historical_prices: vec![],
                },
                units: dec!(10),
                entry_price: dec!(2000),
                allocation: Fraction::new(dec!(0.5)),
            },
        ]
    }

    fn sample_risk() -> RiskAssessment {
        RiskAssessment {
            risk_score: dec!(72),
            volatility: dec!(0.15),
            predicted_return: dec!(0.25),
            sharpe_ratio: dec!(1.67),
        }
    }

    #[test]
    fn test_fmt2() {
        assert_eq!(fmt2(dec!(1)), "1.00");
        assert_eq!(fmt2(dec!(1.005)), "1.01");
        assert_eq!(fmt2(dec!(1234567.891)), "1234567.89");
        assert_eq!(fmt2(dec!(-2.5)), "-2.50");
        assert_eq!(fmt2(dec!(-1.005)), "-1.01");
        assert_eq!(fmt2(dec!(-0.001)), "-0.00");
        assert_eq!(fmt2(Decimal::ZERO), "0.00");
    }

    #[test]
    fn test_small_negative_sharpe_keeps_sign() {
        let mut risk = sample_risk();
        risk.sharpe_ratio = dec!(-0.001);
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let csv = generate_csv("Test Portfolio", &sample_assets(), &risk, ts).unwrap();
        assert_eq!(csv.lines().last().unwrap(), "Sharpe Ratio,-0.00");
    }

    #[test]
    fn test_report_layout() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        let csv = generate_csv("Test Portfolio", &sample_assets(), &sample_risk(), ts).unwrap();
        let lines: Vec<&str> = csv.split('\n').collect();

        assert_eq!(lines[0], "Portfolio Report: Test Portfolio");
        assert_eq!(lines[1], "Generated: 2024-03-01T12:30:00.000Z");
        assert_eq!(lines[2], "");
        assert_eq!(lines[3], "PORTFOLIO OVERVIEW");
        assert_eq!(lines[4], "Total Value: $47500.00");
        assert_eq!(lines[5], "Percentage Return: 18.75%");
        assert_eq!(lines[7], "ASSET ALLOCATION");
        assert_eq!(lines[8], ASSET_HEADER);
        assert_eq!(lines[9], "BTC,Bitcoin,0.50,$40000.00,$45000.00,$22500.00,47.37%,$2500.00");
        assert_eq!(lines[10], "ETH,Ethereum,10.00,$2000.00,$2500.00,$25000.00,52.63%,$5000.00");
        assert_eq!(lines[12], "RISK ASSESSMENT");
        assert_eq!(lines[13], "Risk Score,72.00");
        assert_eq!(lines[14], "Volatility,0.15");
        assert_eq!(lines[15], "Expected Annual Return,0.25%");
        assert_eq!(lines[16], "Sharpe Ratio,1.67");
        assert_eq!(lines.len(), 17);
    }

    #[test]
    fn test_report_no_assets() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let csv = generate_csv("Empty", &[], &sample_risk(), ts).unwrap();
        assert!(csv.contains(ASSET_HEADER));
        assert!(csv.contains("Total Value: $0.00"));
    }

    #[test]
    fn test_report_zero_value_rejected() {
        let mut assets = sample_assets();
        for a in &mut assets {
            a.units = Decimal::ZERO;
        }
        let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(generate_csv("Flat", &assets, &sample_risk(), ts).is_err());
    }

    #[test]
    fn test_suggested_filename() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(
            suggested_filename("My Crypto Portfolio", d),
            "My_Crypto_Portfolio_report_2024-03-01.csv"
        );
        assert_eq!(suggested_filename("a  \tb", d), "a_b_report_2024-03-01.csv");
    }

    #[test]
    fn test_report_preview() {
        assert_eq!(report_preview("abcdef", 3), "abc...");
        assert_eq!(report_preview("abc", 3), "abc");
        assert_eq!(report_preview("₿₿₿₿", 2), "₿₿...");
    }
}
