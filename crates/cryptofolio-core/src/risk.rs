use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::CryptofolioError;
use crate::types::*;
use crate::CryptofolioResult;

/// Per-period risk-free rate subtracted in the Sharpe-like ratio.
pub const RISK_FREE_RATE: Rate = dec!(0.02);

/// Periods used to annualise the expected per-period return.
pub const TRADING_PERIODS_PER_YEAR: Decimal = dec!(252);

/// Default horizon, in periods, for [`predict_future_return`].
pub const DEFAULT_PREDICTION_HORIZON: u32 = 30;

const BASE_RISK_SCORE: Decimal = dec!(50);
const MIN_RISK_SCORE: Decimal = dec!(0);
const MAX_RISK_SCORE: Decimal = dec!(100);

/// Scores below this are [`RiskLevel::Low`].
pub const LOW_RISK_CEILING: Decimal = dec!(30);
/// Scores below this (and not low) are [`RiskLevel::Moderate`].
pub const MODERATE_RISK_CEILING: Decimal = dec!(60);

/// Qualitative band of a risk score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn label(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::Moderate => "Moderate Risk",
            RiskLevel::High => "High Risk",
        }
    }
}

/// Band a score: below 30 is low, below 60 moderate, anything else high.
pub fn risk_level(score: Decimal) -> RiskLevel {
    if score < LOW_RISK_CEILING {
        RiskLevel::Low
    } else if score < MODERATE_RISK_CEILING {
        RiskLevel::Moderate
    } else {
        RiskLevel::High
    }
}

/// Population standard deviation of a raw price series.
///
/// Returns zero for fewer than two observations. A series whose squared
/// deviations exceed the Decimal range saturates to `Decimal::MAX`.
pub fn calculate_volatility(prices: &[Money]) -> Decimal {
    match price_volatility(prices) {
        Ok(vol) => vol,
        Err(e) => {
            warn!(error = %e, "volatility saturated");
            Decimal::MAX
        }
    }
}

fn price_volatility(prices: &[Money]) -> CryptofolioResult<Decimal> {
    if prices.len() < 2 {
        return Ok(Decimal::ZERO);
    }

    let n = Decimal::from(prices.len() as i64);
    let mean = checked_sum(prices.iter().copied(), "price series sum")? / n;
    let squared = prices
        .iter()
        .map(|p| {
            p.checked_sub(mean)
                .and_then(|d| d.checked_mul(d))
                .ok_or_else(|| overflow("squared price deviation"))
        })
        .collect::<CryptofolioResult<Vec<_>>>()?;
    let variance = checked_sum(squared, "price variance")? / n;

    Ok(sqrt_decimal(variance))
}

/// Simple period-over-period returns, `len(prices) - 1` of them.
pub fn calculate_returns(prices: &[Money]) -> CryptofolioResult<Vec<Rate>> {
    prices
        .windows(2)
        .map(|w| {
            if w[0].is_zero() {
                return Err(CryptofolioError::DivisionByZero {
                    context: "period return with a zero previous price".into(),
                });
            }
            w[1].checked_sub(w[0])
                .and_then(|d| d.checked_div(w[0]))
                .ok_or_else(|| overflow("period return"))
        })
        .collect()
}

/// Arithmetic mean of the simple returns. `None` when there are no returns.
fn mean_return(prices: &[Money]) -> CryptofolioResult<Option<Rate>> {
    let returns = calculate_returns(prices)?;
    if returns.is_empty() {
        return Ok(None);
    }
    let n = Decimal::from(returns.len() as i64);
    Ok(Some(checked_sum(returns, "mean return")? / n))
}

/// Allocation-weighted volatility, expected return and derived scores.
///
/// Each asset's price volatility and mean return are weighted by its
/// allocation fraction. `predicted_return` scales the per-period expected
/// return by [`TRADING_PERIODS_PER_YEAR`]; the Sharpe-like ratio subtracts
/// [`RISK_FREE_RATE`] from the per-period figure.
pub fn assess_portfolio_risk(assets: &[PortfolioAsset]) -> CryptofolioResult<RiskAssessment> {
    let mut portfolio_volatility = Decimal::ZERO;
    let mut expected_return = Decimal::ZERO;

    for holding in assets {
        let weight = holding.allocation.value();
        let history = &holding.asset.historical_prices;

        let avg = mean_return(history)?.ok_or_else(|| {
            CryptofolioError::InsufficientData(format!(
                "{} needs at least 2 historical prices to estimate a mean return (has {})",
                holding.asset.symbol,
                history.len()
            ))
        })?;

        let weighted_vol = price_volatility(history)?
            .checked_mul(weight)
            .ok_or_else(|| overflow("weighted volatility"))?;
        portfolio_volatility = portfolio_volatility
            .checked_add(weighted_vol)
            .ok_or_else(|| overflow("portfolio volatility"))?;
        expected_return = avg
            .checked_mul(weight)
            .and_then(|r| expected_return.checked_add(r))
            .ok_or_else(|| overflow("expected return"))?;
    }

    let sharpe_ratio = if portfolio_volatility > Decimal::ZERO {
        expected_return
            .checked_sub(RISK_FREE_RATE)
            .and_then(|excess| excess.checked_div(portfolio_volatility))
            .ok_or_else(|| overflow("sharpe ratio"))?
    } else {
        Decimal::ZERO
    };

    let assessment = RiskAssessment {
        risk_score: calculate_risk_score(portfolio_volatility, expected_return),
        volatility: portfolio_volatility,
        predicted_return: expected_return
            .checked_mul(TRADING_PERIODS_PER_YEAR)
            .ok_or_else(|| overflow("annualised return"))?,
        sharpe_ratio,
    };

    debug!(
        assets = assets.len(),
        risk_score = %assessment.risk_score,
        volatility = %assessment.volatility,
        "portfolio risk assessed"
    );

    Ok(assessment)
}

/// `50 + return*100*10 - volatility*100*20`, clamped to [0, 100].
///
/// Intermediate products that overflow saturate to whichever bound the
/// dominant term points at.
pub fn calculate_risk_score(volatility: Decimal, expected_return: Decimal) -> Decimal {
    let score = expected_return
        .checked_mul(dec!(100) * dec!(10))
        .zip(volatility.checked_mul(dec!(100) * dec!(20)))
        .and_then(|(gain, drag)| BASE_RISK_SCORE.checked_add(gain)?.checked_sub(drag));

    match score {
        Some(s) => s.max(MIN_RISK_SCORE).min(MAX_RISK_SCORE),
        // 1000·r − 2000·v > 0  ⇔  r/2 > v
        None if expected_return / dec!(2) > volatility => MAX_RISK_SCORE,
        None => MIN_RISK_SCORE,
    }
}

/// Naive projection: compound the latest price by the mean simple return
/// for `days_ahead` periods and report the percentage change.
///
/// Returns zero for fewer than two observations.
pub fn predict_future_return(prices: &[Money], days_ahead: u32) -> CryptofolioResult<Percentage> {
    let avg = match mean_return(prices)? {
        Some(avg) => avg,
        None => return Ok(Percentage::ZERO),
    };

    let current = prices[prices.len() - 1];
    if current.is_zero() {
        return Err(CryptofolioError::DivisionByZero {
            context: "future return projection from a zero latest price".into(),
        });
    }

    let compounding = || CryptofolioError::Overflow {
        context: format!("compounding mean return over {} periods", days_ahead),
    };
    let growth = Decimal::ONE
        .checked_add(avg)
        .and_then(|base| base.checked_powu(u64::from(days_ahead)))
        .ok_or_else(compounding)?;
    let future = current.checked_mul(growth).ok_or_else(compounding)?;

    let change = future
        .checked_sub(current)
        .and_then(|d| d.checked_div(current))
        .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or_else(|| overflow("projected percentage change"))?;
    Ok(Percentage::new(change))
}

fn overflow(context: &str) -> CryptofolioError {
    CryptofolioError::Overflow {
        context: context.into(),
    }
}

fn sqrt_decimal(val: Decimal) -> Decimal {
    if val <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    val.sqrt().unwrap_or(Decimal::ZERO)
}
