use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CryptofolioError;
use crate::types::*;
use crate::CryptofolioResult;

/// Absolute drift above which a rebalance is recommended.
pub const DEFAULT_REBALANCE_THRESHOLD: Rate = dec!(0.05);

/// Outcome of one stress scenario.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub scenario: String,
    /// Portfolio value with the shock applied
    pub portfolio_value: Money,
    /// Change versus the unshocked value
    pub change: Percentage,
}

/// Drift check plus the trades that would close it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancePlan {
    pub needed: bool,
    pub threshold: Rate,
    /// Signed dollar amount per asset: buy (+) / sell (-). Empty when not needed.
    pub adjustments: Vec<Money>,
    pub message: String,
}

/// The four standard market scenarios.
pub fn default_scenarios() -> Vec<StressScenario> {
    vec![
        StressScenario {
            name: "Bull Market (+20%)".into(),
            price_change: dec!(0.2),
        },
        StressScenario {
            name: "Normal (+5%)".into(),
            price_change: dec!(0.05),
        },
        StressScenario {
            name: "Bear Market (-15%)".into(),
            price_change: dec!(-0.15),
        },
        StressScenario {
            name: "Crash (-30%)".into(),
            price_change: dec!(-0.3),
        },
    ]
}

fn ensure_aligned(current: &[Fraction], target: &[Fraction]) -> CryptofolioResult<()> {
    if current.len() != target.len() {
        return Err(CryptofolioError::InvalidInput {
            field: "target_allocation".into(),
            reason: format!(
                "Expected {} weights to match the current allocation, got {}",
                current.len(),
                target.len()
            ),
        });
    }
    Ok(())
}

/// True when any asset's weight has drifted from target by more than `threshold`.
pub fn check_rebalance_needed(
    current: &[Fraction],
    target: &[Fraction],
    threshold: Rate,
) -> CryptofolioResult<bool> {
    ensure_aligned(current, target)?;
    Ok(current
        .iter()
        .zip(target)
        .any(|(c, t)| (c.value() - t.value()).abs() > threshold))
}

/// Dollar adjustment per asset to move from `current` to `target`.
pub fn calculate_rebalancing(
    current: &[Fraction],
    target: &[Fraction],
    portfolio_value: Money,
) -> CryptofolioResult<Vec<Money>> {
    ensure_aligned(current, target)?;
    target
        .iter()
        .zip(current)
        .map(|(t, c)| {
            t.value()
                .checked_sub(c.value())
                .and_then(|drift| drift.checked_mul(portfolio_value))
                .ok_or_else(|| CryptofolioError::Overflow {
                    context: "rebalancing adjustment".into(),
                })
        })
        .collect()
}

/// Combine the drift check with the adjustments.
pub fn plan_rebalance(
    current: &[Fraction],
    target: &[Fraction],
    threshold: Rate,
    portfolio_value: Money,
) -> CryptofolioResult<RebalancePlan> {
    let needed = check_rebalance_needed(current, target, threshold)?;
    if !needed {
        return Ok(RebalancePlan {
            needed,
            threshold,
            adjustments: Vec::new(),
            message: "Portfolio is within acceptable allocation ranges.".into(),
        });
    }

    Ok(RebalancePlan {
        needed,
        threshold,
        adjustments: calculate_rebalancing(current, target, portfolio_value)?,
        message: "Portfolio has drifted from target allocation. Rebalancing recommended.".into(),
    })
}

/// Revalue the portfolio under each uniform price shock.
///
/// The baseline is the unshocked value, computed once for all scenarios.
pub fn stress_test(
    assets: &[PortfolioAsset],
    scenarios: &[StressScenario],
) -> CryptofolioResult<Vec<StressResult>> {
    let baseline = checked_sum(
        assets
            .iter()
            .map(|a| a.shocked_value(Decimal::ZERO))
            .collect::<CryptofolioResult<Vec<_>>>()?,
        "stress baseline value",
    )?;

    if baseline.is_zero() && !scenarios.is_empty() {
        return Err(CryptofolioError::DivisionByZero {
            context: "stress test against a zero-value portfolio".into(),
        });
    }

    let results = scenarios
        .iter()
        .map(|scenario| {
            let values = assets
                .iter()
                .map(|a| a.shocked_value(scenario.price_change))
                .collect::<CryptofolioResult<Vec<_>>>()?;
            let stressed = checked_sum(values, "stressed portfolio value")?;
            let change = stressed
                .checked_sub(baseline)
                .and_then(|d| d.checked_div(baseline))
                .and_then(|r| r.checked_mul(Decimal::ONE_HUNDRED))
                .ok_or_else(|| CryptofolioError::Overflow {
                    context: format!("{} percentage change", scenario.name),
                })?;
            Ok(StressResult {
                scenario: scenario.name.clone(),
                portfolio_value: stressed,
                change: Percentage::new(change),
            })
        })
        .collect::<CryptofolioResult<Vec<_>>>()?;

    debug!(scenarios = results.len(), baseline = %baseline, "stress test complete");
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fractions(values: &[Decimal]) -> Vec<Fraction> {
        values.iter().copied().map(Fraction::new).collect()
    }

    fn single(price: Decimal, units: Decimal) -> Vec<PortfolioAsset> {
        vec![PortfolioAsset {
            asset: Asset {
                symbol: "BTC".into(),
                name: "Bitcoin".into(),
                current_price: price,
                historical_prices: vec![],
            },
            units,
            entry_price: price,
            allocation: Fraction::ONE,
        }]
    }

    #[test]
    fn test_no_drift() {
        let c = fractions(&[dec!(0.5), dec!(0.5)]);
        assert!(!check_rebalance_needed(&c, &c, DEFAULT_REBALANCE_THRESHOLD).unwrap());
    }

    #[test]
    fn test_drift_exceeds_threshold() {
        let c = fractions(&[dec!(0.5), dec!(0.5)]);
        let t = fractions(&[dec!(0.6), dec!(0.4)]);
        assert!(check_rebalance_needed(&c, &t, dec!(0.05)).unwrap());
    }

    #[test]
    fn test_drift_equal_to_threshold_not_needed() {
        let c = fractions(&[dec!(0.5), dec!(0.5)]);
        let t = fractions(&[dec!(0.55), dec!(0.45)]);
        assert!(!check_rebalance_needed(&c, &t, dec!(0.05)).unwrap());
    }

    #[test]
    fn test_adjustments() {
        let c = fractions(&[dec!(0.5), dec!(0.5)]);
        let t = fractions(&[dec!(0.6), dec!(0.4)]);
        let adj = calculate_rebalancing(&c, &t, dec!(100000)).unwrap();
        assert_eq!(adj, vec![dec!(10000), dec!(-10000)]);
    }

    #[test]
    fn test_misaligned_vectors_rejected() {
        let c = fractions(&[dec!(0.5), dec!(0.5)]);
        let t = fractions(&[dec!(1)]);
        assert!(check_rebalance_needed(&c, &t, dec!(0.05)).is_err());
        assert!(calculate_rebalancing(&c, &t, dec!(100)).is_err());
    }

    #[test]
    fn test_plan_not_needed_has_no_adjustments() {
        let c = fractions(&[dec!(0.5), dec!(0.5)]);
        let plan = plan_rebalance(&c, &c, dec!(0.05), dec!(1000)).unwrap();
        assert!(!plan.needed);
        assert!(plan.adjustments.is_empty());
    }

    #[test]
    fn test_plan_needed() {
        let c = fractions(&[dec!(0.5), dec!(0.5)]);
        let t = fractions(&[dec!(0.4), dec!(0.6)]);
        let plan = plan_rebalance(&c, &t, dec!(0.05), dec!(100000)).unwrap();
        assert!(plan.needed);
        assert_eq!(plan.adjustments, vec![dec!(-10000), dec!(10000)]);
    }

    #[test]
    fn test_stress_crash() {
        let scenarios = vec![StressScenario {
            name: "Crash".into(),
            price_change: dec!(-0.3),
        }];
        let out = stress_test(&single(dec!(100), dec!(1)), &scenarios).unwrap();
        assert_eq!(out[0].portfolio_value, dec!(70));
        assert_eq!(out[0].change, Percentage::new(dec!(-30)));
    }

    #[test]
    fn test_stress_default_scenarios() {
        let out = stress_test(&single(dec!(45000), dec!(0.5)), &default_scenarios()).unwrap();
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].change, Percentage::new(dec!(20)));
        assert_eq!(out[3].portfolio_value, dec!(15750));
    }

    #[test]
    fn test_stress_overflow_is_error() {
        let scenarios = vec![StressScenario {
            name: "Bull Market (+20%)".into(),
            price_change: dec!(0.2),
        }];
        let out = stress_test(&single(Decimal::MAX, dec!(1)), &scenarios);
        assert!(matches!(out, Err(CryptofolioError::Overflow { .. })));
    }

    #[test]
    fn test_adjustment_overflow_is_error() {
        let c = fractions(&[dec!(0)]);
        let t = fractions(&[dec!(2)]);
        assert!(matches!(
            calculate_rebalancing(&c, &t, Decimal::MAX),
            Err(CryptofolioError::Overflow { .. })
        ));
    }

    #[test]
    fn test_stress_zero_baseline() {
        let out = stress_test(&single(dec!(100), Decimal::ZERO), &default_scenarios());
        assert!(matches!(out, Err(CryptofolioError::DivisionByZero { .. })));
        assert!(stress_test(&[], &[]).unwrap().is_empty());
    }
}
