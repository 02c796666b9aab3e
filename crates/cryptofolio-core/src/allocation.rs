use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::CryptofolioError;
use crate::types::*;
use crate::CryptofolioResult;

/// Allocate `total_investment` across `assets`, honouring any per-symbol rules.
///
/// Weights start equal, each ruled asset is clamped once into its
/// `[min_percent, max_percent]` band, and the result is renormalised so the
/// weights sum to one. There is no iterative redistribution after the clamp.
///
/// Returns fresh copies with `allocation` and `units` filled in; the input
/// slice is left untouched.
pub fn calculate_allocation(
    total_investment: Money,
    assets: &[PortfolioAsset],
    rules: &HashMap<String, AllocationRule>,
) -> CryptofolioResult<Vec<PortfolioAsset>> {
    if assets.is_empty() {
        return Err(CryptofolioError::InsufficientData(
            "At least one asset is required for allocation".into(),
        ));
    }

    if let Some(bad) = assets.iter().find(|a| a.asset.current_price <= Decimal::ZERO) {
        return Err(CryptofolioError::InvalidInput {
            field: format!("{}.current_price", bad.asset.symbol),
            reason: "Current price must be positive".into(),
        });
    }

    let weights = optimize_weights(assets, rules)?;

    let allocated = assets
        .iter()
        .zip(weights.iter())
        .map(|(holding, weight)| {
            let units = total_investment
                .checked_mul(weight.value())
                .and_then(|budget| budget.checked_div(holding.asset.current_price))
                .ok_or_else(|| CryptofolioError::Overflow {
                    context: format!("{} unit count", holding.asset.symbol),
                })?;
            Ok(PortfolioAsset {
                allocation: *weight,
                units,
                ..holding.clone()
            })
        })
        .collect::<CryptofolioResult<Vec<_>>>()?;

    debug!(
        assets = allocated.len(),
        total_investment = %total_investment,
        "allocation computed"
    );

    Ok(allocated)
}

/// Equal weights, a single clamp pass per ruled symbol, then normalisation.
fn optimize_weights(
    assets: &[PortfolioAsset],
    rules: &HashMap<String, AllocationRule>,
) -> CryptofolioResult<Vec<Fraction>> {
    let n = Decimal::from(assets.len() as i64);
    let equal = Decimal::ONE / n;

    let clamped: Vec<Decimal> = assets
        .iter()
        .map(|holding| match rules.get(&holding.asset.symbol) {
            Some(rule) => {
                if rule.min_percent > rule.max_percent {
                    warn!(
                        symbol = %holding.asset.symbol,
                        min = %rule.min_percent.value(),
                        max = %rule.max_percent.value(),
                        "allocation rule has min above max; min takes precedence"
                    );
                }
                rule.min_percent.value().max(rule.max_percent.value().min(equal))
            }
            None => equal,
        })
        .collect();

    let sum = checked_sum(clamped.iter().copied(), "allocation weight sum")?;
    if sum.is_zero() {
        return Err(CryptofolioError::DivisionByZero {
            context: "allocation weight normalisation (all weights clamped to zero)".into(),
        });
    }

    Ok(clamped.into_iter().map(|w| Fraction::new(w / sum)).collect())
}

/// Total value of the holdings at current prices.
pub fn calculate_portfolio_value(assets: &[PortfolioAsset]) -> Money {
    assets.iter().map(PortfolioAsset::current_value).sum()
}

/// Absolute gain/loss across all holdings versus their entry prices.
pub fn calculate_total_gain_loss(assets: &[PortfolioAsset]) -> Money {
    assets.iter().map(PortfolioAsset::gain_loss).sum()
}

/// Return on cost basis, as a percentage. Zero when the cost basis is not positive.
pub fn calculate_percentage_return(assets: &[PortfolioAsset]) -> Percentage {
    let initial: Money = assets.iter().map(PortfolioAsset::cost_basis).sum();
    if initial <= Decimal::ZERO {
        return Percentage::ZERO;
    }
    let current = calculate_portfolio_value(assets);
    Percentage::new((current - initial) / initial * Decimal::ONE_HUNDRED)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn holding(symbol: &str, price: Decimal, entry: Decimal) -> PortfolioAsset {
        PortfolioAsset {
            asset: Asset {
                symbol: symbol.into(),
                name: symbol.into(),
                current_price: price,
                historical_prices: vec![],
            },
            units: Decimal::ZERO,
            entry_price: entry,
            allocation: Fraction::ZERO,
        }
    }

    fn rule(min: Decimal, max: Decimal) -> AllocationRule {
        AllocationRule {
            min_percent: Fraction::new(min),
            max_percent: Fraction::new(max),
            risk_score: dec!(50),
        }
    }

    fn weight_sum(assets: &[PortfolioAsset]) -> Decimal {
        assets.iter().map(|a| a.allocation.value()).sum()
    }

    #[test]
    fn test_equal_weights_without_rules() {
        let assets = vec![holding("BTC", dec!(45000), dec!(40000)), holding("ETH", dec!(2500), dec!(2000))];
        let out = calculate_allocation(dec!(100000), &assets, &HashMap::new()).unwrap();
        assert_eq!(out[0].allocation, Fraction::new(dec!(0.5)));
        assert_eq!(out[1].allocation, Fraction::new(dec!(0.5)));
        assert_eq!(out[1].units, dec!(20));
    }

    #[test]
    fn test_clamp_then_normalise() {
        // Equal 0.5 each; ETH clamped to 0.4 → [0.5, 0.4] / 0.9
        let assets = vec![holding("BTC", dec!(45000), dec!(40000)), holding("ETH", dec!(2500), dec!(2000))];
        let mut rules = HashMap::new();
        rules.insert("BTC".to_string(), rule(dec!(0.3), dec!(0.6)));
        rules.insert("ETH".to_string(), rule(dec!(0.2), dec!(0.4)));

        let out = calculate_allocation(dec!(100000), &assets, &rules).unwrap();
        let btc = out[0].allocation.value();
        let eth = out[1].allocation.value();
        assert!((btc - dec!(0.5) / dec!(0.9)).abs() < dec!(0.000000001));
        assert!((eth - dec!(0.4) / dec!(0.9)).abs() < dec!(0.000000001));
        assert!((weight_sum(&out) - Decimal::ONE).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_min_wins_when_min_above_max() {
        let assets = vec![holding("A", dec!(1), dec!(1)), holding("B", dec!(1), dec!(1))];
        let mut rules = HashMap::new();
        rules.insert("A".to_string(), rule(dec!(0.8), dec!(0.2)));
        let out = calculate_allocation(dec!(1000), &assets, &rules).unwrap();
        // [0.8, 0.5] / 1.3
        assert!((out[0].allocation.value() - dec!(0.8) / dec!(1.3)).abs() < dec!(0.000000001));
    }

    #[test]
    fn test_input_not_mutated() {
        let assets = vec![holding("BTC", dec!(45000), dec!(40000))];
        let before = assets.clone();
        let out = calculate_allocation(dec!(10000), &assets, &HashMap::new()).unwrap();
        assert_eq!(assets, before);
        assert_eq!(out[0].allocation, Fraction::ONE);
    }

    #[test]
    fn test_empty_assets_rejected() {
        let err = calculate_allocation(dec!(10000), &[], &HashMap::new());
        assert!(matches!(err, Err(CryptofolioError::InsufficientData(_))));
    }

    #[test]
    fn test_zero_price_rejected() {
        let assets = vec![holding("DUST", Decimal::ZERO, dec!(1))];
        assert!(calculate_allocation(dec!(10000), &assets, &HashMap::new()).is_err());
    }

    #[test]
    fn test_unit_overflow_is_error() {
        let assets = vec![holding("DUST", dec!(0.5), dec!(0.5))];
        let err = calculate_allocation(Decimal::MAX, &assets, &HashMap::new());
        assert!(matches!(err, Err(CryptofolioError::Overflow { .. })));
    }

    #[test]
    fn test_all_zero_weights_rejected() {
        let assets = vec![holding("A", dec!(1), dec!(1))];
        let mut rules = HashMap::new();
        rules.insert("A".to_string(), rule(Decimal::ZERO, Decimal::ZERO));
        let err = calculate_allocation(dec!(100), &assets, &rules);
        assert!(matches!(err, Err(CryptofolioError::DivisionByZero { .. })));
    }

    #[test]
    fn test_percentage_return_guarded() {
        let assets = vec![holding("A", dec!(10), dec!(8))];
        assert_eq!(calculate_percentage_return(&assets), Percentage::ZERO);
    }

    #[test]
    fn test_value_gain_and_return() {
        let mut btc = holding("BTC", dec!(45000), dec!(40000));
        btc.units = dec!(0.5);
        let mut eth = holding("ETH", dec!(2500), dec!(2000));
        eth.units = dec!(10);
        let assets = vec![btc, eth];
        assert_eq!(calculate_portfolio_value(&assets), dec!(47500));
        assert_eq!(calculate_total_gain_loss(&assets), dec!(7500));
        assert_eq!(calculate_percentage_return(&assets), Percentage::new(dec!(18.75)));
    }
}
