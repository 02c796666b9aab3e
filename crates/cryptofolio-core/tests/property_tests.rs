use cryptofolio_core::allocation::{calculate_allocation, calculate_portfolio_value};
use cryptofolio_core::risk::calculate_risk_score;
use cryptofolio_core::{AllocationRule, Asset, Fraction, PortfolioAsset};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;

fn holding(idx: usize, price_cents: i64) -> PortfolioAsset {
    PortfolioAsset {
        asset: Asset {
            symbol: format!("C{}", idx),
            name: format!("Coin {}", idx),
            current_price: Decimal::new(price_cents, 2),
            historical_prices: vec![],
        },
        units: Decimal::ZERO,
        entry_price: Decimal::ONE,
        allocation: Fraction::ZERO,
    }
}

/// (price in cents, optional (min, max) in basis points)
fn asset_strategy() -> impl Strategy<Value = (i64, Option<(i64, i64)>)> {
    (
        1i64..10_000_000,
        prop::option::of((1i64..10_000, 1i64..10_000)),
    )
}

proptest! {
    #[test]
    fn allocation_weights_always_sum_to_one(
        specs in prop::collection::vec(asset_strategy(), 1..12),
        investment_cents in 1i64..1_000_000_000,
    ) {
        let assets: Vec<PortfolioAsset> = specs
            .iter()
            .enumerate()
            .map(|(i, (price, _))| holding(i, *price))
            .collect();
        let rules: HashMap<String, AllocationRule> = specs
            .iter()
            .enumerate()
            .filter_map(|(i, (_, bounds))| {
                bounds.map(|(lo, hi)| {
                    (
                        format!("C{}", i),
                        AllocationRule {
                            min_percent: Fraction::new(Decimal::new(lo, 4)),
                            max_percent: Fraction::new(Decimal::new(hi, 4)),
                            risk_score: Decimal::ZERO,
                        },
                    )
                })
            })
            .collect();

        let investment = Decimal::new(investment_cents, 2);
        let out = calculate_allocation(investment, &assets, &rules).unwrap();

        let sum: Decimal = out.iter().map(|a| a.allocation.value()).sum();
        prop_assert!((sum - Decimal::ONE).abs() < dec!(0.000000001));

        let value = calculate_portfolio_value(&out);
        prop_assert!((value - investment).abs() < dec!(0.000001));
    }

    #[test]
    fn risk_score_always_clamped(
        vol in any::<i64>(),
        vol_scale in 0u32..28,
        ret in any::<i64>(),
        ret_scale in 0u32..28,
    ) {
        let score = calculate_risk_score(Decimal::new(vol, vol_scale), Decimal::new(ret, ret_scale));
        prop_assert!(score >= Decimal::ZERO);
        prop_assert!(score <= dec!(100));
    }
}
