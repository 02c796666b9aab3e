use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::CryptofolioError;
use crate::CryptofolioResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// A weight on the 0–1 scale. The canonical scale for allocations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fraction(Decimal);

impl Fraction {
    pub const ZERO: Fraction = Fraction(Decimal::ZERO);
    pub const ONE: Fraction = Fraction(Decimal::ONE);

    pub fn new(value: Decimal) -> Self {
        Fraction(value)
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn to_percentage(self) -> Percentage {
        Percentage(self.0 * Decimal::ONE_HUNDRED)
    }
}

/// A value on the 0–100 scale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percentage(Decimal);

impl Percentage {
    pub const ZERO: Percentage = Percentage(Decimal::ZERO);

    pub fn new(value: Decimal) -> Self {
        Percentage(value)
    }

    pub fn value(self) -> Decimal {
        self.0
    }

    pub fn to_fraction(self) -> Fraction {
        Fraction(self.0 / Decimal::ONE_HUNDRED)
    }
}

/// Reference data for a tradeable asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique short identifier (e.g. "BTC")
    pub symbol: String,
    pub name: String,
    pub current_price: Money,
    /// Chronological, oldest first. May be empty.
    #[serde(default)]
    pub historical_prices: Vec<Money>,
}

/// A holding of an asset inside a portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioAsset {
    pub asset: Asset,
    #[serde(default)]
    pub units: Decimal,
    /// Average cost basis per unit
    pub entry_price: Money,
    #[serde(default)]
    pub allocation: Fraction,
}

impl PortfolioAsset {
    /// Units marked at the current price.
    pub fn current_value(&self) -> Money {
        self.units * self.asset.current_price
    }

    /// Units marked at the entry price.
    pub fn cost_basis(&self) -> Money {
        self.units * self.entry_price
    }

    pub fn gain_loss(&self) -> Money {
        self.current_value() - self.cost_basis()
    }

    /// [`current_value`](Self::current_value) with the price scaled by `1 + shock`,
    /// or an `Overflow` error when the product leaves the Decimal range.
    pub fn shocked_value(&self, shock: Rate) -> CryptofolioResult<Money> {
        Decimal::ONE
            .checked_add(shock)
            .and_then(|factor| self.asset.current_price.checked_mul(factor))
            .and_then(|price| self.units.checked_mul(price))
            .ok_or_else(|| CryptofolioError::Overflow {
                context: format!("{} value under a {} shock", self.asset.symbol, shock),
            })
    }
}

/// Per-symbol allocation bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationRule {
    pub min_percent: Fraction,
    pub max_percent: Fraction,
    /// Informational only; not used by the allocation arithmetic
    #[serde(default)]
    pub risk_score: Decimal,
}

/// Composite portfolio risk metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskAssessment {
    /// Clamped to [0, 100]
    pub risk_score: Decimal,
    /// Allocation-weighted price volatility (price units)
    pub volatility: Decimal,
    /// Mean per-period return scaled by the trading periods per year
    pub predicted_return: Decimal,
    pub sharpe_ratio: Decimal,
}

/// A uniform price shock applied to every asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub name: String,
    /// Fractional shock (-0.3 = -30%)
    pub price_change: Rate,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Sum that reports `Overflow` instead of panicking.
pub fn checked_sum<I>(values: I, context: &str) -> CryptofolioResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(v))
        .ok_or_else(|| CryptofolioError::Overflow {
            context: context.into(),
        })
}
