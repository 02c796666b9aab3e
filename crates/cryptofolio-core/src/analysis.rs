use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Instant;
use tracing::{info, warn};

use crate::allocation::{
    calculate_allocation, calculate_percentage_return, calculate_portfolio_value,
    calculate_total_gain_loss,
};
use crate::error::CryptofolioError;
use crate::rebalance::{
    default_scenarios, plan_rebalance, stress_test, RebalancePlan, StressResult,
    DEFAULT_REBALANCE_THRESHOLD,
};
use crate::report::{generate_csv, suggested_filename};
use crate::risk::{
    assess_portfolio_risk, predict_future_return, risk_level, RiskLevel,
    DEFAULT_PREDICTION_HORIZON, RISK_FREE_RATE, TRADING_PERIODS_PER_YEAR,
};
use crate::types::*;
use crate::CryptofolioResult;

/// Input for a full portfolio analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysisInput {
    pub portfolio_name: String,
    pub total_investment: Money,
    pub assets: Vec<PortfolioAsset>,
    #[serde(default)]
    pub rules: HashMap<String, AllocationRule>,
    /// Defaults to the four standard market scenarios
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenarios: Option<Vec<StressScenario>>,
    /// Index-aligned with `assets`; enables the rebalance plan
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_allocation: Option<Vec<Fraction>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebalance_threshold: Option<Rate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_horizon: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}

/// Projection for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetPrediction {
    pub symbol: String,
    pub horizon: u32,
    pub predicted_change: Percentage,
}

/// Output of a full portfolio analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAnalysisOutput {
    pub allocated_assets: Vec<PortfolioAsset>,
    pub portfolio_value: Money,
    pub total_gain_loss: Money,
    pub percentage_return: Percentage,
    pub risk: RiskAssessment,
    pub risk_level: RiskLevel,
    pub predictions: Vec<AssetPrediction>,
    pub stress_results: Vec<StressResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rebalance: Option<RebalancePlan>,
    pub report: String,
    pub report_filename: String,
}

/// Allocate, assess, stress and report a portfolio in one pass.
pub fn analyze_portfolio(
    input: &PortfolioAnalysisInput,
) -> CryptofolioResult<ComputationOutput<PortfolioAnalysisOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.total_investment <= Decimal::ZERO {
        return Err(CryptofolioError::InvalidInput {
            field: "total_investment".into(),
            reason: "Total investment must be positive".into(),
        });
    }

    for (symbol, rule) in &input.rules {
        if rule.min_percent > rule.max_percent {
            warnings.push(format!(
                "Rule for {} has min_percent above max_percent; min_percent takes precedence",
                symbol
            ));
        }
        if !input.assets.iter().any(|a| &a.asset.symbol == symbol) {
            warnings.push(format!("Rule for {} matches no asset in the portfolio", symbol));
        }
    }
    // HashMap order is arbitrary
    warnings.sort();

    for holding in &input.assets {
        if holding.entry_price <= Decimal::ZERO {
            warnings.push(format!(
                "{} has a non-positive entry price; percentage return is understated",
                holding.asset.symbol
            ));
        }
    }

    let allocated = calculate_allocation(input.total_investment, &input.assets, &input.rules)?;
    let portfolio_value = calculate_portfolio_value(&allocated);
    let risk = assess_portfolio_risk(&allocated)?;

    let horizon = input.prediction_horizon.unwrap_or(DEFAULT_PREDICTION_HORIZON);
    let predictions = allocated
        .iter()
        .map(|holding| {
            Ok(AssetPrediction {
                symbol: holding.asset.symbol.clone(),
                horizon,
                predicted_change: predict_future_return(&holding.asset.historical_prices, horizon)?,
            })
        })
        .collect::<CryptofolioResult<Vec<_>>>()?;

    let scenarios = input.scenarios.clone().unwrap_or_else(default_scenarios);
    let stress_results = stress_test(&allocated, &scenarios)?;

    let threshold = input.rebalance_threshold.unwrap_or(DEFAULT_REBALANCE_THRESHOLD);
    let rebalance = match &input.target_allocation {
        Some(target) => {
            let current: Vec<Fraction> = allocated.iter().map(|a| a.allocation).collect();
            let plan = plan_rebalance(&current, target, threshold, portfolio_value)?;
            if plan.needed {
                warn!(portfolio = %input.portfolio_name, "allocation drift exceeds threshold");
            }
            Some(plan)
        }
        None => None,
    };

    let generated_at = input.generated_at.unwrap_or_else(Utc::now);
    let report = generate_csv(&input.portfolio_name, &allocated, &risk, generated_at)?;
    let report_filename = suggested_filename(&input.portfolio_name, generated_at.date_naive());

    let output = PortfolioAnalysisOutput {
        total_gain_loss: calculate_total_gain_loss(&allocated),
        percentage_return: calculate_percentage_return(&allocated),
        allocated_assets: allocated,
        portfolio_value,
        risk_level: risk_level(risk.risk_score),
        risk,
        predictions,
        stress_results,
        rebalance,
        report,
        report_filename,
    };

    info!(
        portfolio = %input.portfolio_name,
        assets = output.allocated_assets.len(),
        warnings = warnings.len(),
        "portfolio analysis complete"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Clamp-and-normalise allocation, allocation-weighted price risk, uniform-shock stress test",
        &serde_json::json!({
            "total_investment": input.total_investment.to_string(),
            "risk_free_rate": RISK_FREE_RATE.to_string(),
            "periods_per_year": TRADING_PERIODS_PER_YEAR.to_string(),
            "prediction_horizon": horizon,
            "rebalance_threshold": threshold.to_string(),
            "scenarios": scenarios.len(),
        }),
        warnings,
        elapsed,
        output,
    ))
}
