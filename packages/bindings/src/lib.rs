use std::collections::HashMap;

use chrono::{DateTime, Utc};
use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::Deserialize;

use cryptofolio_core::{
    AllocationRule, Fraction, Money, PortfolioAsset, RiskAssessment, StressScenario,
};

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

// ---------------------------------------------------------------------------
// Input envelopes for multi-argument operations
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct AllocationInput {
    total_investment: Money,
    assets: Vec<PortfolioAsset>,
    #[serde(default)]
    rules: HashMap<String, AllocationRule>,
}

#[derive(Deserialize)]
struct PredictionInput {
    historical_prices: Vec<Money>,
    #[serde(default)]
    days_ahead: Option<u32>,
}

#[derive(Deserialize)]
struct RebalanceInput {
    current: Vec<Fraction>,
    target: Vec<Fraction>,
    #[serde(default)]
    threshold: Option<Decimal>,
    portfolio_value: Money,
}

#[derive(Deserialize)]
struct StressInput {
    assets: Vec<PortfolioAsset>,
    #[serde(default)]
    scenarios: Option<Vec<StressScenario>>,
}

#[derive(Deserialize)]
struct ReportInput {
    portfolio_name: String,
    assets: Vec<PortfolioAsset>,
    risk: RiskAssessment,
    #[serde(default)]
    generated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Allocation
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_allocation(input_json: String) -> NapiResult<String> {
    let input: AllocationInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = cryptofolio_core::allocation::calculate_allocation(
        input.total_investment,
        &input.assets,
        &input.rules,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[napi]
pub fn assess_portfolio_risk(input_json: String) -> NapiResult<String> {
    let assets: Vec<PortfolioAsset> = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        cryptofolio_core::risk::assess_portfolio_risk(&assets).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn risk_level(score_json: String) -> NapiResult<String> {
    let score: Decimal = serde_json::from_str(&score_json).map_err(to_napi_error)?;
    let output = cryptofolio_core::risk::risk_level(score);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn predict_future_return(input_json: String) -> NapiResult<String> {
    let input: PredictionInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let days = input
        .days_ahead
        .unwrap_or(cryptofolio_core::risk::DEFAULT_PREDICTION_HORIZON);
    let output = cryptofolio_core::risk::predict_future_return(&input.historical_prices, days)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Rebalancing
// ---------------------------------------------------------------------------

#[napi]
pub fn check_rebalance(input_json: String) -> NapiResult<String> {
    let input: RebalanceInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let threshold = input
        .threshold
        .unwrap_or(cryptofolio_core::rebalance::DEFAULT_REBALANCE_THRESHOLD);
    let output = cryptofolio_core::rebalance::plan_rebalance(
        &input.current,
        &input.target,
        threshold,
        input.portfolio_value,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn stress_test(input_json: String) -> NapiResult<String> {
    let input: StressInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let scenarios = input
        .scenarios
        .unwrap_or_else(cryptofolio_core::rebalance::default_scenarios);
    let output = cryptofolio_core::rebalance::stress_test(&input.assets, &scenarios)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[napi]
pub fn generate_report(input_json: String) -> NapiResult<String> {
    let input: ReportInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let generated_at = input.generated_at.unwrap_or_else(Utc::now);
    let report = cryptofolio_core::report::generate_csv(
        &input.portfolio_name,
        &input.assets,
        &input.risk,
        generated_at,
    )
    .map_err(to_napi_error)?;
    let filename =
        cryptofolio_core::report::suggested_filename(&input.portfolio_name, generated_at.date_naive());
    serde_json::to_string(&serde_json::json!({ "report": report, "filename": filename }))
        .map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Workflows
// ---------------------------------------------------------------------------

#[napi]
pub fn analyze_portfolio(input_json: String) -> NapiResult<String> {
    let input: cryptofolio_core::analysis::PortfolioAnalysisInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        cryptofolio_core::analysis::analyze_portfolio(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}
