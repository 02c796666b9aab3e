use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use cryptofolio_core::risk::{
    assess_portfolio_risk, calculate_returns, calculate_volatility, predict_future_return,
    risk_level, RiskLevel, DEFAULT_PREDICTION_HORIZON,
};
use cryptofolio_core::{Money, Percentage, Rate, RiskAssessment};

use super::{percent_allocations_to_fractions, AssetsDocument};
use crate::input;

/// Arguments for portfolio risk assessment
#[derive(Args)]
pub struct RiskArgs {
    /// Path to JSON/YAML file with the holdings (array, or object with `assets`)
    #[arg(long)]
    pub input: Option<String>,

    /// Treat each holding's allocation as a 0-100 percentage instead of a 0-1 fraction
    #[arg(long)]
    pub percent_allocations: bool,
}

/// Arguments for a single-asset return projection
#[derive(Args)]
pub struct PredictArgs {
    /// Path to JSON/YAML file with a price array or `historical_prices`
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated historical prices, oldest first
    #[arg(long, value_delimiter = ',')]
    pub prices: Option<Vec<Decimal>>,

    /// Periods to project forward
    #[arg(long, default_value_t = DEFAULT_PREDICTION_HORIZON)]
    pub days: u32,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PriceDocument {
    Bare(Vec<Money>),
    Wrapped { historical_prices: Vec<Money> },
}

#[derive(Serialize)]
struct RiskOutput {
    #[serde(flatten)]
    risk: RiskAssessment,
    risk_level: RiskLevel,
    risk_label: &'static str,
}

#[derive(Serialize)]
struct PredictOutput {
    predicted_change: Percentage,
    days_ahead: u32,
    mean_return: Rate,
    volatility: Decimal,
    observations: usize,
}

pub fn run_risk(args: RiskArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: AssetsDocument = input::load(&args.input, "risk assessment")?;
    let mut assets = doc.into_assets();
    if args.percent_allocations {
        assets = percent_allocations_to_fractions(assets);
    }

    let risk = assess_portfolio_risk(&assets)?;
    let level = risk_level(risk.risk_score);
    let output = RiskOutput {
        risk,
        risk_level: level,
        risk_label: level.label(),
    };
    Ok(serde_json::to_value(output)?)
}

pub fn run_predict(args: PredictArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let prices = match args.prices {
        Some(prices) => prices,
        None => match input::load::<PriceDocument>(&args.input, "prediction")? {
            PriceDocument::Bare(prices) => prices,
            PriceDocument::Wrapped { historical_prices } => historical_prices,
        },
    };

    let returns = calculate_returns(&prices)?;
    let mean_return = if returns.is_empty() {
        Decimal::ZERO
    } else {
        returns.iter().sum::<Decimal>() / Decimal::from(returns.len() as i64)
    };

    let output = PredictOutput {
        predicted_change: predict_future_return(&prices, args.days)?,
        days_ahead: args.days,
        mean_return,
        volatility: calculate_volatility(&prices),
        observations: prices.len(),
    };

    Ok(serde_json::to_value(output)?)
}
