use clap::Args;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use cryptofolio_core::allocation::{
    calculate_allocation, calculate_percentage_return, calculate_portfolio_value,
    calculate_total_gain_loss,
};
use cryptofolio_core::{AllocationRule, Money, Percentage, PortfolioAsset};

use crate::input;

/// Arguments for investment allocation
#[derive(Args)]
pub struct AllocateArgs {
    /// Path to JSON/YAML file with assets, rules and optionally total_investment
    #[arg(long)]
    pub input: Option<String>,

    /// Amount to invest (overrides the document's total_investment)
    #[arg(long)]
    pub total_investment: Option<Decimal>,
}

#[derive(Deserialize)]
struct AllocationDocument {
    total_investment: Option<Decimal>,
    assets: Vec<PortfolioAsset>,
    #[serde(default)]
    rules: HashMap<String, AllocationRule>,
}

#[derive(Serialize)]
struct AllocationOutput {
    portfolio_value: Money,
    total_gain_loss: Money,
    percentage_return: Percentage,
    allocated_assets: Vec<PortfolioAsset>,
}

pub fn run_allocate(args: AllocateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let doc: AllocationDocument = input::load(&args.input, "allocation")?;
    let investment = args
        .total_investment
        .or(doc.total_investment)
        .ok_or("Provide --total-investment or total_investment in the input document")?;
    if investment <= Decimal::ZERO {
        return Err("--total-investment must be positive".into());
    }

    let allocated = calculate_allocation(investment, &doc.assets, &doc.rules)?;

    let output = AllocationOutput {
        portfolio_value: calculate_portfolio_value(&allocated),
        total_gain_loss: calculate_total_gain_loss(&allocated),
        percentage_return: calculate_percentage_return(&allocated),
        allocated_assets: allocated,
    };

    Ok(serde_json::to_value(output)?)
}
