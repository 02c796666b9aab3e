pub mod allocation;
pub mod analysis;
pub mod rebalance;
pub mod report;
pub mod risk;

use cryptofolio_core::{Percentage, PortfolioAsset};
use serde::Deserialize;

/// Holdings given either as a bare array or under an `assets` key.
#[derive(Deserialize)]
#[serde(untagged)]
pub enum AssetsDocument {
    Bare(Vec<PortfolioAsset>),
    Wrapped { assets: Vec<PortfolioAsset> },
}

impl AssetsDocument {
    pub fn into_assets(self) -> Vec<PortfolioAsset> {
        match self {
            AssetsDocument::Bare(assets) => assets,
            AssetsDocument::Wrapped { assets } => assets,
        }
    }
}

/// Reinterpret allocations supplied on the 0–100 scale as fractions.
pub fn percent_allocations_to_fractions(assets: Vec<PortfolioAsset>) -> Vec<PortfolioAsset> {
    assets
        .into_iter()
        .map(|a| PortfolioAsset {
            allocation: Percentage::new(a.allocation.value()).to_fraction(),
            ..a
        })
        .collect()
}
