pub mod error;
pub mod types;

#[cfg(feature = "allocation")]
pub mod allocation;

#[cfg(feature = "risk")]
pub mod risk;

#[cfg(feature = "rebalance")]
pub mod rebalance;

#[cfg(feature = "report")]
pub mod report;

#[cfg(feature = "workflows")]
pub mod analysis;

pub use error::CryptofolioError;
pub use types::*;

/// Standard result type for all cryptofolio operations
pub type CryptofolioResult<T> = Result<T, CryptofolioError>;
