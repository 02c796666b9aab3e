use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptofolioError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Numeric overflow in {context}")]
    Overflow { context: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CryptofolioError {
    fn from(e: serde_json::Error) -> Self {
        CryptofolioError::SerializationError(e.to_string())
    }
}
