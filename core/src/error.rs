use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Priority weights must sum to 1.0 (±0.01), got {sum:.4}")]
    InvalidWeights { sum: f64 },

    #[error("Priority weight '{name}' must be non-negative, got {value}")]
    NegativeWeight { name: &'static str, value: f64 },

    #[error("Typical bill amount must be positive, got {value}")]
    InvalidBaseline { value: f64 },

    #[error("Minimum payment threshold must be non-negative, got {value}")]
    InvalidThreshold { value: f64 },

    #[error("Bill '{bill_id}' not found for user '{user_id}'")]
    BillNotFound { user_id: String, bill_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
