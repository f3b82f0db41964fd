use thiserror::Error;

#[derive(Error, Debug)]
pub enum UpliftError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid attribution config: {field}: {reason}")]
    Config { field: String, reason: String },

    #[error("Invalid date '{value}' in column {column}")]
    InvalidDate { column: &'static str, value: String },

    #[error("Recompute run '{run_id}' not found")]
    RunNotFound { run_id: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UpliftError {
    pub fn config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        UpliftError::Config {
            field:  field.into(),
            reason: reason.into(),
        }
    }
}

pub type UpliftResult<T> = Result<T, UpliftError>;
