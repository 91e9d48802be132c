use thiserror::Error;

/// Errors surfaced by the hospital directory and assistant
#[derive(Error, Debug)]
pub enum HospitalAssistantError {
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation failed for '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Hospital not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Model load failed: {0}")]
    ModelLoad(String),

    #[error(transparent)]
    Inference(#[from] InferenceError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl HospitalAssistantError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A single question-answer round failed
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("No hospital data available")]
    NoData,

    #[error("{0}")]
    Backend(String),
}

impl InferenceError {
    /// Short machine-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            InferenceError::NoData => "no data",
            InferenceError::Backend(_) => "backend",
        }
    }
}

pub type Result<T> = std::result::Result<T, HospitalAssistantError>;
