//! Error taxonomy shared by the engines and their collaborators

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlannerError>;

/// Errors surfaced by the ranking core.
///
/// "Not found" is deliberately absent: an ingredient or recipe with no
/// matches is an empty result, never an error.
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Caller-supplied parameter out of contract. Raised before any
    /// collaborator is contacted.
    #[error("Invalid parameter: {0}")]
    Validation(String),

    /// Graph store, vector index, embedding or metadata service failed.
    #[error("{service} error: {message}")]
    ExternalService { service: String, message: String },

    /// A single stored record could not be parsed. Batch operations skip
    /// the record and continue.
    #[error("Malformed record {record}: {reason}")]
    MalformedData { record: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PlannerError {
    pub fn external(service: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            message: message.into(),
        }
    }

    pub fn malformed(record: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedData {
            record: record.into(),
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::MalformedData { .. })
    }
}

impl From<reqwest::Error> for PlannerError {
    fn from(err: reqwest::Error) -> Self {
        let service = err
            .url()
            .and_then(|url| url.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "http".to_string());
        let message = if err.is_timeout() {
            format!("request timed out: {}", err)
        } else {
            err.to_string()
        };
        Self::ExternalService { service, message }
    }
}

/// Validate a weight in [0, 1]; NaN and infinities are rejected.
pub fn check_unit_weight(name: &str, value: f32) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(PlannerError::Validation(format!(
            "{} must be within [0, 1], got {}",
            name, value
        )))
    }
}

/// Validate a strictly positive count.
pub fn check_positive(name: &str, value: usize) -> Result<()> {
    if value == 0 {
        Err(PlannerError::Validation(format!("{} must be greater than 0", name)))
    } else {
        Ok(())
    }
}
