use std::collections::BTreeMap;

use reqwest::StatusCode;
use thiserror::Error;

/// Field name to message, as shown inline next to a form input.
pub type FieldErrors = BTreeMap<&'static str, String>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server error {status}: {body}")]
    Api { status: StatusCode, body: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Session storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("Invalid input: {}", join_field_errors(.0))]
    Validation(FieldErrors),

    #[error("{0}")]
    Workflow(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found")]
    NotFound,

    #[error("Not logged in")]
    Unauthorized,
}

impl AppError {
    pub fn field(name: &'static str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name, message.into());
        AppError::Validation(errors)
    }

    /// Text for the dismissible banner a page shows when an operation fails.
    /// Server errors surface their raw body.
    pub fn banner(&self) -> String {
        match self {
            AppError::Api { body, .. } if !body.trim().is_empty() => body.clone(),
            AppError::Api { status, .. } => format!("Request failed ({})", status),
            AppError::Http(_) => "Could not reach the server".to_string(),
            other => other.to_string(),
        }
    }
}

fn join_field_errors(errors: &FieldErrors) -> String {
    errors
        .iter()
        .map(|(field, msg)| format!("{}: {}", field, msg))
        .collect::<Vec<_>>()
        .join("; ")
}
