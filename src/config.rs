use std::env;
use std::time::Duration;

use crate::error::AppError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
pub const DEFAULT_SESSION_DB: &str = "sqlite://lms-session.db";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub session_db_url: String,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base_url: impl Into<String>) -> Self {
        Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            session_db_url: DEFAULT_SESSION_DB.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    pub fn new_from_env() -> Result<Self, AppError> {
        let api_base_url = env::var("LMS_API_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_string());
        let session_db_url = env::var("LMS_SESSION_DB")
            .unwrap_or_else(|_| DEFAULT_SESSION_DB.to_string());
        let timeout_secs = match env::var("LMS_HTTP_TIMEOUT_SECS") {
            Ok(raw) => raw.parse::<u64>().map_err(|_| {
                AppError::Config(format!("LMS_HTTP_TIMEOUT_SECS is not a number: {}", raw))
            })?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };

        if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
            return Err(AppError::Config(format!(
                "LMS_API_BASE_URL must be an http(s) URL, got {}",
                api_base_url
            )));
        }

        Ok(Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            session_db_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}
