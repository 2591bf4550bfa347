use reqwest::StatusCode;
use serde_json::Value;
use std::fmt;

/// Non-2xx response from the backend. Recover it from an `anyhow::Error` with `downcast_ref`.
#[derive(Debug, Clone)]
pub struct BackendError {
    pub endpoint: &'static str,
    pub status: StatusCode,
    pub message: String,
    pub raw_body: Option<Value>,
}

impl BackendError {
    pub(crate) fn from_body(endpoint: &'static str, status: StatusCode, text: &str) -> Self {
        let raw_body = serde_json::from_str::<Value>(text).ok();
        let message = raw_body
            .as_ref()
            .and_then(|v| v.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| text.trim().to_string());

        Self {
            endpoint,
            status,
            message,
            raw_body,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "backend error (endpoint={}, status={}): {}",
            self.endpoint, self.status, self.message
        )
    }
}

impl std::error::Error for BackendError {}
