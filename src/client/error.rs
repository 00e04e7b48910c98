use reqwest::StatusCode;
use thiserror::Error;

/// Every failure the client surfaces.
///
/// `Clone` so that one refresh failure can be handed to every queued caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error("{message}")]
    Http { status: StatusCode, message: String },
    #[error("{message}")]
    Network { message: String },
    #[error("Session expired: {reason}")]
    SessionExpired { reason: String },
    #[error("Token storage failed: {message}")]
    Storage { message: String },
    #[error("Unexpected response: {message}")]
    Decode { message: String },
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl ClientError {
    pub(crate) fn session_expired(reason: impl Into<String>) -> Self {
        Self::SessionExpired { reason: reason.into() }
    }

    /// The HTTP status associated with the failure, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            Self::SessionExpired { .. } => Some(StatusCode::UNAUTHORIZED),
            Self::Network { .. } | Self::Storage { .. } | Self::Decode { .. } => None,
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Http { message, .. }
            | Self::Network { message }
            | Self::Storage { message }
            | Self::Decode { message } => message,
            Self::SessionExpired { reason } => reason,
        }
    }

    /// True when the stored session is gone and the user must sign in again.
    #[must_use]
    pub const fn should_logout(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Builds an `Http` error from a non-success response, preferring the
    /// server's `error` or `message` body field over the canonical reason.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        Self::Http { status, message: error_message(status, &body) }
    }
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["error", "message"].iter().find_map(|field| v.get(field).and_then(|m| m.as_str()).map(str::to_string))
        })
        .filter(|m| !m.is_empty())
        .or_else(|| status.canonical_reason().map(str::to_string))
        .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()))
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return Self::Decode { message: err.to_string() };
        }
        let message = if err.is_timeout() {
            "Request timed out. Check your connection and try again.".to_string()
        } else if err.is_connect() {
            "Unable to reach the server. Check your connection and try again.".to_string()
        } else {
            format!("Network error: {err}")
        };
        Self::Network { message }
    }
}

impl From<std::io::Error> for ClientError {
    fn from(err: std::io::Error) -> Self {
        Self::Storage { message: err.to_string() }
    }
}
