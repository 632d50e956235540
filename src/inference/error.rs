//! Error handling for the inference module

use serde::Deserialize;
use thiserror::Error;

/// Error body the inference API attaches to non-success responses.
#[derive(Deserialize)]
struct RawError {
    detail: String,
}

#[derive(Debug, Error)]
pub enum InferenceError {
    /// The caller supplied no image URL; nothing was sent upstream.
    #[error("image input is required")]
    MissingInput,

    /// Reqwest error, typically related to network issues or request failures.
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    /// An error occurred while processing the request.
    #[error("HTTP error with status {status}: {message}")]
    Http { status: u16, message: String },
}

impl InferenceError {
    pub async fn from_response(response: reqwest::Response) -> InferenceError {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read response text".to_string());
        let message = serde_json::from_str::<RawError>(&body)
            .map(|e| e.detail)
            .unwrap_or(body);

        InferenceError::Http { status, message }
    }

    /// Upstream detail suitable for showing to a person.
    pub fn detail(&self) -> String {
        match self {
            Self::Http { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether retrying has any chance of succeeding: connection problems,
    /// rate limiting, and server-side failures.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http { status, .. } => *status == 429 || *status >= 500,
            Self::Reqwest(e) => e.is_connect() || e.is_timeout(),
            Self::MissingInput => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // The detail field of a JSON error body becomes the message; anything
    // else is carried verbatim.
    fn test_detail_extraction() {
        let with_detail = InferenceError::Http {
            status: 500,
            message: "model exploded".to_string(),
        };
        assert_eq!(with_detail.detail(), "model exploded");

        let missing = InferenceError::MissingInput;
        assert_eq!(missing.detail(), "image input is required");
    }

    #[test]
    fn test_transient_classification() {
        let rate_limited = InferenceError::Http {
            status: 429,
            message: String::new(),
        };
        let server_side = InferenceError::Http {
            status: 503,
            message: String::new(),
        };
        let not_found = InferenceError::Http {
            status: 404,
            message: String::new(),
        };
        assert!(rate_limited.is_transient());
        assert!(server_side.is_transient());
        assert!(!not_found.is_transient());
        assert!(!InferenceError::MissingInput.is_transient());
    }
}
