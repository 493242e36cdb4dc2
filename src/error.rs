//! Error types for the exchange client core.

use thiserror::Error;

/// The main error type for all client operations.
#[derive(Error, Debug)]
pub enum ExchangeError {
    /// HTTP transport failure (connection refused, timeout, TLS, ...)
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error
    #[error("URL parsing error: {0}")]
    Url(#[from] url::ParseError),

    /// JSON serialization error while building a request body
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Response body was not valid JSON
    #[error("unable to decode JSON from response ({url})")]
    Decode {
        /// The raw response body that failed to parse
        body: String,
        /// URL the response came from
        url: String,
    },

    /// HTTP error status, or an error the exchange embedded in a 2xx body
    #[error("{0}")]
    InvalidResponse(ResponseError),

    /// Request signing failed (key material rejected by the HMAC implementation)
    #[error("authentication error: {0}")]
    Auth(String),

    /// A configuration string did not name a known variant
    #[error("parse error: {0}")]
    Parse(String),

    /// Missing required credentials
    #[error("missing credentials: API key and secret are required for signed requests")]
    MissingCredentials,
}

impl ExchangeError {
    /// HTTP status code carried by this error, when there is one.
    ///
    /// Used by the retry policy's give-up predicate: errors without a status
    /// (connection-level failures) are treated as retryable.
    pub fn status(&self) -> Option<u16> {
        match self {
            ExchangeError::InvalidResponse(response) => Some(response.status),
            ExchangeError::Http(error) => error.status().map(|status| status.as_u16()),
            _ => None,
        }
    }
}

/// An error response reported by an exchange.
///
/// Carries everything a caller needs to log or display the failure without
/// re-parsing the raw response: status code, reason phrase, the best-effort
/// message extracted via the configured error keys, and the request URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseError {
    /// HTTP status code (a 2xx here means the error was embedded in the body)
    pub status: u16,
    /// Canonical reason phrase for the status, empty when unknown
    pub reason: String,
    /// Exchange-reported message, when one of the error keys matched
    pub message: Option<String>,
    /// URL of the failed request
    pub url: String,
}

impl std::fmt::Display for ResponseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let message = self.message.as_deref().unwrap_or(&self.reason);
        write!(
            f,
            "invalid response (code {}): {} ({})",
            self.status, message, self.url
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_error_display_with_message() {
        let error = ResponseError {
            status: 422,
            reason: "Unprocessable Entity".to_string(),
            message: Some("insufficient balance".to_string()),
            url: "https://api.example.com/orders".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "invalid response (code 422): insufficient balance (https://api.example.com/orders)"
        );
    }

    #[test]
    fn test_response_error_display_falls_back_to_reason() {
        let error = ResponseError {
            status: 502,
            reason: "Bad Gateway".to_string(),
            message: None,
            url: "https://api.example.com/ticker".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "invalid response (code 502): Bad Gateway (https://api.example.com/ticker)"
        );
    }

    #[test]
    fn test_status_of_invalid_response() {
        let error = ExchangeError::InvalidResponse(ResponseError {
            status: 503,
            reason: String::new(),
            message: None,
            url: String::new(),
        });
        assert_eq!(error.status(), Some(503));
    }

    #[test]
    fn test_status_absent_for_decode_error() {
        let error = ExchangeError::Decode {
            body: "<html></html>".to_string(),
            url: "https://api.example.com".to_string(),
        };
        assert_eq!(error.status(), None);
    }
}
