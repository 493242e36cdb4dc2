//! Response decoding and embedded-error detection.
//!
//! Exchanges disagree on where a human-readable error lives in a response
//! body (`message`, `error`, `errors`, `detail`, ...), and some report
//! failures inside an HTTP 200. The decoder probes a configured, ordered
//! list of error keys and classifies uniformly.

use reqwest::StatusCode;
use serde_json::Value;

use crate::error::{ExchangeError, ResponseError};

/// Decodes JSON response bodies and surfaces exchange-reported errors.
#[derive(Debug, Clone, Default)]
pub struct ResponseDecoder {
    error_keys: Vec<String>,
}

impl ResponseDecoder {
    /// Create a decoder probing the given error keys, in order.
    pub fn new(error_keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            error_keys: error_keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode a response body into its JSON payload.
    ///
    /// - An error status yields [`ExchangeError::InvalidResponse`], with the
    ///   exchange message extracted best-effort (a non-JSON error page still
    ///   classifies by status).
    /// - A success status with a non-JSON body yields
    ///   [`ExchangeError::Decode`] carrying the raw body.
    /// - A success status with a non-null error key in the body is treated
    ///   like an HTTP-level failure.
    /// - Otherwise the parsed payload is returned unchanged.
    pub fn decode(
        &self,
        status: StatusCode,
        url: &str,
        body: &str,
    ) -> Result<Value, ExchangeError> {
        if status.is_client_error() || status.is_server_error() {
            let message = serde_json::from_str::<Value>(body)
                .ok()
                .and_then(|parsed| self.error_message(&parsed));
            return Err(ExchangeError::InvalidResponse(self.response_error(
                status, url, message,
            )));
        }

        let parsed: Value = serde_json::from_str(body).map_err(|_| ExchangeError::Decode {
            body: body.to_string(),
            url: url.to_string(),
        })?;

        if let Some(message) = self.error_message(&parsed) {
            return Err(ExchangeError::InvalidResponse(self.response_error(
                status,
                url,
                Some(message),
            )));
        }

        Ok(parsed)
    }

    /// Probe the configured error keys against a parsed body; the first
    /// present, non-empty one wins.
    pub fn error_message(&self, body: &Value) -> Option<String> {
        let map = body.as_object()?;
        for key in &self.error_keys {
            if let Some(rendered) = map.get(key).and_then(render_message) {
                return Some(rendered);
            }
        }
        None
    }

    fn response_error(
        &self,
        status: StatusCode,
        url: &str,
        message: Option<String>,
    ) -> ResponseError {
        ResponseError {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            message,
            url: url.to_string(),
        }
    }
}

/// Render an error value as a display string: strings verbatim, arrays
/// joined, anything else as compact JSON. Null and empty values count as
/// "no error". Trailing periods are trimmed.
fn render_message(value: &Value) -> Option<String> {
    let rendered = match value {
        Value::Null => return None,
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(render_message)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Object(map) if map.is_empty() => return None,
        other => other.to_string(),
    };
    let trimmed = rendered.trim_end_matches('.').trim().to_string();
    if trimmed.is_empty() { None } else { Some(trimmed) }
}
