//! Client configuration.

use std::time::Duration;

use crate::request::ListEncoding;
use crate::retry::RetryPolicy;

/// Immutable configuration consumed by [`RestClient`](crate::RestClient).
///
/// Built once and handed to the client; nothing here is mutated after
/// construction.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint is joined against. A trailing slash matters:
    /// `https://api.example.com/v2/` + `ticker` resolves under `/v2/`.
    pub base_url: String,
    /// Per-request transport timeout; expiry surfaces as a retryable
    /// network error.
    pub timeout: Duration,
    /// Minimum interval between consecutive requests; zero disables pacing.
    pub rate_limit: Duration,
    /// Ordered JSON field names probed for embedded error messages.
    pub error_keys: Vec<String>,
    /// Wire encoding for list-valued query parameters.
    pub list_encoding: ListEncoding,
    /// Retry and backoff policy.
    pub retry: RetryPolicy,
    /// User-Agent header; defaults to `<package>/<version>` when unset.
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Defaults for the given base URL: 30 s timeout, no rate limiting, no
    /// error keys, repeated list parameters, default retry policy.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            rate_limit: Duration::ZERO,
            error_keys: Vec::new(),
            list_encoding: ListEncoding::default(),
            retry: RetryPolicy::default(),
            user_agent: None,
        }
    }
}
