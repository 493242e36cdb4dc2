//! # Exchange API Client
//!
//! The shared core behind per-exchange REST wrappers: request dispatch,
//! pluggable request signing, retry with exponential backoff, fixed-interval
//! rate limiting, nonce management, and uniform error classification over
//! the JSON error conventions exchanges actually use.
//!
//! Per-exchange endpoint tables and response-to-model mapping live in the
//! wrapper layers built on top of this crate; this crate returns decoded
//! JSON payloads and classified errors.
//!
//! ## Features
//!
//! - Pluggable signing strategies: API-key query parameter or HMAC headers
//!   (SHA-256/384/512, configurable message layout and header names)
//! - Strictly monotonic nonces with transparent, bounded re-auth on 401
//! - Exponential-backoff retries gated by a configurable status-code set
//! - Fixed-interval request pacing
//! - Ordered error-key probing over heterogeneous error bodies
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use exchange_api_client::RestClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RestClient::builder("https://api.exchange.com/v2/")
//!         .error_keys(["message", "error"])
//!         .build()?;
//!     let markets = client.get("markets").await?;
//!     println!("{markets}");
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod rate_limit;
pub mod request;
pub mod response;
pub mod retry;

// Re-export commonly used types at crate root
pub use client::{RestClient, RestClientBuilder};
pub use config::ClientConfig;
pub use error::ExchangeError;

/// Result type alias using ExchangeError
pub type Result<T> = std::result::Result<T, ExchangeError>;
