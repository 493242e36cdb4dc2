//! Authentication: credentials, nonces and request-signing strategies.
//!
//! This module provides:
//! - Credential management with secure secret storage
//! - Strictly monotonic nonce generation
//! - Pluggable request-signing strategies (API-key parameter, HMAC headers)

mod credentials;
mod nonce;
mod signature;

pub use credentials::Credentials;
pub use nonce::{IncreasingNonce, NonceProvider};
pub use signature::{
    ApiKeyAuth, AuthHeaders, BodyEncoding, HmacAuth, HmacConfig, MessageComponent,
    SignatureAlgorithm, SignatureStrategy,
};
