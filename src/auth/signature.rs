//! Request-signing strategies.
//!
//! Exchanges authenticate requests in one of two shapes:
//!
//! - a bare API key passed as a query parameter ([`ApiKeyAuth`]), or
//! - an HMAC over a canonical message derived from the request
//!   ([`HmacAuth`]), injected as a trio of headers.
//!
//! The canonical message layout varies per exchange only in component
//! order, delimiter, digest algorithm and body encoding, so all of that is
//! injected configuration ([`HmacConfig`]) rather than subclassed behavior.

use std::str::FromStr;

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha384, Sha512};

use crate::auth::Credentials;
use crate::error::ExchangeError;
use crate::request::SignableRequest;

type HmacSha256 = Hmac<Sha256>;
type HmacSha384 = Hmac<Sha384>;
type HmacSha512 = Hmac<Sha512>;

/// Digest algorithm used by [`HmacAuth`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256
    #[default]
    Sha256,
    /// HMAC-SHA384
    Sha384,
    /// HMAC-SHA512
    Sha512,
}

impl FromStr for SignatureAlgorithm {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sha256" => Ok(SignatureAlgorithm::Sha256),
            "sha384" => Ok(SignatureAlgorithm::Sha384),
            "sha512" => Ok(SignatureAlgorithm::Sha512),
            _ => Err(ExchangeError::Parse(format!(
                "unsupported signature algorithm: {s}"
            ))),
        }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SignatureAlgorithm::Sha256 => "sha256",
            SignatureAlgorithm::Sha384 => "sha384",
            SignatureAlgorithm::Sha512 => "sha512",
        };
        write!(f, "{s}")
    }
}

/// Header names injected by [`HmacAuth`].
#[derive(Debug, Clone)]
pub struct AuthHeaders {
    /// Header carrying the raw API key
    pub api_key: String,
    /// Header carrying the nonce as a decimal string
    pub nonce: String,
    /// Header carrying the hex-encoded HMAC digest
    pub signature: String,
}

impl AuthHeaders {
    /// Build a header-name trio.
    pub fn new(
        api_key: impl Into<String>,
        nonce: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            nonce: nonce.into(),
            signature: signature.into(),
        }
    }
}

impl Default for AuthHeaders {
    fn default() -> Self {
        Self::new("x-auth-key", "x-auth-nonce", "x-auth-signature")
    }
}

/// How the request body is embedded in the canonical message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyEncoding {
    /// The serialized JSON body verbatim
    #[default]
    Raw,
    /// The serialized JSON body, base64-encoded
    Base64,
}

/// One component of the canonical message, in signing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageComponent {
    /// The HTTP method, uppercase
    Method,
    /// The nonce as a decimal string
    Nonce,
    /// Path plus canonical query string
    Route,
    /// The body per [`BodyEncoding`]; skipped when the request has none
    Body,
}

/// Canonical-message and header configuration for [`HmacAuth`].
///
/// The default matches the common convention (method, nonce, route, body
/// joined by newlines, HMAC-SHA256, `x-auth-*` headers); per-exchange
/// variants override the pieces that differ.
#[derive(Debug, Clone)]
pub struct HmacConfig {
    /// Digest algorithm
    pub algorithm: SignatureAlgorithm,
    /// String joining the message components
    pub delimiter: String,
    /// Names of the three injected headers
    pub headers: AuthHeaders,
    /// Body embedding in the canonical message
    pub body_encoding: BodyEncoding,
    /// Message components in signing order
    pub components: Vec<MessageComponent>,
}

impl Default for HmacConfig {
    fn default() -> Self {
        Self {
            algorithm: SignatureAlgorithm::Sha256,
            delimiter: "\n".to_string(),
            headers: AuthHeaders::default(),
            body_encoding: BodyEncoding::Raw,
            components: vec![
                MessageComponent::Method,
                MessageComponent::Nonce,
                MessageComponent::Route,
                MessageComponent::Body,
            ],
        }
    }
}

impl HmacConfig {
    /// Start from the default convention.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the digest algorithm.
    pub fn algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the component delimiter.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// Set the injected header names.
    pub fn headers(mut self, headers: AuthHeaders) -> Self {
        self.headers = headers;
        self
    }

    /// Set the body embedding.
    pub fn body_encoding(mut self, encoding: BodyEncoding) -> Self {
        self.body_encoding = encoding;
        self
    }

    /// Set the message component order.
    pub fn components(mut self, components: impl Into<Vec<MessageComponent>>) -> Self {
        self.components = components.into();
        self
    }
}

/// Attaches authentication to an outgoing request.
///
/// Strategies are constructed once per client (holding credentials where
/// needed) and borrow the request only for the duration of signing. The
/// client passes a fresh nonce per attempt; stateless strategies ignore it.
pub trait SignatureStrategy: Send + Sync {
    /// Inject authentication into the request using the supplied nonce.
    fn authorize(&self, request: &mut SignableRequest, nonce: u64) -> Result<(), ExchangeError>;
}

/// API-key-as-query-parameter authentication. No signature, no nonce.
pub struct ApiKeyAuth {
    api_key: String,
    param: String,
}

impl ApiKeyAuth {
    /// Authenticate with the key under the default `api_key` parameter.
    pub fn new(api_key: impl Into<String>) -> Result<Self, ExchangeError> {
        Self::with_param(api_key, "api_key")
    }

    /// Authenticate with the key under a custom parameter name
    /// (e.g. `app_id` for OXR).
    pub fn with_param(
        api_key: impl Into<String>,
        param: impl Into<String>,
    ) -> Result<Self, ExchangeError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(ExchangeError::MissingCredentials);
        }
        Ok(Self {
            api_key,
            param: param.into(),
        })
    }
}

impl SignatureStrategy for ApiKeyAuth {
    fn authorize(&self, request: &mut SignableRequest, _nonce: u64) -> Result<(), ExchangeError> {
        request.append_query(&self.param, &self.api_key);
        Ok(())
    }
}

/// HMAC request signing over a configurable canonical message.
pub struct HmacAuth {
    credentials: Credentials,
    config: HmacConfig,
}

impl HmacAuth {
    /// Sign with the default message convention.
    pub fn new(credentials: Credentials) -> Self {
        Self::with_config(credentials, HmacConfig::default())
    }

    /// Sign with an exchange-specific message convention.
    pub fn with_config(credentials: Credentials, config: HmacConfig) -> Self {
        Self {
            credentials,
            config,
        }
    }

    /// Build the canonical message for a request and nonce.
    ///
    /// Deterministic: the same request, nonce and configuration always
    /// produce the same message, and the message covers the exact bytes
    /// that go on the wire (route and body are used verbatim).
    pub fn build_message(&self, request: &SignableRequest, nonce: u64) -> String {
        let mut parts: Vec<String> = Vec::with_capacity(self.config.components.len());
        for component in &self.config.components {
            match component {
                MessageComponent::Method => parts.push(request.method.as_str().to_string()),
                MessageComponent::Nonce => parts.push(nonce.to_string()),
                MessageComponent::Route => parts.push(request.route()),
                MessageComponent::Body => {
                    if let Some(body) = &request.body {
                        parts.push(match self.config.body_encoding {
                            BodyEncoding::Raw => body.clone(),
                            BodyEncoding::Base64 => BASE64.encode(body.as_bytes()),
                        });
                    }
                }
            }
        }
        parts.join(&self.config.delimiter)
    }

    /// HMAC the message with the configured algorithm; hex-encoded digest.
    pub fn sign(&self, message: &str) -> Result<String, ExchangeError> {
        let key = self.credentials.expose_secret().as_bytes();
        let digest = match self.config.algorithm {
            SignatureAlgorithm::Sha256 => {
                let mut mac = HmacSha256::new_from_slice(key)
                    .map_err(|e| ExchangeError::Auth(format!("invalid HMAC key: {e}")))?;
                mac.update(message.as_bytes());
                hex::encode(mac.finalize().into_bytes())
            }
            SignatureAlgorithm::Sha384 => {
                let mut mac = HmacSha384::new_from_slice(key)
                    .map_err(|e| ExchangeError::Auth(format!("invalid HMAC key: {e}")))?;
                mac.update(message.as_bytes());
                hex::encode(mac.finalize().into_bytes())
            }
            SignatureAlgorithm::Sha512 => {
                let mut mac = HmacSha512::new_from_slice(key)
                    .map_err(|e| ExchangeError::Auth(format!("invalid HMAC key: {e}")))?;
                mac.update(message.as_bytes());
                hex::encode(mac.finalize().into_bytes())
            }
        };
        Ok(digest)
    }
}

impl SignatureStrategy for HmacAuth {
    fn authorize(&self, request: &mut SignableRequest, nonce: u64) -> Result<(), ExchangeError> {
        let message = self.build_message(request, nonce);
        let signature = self.sign(&message)?;

        let headers = &self.config.headers;
        request.put_header(&headers.api_key, self.credentials.api_key.clone());
        request.put_header(&headers.nonce, nonce.to_string());
        request.put_header(&headers.signature, signature);
        Ok(())
    }
}
