//! The REST client façade.
//!
//! Composes the rate limiter, signature strategy, retry policy and response
//! decoder over a [`reqwest::Client`]. Inside the retry loop, one attempt
//! throttles, signs with a fresh nonce, sends, transparently re-auths a
//! bounded number of times on 401, and decodes the response.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{IncreasingNonce, NonceProvider, SignatureStrategy};
use crate::config::ClientConfig;
use crate::error::ExchangeError;
use crate::rate_limit::FixedIntervalLimiter;
use crate::request::{ListEncoding, Query, SignableRequest, clean_empty};
use crate::response::ResponseDecoder;
use crate::retry::{RetryPolicy, RetryState};

/// Re-authentications permitted after a 401 within one logical call.
const MAX_REAUTH: u32 = 2;

/// An authenticated exchange REST client.
///
/// The client exclusively owns its nonce source and rate-limiter state;
/// both are internally synchronized, so one client may be shared across
/// tasks behind an [`Arc`] without breaking the nonce-monotonicity or
/// request-spacing invariants. Distinct clients never share state.
///
/// # Example
///
/// ```rust,no_run
/// use exchange_api_client::RestClient;
/// use exchange_api_client::request::Query;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = RestClient::builder("https://api.exchange.com/v2/").build()?;
///     let ticker = client
///         .get_with("ticker", Query::new().with("market", "btc-usd"))
///         .await?;
///     println!("{ticker}");
///     Ok(())
/// }
/// ```
///
/// For signed endpoints, inject a strategy:
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use exchange_api_client::RestClient;
/// use exchange_api_client::auth::{Credentials, HmacAuth};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Credentials::new("api_key", "api_secret")?;
/// let client = RestClient::builder("https://api.exchange.com/v2/")
///     .auth(Arc::new(HmacAuth::new(credentials)))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct RestClient {
    http: reqwest::Client,
    base_url: Url,
    config: ClientConfig,
    decoder: ResponseDecoder,
    limiter: FixedIntervalLimiter,
    auth: Option<Arc<dyn SignatureStrategy>>,
    nonce: Arc<dyn NonceProvider>,
}

impl RestClient {
    /// Create a builder for the given base URL.
    pub fn builder(base_url: impl Into<String>) -> RestClientBuilder {
        RestClientBuilder::new(base_url)
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// GET an endpoint with no query parameters.
    pub async fn get(&self, endpoint: &str) -> Result<Value, ExchangeError> {
        self.request(Method::GET, endpoint, Query::new(), None).await
    }

    /// GET an endpoint with query parameters.
    pub async fn get_with(&self, endpoint: &str, query: Query) -> Result<Value, ExchangeError> {
        self.request(Method::GET, endpoint, query, None).await
    }

    /// POST a JSON body to an endpoint.
    pub async fn post<T: Serialize>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Value, ExchangeError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::POST, endpoint, Query::new(), Some(body))
            .await
    }

    /// PUT a JSON body to an endpoint.
    pub async fn put<T: Serialize>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Value, ExchangeError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PUT, endpoint, Query::new(), Some(body))
            .await
    }

    /// PATCH a JSON body to an endpoint.
    pub async fn patch<T: Serialize>(
        &self,
        endpoint: &str,
        body: &T,
    ) -> Result<Value, ExchangeError> {
        let body = serde_json::to_value(body)?;
        self.request(Method::PATCH, endpoint, Query::new(), Some(body))
            .await
    }

    /// DELETE an endpoint.
    pub async fn delete(&self, endpoint: &str) -> Result<Value, ExchangeError> {
        self.request(Method::DELETE, endpoint, Query::new(), None)
            .await
    }

    /// Dispatch one logical call and return the decoded JSON payload.
    ///
    /// `null` values are pruned from the body before serialization; the
    /// query string is canonicalized before signing so the signature covers
    /// the exact wire bytes.
    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        query: Query,
        body: Option<Value>,
    ) -> Result<Value, ExchangeError> {
        let request = self.build_request(method, endpoint, query, body)?;
        self.execute(request).await
    }

    fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        query: Query,
        body: Option<Value>,
    ) -> Result<SignableRequest, ExchangeError> {
        let resolved = self.base_url.join(endpoint)?;
        let mut request = SignableRequest::new(method, resolved.path());
        request.query_string = query.encode(self.config.list_encoding);
        request.body = match body.and_then(clean_empty) {
            Some(value) => Some(serde_json::to_string(&value)?),
            None => None,
        };
        Ok(request)
    }

    async fn execute(&self, request: SignableRequest) -> Result<Value, ExchangeError> {
        let policy = &self.config.retry;
        let mut state = RetryState::new();
        let mut reauths_left = MAX_REAUTH;

        loop {
            state.next_attempt();
            match self.attempt(&request, &mut reauths_left).await {
                Ok(payload) => return Ok(payload),
                Err(error) => {
                    if policy.give_up(&error) || !state.can_retry(policy) {
                        return Err(error);
                    }
                    let delay = state.backoff(policy);
                    warn!(
                        attempt = state.attempt(),
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "request failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    /// One attempt: throttle, sign with a fresh nonce, send, and decode.
    /// A 401 triggers a bounded transparent re-auth with a strictly greater
    /// nonce before the response is classified.
    async fn attempt(
        &self,
        base: &SignableRequest,
        reauths_left: &mut u32,
    ) -> Result<Value, ExchangeError> {
        self.limiter.throttle().await;

        let mut nonce = self.nonce.next_nonce();
        let mut response = self.send_signed(base, nonce).await?;

        while response.status() == StatusCode::UNAUTHORIZED
            && self.auth.is_some()
            && *reauths_left > 0
        {
            *reauths_left -= 1;
            let stale = nonce;
            nonce = self.nonce.nonce_at_least(stale.saturating_add(1));
            warn!(stale_nonce = stale, nonce, "got 401, re-signing with a new nonce");
            response = self.send_signed(base, nonce).await?;
        }

        let status = response.status();
        let url = response.url().to_string();
        let body = response.text().await?;
        self.decoder.decode(status, &url, &body)
    }

    /// Re-sign a clone of the base request so stale auth never leaks into a
    /// resend, then dispatch it.
    async fn send_signed(
        &self,
        base: &SignableRequest,
        nonce: u64,
    ) -> Result<reqwest::Response, ExchangeError> {
        let mut request = base.clone();
        if let Some(auth) = &self.auth {
            auth.authorize(&mut request, nonce)?;
        }

        let mut url = self.base_url.clone();
        url.set_path(&request.path);
        url.set_query((!request.query_string.is_empty()).then_some(request.query_string.as_str()));

        debug!(method = %request.method, %url, "dispatching request");
        let mut builder = self.http.request(request.method.clone(), url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header(CONTENT_TYPE, "application/json")
                .body(body);
        }
        Ok(builder.send().await?)
    }
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &self.auth.is_some())
            .finish()
    }
}

/// Builder for [`RestClient`].
pub struct RestClientBuilder {
    config: ClientConfig,
    auth: Option<Arc<dyn SignatureStrategy>>,
    nonce: Option<Arc<dyn NonceProvider>>,
}

impl RestClientBuilder {
    /// Start from defaults for the given base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            config: ClientConfig::new(base_url),
            auth: None,
            nonce: None,
        }
    }

    /// Replace the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the per-request transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the minimum interval between consecutive requests.
    pub fn rate_limit(mut self, interval: Duration) -> Self {
        self.config.rate_limit = interval;
        self
    }

    /// Set the ordered error keys probed in response bodies.
    pub fn error_keys(
        mut self,
        keys: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.config.error_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Set the wire encoding for list-valued query parameters.
    pub fn list_encoding(mut self, encoding: ListEncoding) -> Self {
        self.config.list_encoding = encoding;
        self
    }

    /// Set the retry and backoff policy.
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = Some(user_agent.into());
        self
    }

    /// Set the signature strategy for authenticated requests.
    pub fn auth(mut self, strategy: Arc<dyn SignatureStrategy>) -> Self {
        self.auth = Some(strategy);
        self
    }

    /// Set a custom nonce provider.
    pub fn nonce_provider(mut self, provider: Arc<dyn NonceProvider>) -> Self {
        self.nonce = Some(provider);
        self
    }

    /// Build the client.
    ///
    /// # Errors
    ///
    /// Fails when the base URL does not parse or the transport cannot be
    /// constructed.
    pub fn build(self) -> Result<RestClient, ExchangeError> {
        let base_url = Url::parse(&self.config.base_url)?;

        let user_agent = self
            .config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")));
        let mut headers = HeaderMap::new();
        let header_value = HeaderValue::from_str(&user_agent)
            .unwrap_or_else(|_| HeaderValue::from_static(env!("CARGO_PKG_NAME")));
        headers.insert(USER_AGENT, header_value);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(self.config.timeout)
            .build()?;

        let nonce = self
            .nonce
            .unwrap_or_else(|| Arc::new(IncreasingNonce::new()));

        Ok(RestClient {
            http,
            base_url,
            decoder: ResponseDecoder::new(self.config.error_keys.clone()),
            limiter: FixedIntervalLimiter::new(self.config.rate_limit),
            auth: self.auth,
            nonce,
            config: self.config,
        })
    }
}
