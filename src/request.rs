//! Request model and query-string handling.
//!
//! A [`SignableRequest`] holds the exact method, route and body bytes a
//! signature must cover; the query string is canonicalized (pruned, sorted,
//! percent-encoded) once and reused verbatim for both signing and
//! transmission.

use std::str::FromStr;

use reqwest::Method;
use serde_json::Value;
use url::form_urlencoded;

use crate::error::ExchangeError;

/// How list-valued query parameters are written on the wire.
///
/// Exchanges disagree on this, so it is an explicit per-client setting
/// rather than something inferred from the value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListEncoding {
    /// `key=v1&key=v2`
    #[default]
    Repeat,
    /// `key[]=v1&key[]=v2`
    Brackets,
    /// `key=v1,v2`
    CommaSeparated,
}

impl FromStr for ListEncoding {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "repeat" => Ok(ListEncoding::Repeat),
            "brackets" => Ok(ListEncoding::Brackets),
            "comma" | "comma_separated" => Ok(ListEncoding::CommaSeparated),
            _ => Err(ExchangeError::Parse(format!(
                "unsupported list encoding: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
enum QueryValue {
    Single(String),
    List(Vec<String>),
}

/// An ordered set of query parameters.
///
/// `None` values are pruned at insertion via [`Query::with_opt`], matching
/// the wrappers' convention of dropping unset optional parameters instead
/// of sending empty ones.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pairs: Vec<(String, QueryValue)>,
}

impl Query {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single-valued parameter.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.pairs
            .push((key.into(), QueryValue::Single(value.to_string())));
        self
    }

    /// Append a single-valued parameter when it is set.
    pub fn with_opt(self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Append a list-valued parameter; its wire form is decided by the
    /// client's [`ListEncoding`] at encode time.
    pub fn with_list(
        mut self,
        key: impl Into<String>,
        values: impl IntoIterator<Item = impl ToString>,
    ) -> Self {
        let values = values.into_iter().map(|v| v.to_string()).collect();
        self.pairs.push((key.into(), QueryValue::List(values)));
        self
    }

    /// Whether no parameters have been added.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Encode to a canonical query string: keys sorted alphabetically
    /// (stable, so repeated keys keep their insertion order), values
    /// percent-encoded.
    ///
    /// The canonical form is what gets signed AND transmitted, so signatures
    /// cover the exact wire bytes.
    pub fn encode(&self, lists: ListEncoding) -> String {
        let mut pairs: Vec<(String, String)> = Vec::with_capacity(self.pairs.len());
        for (key, value) in &self.pairs {
            match value {
                QueryValue::Single(v) => pairs.push((key.clone(), v.clone())),
                QueryValue::List(items) => match lists {
                    ListEncoding::Repeat => {
                        pairs.extend(items.iter().map(|v| (key.clone(), v.clone())));
                    }
                    ListEncoding::Brackets => {
                        pairs.extend(items.iter().map(|v| (format!("{key}[]"), v.clone())));
                    }
                    ListEncoding::CommaSeparated => {
                        pairs.push((key.clone(), items.join(",")));
                    }
                },
            }
        }
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (key, value) in &pairs {
            serializer.append_pair(key, value);
        }
        serializer.finish()
    }
}

/// A request in the exact form its signature must cover.
///
/// Built once per logical call; re-signing after a 401 clones the base
/// request so stale auth headers never leak into the resend.
#[derive(Debug, Clone)]
pub struct SignableRequest {
    /// HTTP method
    pub method: Method,
    /// URL path, resolved against the client's base URL
    pub path: String,
    /// Canonical query string, already percent-encoded; empty when absent
    pub query_string: String,
    /// Headers to send, case-sensitive names in insertion order
    pub headers: Vec<(String, String)>,
    /// JSON body, serialized once and reused for signing and transmission
    pub body: Option<String>,
}

impl SignableRequest {
    /// Create a request with no query string, headers or body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query_string: String::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// The route a signature covers: path plus canonical query string.
    pub fn route(&self) -> String {
        if self.query_string.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query_string)
        }
    }

    /// Append one percent-encoded query parameter to the canonical string.
    pub fn append_query(&mut self, key: &str, value: &str) {
        let pair = form_urlencoded::Serializer::new(String::new())
            .append_pair(key, value)
            .finish();
        if self.query_string.is_empty() {
            self.query_string = pair;
        } else {
            self.query_string.push('&');
            self.query_string.push_str(&pair);
        }
    }

    /// Set a header, replacing any previous value under the same name.
    pub fn put_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self.headers.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.headers.push((name.to_string(), value));
        }
    }
}

/// Recursively prune `null` values, and containers emptied by the pruning,
/// from a JSON body before serialization.
///
/// Unset optional fields arrive as `null` and exchanges reject them; `0`,
/// `false` and empty strings are meaningful payloads and are kept.
pub fn clean_empty(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::Object(map) => {
            let cleaned: serde_json::Map<String, Value> = map
                .into_iter()
                .filter_map(|(key, value)| clean_empty(value).map(|value| (key, value)))
                .collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Object(cleaned))
            }
        }
        Value::Array(items) => {
            let cleaned: Vec<Value> = items.into_iter().filter_map(clean_empty).collect();
            if cleaned.is_empty() {
                None
            } else {
                Some(Value::Array(cleaned))
            }
        }
        other => Some(other),
    }
}
