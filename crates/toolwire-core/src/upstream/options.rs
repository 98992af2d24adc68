use reqwest::Method;
use serde_json::Value;
use std::time::Duration;

/// Everything needed to make one logical outbound call.
///
/// Retry fields left as `None` fall back to the context's `RetryConfig`.
#[derive(Debug, Clone)]
pub struct CallOptions {
    pub method: Method,
    pub url: String,
    /// Logical upstream name; derived from the URL host when absent
    pub upstream: Option<String>,
    /// Per-attempt timeout; the configured HTTP timeout when absent
    pub timeout: Option<Duration>,
    pub headers: Vec<(String, String)>,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
    /// Defaults to true for idempotent methods
    pub allow_retries: bool,
    pub max_retries: Option<u32>,
    pub retry_on_4xx: Option<bool>,
    pub retry_on_5xx: Option<bool>,
    pub retry_on_network: Option<bool>,
    pub backoff_base: Option<Duration>,
    pub backoff_max: Option<Duration>,
    pub backoff_multiplier: Option<f64>,
    /// Named bucket each attempt draws one permit from
    pub rate_limit_key: Option<String>,
    /// Reject with RATE_LIMITED instead of waiting for the bucket
    pub rate_limit_fail_fast: bool,
    /// Bound on the whole call, retries and backoff included
    pub deadline: Option<Duration>,
}

impl CallOptions {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let allow_retries = is_idempotent(&method);
        Self {
            method,
            url: url.into(),
            upstream: None,
            timeout: None,
            headers: Vec::new(),
            params: Vec::new(),
            body: None,
            allow_retries,
            max_retries: None,
            retry_on_4xx: None,
            retry_on_5xx: None,
            retry_on_network: None,
            backoff_base: None,
            backoff_max: None,
            backoff_multiplier: None,
            rate_limit_key: None,
            rate_limit_fail_fast: false,
            deadline: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    #[must_use]
    pub fn upstream(mut self, name: impl Into<String>) -> Self {
        self.upstream = Some(name.into());
        self
    }

    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn allow_retries(mut self, allow: bool) -> Self {
        self.allow_retries = allow;
        self
    }

    #[must_use]
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    #[must_use]
    pub fn retry_on_4xx(mut self, retry: bool) -> Self {
        self.retry_on_4xx = Some(retry);
        self
    }

    #[must_use]
    pub fn retry_on_5xx(mut self, retry: bool) -> Self {
        self.retry_on_5xx = Some(retry);
        self
    }

    #[must_use]
    pub fn retry_on_network(mut self, retry: bool) -> Self {
        self.retry_on_network = Some(retry);
        self
    }

    #[must_use]
    pub fn backoff(mut self, base: Duration, max: Duration, multiplier: f64) -> Self {
        self.backoff_base = Some(base);
        self.backoff_max = Some(max);
        self.backoff_multiplier = Some(multiplier);
        self
    }

    #[must_use]
    pub fn rate_limit(mut self, key: impl Into<String>, fail_fast: bool) -> Self {
        self.rate_limit_key = Some(key.into());
        self.rate_limit_fail_fast = fail_fast;
        self
    }

    #[must_use]
    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// Methods that are safe to repeat.
pub fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE | Method::TRACE
    )
}
