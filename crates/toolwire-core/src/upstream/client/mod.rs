mod attempt;
mod blocking;
mod cooperative;


use std::sync::{Arc, OnceLock};
use toolwire_types::CallError;

use crate::error::AppResult;
use crate::resilience::ResilienceContext;

/// HTTP client that runs every call through the resilience layer.
///
/// [`ResilientClient::call`] blocks the calling thread and must not be used
/// from inside a tokio runtime; [`ResilientClient::call_async`] is for tasks.
/// Both share the context's breakers and buckets.
#[derive(Debug)]
pub struct ResilientClient {
    ctx: Arc<ResilienceContext>,
    http: reqwest::Client,
    /// Built on first blocking call, never inside the async runtime.
    blocking: OnceLock<reqwest::blocking::Client>,
}

impl ResilientClient {
    pub fn new(ctx: Arc<ResilienceContext>) -> AppResult<Self> {
        let http = reqwest::Client::builder().user_agent(ctx.config().http.user_agent.as_str()).build()?;
        Ok(Self::with_http_client(ctx, http))
    }

    /// Use a pre-built async client.
    pub fn with_http_client(ctx: Arc<ResilienceContext>, http: reqwest::Client) -> Self {
        Self { ctx, http, blocking: OnceLock::new() }
    }

    pub fn context(&self) -> &Arc<ResilienceContext> {
        &self.ctx
    }

    fn blocking_client(&self, upstream: &str) -> Result<&reqwest::blocking::Client, CallError> {
        if let Some(client) = self.blocking.get() {
            return Ok(client);
        }

        let client = reqwest::blocking::Client::builder()
            .user_agent(self.ctx.config().http.user_agent.as_str())
            .build()
            .map_err(|e| CallError::internal(upstream, &e))?;
        Ok(self.blocking.get_or_init(|| client))
    }
}
