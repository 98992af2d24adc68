//! Cooperative mode: network I/O and backoff are awaited, so the runtime is
//! never stalled. Breaker and bucket locks are only taken for bookkeeping.

use std::time::Duration;
use toolwire_types::CallError;
use tracing::Instrument;

use super::attempt::{AttemptOutcome, CallPlan};
use super::ResilientClient;
use crate::upstream::classify::classify_transport;
use crate::upstream::{CallOptions, UpstreamResponse};

impl ResilientClient {
    /// Make one logical call from an async task.
    pub async fn call_async(&self, options: &CallOptions) -> Result<UpstreamResponse, CallError> {
        let plan = CallPlan::new(&self.ctx, options);
        let span = plan.span();

        let result = self.run_async(&plan).instrument(span).await;
        plan.finish(result)
    }

    async fn run_async(&self, plan: &CallPlan<'_>) -> Result<UpstreamResponse, CallError> {
        let mut attempt = 0;
        loop {
            let result = self.attempt_async(plan, attempt).await;
            match plan.settle(attempt, result) {
                AttemptOutcome::Done(result) => return result,
                AttemptOutcome::Retry { delay } => {
                    self.ctx.sleeper().sleep_async(delay).await;
                    attempt += 1;
                },
            }
        }
    }

    async fn attempt_async(&self, plan: &CallPlan<'_>, attempt: u32) -> Result<UpstreamResponse, CallError> {
        if let Some(key) = plan.options.rate_limit_key.as_deref() {
            let limiter = self.ctx.rate_limiter();
            if plan.options.rate_limit_fail_fast {
                limiter.check_rate_limit(key, 1).map_err(|e| e.into_call_error(plan.upstream.as_str()))?;
            } else {
                plan.check_rate_limit_budget(limiter, key)?;
                limiter
                    .wait_if_needed_async(key, 1)
                    .await
                    .map_err(|e| e.into_call_error(plan.upstream.as_str()))?;
            }
        }

        let timeout = plan.attempt_timeout()?;
        plan.breaker
            .call_async_with(
                || async {
                    let response = build_request(&self.http, plan.options, timeout)
                        .send()
                        .await
                        .map_err(|e| classify_transport(&e, &plan.upstream))?;
                    let status = response.status();
                    let headers = response.headers().clone();
                    let body =
                        response.bytes().await.map_err(|e| classify_transport(&e, &plan.upstream))?;
                    plan.into_result(attempt, status, headers, body)
                },
                |e| e.kind.trips_breaker(),
            )
            .await
    }
}

fn build_request(
    client: &reqwest::Client,
    options: &CallOptions,
    timeout: Duration,
) -> reqwest::RequestBuilder {
    let mut request = client.request(options.method.clone(), options.url.as_str()).timeout(timeout);
    if !options.params.is_empty() {
        request = request.query(&options.params);
    }
    for (name, value) in &options.headers {
        request = request.header(name.as_str(), value.as_str());
    }
    if let Some(body) = &options.body {
        request = request.json(body);
    }
    request
}
