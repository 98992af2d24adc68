//! Blocking mode: I/O, breaker bookkeeping and backoff sleeps all run on the
//! calling thread.

use std::time::Duration;
use toolwire_types::CallError;

use super::attempt::{AttemptOutcome, CallPlan};
use super::ResilientClient;
use crate::upstream::classify::classify_transport;
use crate::upstream::{CallOptions, UpstreamResponse};

impl ResilientClient {
    /// Make one logical call, blocking the current thread.
    pub fn call(&self, options: &CallOptions) -> Result<UpstreamResponse, CallError> {
        let plan = CallPlan::new(&self.ctx, options);
        let _span = plan.span().entered();

        let result = self.run_blocking(&plan);
        plan.finish(result)
    }

    fn run_blocking(&self, plan: &CallPlan<'_>) -> Result<UpstreamResponse, CallError> {
        let client = self.blocking_client(&plan.upstream)?;

        let mut attempt = 0;
        loop {
            let result = self.attempt_blocking(plan, client, attempt);
            match plan.settle(attempt, result) {
                AttemptOutcome::Done(result) => return result,
                AttemptOutcome::Retry { delay } => {
                    self.ctx.sleeper().sleep(delay);
                    attempt += 1;
                },
            }
        }
    }

    fn attempt_blocking(
        &self,
        plan: &CallPlan<'_>,
        client: &reqwest::blocking::Client,
        attempt: u32,
    ) -> Result<UpstreamResponse, CallError> {
        if let Some(key) = plan.options.rate_limit_key.as_deref() {
            let limiter = self.ctx.rate_limiter();
            if plan.options.rate_limit_fail_fast {
                limiter.check_rate_limit(key, 1).map_err(|e| e.into_call_error(plan.upstream.as_str()))?;
            } else {
                plan.check_rate_limit_budget(limiter, key)?;
                limiter.wait_if_needed(key, 1).map_err(|e| e.into_call_error(plan.upstream.as_str()))?;
            }
        }

        let timeout = plan.attempt_timeout()?;
        plan.breaker.call_with(
            || {
                let response = build_request(client, plan.options, timeout)
                    .send()
                    .map_err(|e| classify_transport(&e, &plan.upstream))?;
                let status = response.status();
                let headers = response.headers().clone();
                let body = response.bytes().map_err(|e| classify_transport(&e, &plan.upstream))?;
                plan.into_result(attempt, status, headers, body)
            },
            |e| e.kind.trips_breaker(),
        )
    }
}

fn build_request(
    client: &reqwest::blocking::Client,
    options: &CallOptions,
    timeout: Duration,
) -> reqwest::blocking::RequestBuilder {
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
