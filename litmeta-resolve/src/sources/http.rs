//! Shared HTTP plumbing for the structured-source adapters
//!
//! One [`HttpContext`] is shared by every structured adapter: a reqwest client
//! with the short per-call timeout, and a `governor` rate limiter so bursts of
//! encyclopedia and knowledge-graph lookups stay polite.

use crate::error::{ResolveError, ResolveResult};
use anyhow::{bail, Context};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// HTTP client plus rate limiter shared by structured adapters
#[derive(Clone)]
pub struct HttpContext {
    client: Client,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl HttpContext {
    /// Build a context with a per-request timeout and a request-per-second cap
    pub fn new(user_agent: &str, timeout: Duration, requests_per_second: u32) -> ResolveResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .user_agent(user_agent)
            .build()
            .map_err(|e| ResolveError::HttpClient(e.to_string()))?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` and decode a JSON body
    ///
    /// `Ok(None)` for 404 (page or entity does not exist); any other
    /// non-success status is an error.
    pub async fn get_json<T>(&self, url: &str, query: &[(&str, &str)]) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        self.limiter.until_ready().await;

        let response = self
            .client
            .get(url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            bail!("{url} returned status {status}");
        }

        let body = response
            .json::<T>()
            .await
            .with_context(|| format!("failed to decode response from {url}"))?;
        Ok(Some(body))
    }
}

impl std::fmt::Debug for HttpContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpContext").finish_non_exhaustive()
    }
}

/// Percent-encode a page title for a REST path segment (spaces as underscores)
pub fn encode_title(title: &str) -> String {
    urlencoding::encode(&title.trim().replace(' ', "_")).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_title() {
        assert_eq!(encode_title("War and Peace"), "War_and_Peace");
        assert_eq!(encode_title("Suç ve Ceza"), "Su%C3%A7_ve_Ceza");
        assert_eq!(encode_title("War and Peace (Tolstoy)"), "War_and_Peace_%28Tolstoy%29");
    }

    #[test]
    fn test_zero_rate_is_clamped() {
        assert!(HttpContext::new("litmeta-test/0.1", Duration::from_secs(5), 0).is_ok());
    }
}
