//! Rate-limited HTTP client for the reference API
//!
//! The season audit already paces itself per show; this limiter sits under
//! that as a transport-level ceiling so that no code path can burst past
//! the upstream's published quota.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use governor::{
    Quota, RateLimiter,
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
};
use reqwest::{Client, Response};
use tracing::debug;

/// Configuration for rate limiting
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per second
    pub requests_per_second: u32,
    /// Burst capacity (allows short bursts above the rate)
    pub burst_size: u32,
}

/// A rate-limited HTTP client wrapper
pub struct RateLimitedClient {
    client: Client,
    limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
    name: String,
}

impl RateLimitedClient {
    pub fn new(name: &str, config: RateLimitConfig) -> Result<Self> {
        let quota = Quota::per_second(
            NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            limiter: Arc::new(RateLimiter::direct(quota)),
            name: name.to_string(),
        })
    }

    /// Client tuned for TMDB
    pub fn for_tmdb() -> Result<Self> {
        // TMDB allows ~40 requests per 10 seconds, so ~4/sec with burst of 10
        Self::new(
            "tmdb",
            RateLimitConfig {
                requests_per_second: 4,
                burst_size: 10,
            },
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Wait for rate limit and make a GET request with headers and query parameters
    pub async fn get_with_headers_and_query<T: serde::Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        query: &T,
    ) -> Result<Response> {
        self.wait_for_permit().await;
        debug!(client = %self.name, url = %url, "Making rate-limited GET request");

        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        request
            .query(query)
            .send()
            .await
            .context("HTTP request failed")
    }

    /// Wait for a rate limit permit
    pub async fn wait_for_permit(&self) {
        self.limiter.until_ready().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tmdb_client_name() {
        let client = RateLimitedClient::for_tmdb().unwrap();
        assert_eq!(client.name(), "tmdb");
    }

    #[tokio::test]
    async fn test_zero_quota_falls_back_to_minimum() {
        let client = RateLimitedClient::new(
            "test",
            RateLimitConfig {
                requests_per_second: 0,
                burst_size: 0,
            },
        )
        .unwrap();
        assert_eq!(client.name(), "test");
        // A burst of one means the first permit is immediate.
        client.wait_for_permit().await;
    }
}
