//! HTTP layer: one pooled client, bounded retries with randomized exponential backoff.
//!
//! The transport and the sleep/jitter source are traits so the retry schedule
//! can be driven without a network or a wall clock.

use async_trait::async_trait;
use rand::Rng;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::ScrapeConfig;
use crate::error::FetchError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff_base: f64,
    /// Jitter is drawn uniformly from `[0, jitter_max)`.
    pub jitter_max: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base: 1.7,
            jitter_max: Duration::from_millis(300),
        }
    }
}

impl RetryPolicy {
    /// Pause after the failed attempt `attempt` (0-based): `base^attempt + jitter`.
    ///
    /// Saturates at `Duration::MAX`; a negative or NaN exponent result means no wait.
    pub fn delay(&self, attempt: u32, jitter: Duration) -> Duration {
        let exp = self.backoff_base.powi(attempt as i32);
        let base = if exp.is_nan() || exp <= 0.0 {
            Duration::ZERO
        } else {
            Duration::try_from_secs_f64(exp).unwrap_or(Duration::MAX)
        };
        base.saturating_add(jitter)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One GET round trip, no retries.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError>;
}

/// Source of backoff sleeps and their random component.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pause(&self, duration: Duration);

    fn jitter(&self, max: Duration) -> Duration;
}

/// Anything that can hand back a page body. The resolvers only see this.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError>;
}

pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        let client = reqwest::Client::builder()
            // Servers reject the default reqwest identifier.
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse, FetchError> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        let status = resp.status().as_u16();
        let body = resp
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;
        Ok(HttpResponse { status, body })
    }
}

pub struct TokioPacer;

#[async_trait]
impl Pacer for TokioPacer {
    async fn pause(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn jitter(&self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        let secs = rand::rng().random_range(0.0..max.as_secs_f64());
        Duration::from_secs_f64(secs)
    }
}

/// Retrying fetch client shared read-only by every worker in a run.
pub struct FetchClient {
    transport: Arc<dyn HttpTransport>,
    pacer: Arc<dyn Pacer>,
    policy: RetryPolicy,
}

impl FetchClient {
    pub fn new(transport: Arc<dyn HttpTransport>, pacer: Arc<dyn Pacer>, policy: RetryPolicy) -> Self {
        Self {
            transport,
            pacer,
            policy,
        }
    }

    pub fn from_config(config: &ScrapeConfig) -> Result<Self, FetchError> {
        let transport = ReqwestTransport::new(&config.user_agent, config.request_timeout)?;
        Ok(Self::new(
            Arc::new(transport),
            Arc::new(TokioPacer),
            config.retry.clone(),
        ))
    }

    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.policy.attempts.max(1);
        let mut attempt = 0u32;
        loop {
            let err = match self.transport.get(url).await {
                Ok(resp) if resp.is_success() => {
                    debug!("GET {} -> {} ({} bytes)", url, resp.status, resp.body.len());
                    return Ok(resp.body);
                }
                Ok(resp) => FetchError::status(resp.status, url),
                Err(e) => e,
            };

            if attempt + 1 >= attempts {
                warn!("Giving up on {} after {} attempts: {}", url, attempts, err);
                return Err(err);
            }

            let wait = self
                .policy
                .delay(attempt, self.pacer.jitter(self.policy.jitter_max));
            warn!(
                "{}. Retrying in {:?} (attempt {}/{})",
                err,
                wait,
                attempt + 1,
                attempts
            );
            self.pacer.pause(wait).await;
            attempt += 1;
        }
    }
}

#[async_trait]
impl PageSource for FetchClient {
    async fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        self.fetch(url).await
    }
}
