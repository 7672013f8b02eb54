//! Network collaborator: plain GETs for text and bytes with a referer and a
//! cancellation token. Transport and HTTP errors come back as `None`, never
//! as a panic or an `Err`, so the discovery pipeline above stays no-throw.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::{Client, ClientBuilder, Response};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use url::Url;

/// User agents to rotate through to avoid bot detection.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
];

/// Fetches a resource on behalf of an adapter.
///
/// Implementations must report any failure as `None` and honor the token
/// promptly, abandoning in-flight requests where possible.
#[async_trait]
pub trait NetworkClient: Send + Sync {
    async fn fetch_text(
        &self,
        uri: &Url,
        referer: &Url,
        token: &CancellationToken,
    ) -> Option<String>;

    async fn fetch_bytes(
        &self,
        uri: &Url,
        referer: &Url,
        token: &CancellationToken,
    ) -> Option<Vec<u8>>;
}

#[derive(Clone)]
pub struct HttpClientConfig {
    pub timeout: Duration,
    pub max_retries: usize,
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub enable_cookies: bool,
    pub enable_compression: bool,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_retries: 4,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 8000,
            enable_cookies: true,
            enable_compression: true,
        }
    }
}

/// reqwest-backed client with browser-like headers and retry on transient
/// failures. Retries stay inside this collaborator; each discovery call
/// above it remains a single attempt.
pub struct HttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl HttpClient {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_config(HttpClientConfig::default())
    }

    pub fn with_config(config: HttpClientConfig) -> Result<Self, reqwest::Error> {
        let mut builder = ClientBuilder::new()
            .timeout(config.timeout)
            .user_agent(Self::random_user_agent())
            .cookie_store(config.enable_cookies)
            .gzip(config.enable_compression)
            .brotli(config.enable_compression)
            .tcp_keepalive(Some(Duration::from_secs(60)))
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        // Default headers that mimic a real browser
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8".parse().unwrap());
        headers.insert("Accept-Language", "en-US,en;q=0.9".parse().unwrap());
        headers.insert("DNT", "1".parse().unwrap());
        headers.insert("Connection", "keep-alive".parse().unwrap());
        headers.insert("Upgrade-Insecure-Requests", "1".parse().unwrap());
        builder = builder.default_headers(headers);

        let client = builder.build()?;

        Ok(Self { client, config })
    }

    fn random_user_agent() -> &'static str {
        let mut rng = rand::thread_rng();
        USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())]
    }

    /// Exponential backoff with jitter to avoid thundering herds.
    fn retry_delay(&self, attempt: usize) -> Duration {
        let base = self.config.initial_retry_delay_ms;
        let capped = (base * 2u64.pow(attempt as u32)).min(self.config.max_retry_delay_ms);
        let jitter = rand::thread_rng().gen_range(0.75..=1.25);
        Duration::from_millis((capped as f64 * jitter) as u64)
    }

    fn is_retryable_status(status: reqwest::StatusCode) -> bool {
        matches!(
            status.as_u16(),
            // Rate limiting
            429 |
            // Server errors
            500 | 502 | 503 | 504 |
            // Cloudflare errors
            520 | 521 | 522 | 523 | 524 | 525 | 526 | 527
        )
    }

    /// Wait out the backoff unless the caller cancels first.
    async fn backoff(&self, attempt: usize, token: &CancellationToken) -> bool {
        tokio::select! {
            _ = token.cancelled() => false,
            _ = sleep(self.retry_delay(attempt)) => true,
        }
    }

    async fn get(&self, uri: &Url, referer: &Url, token: &CancellationToken) -> Option<Response> {
        for attempt in 0..=self.config.max_retries {
            if token.is_cancelled() {
                return None;
            }

            let request = self
                .client
                .get(uri.clone())
                .header("User-Agent", Self::random_user_agent())
                .header("Referer", referer.as_str());

            let sent = tokio::select! {
                _ = token.cancelled() => return None,
                sent = request.send() => sent,
            };

            match sent {
                Ok(response) => {
                    let status = response.status();
                    if Self::is_retryable_status(status) && attempt < self.config.max_retries {
                        log::warn!(
                            "retryable status {} for {}, attempt {}/{}",
                            status,
                            uri,
                            attempt + 1,
                            self.config.max_retries + 1
                        );
                        if !self.backoff(attempt, token).await {
                            return None;
                        }
                        continue;
                    }
                    if !status.is_success() {
                        log::warn!("{} for {}", status, uri);
                        return None;
                    }
                    return Some(response);
                }
                Err(e) => {
                    let transient = e.is_timeout() || e.is_connect() || e.is_request();
                    if transient && attempt < self.config.max_retries {
                        log::warn!(
                            "request failed for {}, attempt {}/{}: {}",
                            uri,
                            attempt + 1,
                            self.config.max_retries + 1,
                            e
                        );
                        if !self.backoff(attempt, token).await {
                            return None;
                        }
                        continue;
                    }
                    log::warn!("request failed for {}: {}", uri, e);
                    return None;
                }
            }
        }
        None
    }
}

#[async_trait]
impl NetworkClient for HttpClient {
    async fn fetch_text(
        &self,
        uri: &Url,
        referer: &Url,
        token: &CancellationToken,
    ) -> Option<String> {
        let response = self.get(uri, referer, token).await?;
        let body = tokio::select! {
            _ = token.cancelled() => return None,
            body = response.text() => body,
        };
        match body {
            Ok(text) => Some(text),
            Err(e) => {
                log::warn!("failed to read body of {}: {}", uri, e);
                None
            }
        }
    }

    async fn fetch_bytes(
        &self,
        uri: &Url,
        referer: &Url,
        token: &CancellationToken,
    ) -> Option<Vec<u8>> {
        let response = self.get(uri, referer, token).await?;
        let body = tokio::select! {
            _ = token.cancelled() => return None,
            body = response.bytes() => body,
        };
        match body {
            Ok(bytes) => Some(bytes.to_vec()),
            Err(e) => {
                log::warn!("failed to read body of {}: {}", uri, e);
                None
            }
        }
    }
}
