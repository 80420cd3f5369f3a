//!
//! src/fetch.rs
//!
//! Builds HTTP clients and request builders for the Spotify Web API and
//! runs them with retry on throttling and server errors.
//!

use std::time::Duration;

use rand::{rngs::SmallRng, Rng, SeedableRng};
use reqwest::{header, redirect, Client, RequestBuilder};
use tokio::time::sleep;
use tracing::warn;
use url::Url;

use crate::config::{HttpConfig, RetryConfig, SpotifyConfig};
use crate::errors::InsightsError;

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, InsightsError> {
    client_helper(http)
        .default_headers(headers)
        .user_agent(concat!("playlist-insights/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| InsightsError::Http(format!("build client: {e}")))
}

pub fn base_client(http: &HttpConfig) -> Result<Client, InsightsError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    client_with_headers(http, h)
}

fn endpoint(base: &Url, path: &str) -> Result<Url, InsightsError> {
    base.join(path)
        .map_err(|e| InsightsError::Config(format!("bad endpoint {path}: {e}")))
}

#[derive(Clone, Debug)]
pub struct SpotifyClient {
    pub http: Client,
    pub cfg: SpotifyConfig,
}

impl SpotifyClient {
    pub fn new(http_config: &HttpConfig, cfg: &SpotifyConfig) ->
        Result<Self, InsightsError> {

        let http = base_client(http_config)?;
        Ok( Self {
            http,
            cfg: cfg.clone()
        })
    }

    /// POST {token_url} with client credentials
    pub fn token_request(&self) -> RequestBuilder {
        self.http
            .post(self.cfg.token_url.clone())
            .basic_auth(&self.cfg.client_id, Some(&self.cfg.client_secret))
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body("grant_type=client_credentials")
    }

    /// GET /v1/search?type=artist&q=...&limit=1
    pub fn search_artist(&self, name: &str, bearer: &str) ->
        Result<RequestBuilder, InsightsError> {
        let url = endpoint(&self.cfg.api_base, "search")?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[
            ("type", "artist"),
            ("q", name),
            ("limit", "1"),
        ]))
    }

    /// GET /v1/artists/{id}/top-tracks?market=...
    pub fn artist_top_tracks(&self, artist_id: &str, market: &str, bearer: &str) ->
        Result<RequestBuilder, InsightsError> {
        let url = endpoint(&self.cfg.api_base, &format!("artists/{artist_id}/top-tracks"))?;
        Ok(self.http.get(url).bearer_auth(bearer).query(&[("market", market)]))
    }
}

/// Exponential backoff with a little random jitter
pub fn generate_backoff(ms: u64, attempt: usize, rng: &mut SmallRng) -> Duration {
    let exp = (1_u64 << attempt.min(6)) * ms;
    let jitter = rng.gen_range(50..=200) as u64;
    Duration::from_millis(exp + jitter)
}

/// Sends `request`, retrying transport errors and retryable statuses up
/// to `retry.max_attempts` extra times. Returns the decoded JSON body.
pub async fn http_with_retry(
    request: RequestBuilder,
    retry: &RetryConfig
) -> Result<serde_json::Value, InsightsError> {
    let mut rng = SmallRng::from_entropy();
    let max_retries = retry.max_attempts as usize;
    let backoff_ms = retry.base_backoff.as_millis() as u64;
    let mut attempt = 0_usize;
    loop {
        let response = request.try_clone()
            .ok_or_else(|| InsightsError::Http("non-cloneable request".to_string()))?
            .send()
            .await;
        match response {
            Ok(resp) => {
                if resp.status().is_success() {
                    let v = resp.json::<serde_json::Value>().await?;
                    return Ok(v);
                }
                let status = resp.status();
                let retryable = retry.retryable_statuses.contains(&status.as_u16());
                if !retryable || attempt >= max_retries {
                    let body = resp.text().await.unwrap_or_default();
                    return Err(InsightsError::Http(format!("status {status}: {body}")));
                }
                let backoff = generate_backoff(backoff_ms, attempt, &mut rng);
                warn!(status = %status, backoff = ?backoff.as_millis(), "http.retry");
                sleep(backoff).await;
                attempt += 1;
            },
            Err(e) => {
                if attempt >= max_retries {
                    return Err(e.into());
                }
                let backoff = generate_backoff(backoff_ms, attempt, &mut rng);
                warn!(error = %e, backoff = ?backoff.as_millis(), "http.retry.error");
                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
