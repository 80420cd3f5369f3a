//!
//! src/config.rs
//!
//! Environment driven configuration. Every section has defaults except
//! Spotify credentials, which are optional and switch the catalog on.
//!

use std::time;

use url::Url;

use crate::errors::InsightsError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 16;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

pub const RETRY_MAX_ATTEMPTS: u8 = 3;
pub const RETRY_BASE_BACKOFF: u64 = 250;
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Constants for the deep cuts lookup
pub const DEEP_CUTS_LIMIT: usize = 10;
pub const DEEP_CUTS_TIMEOUT: u64 = 10_000;
pub const DEEP_CUTS_TOP_ARTISTS: usize = 5;
pub const SPOTIFY_MARKET: &str = "US";

pub const HISTORY_DB_URL: &str = "sqlite:playlist-insights.db";
pub const MAX_ENTRIES: usize = 20_000;
pub const LOG_FILTER: &str = "info,playlist_insights=debug,reqwest=warn,sqlx=warn";

/// Wrapper over the lookup to return an invalid environment var error
fn env_check<F>(env: &F, s: &str) -> Result<String, InsightsError>
where
    F: Fn(&str) -> Option<String>,
{
    match env(s) {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(InsightsError::Config(format!("{s} was not set"))),
    }
}

fn env_or<F, T>(env: &F, s: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    env(s)
        .and_then(|v| v.trim().parse::<T>().ok())
        .unwrap_or(default)
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

fn ensure_trailing_slash(url: &mut Url) {
    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
}

/// Credentials and endpoints for the Spotify Web API
#[derive(Debug, Clone)]
pub struct SpotifyConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub api_base: Url,
}

/// `None` when neither credential is present. One without the other is
/// a configuration error.
fn build_spotify<F>(env: &F) -> Result<Option<SpotifyConfig>, InsightsError>
where
    F: Fn(&str) -> Option<String>,
{
    let has = |k: &str| env(k).is_some_and(|v| !v.trim().is_empty());
    if !has("SPOTIFY_CLIENT_ID") && !has("SPOTIFY_CLIENT_SECRET") {
        return Ok(None);
    }
    let client_id     = env_check(env, "SPOTIFY_CLIENT_ID")?;
    let client_secret = env_check(env, "SPOTIFY_CLIENT_SECRET")?;

    // form urls
    let token_url = env("SPOTIFY_TOKEN_URL")
        .unwrap_or_else(|| "https://accounts.spotify.com/api/token".to_string());
    let api_base = env("SPOTIFY_API_BASE")
        .unwrap_or_else(|| "https://api.spotify.com/v1/".to_string());

    let token_url = Url::parse(&token_url)
        .map_err(|e| InsightsError::Config(format!("SPOTIFY_TOKEN_URL invalid {e}")))?;
    let mut api_base = Url::parse(&api_base)
        .map_err(|e| InsightsError::Config(format!("SPOTIFY_API_BASE invalid {e}")))?;

    // ensure valid https and hostname for both urls
    ensure_https(&token_url).map_err(InsightsError::Config)?;
    ensure_https(&api_base).map_err(InsightsError::Config)?;
    ensure_host(&token_url, "accounts.spotify.com").map_err(InsightsError::Config)?;
    ensure_host(&api_base, "api.spotify.com").map_err(InsightsError::Config)?;
    ensure_trailing_slash(&mut api_base);

    Ok(Some(SpotifyConfig { client_id, client_secret, token_url, api_base }))
}

///
/// Configuration for Http timeouts, retries, etc.
///
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u8,
    pub base_backoff: time::Duration,
    pub retryable_statuses: Vec<u16>
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: RETRY_MAX_ATTEMPTS,
            base_backoff: time::Duration::from_millis(RETRY_BASE_BACKOFF),
            retryable_statuses: RETRYABLE_STATUSES.to_vec()
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
    pub retry: RetryConfig
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
            retry: RetryConfig::default()
        }
    }
}

/// How many deep cuts to return and how long to wait for them
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub limit: usize,
    pub timeout: time::Duration,
    pub market: String,
    pub top_artists: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            limit: DEEP_CUTS_LIMIT,
            timeout: time::Duration::from_millis(DEEP_CUTS_TIMEOUT),
            market: SPOTIFY_MARKET.to_string(),
            top_artists: DEEP_CUTS_TOP_ARTISTS,
        }
    }
}

fn build_catalog<F>(env: &F) -> CatalogConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = CatalogConfig::default();
    let market = env("SPOTIFY_MARKET")
        .map(|m| m.trim().to_ascii_uppercase())
        .filter(|m| m.len() == 2)
        .unwrap_or(defaults.market);

    CatalogConfig {
        limit: env_or(env, "DEEP_CUTS_LIMIT", defaults.limit),
        timeout: time::Duration::from_millis(
            env_or(env, "DEEP_CUTS_TIMEOUT_MS", DEEP_CUTS_TIMEOUT)
        ),
        market,
        top_artists: defaults.top_artists,
    }
}

///
/// Where playlist history is persisted
///
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    pub db_url: String,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { db_url: HISTORY_DB_URL.to_string() }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub max_entries: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self { max_entries: MAX_ENTRIES }
    }
}

///
/// Configuration for Logger
///
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

impl LogFormat {
    pub fn parse(s: &str) -> Option<LogFormat> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some(LogFormat::Pretty),
            "json"   => Some(LogFormat::Json),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: LOG_FILTER.to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging<F>(env: &F) -> LoggingConfig
where
    F: Fn(&str) -> Option<String>,
{
    let defaults = LoggingConfig::default();
    let format = env("LOG_FORMAT")
        .and_then(|f| LogFormat::parse(&f))
        .unwrap_or(defaults.format);
    let filter_directives = env("LOG_FILTER")
        .filter(|f| !f.trim().is_empty())
        .unwrap_or(defaults.filter_directives);

    LoggingConfig {
        filter_directives,
        format,
        include_file_line: format == LogFormat::Json,
        ..defaults
    }
}

///
/// AppConfig which holds everything the binary needs
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub spotify: Option<SpotifyConfig>,
    pub catalog: CatalogConfig,
    pub persistence: PersistenceConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig
}

/// Builds the config from an arbitrary key lookup.
pub fn load_config_from<F>(env: F) -> Result<AppConfig, InsightsError>
where
    F: Fn(&str) -> Option<String>,
{
    let http        = HttpConfig::default();
    let spotify     = build_spotify(&env)?;
    let catalog     = build_catalog(&env);
    let persistence = PersistenceConfig {
        db_url: env("HISTORY_DB_URL")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| HISTORY_DB_URL.to_string()),
    };
    let report      = ReportConfig {
        max_entries: env_or(&env, "MAX_ENTRIES", MAX_ENTRIES),
    };
    let logging     = build_logging(&env);

    Ok( AppConfig { http, spotify, catalog, persistence, report, logging } )
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, InsightsError> {
    dotenvy::dotenv().ok();
    load_config_from(|k| std::env::var(k).ok())
}
