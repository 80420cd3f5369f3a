//!
//! src/catalog.rs
//!
//! Deep cuts: popular tracks by a playlist's top artists that the
//! playlist does not contain yet. The lookup is best effort and always
//! resolves to a list, empty when the catalog cannot be reached.
//!

use std::collections::HashSet;

use async_trait::async_trait;
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::{CatalogConfig, HttpConfig, RetryConfig, SpotifyConfig};
use crate::counter::Counter;
use crate::errors::InsightsError;
use crate::fetch::{http_with_retry, SpotifyClient};
use crate::types::Entry;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepCut {
    pub name: String,
    pub artists: Vec<String>,
    pub album_art: Option<String>,
    pub preview_url: Option<String>,
    pub external_url: String,
    pub id: String,
    pub reason: String,
}

/// A track as the catalog reports it for one artist.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogTrack {
    pub id: String,
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album_art: Option<String>,
    pub preview_url: Option<String>,
    pub external_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeepCutRequest {
    /// Most frequent artists, most frequent first.
    pub top_artists: Vec<String>,
    /// Track URIs already in the playlist.
    pub known_track_ids: HashSet<String>,
}

impl DeepCutRequest {
    pub fn from_entries<'a, I>(entries: I, max_artists: usize) -> Self
    where
        I: IntoIterator<Item = &'a Entry>,
    {
        let mut artists: Counter<String> = Counter::new();
        let mut known_track_ids = HashSet::new();
        for entry in entries {
            let track = &entry.track;
            if !track.uri.is_empty() {
                known_track_ids.insert(track.uri.clone());
            }
            for artist in track.artists.iter().filter(|a| !a.trim().is_empty()) {
                artists.add(artist.clone(), 1);
            }
        }
        let top_artists = artists.most_common(max_artists)
            .into_iter()
            .map(|(artist, _)| artist)
            .collect();
        Self { top_artists, known_track_ids }
    }
}

#[async_trait]
pub trait CatalogClient: Send + Sync {
    /// Best-known tracks of the closest matching artist. An artist the
    /// catalog cannot find yields an empty list, not an error.
    async fn artist_top_tracks(&self, artist: &str) -> Result<Vec<CatalogTrack>, InsightsError>;
}

/// Unknown, de-duplicated candidates in discovery order.
pub async fn collect_deep_cuts(
    client: &dyn CatalogClient,
    request: &DeepCutRequest,
) -> Result<Vec<DeepCut>, InsightsError> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut cuts = Vec::new();

    for artist in &request.top_artists {
        let tracks = client.artist_top_tracks(artist).await?;
        debug!(artist = %artist, tracks = tracks.len(), "catalog.artist.top_tracks");
        for track in tracks {
            if request.known_track_ids.contains(&track.uri) || !seen.insert(track.id.clone()) {
                continue;
            }
            cuts.push(DeepCut {
                name: track.name,
                artists: track.artists,
                album_art: track.album_art,
                preview_url: track.preview_url,
                external_url: track.external_url,
                id: track.id,
                reason: format!("Essential {artist} track"),
            });
        }
    }
    Ok(cuts)
}

pub fn shuffle_and_limit(mut cuts: Vec<DeepCut>, limit: usize, rng: &mut impl Rng) -> Vec<DeepCut> {
    cuts.shuffle(rng);
    cuts.truncate(limit);
    cuts
}

/// Runs the lookup under `cfg.timeout` and `cancel`. Failures, timeouts
/// and cancellation are logged and produce an empty list.
pub async fn find_deep_cuts(
    client: &dyn CatalogClient,
    request: &DeepCutRequest,
    cfg: &CatalogConfig,
    cancel: &CancellationToken,
) -> Vec<DeepCut> {
    if request.top_artists.is_empty() || cfg.limit == 0 {
        return Vec::new();
    }

    let lookup = tokio::time::timeout(cfg.timeout, collect_deep_cuts(client, request));
    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("catalog.deep_cuts.cancelled");
            return Vec::new();
        }
        r = lookup => r,
    };

    match outcome {
        Ok(Ok(cuts)) => {
            let mut rng = SmallRng::from_entropy();
            let cuts = shuffle_and_limit(cuts, cfg.limit, &mut rng);
            info!(count = cuts.len(), "catalog.deep_cuts.done");
            cuts
        },
        Ok(Err(e)) => {
            warn!(error = ?e, "catalog.deep_cuts.failed");
            Vec::new()
        },
        Err(_) => {
            warn!(timeout_ms = cfg.timeout.as_millis() as u64, "catalog.deep_cuts.timeout");
            Vec::new()
        }
    }
}

#[derive(Debug)]
struct BearerToken {
    value: String,
    expires: Instant,
}

/// Spotify Web API catalog using the client credentials flow.
#[derive(Debug)]
pub struct SpotifyCatalog {
    client: SpotifyClient,
    retry: RetryConfig,
    market: String,
    token: Mutex<Option<BearerToken>>,
}

impl SpotifyCatalog {
    pub fn new(http: &HttpConfig, spotify: &SpotifyConfig, catalog: &CatalogConfig) ->
        Result<Self, InsightsError> {
        Ok(Self {
            client: SpotifyClient::new(http, spotify)?,
            retry: http.retry.clone(),
            market: catalog.market.clone(),
            token: Mutex::new(None),
        })
    }

    /// Fetches a new token; it is treated as expired 60 s early.
    async fn refresh_token(&self) -> Result<BearerToken, InsightsError> {
        let response = http_with_retry(self.client.token_request(), &self.retry).await?;
        let value = response["access_token"].as_str()
            .ok_or_else(|| InsightsError::Http("no access_token in response".into()))?
            .to_string();
        let expires_in = response["expires_in"].as_u64().unwrap_or(3600);
        let expires = Instant::now()
            + std::time::Duration::from_secs(expires_in.saturating_sub(60));
        Ok(BearerToken { value, expires })
    }

    async fn bearer(&self) -> Result<String, InsightsError> {
        let mut token = self.token.lock().await;
        let fresh = token.as_ref().is_some_and(|t| Instant::now() < t.expires);
        if !fresh {
            let renewed = self.refresh_token().await?;
            debug!("catalog.token.refreshed");
            *token = Some(renewed);
        }
        token.as_ref()
            .map(|t| t.value.clone())
            .ok_or_else(|| InsightsError::Http("no spotify token".into()))
    }
}

fn parse_track(track: &serde_json::Value) -> Option<CatalogTrack> {
    Some(CatalogTrack {
        id: track["id"].as_str()?.to_string(),
        uri: track["uri"].as_str().unwrap_or_default().to_string(),
        name: track["name"].as_str().unwrap_or_default().to_string(),
        artists: track["artists"].as_array()
            .map(|artists| artists.iter()
                .filter_map(|a| a["name"].as_str())
                .map(str::to_string)
                .collect())
            .unwrap_or_default(),
        album_art: track.pointer("/album/images/0/url")
            .and_then(|v| v.as_str())
            .map(str::to_string),
        preview_url: track["preview_url"].as_str().map(str::to_string),
        external_url: track.pointer("/external_urls/spotify")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

#[async_trait]
impl CatalogClient for SpotifyCatalog {
    async fn artist_top_tracks(&self, artist: &str) -> Result<Vec<CatalogTrack>, InsightsError> {
        let bearer = self.bearer().await?;

        let search = self.client.search_artist(&format!("artist:{artist}"), &bearer)?;
        let found = http_with_retry(search, &self.retry).await?;
        let Some(artist_id) = found.pointer("/artists/items/0/id").and_then(|v| v.as_str())
        else {
            debug!(artist = %artist, "catalog.artist.not_found");
            return Ok(Vec::new());
        };

        let top = self.client.artist_top_tracks(artist_id, &self.market, &bearer)?;
        let top = http_with_retry(top, &self.retry).await?;
        Ok(top["tracks"].as_array()
            .map(|tracks| tracks.iter().filter_map(parse_track).collect())
            .unwrap_or_default())
    }
}
