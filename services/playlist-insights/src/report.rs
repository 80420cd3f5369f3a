//!
//! src/report.rs
//!
//! Everything the dashboard shows for one playlist, assembled in one call.
//!

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::catalog::{find_deep_cuts, CatalogClient, DeepCut, DeepCutRequest};
use crate::config::{AppConfig, CatalogConfig, MAX_ENTRIES};
use crate::insights::generate_insights;
use crate::recommend::build_recommendations;
use crate::stats::{build_dashboard_context, DashboardContext};
use crate::types::Entry;
use crate::vibe::{classify, Vibe};

#[derive(Debug, Clone, Serialize)]
pub struct InsightReport {
    pub dashboard: DashboardContext,
    pub vibe: Vibe,
    pub insights: Vec<String>,
    pub recommendations: Vec<String>,
    pub deep_cuts: Vec<DeepCut>,
    pub catalog_connected: bool,
}

#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub max_entries: usize,
    pub catalog: CatalogConfig,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self { max_entries: MAX_ENTRIES, catalog: CatalogConfig::default() }
    }
}

impl From<&AppConfig> for ReportSettings {
    fn from(cfg: &AppConfig) -> Self {
        Self { max_entries: cfg.report.max_entries, catalog: cfg.catalog.clone() }
    }
}

/// Runs every analysis over `entries`. Never fails: without a catalog,
/// or when it misbehaves, `deep_cuts` is empty.
pub async fn build_report(
    entries: &[Entry],
    name_override: Option<&str>,
    catalog: Option<&dyn CatalogClient>,
    settings: &ReportSettings,
    cancel: &CancellationToken,
) -> InsightReport {
    let entries = if entries.len() > settings.max_entries {
        warn!(
            total = entries.len(),
            kept = settings.max_entries,
            "report.entries.truncated"
        );
        &entries[..settings.max_entries]
    } else {
        entries
    };

    let dashboard = build_dashboard_context(entries, name_override);
    let vibe = classify(&dashboard);
    let insights = generate_insights(&dashboard);
    let recommendations = build_recommendations(entries);

    let deep_cuts = match catalog {
        Some(client) => {
            let request = DeepCutRequest::from_entries(entries, settings.catalog.top_artists);
            find_deep_cuts(client, &request, &settings.catalog, cancel).await
        },
        None => Vec::new(),
    };

    info!(
        playlist = %dashboard.playlist_name,
        tracks = dashboard.total_tracks,
        vibe = %vibe,
        deep_cuts = deep_cuts.len(),
        "report.build"
    );

    InsightReport {
        dashboard,
        vibe,
        insights,
        recommendations,
        deep_cuts,
        catalog_connected: catalog.is_some(),
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::catalog::CatalogTrack;
    use crate::errors::InsightsError;
    use crate::fixtures::{entry, entry_with, features, track};
    use crate::insights::NOT_ENOUGH_DATA;
    use crate::recommend::FALLBACK;

    struct OneTrackCatalog;

    #[async_trait]
    impl CatalogClient for OneTrackCatalog {
        async fn artist_top_tracks(&self, artist: &str) -> Result<Vec<CatalogTrack>, InsightsError> {
            Ok(vec![CatalogTrack {
                id: format!("{artist}-hit"),
                uri: format!("spotify:track:{artist}-hit"),
                name: "Hit".to_string(),
                artists: vec![artist.to_string()],
                album_art: None,
                preview_url: None,
                external_url: String::new(),
            }])
        }
    }

    #[tokio::test]
    async fn empty_playlist_report() {
        let report = build_report(&[], None, None, &ReportSettings::default(),
            &CancellationToken::new()).await;
        assert_eq!(report.dashboard.total_tracks, 0);
        assert_eq!(report.vibe, Vibe::EclecticMix);
        assert_eq!(report.insights, vec![NOT_ENOUGH_DATA.to_string()]);
        assert_eq!(report.recommendations, vec![FALLBACK.to_string()]);
        assert!(report.deep_cuts.is_empty());
        assert!(!report.catalog_connected);
    }

    #[tokio::test]
    async fn high_voltage_single_track() -> Result<(), serde_json::Error> {
        let mut t = track("Fast", &["Runner"]);
        t.features = features(0.9, 0.9);
        t.features.tempo = Some(150.0);
        t.features.popularity = Some(95);

        let report = build_report(&[entry_with(t)], Some("Sprint"), None,
            &ReportSettings::default(), &CancellationToken::new()).await;
        assert_eq!(report.vibe, Vibe::HighVoltageParty);
        assert_eq!(report.dashboard.playlist_name, "Sprint");

        let json = serde_json::to_value(&report)?;
        assert_eq!(json["vibe"], "High-voltage party");
        assert_eq!(json["catalog_connected"], false);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_import_is_truncated() {
        let entries: Vec<Entry> = (0..12).map(|i| entry(&format!("t{i}"), &["X"])).collect();
        let settings = ReportSettings { max_entries: 5, ..ReportSettings::default() };
        let report = build_report(&entries, None, None, &settings,
            &CancellationToken::new()).await;
        assert_eq!(report.dashboard.total_tracks, 5);
    }

    #[tokio::test]
    async fn catalog_supplies_deep_cuts() {
        let entries = vec![entry("a", &["Alpha"]), entry("b", &["Beta"])];
        let catalog = OneTrackCatalog;
        let report = build_report(&entries, None, Some(&catalog as &dyn CatalogClient),
            &ReportSettings::default(), &CancellationToken::new()).await;
        assert!(report.catalog_connected);
        assert_eq!(report.deep_cuts.len(), 2);
        assert!(report.deep_cuts.iter().any(|c| c.reason == "Essential Alpha track"));
    }
}
