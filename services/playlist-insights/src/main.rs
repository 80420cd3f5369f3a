//!
//! src/main.rs
//!
//! Command line front end. Every command prints JSON on stdout; logs go
//! to stderr.
//!

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use playlist_insights::{
    build_report,
    catalog::{CatalogClient, SpotifyCatalog},
    config::{self, AppConfig},
    demo,
    history::{HistoryStore, MemoryHistory, PlaylistRecord, SqliteHistory},
    logging,
    normalize::parse_exportify_csv,
    InsightsError, ReportSettings,
};

#[derive(Parser, Debug)]
#[command(name = "playlist-insights", version, about = "Insights for Exportify playlist exports")]
struct Cli {
    /// Keep history in memory for this run only
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Skip the Spotify deep cuts lookup even when credentials are set
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Import an Exportify CSV, store it and print its report
    Analyze {
        file: PathBuf,
        /// Display name instead of the stored one
        #[arg(long)]
        name: Option<String>,
    },
    /// Generate the demo playlist, store it and print its report
    Demo,
    /// Inspect stored playlists
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List stored playlists, oldest first
    List,
    /// Report for a stored playlist; the newest one if ID is missing or unknown
    Show { id: Option<String> },
    /// Remove a stored playlist
    Delete { id: String },
}

fn print_json<T: Serialize>(value: &T) -> Result<(), InsightsError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn open_history(cfg: &AppConfig, ephemeral: bool) ->
    Result<Box<dyn HistoryStore>, InsightsError> {
    if ephemeral {
        return Ok(Box::new(MemoryHistory::new()));
    }
    Ok(Box::new(SqliteHistory::init(&cfg.persistence.db_url).await?))
}

fn open_catalog(cfg: &AppConfig, offline: bool) -> Option<Arc<dyn CatalogClient>> {
    if offline {
        return None;
    }
    let spotify = cfg.spotify.as_ref()?;
    match SpotifyCatalog::new(&cfg.http, spotify, &cfg.catalog) {
        Ok(client) => Some(Arc::new(client)),
        Err(e) => {
            warn!(error = ?e, "catalog.init.failed");
            None
        }
    }
}

async fn report_record(
    record: &PlaylistRecord,
    name_override: Option<&str>,
    catalog: Option<&dyn CatalogClient>,
    settings: &ReportSettings,
    shutdown: &CancellationToken,
) -> Result<(), InsightsError> {
    let name = name_override.unwrap_or(&record.name);
    let report = build_report(&record.entries, Some(name), catalog, settings, shutdown).await;
    print_json(&serde_json::json!({
        "id": record.id,
        "name": record.name,
        "report": report,
    }))
}

#[tokio::main]
async fn main() -> Result<(), InsightsError> {
    let cli = Cli::parse();
    let cfgs = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    info!(
        service = "playlist-insights",
        version = %env!("CARGO_PKG_VERSION"),
        catalog = cfgs.spotify.is_some() && !cli.offline,
        "starting"
    );

    let shutdown = CancellationToken::new();
    let trigger = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("shutdown.signal");
                shutdown.cancel();
            }
        })
    };

    let history = open_history(&cfgs, cli.ephemeral).await?;
    let catalog = open_catalog(&cfgs, cli.offline);
    let settings = ReportSettings::from(&cfgs);

    match cli.command {
        Command::Analyze { file, name } => {
            let bytes = tokio::fs::read(&file).await?;
            let file_name = file.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| file.display().to_string());
            let entries = parse_exportify_csv(&bytes, &file_name)?;
            let record = history.add(&file_name, entries).await?;
            info!(id = %record.id, name = %record.name, tracks = record.entries.len(), "history.added");
            report_record(&record, name.as_deref(), catalog.as_deref(), &settings, &shutdown).await?;
        },
        Command::Demo => {
            let record = history.replace_demo(demo::demo_entries()).await?;
            report_record(&record, None, catalog.as_deref(), &settings, &shutdown).await?;
        },
        Command::History { action } => match action {
            HistoryAction::List => {
                print_json(&history.list().await?)?;
            },
            HistoryAction::Show { id } => {
                let record = history.select(id.as_deref()).await?
                    .ok_or_else(|| InsightsError::NotFound("no stored playlists".into()))?;
                report_record(&record, None, catalog.as_deref(), &settings, &shutdown).await?;
            },
            HistoryAction::Delete { id } => {
                if !history.delete(&id).await? {
                    return Err(InsightsError::NotFound(format!("playlist {id}")));
                }
                print_json(&serde_json::json!({ "deleted": id }))?;
            },
        },
    }

    trigger.abort();
    info!("exit");
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_history_show_without_id() {
        let cli = Cli::parse_from(["playlist-insights", "history", "show", "--offline"]);
        assert!(cli.offline);
        assert!(matches!(cli.command, Command::History { action: HistoryAction::Show { id: None } }));
    }

    #[test]
    fn parses_analyze_with_name() {
        let cli = Cli::parse_from(["playlist-insights", "analyze", "mix.csv", "--name", "Mine"]);
        match cli.command {
            Command::Analyze { file, name } => {
                assert_eq!(file, PathBuf::from("mix.csv"));
                assert_eq!(name.as_deref(), Some("Mine"));
            },
            other => panic!("unexpected command {other:?}"),
        }
    }
}
