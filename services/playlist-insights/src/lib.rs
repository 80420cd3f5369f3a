//!
//! src/lib.rs
//!
//! Playlist insight engine: normalizes Exportify CSV exports, aggregates
//! them into dashboard statistics, labels the playlist's vibe, writes
//! insights and recommendations, and optionally asks Spotify for deep cuts.
//!

pub mod config;
pub mod errors;
pub mod logging;

pub mod counter;
pub mod types;
pub mod normalize;
pub mod demo;

pub mod stats;
pub mod vibe;
pub mod insights;
pub mod recommend;

pub mod fetch;
pub mod catalog;
pub mod history;
pub mod report;

#[cfg(test)]
mod fixtures;

pub use errors::InsightsError;
pub use report::{build_report, InsightReport, ReportSettings};
pub use types::{AudioFeatures, Entry, Track};
