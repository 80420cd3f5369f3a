//!
//! src/stats.rs
//!
//! Single-pass aggregator that turns a sequence of playlist entries into
//! the dashboard context: counters, histograms, top-K rankings and the
//! scatter data for the mood chart.
//!

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::Timelike;
use serde::Serialize;

use crate::counter::Counter;
use crate::types::{AudioFeatures, Entry, Feature, TrackKey};

pub const UNKNOWN_PLAYLIST: &str = "Unknown Playlist";
pub const TOP_K: usize = 10;

const MS_PER_HOUR: f64 = 3_600_000.0;

pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10_f64.powi(places);
    (value * factor).round() / factor
}

pub fn ms_to_hours(ms: u64, places: i32) -> f64 {
    round_to(ms as f64 / MS_PER_HOUR, places)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub const ALL: [TimeOfDay; 4] = [
        TimeOfDay::Morning,
        TimeOfDay::Afternoon,
        TimeOfDay::Evening,
        TimeOfDay::Night,
    ];

    /// Morning 5-11, Afternoon 12-17, Evening 18-23, Night 0-4.
    pub fn from_hour(hour: u32) -> Self {
        match hour {
            5..=11  => TimeOfDay::Morning,
            12..=17 => TimeOfDay::Afternoon,
            18..=23 => TimeOfDay::Evening,
            _       => TimeOfDay::Night,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimeOfDay::Morning   => "Morning",
            TimeOfDay::Afternoon => "Afternoon",
            TimeOfDay::Evening   => "Evening",
            TimeOfDay::Night     => "Night",
        }
    }

    pub(crate) fn slot(self) -> usize {
        self as usize
    }
}

pub const POPULARITY_LABELS: [&str; 5] = ["0-20", "21-40", "41-60", "61-80", "81-100"];
pub const TEMPO_LABELS: [&str; 5] = [
    "<80 BPM", "80-99 BPM", "100-119 BPM", "120-139 BPM", ">140 BPM",
];

fn popularity_slot(popularity: u8) -> Option<usize> {
    match popularity {
        0..=20   => Some(0),
        21..=40  => Some(1),
        41..=60  => Some(2),
        61..=80  => Some(3),
        81..=100 => Some(4),
        _        => None,
    }
}

pub fn popularity_bucket(popularity: u8) -> Option<&'static str> {
    popularity_slot(popularity).map(|slot| POPULARITY_LABELS[slot])
}

/// A tempo of exactly zero carries no information and is skipped.
fn tempo_slot(tempo: f64) -> Option<usize> {
    if tempo == 0.0 || !tempo.is_finite() {
        return None;
    }
    let slot = if tempo < 80.0 {
        0
    } else if tempo < 100.0 {
        1
    } else if tempo < 120.0 {
        2
    } else if tempo < 140.0 {
        3
    } else {
        4
    };
    Some(slot)
}

pub fn tempo_bucket(tempo: f64) -> Option<&'static str> {
    tempo_slot(tempo).map(|slot| TEMPO_LABELS[slot])
}

/// Decade from the leading four-digit year of a release date.
pub fn decade(release_date: &str) -> Option<i32> {
    let year = release_date.get(..4)?;
    if !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    Some((year / 10) * 10)
}

pub fn era_label(decade: i32) -> String {
    format!("{decade}s")
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BucketCount {
    pub label: String,
    pub count: u64,
}

impl BucketCount {
    fn new(label: impl Into<String>, count: u64) -> Self {
        Self { label: label.into(), count }
    }
}

pub fn bucket_count(buckets: &[BucketCount], label: &str) -> u64 {
    buckets.iter()
        .find(|b| b.label == label)
        .map(|b| b.count)
        .unwrap_or(0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopTrack {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub listening_time_hours: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistListening {
    pub artist: String,
    pub listening_time_hours: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct FeatureAverages {
    pub danceability: f64,
    pub energy: f64,
    pub valence: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub speechiness: f64,
}

impl FeatureAverages {
    pub fn get(&self, feature: Feature) -> f64 {
        match feature {
            Feature::Danceability     => self.danceability,
            Feature::Energy           => self.energy,
            Feature::Valence          => self.valence,
            Feature::Acousticness     => self.acousticness,
            Feature::Instrumentalness => self.instrumentalness,
            Feature::Liveness         => self.liveness,
            Feature::Speechiness      => self.speechiness,
        }
    }

    fn set(&mut self, feature: Feature, value: f64) {
        let slot = match feature {
            Feature::Danceability     => &mut self.danceability,
            Feature::Energy           => &mut self.energy,
            Feature::Valence          => &mut self.valence,
            Feature::Acousticness     => &mut self.acousticness,
            Feature::Instrumentalness => &mut self.instrumentalness,
            Feature::Liveness         => &mut self.liveness,
            Feature::Speechiness      => &mut self.speechiness,
        };
        *slot = value;
    }

    /// Values in `Feature::ALL` order, for radar charts.
    pub fn series(&self) -> Vec<f64> {
        Feature::ALL.iter().map(|&f| self.get(f)).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodPoint {
    pub x: f64,
    pub y: f64,
    pub name: String,
    pub artist: String,
}

/// Flat per-entry record for client-side filtering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackRow {
    pub name: String,
    pub artist: String,
    pub album: String,
    pub genres: Vec<String>,
    pub duration_ms: Option<u64>,
    pub release_date: Option<String>,
    pub era: Option<String>,
    pub time_of_day: Option<TimeOfDay>,
    pub popularity_bucket: Option<&'static str>,
    pub tempo_bucket: Option<&'static str>,
    #[serde(flatten)]
    pub features: AudioFeatures,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardContext {
    pub playlist_name: String,
    pub total_tracks: u64,
    pub total_listening_hours: f64,
    pub top_artists: Vec<(String, u64)>,
    pub top_tracks: Vec<TopTrack>,
    pub top_artists_by_duration: Vec<ArtistListening>,
    pub avg_features: FeatureAverages,
    pub feature_labels: Vec<&'static str>,
    pub top_genres: Vec<(String, u64)>,
    pub distinct_genres: usize,
    pub time_of_day_counts: Vec<BucketCount>,
    pub era_counts: Vec<BucketCount>,
    pub popularity_counts: Vec<BucketCount>,
    pub tempo_counts: Vec<BucketCount>,
    pub mood_data: Vec<MoodPoint>,
    pub monthly_labels: Vec<String>,
    pub monthly_values: Vec<f64>,
    pub tracks: Vec<TrackRow>,
}

#[derive(Debug, Clone)]
struct TrackInfo {
    album: String,
    artists: Vec<String>,
}

/// Streaming fold over entries; owns all of its state so concurrent
/// invocations never share counters.
#[derive(Debug, Default)]
pub struct Aggregator {
    first_playlist: Option<String>,
    total_tracks: u64,
    total_ms: u64,
    artists: Counter<String>,
    track_time: Counter<TrackKey>,
    track_info: HashMap<TrackKey, TrackInfo>,
    feature_sums: [f64; 7],
    feature_counts: [u64; 7],
    genres: Counter<String>,
    time_of_day: [u64; 4],
    eras: BTreeMap<i32, u64>,
    popularity: [u64; 5],
    tempo: [u64; 5],
    mood_seen: HashSet<TrackKey>,
    mood: Vec<MoodPoint>,
    monthly_ms: BTreeMap<String, u64>,
    rows: Vec<TrackRow>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: &Entry) {
        let track = &entry.track;
        let duration = track.duration_ms.unwrap_or(0);
        let key = track.key();

        if self.first_playlist.is_none() {
            self.first_playlist = Some(entry.playlist_name.clone());
        }
        self.total_tracks += 1;
        self.total_ms += duration;

        for artist in track.artists.iter().filter(|a| !a.trim().is_empty()) {
            self.artists.add(artist.clone(), 1);
        }

        self.track_time.add(key.clone(), duration);
        self.track_info.entry(key.clone()).or_insert_with(|| TrackInfo {
            album: track.album.clone(),
            artists: track.artists.clone(),
        });

        for (slot, feature) in Feature::ALL.iter().enumerate() {
            if let Some(value) = feature.value(&track.features) {
                self.feature_sums[slot] += value;
                self.feature_counts[slot] += 1;
            }
        }

        for genre in &track.genres {
            let genre = genre.trim();
            if !genre.is_empty() {
                self.genres.add(genre.to_string(), 1);
            }
        }

        let time_of_day = entry.added_at.map(|ts| TimeOfDay::from_hour(ts.hour()));
        if let Some(tod) = time_of_day {
            self.time_of_day[tod.slot()] += 1;
        }
        if let Some(ts) = entry.added_at {
            *self.monthly_ms.entry(ts.format("%Y-%m").to_string()).or_insert(0) += duration;
        }

        let decade = track.release_date.as_deref().and_then(decade);
        if let Some(decade) = decade {
            *self.eras.entry(decade).or_insert(0) += 1;
        }

        let popularity = track.features.popularity.and_then(popularity_slot);
        if let Some(slot) = popularity {
            self.popularity[slot] += 1;
        }

        let tempo = track.features.tempo.and_then(tempo_slot);
        if let Some(slot) = tempo {
            self.tempo[slot] += 1;
        }

        if let (Some(valence), Some(energy)) = (track.features.valence, track.features.energy) {
            if self.mood_seen.insert(key) {
                self.mood.push(MoodPoint {
                    x: valence,
                    y: energy,
                    name: track.name.clone(),
                    artist: track.first_artist().unwrap_or_default().to_string(),
                });
            }
        }

        self.rows.push(TrackRow {
            name: track.name.clone(),
            artist: track.joined_artists(),
            album: track.album.clone(),
            genres: track.genres.clone(),
            duration_ms: track.duration_ms,
            release_date: track.release_date.clone(),
            era: decade.map(era_label),
            time_of_day,
            popularity_bucket: popularity.map(|slot| POPULARITY_LABELS[slot]),
            tempo_bucket: tempo.map(|slot| TEMPO_LABELS[slot]),
            features: track.features.clone(),
        });
    }

    pub fn finish(self, playlist_name_override: Option<&str>) -> DashboardContext {
        let playlist_name = playlist_name_override
            .map(str::to_string)
            .or(self.first_playlist)
            .unwrap_or_else(|| UNKNOWN_PLAYLIST.to_string());

        let top_tracks = self.track_time.most_common(TOP_K)
            .into_iter()
            .map(|(key, ms)| TopTrack {
                album: self.track_info.get(&key)
                    .map(|info| info.album.clone())
                    .unwrap_or_default(),
                name: key.name,
                artist: key.artists,
                listening_time_hours: ms_to_hours(ms, 2),
            })
            .collect();

        // every listed artist gets the track's full duration
        let mut artist_time: Counter<String> = Counter::new();
        for (key, ms) in self.track_time.iter() {
            if let Some(info) = self.track_info.get(key) {
                for artist in info.artists.iter().filter(|a| !a.trim().is_empty()) {
                    artist_time.add(artist.clone(), ms);
                }
            }
        }
        let top_artists_by_duration = artist_time.most_common(TOP_K)
            .into_iter()
            .map(|(artist, ms)| ArtistListening {
                artist,
                listening_time_hours: ms_to_hours(ms, 2),
            })
            .collect();

        let mut avg_features = FeatureAverages::default();
        for (slot, feature) in Feature::ALL.iter().enumerate() {
            let count = self.feature_counts[slot];
            if count > 0 {
                avg_features.set(*feature, round_to(self.feature_sums[slot] / count as f64, 3));
            }
        }

        let time_of_day_counts = TimeOfDay::ALL.iter()
            .map(|tod| BucketCount::new(tod.label(), self.time_of_day[tod.slot()]))
            .collect();
        let era_counts = self.eras.iter()
            .map(|(&decade, &count)| BucketCount::new(era_label(decade), count))
            .collect();
        let popularity_counts = POPULARITY_LABELS.iter()
            .zip(self.popularity)
            .map(|(label, count)| BucketCount::new(*label, count))
            .collect();
        let tempo_counts = TEMPO_LABELS.iter()
            .zip(self.tempo)
            .map(|(label, count)| BucketCount::new(*label, count))
            .collect();

        let monthly_labels: Vec<String> = self.monthly_ms.keys().cloned().collect();
        let monthly_values = self.monthly_ms.values().map(|&ms| ms_to_hours(ms, 2)).collect();

        DashboardContext {
            playlist_name,
            total_tracks: self.total_tracks,
            total_listening_hours: ms_to_hours(self.total_ms, 3),
            top_artists: self.artists.most_common(TOP_K),
            top_tracks,
            top_artists_by_duration,
            avg_features,
            feature_labels: Feature::ALL.iter().map(|f| f.label()).collect(),
            top_genres: self.genres.most_common(TOP_K),
            distinct_genres: self.genres.len(),
            time_of_day_counts,
            era_counts,
            popularity_counts,
            tempo_counts,
            mood_data: self.mood,
            monthly_labels,
            monthly_values,
            tracks: self.rows,
        }
    }
}

pub fn build_dashboard_context<'a, I>(
    entries: I,
    playlist_name_override: Option<&str>
) -> DashboardContext
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut aggregator = Aggregator::new();
    for entry in entries {
        aggregator.push(entry);
    }
    aggregator.finish(playlist_name_override)
}
