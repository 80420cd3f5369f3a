use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

/// Per-track audio analysis scores. `None` means the export had no
/// usable value, which is never the same as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioFeatures {
    pub danceability: Option<f64>,
    pub energy: Option<f64>,
    pub valence: Option<f64>,
    pub acousticness: Option<f64>,
    pub instrumentalness: Option<f64>,
    pub liveness: Option<f64>,
    pub speechiness: Option<f64>,
    pub tempo: Option<f64>,
    pub popularity: Option<u8>,
}

/// The seven bounded [0, 1] features that get averaged on the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    Danceability,
    Energy,
    Valence,
    Acousticness,
    Instrumentalness,
    Liveness,
    Speechiness,
}

impl Feature {
    pub const ALL: [Feature; 7] = [
        Feature::Danceability,
        Feature::Energy,
        Feature::Valence,
        Feature::Acousticness,
        Feature::Instrumentalness,
        Feature::Liveness,
        Feature::Speechiness,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Feature::Danceability     => "Danceability",
            Feature::Energy           => "Energy",
            Feature::Valence          => "Valence",
            Feature::Acousticness     => "Acousticness",
            Feature::Instrumentalness => "Instrumentalness",
            Feature::Liveness         => "Liveness",
            Feature::Speechiness      => "Speechiness",
        }
    }

    pub fn value(self, features: &AudioFeatures) -> Option<f64> {
        match self {
            Feature::Danceability     => features.danceability,
            Feature::Energy           => features.energy,
            Feature::Valence          => features.valence,
            Feature::Acousticness     => features.acousticness,
            Feature::Instrumentalness => features.instrumentalness,
            Feature::Liveness         => features.liveness,
            Feature::Speechiness      => features.speechiness,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub uri: String,
    pub name: String,
    pub artists: Vec<String>,
    pub album: String,
    pub duration_ms: Option<u64>,
    pub genres: Vec<String>,
    pub release_date: Option<String>,
    pub features: AudioFeatures,
}

impl Default for Track {
    fn default() -> Self {
        Self {
            uri: String::new(),
            name: UNKNOWN_TRACK.to_string(),
            artists: Vec::new(),
            album: UNKNOWN_ALBUM.to_string(),
            duration_ms: None,
            genres: Vec::new(),
            release_date: None,
            features: AudioFeatures::default(),
        }
    }
}

impl Track {
    pub fn first_artist(&self) -> Option<&str> {
        self.artists.first().map(String::as_str)
    }

    pub fn joined_artists(&self) -> String {
        self.artists.join(", ")
    }

    pub fn key(&self) -> TrackKey {
        TrackKey {
            name: self.name.clone(),
            artists: self.joined_artists(),
        }
    }
}

/// Aggregation identity of a track: name plus the joined artist string.
/// Two rows with equal keys are the same song no matter where they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TrackKey {
    pub name: String,
    pub artists: String,
}

/// One playlist-add event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub track: Track,
    pub added_at: Option<DateTime<FixedOffset>>,
    pub playlist_name: String,
}

impl Entry {
    pub fn new(track: Track, playlist_name: impl Into<String>) -> Self {
        Self { track, added_at: None, playlist_name: playlist_name.into() }
    }

    pub fn added_at(mut self, added_at: DateTime<FixedOffset>) -> Self {
        self.added_at = Some(added_at);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_joins_artists_in_listed_order() {
        let track = Track {
            name: "Breathe Deeper".to_string(),
            artists: vec!["Tame Impala".to_string(), "Lil Yachty".to_string()],
            ..Track::default()
        };
        let key = track.key();
        assert_eq!(key.name, "Breathe Deeper");
        assert_eq!(key.artists, "Tame Impala, Lil Yachty");
        assert_eq!(track.first_artist(), Some("Tame Impala"));
    }

    #[test]
    fn default_track_uses_placeholders() {
        let track = Track::default();
        assert_eq!(track.name, UNKNOWN_TRACK);
        assert_eq!(track.album, UNKNOWN_ALBUM);
        assert!(track.first_artist().is_none());
        assert_eq!(track.key().artists, "");
    }
}
