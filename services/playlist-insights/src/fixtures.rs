//! Entry builders shared by the unit tests.

use chrono::{DateTime, FixedOffset, NaiveDate};

use crate::types::{AudioFeatures, Entry, Track};

pub fn track(name: &str, artists: &[&str]) -> Track {
    Track {
        uri: format!("spotify:track:{}", name.replace(' ', "_")),
        name: name.to_string(),
        artists: artists.iter().map(|a| a.to_string()).collect(),
        album: "Album X".to_string(),
        ..Track::default()
    }
}

pub fn entry(name: &str, artists: &[&str]) -> Entry {
    Entry::new(track(name, artists), "Playlist")
}

pub fn entry_with(track: Track) -> Entry {
    Entry::new(track, "Playlist")
}

pub fn at_hour(hour: u32) -> DateTime<FixedOffset> {
    NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
        .expect("valid fixture timestamp")
}

pub fn features(energy: f64, valence: f64) -> AudioFeatures {
    AudioFeatures {
        energy: Some(energy),
        valence: Some(valence),
        ..AudioFeatures::default()
    }
}
