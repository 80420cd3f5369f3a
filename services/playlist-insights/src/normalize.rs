//!
//! src/normalize.rs
//!
//! Turns a raw Exportify CSV upload into `Entry` values. Unknown or
//! malformed cells become `None`; only the file shape itself can fail.
//!

use std::borrow::Cow;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::InsightsError;
use crate::types::{AudioFeatures, Entry, Track, UNKNOWN_ALBUM, UNKNOWN_TRACK};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// One row as Exportify writes it. Every column is optional so exports
/// with fewer columns still load.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExportifyRow {
    #[serde(rename = "Track URI")]
    track_uri: Option<String>,
    #[serde(rename = "Track Name")]
    track_name: Option<String>,
    #[serde(rename = "Album Name")]
    album_name: Option<String>,
    #[serde(rename = "Artist Name(s)")]
    artist_names: Option<String>,
    #[serde(rename = "Added At")]
    added_at: Option<String>,
    #[serde(rename = "Duration (ms)")]
    duration_ms: Option<String>,
    #[serde(rename = "Genres")]
    genres: Option<String>,
    #[serde(rename = "Danceability")]
    danceability: Option<String>,
    #[serde(rename = "Energy")]
    energy: Option<String>,
    #[serde(rename = "Valence")]
    valence: Option<String>,
    #[serde(rename = "Acousticness")]
    acousticness: Option<String>,
    #[serde(rename = "Instrumentalness")]
    instrumentalness: Option<String>,
    #[serde(rename = "Liveness")]
    liveness: Option<String>,
    #[serde(rename = "Speechiness")]
    speechiness: Option<String>,
    #[serde(rename = "Tempo")]
    tempo: Option<String>,
    #[serde(rename = "Popularity")]
    popularity: Option<String>,
    #[serde(rename = "Release Date")]
    release_date: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn safe_int(value: Option<&str>) -> Option<i64> {
    value?.trim().parse::<i64>().ok()
}

fn safe_float(value: Option<&str>) -> Option<f64> {
    value?.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
}

fn split_list(value: Option<&str>, separator: char) -> Vec<String> {
    value.unwrap_or_default()
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 3339 first (`Z` included), then offset-less forms read as UTC.
pub fn parse_added_at(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts);
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc().fixed_offset());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Base name without directories or the final extension.
pub fn playlist_name_from(file_name: &str) -> String {
    let base = file_name.rsplit(['/', '\\']).next().unwrap_or(file_name);
    match base.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem.to_string(),
        _ => base.to_string(),
    }
}

fn ensure_csv(file_name: &str) -> Result<(), InsightsError> {
    let is_csv = file_name.rsplit_once('.')
        .map(|(_, ext)| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false);
    if is_csv {
        Ok(())
    } else {
        Err(InsightsError::UnsupportedFileType(file_name.to_string()))
    }
}

/// UTF-8 (BOM stripped) when valid, otherwise each byte read as Latin-1.
fn decode(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        Err(e) => {
            warn!(error = %e, "normalize.latin1_fallback");
            Cow::Owned(bytes.iter().map(|&b| b as char).collect())
        }
    }
}

impl ExportifyRow {
    fn into_entry(self, playlist_name: &str) -> Entry {
        let features = AudioFeatures {
            danceability: safe_float(self.danceability.as_deref()),
            energy: safe_float(self.energy.as_deref()),
            valence: safe_float(self.valence.as_deref()),
            acousticness: safe_float(self.acousticness.as_deref()),
            instrumentalness: safe_float(self.instrumentalness.as_deref()),
            liveness: safe_float(self.liveness.as_deref()),
            speechiness: safe_float(self.speechiness.as_deref()),
            tempo: safe_float(self.tempo.as_deref()),
            popularity: safe_int(self.popularity.as_deref())
                .and_then(|p| u8::try_from(p).ok())
                .filter(|p| *p <= 100),
        };

        let track = Track {
            uri: self.track_uri.unwrap_or_default().trim().to_string(),
            name: non_empty(self.track_name).unwrap_or_else(|| UNKNOWN_TRACK.to_string()),
            artists: split_list(self.artist_names.as_deref(), ';'),
            album: non_empty(self.album_name).unwrap_or_else(|| UNKNOWN_ALBUM.to_string()),
            duration_ms: safe_int(self.duration_ms.as_deref())
                .and_then(|ms| u64::try_from(ms).ok()),
            genres: split_list(self.genres.as_deref(), ','),
            release_date: non_empty(self.release_date),
            features,
        };

        Entry {
            track,
            added_at: self.added_at.as_deref().and_then(parse_added_at),
            playlist_name: playlist_name.to_string(),
        }
    }
}

/// Parse an Exportify export. Fails only for a non-CSV file name or a
/// structurally broken CSV; bad cells never abort the import.
pub fn parse_exportify_csv(bytes: &[u8], file_name: &str) -> Result<Vec<Entry>, InsightsError> {
    ensure_csv(file_name)?;
    let playlist_name = playlist_name_from(file_name);
    let text = decode(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let mut entries = Vec::new();
    for row in reader.deserialize::<ExportifyRow>() {
        entries.push(row?.into_entry(&playlist_name));
    }

    debug!(rows = entries.len(), playlist = %playlist_name, "normalize.done");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    const HEADER: &str = "Track URI,Track Name,Album Name,Artist Name(s),Added At,\
Duration (ms),Genres,Danceability,Energy,Valence,Acousticness,Instrumentalness,\
Liveness,Speechiness,Tempo,Popularity,Release Date";

    #[test]
    fn full_row_is_mapped() -> Result<(), InsightsError> {
        let csv = format!(
            "{HEADER}\nspotify:track:1,Breathe Deeper,Currents,Tame Impala; Lil Yachty,\
2023-04-01T08:15:00Z,372000,\"psychedelic rock, indie\",0.6,0.7,0.8,0.1,0.2,0.3,0.04,121.5,77,2015-07-17\n"
        );
        let entries = parse_exportify_csv(csv.as_bytes(), "exports/Road Trip.csv")?;
        assert_eq!(entries.len(), 1);

        let e = &entries[0];
        assert_eq!(e.playlist_name, "Road Trip");
        assert_eq!(e.track.uri, "spotify:track:1");
        assert_eq!(e.track.artists, vec!["Tame Impala", "Lil Yachty"]);
        assert_eq!(e.track.genres, vec!["psychedelic rock", "indie"]);
        assert_eq!(e.track.duration_ms, Some(372_000));
        assert_eq!(e.track.features.tempo, Some(121.5));
        assert_eq!(e.track.features.popularity, Some(77));
        assert_eq!(e.track.release_date.as_deref(), Some("2015-07-17"));
        assert_eq!(e.added_at.map(|ts| ts.hour()), Some(8));
        Ok(())
    }

    #[test]
    fn latin1_bytes_fall_back() -> Result<(), InsightsError> {
        let content = b"Track URI,Track Name,Album Name,Artist Name(s)\nspotify:track:1,Song \xe9,Album A,Artist A";
        let entries = parse_exportify_csv(content, "latin1.csv")?;
        assert_eq!(entries[0].track.name, "Song é");
        assert_eq!(entries[0].track.artists, vec!["Artist A"]);
        Ok(())
    }

    #[test]
    fn bom_is_stripped_from_first_header() -> Result<(), InsightsError> {
        let mut content = UTF8_BOM.to_vec();
        content.extend_from_slice(b"Track URI,Track Name\nspotify:track:9,Hello\n");
        let entries = parse_exportify_csv(&content, "bom.csv")?;
        assert_eq!(entries[0].track.uri, "spotify:track:9");
        Ok(())
    }

    #[test]
    fn invalid_numbers_become_unknown() -> Result<(), InsightsError> {
        let content = "Track URI,Track Name,Album Name,Artist Name(s),Duration (ms),Danceability,Popularity\n\
spotify:track:1,Song A,Album A,Artist A,invalid_int,invalid_float,250\n";
        let entries = parse_exportify_csv(content.as_bytes(), "invalid_numbers.csv")?;
        let track = &entries[0].track;
        assert_eq!(track.duration_ms, None);
        assert_eq!(track.features.danceability, None);
        assert_eq!(track.features.popularity, None);
        assert_eq!(entries[0].added_at, None);
        Ok(())
    }

    #[test]
    fn missing_cells_use_placeholders() -> Result<(), InsightsError> {
        let content = "Track URI,Track Name,Album Name,Artist Name(s)\nspotify:track:2,,,\n";
        let entries = parse_exportify_csv(content.as_bytes(), "blank.CSV")?;
        let track = &entries[0].track;
        assert_eq!(track.name, UNKNOWN_TRACK);
        assert_eq!(track.album, UNKNOWN_ALBUM);
        assert!(track.artists.is_empty());
        Ok(())
    }

    #[test]
    fn non_csv_is_rejected() {
        let err = parse_exportify_csv(b"whatever", "notes.txt");
        assert!(matches!(err, Err(InsightsError::UnsupportedFileType(_))));
        let err = parse_exportify_csv(b"whatever", "no_extension");
        assert!(matches!(err, Err(InsightsError::UnsupportedFileType(ref f)) if f == "no_extension"));
    }

    #[test]
    fn header_only_yields_no_entries() -> Result<(), InsightsError> {
        assert!(parse_exportify_csv(HEADER.as_bytes(), "empty.csv")?.is_empty());
        Ok(())
    }

    #[test]
    fn added_at_formats() {
        let with_offset = parse_added_at("2023-01-01T23:30:00+02:00");
        assert_eq!(with_offset.map(|ts| ts.hour()), Some(23));
        assert_eq!(parse_added_at("2023-01-01 06:00:00").map(|ts| ts.hour()), Some(6));
        assert_eq!(parse_added_at("2023-01-01").map(|ts| ts.hour()), Some(0));
        assert_eq!(parse_added_at("yesterday"), None);
        assert_eq!(parse_added_at(""), None);
    }

    #[test]
    fn playlist_names() {
        assert_eq!(playlist_name_from("C:\\music\\Gym.Mix.csv"), "Gym.Mix");
        assert_eq!(playlist_name_from("plain.csv"), "plain");
        assert_eq!(playlist_name_from(".csv"), ".csv");
    }
}
