//!
//! src/demo.rs
//!
//! Synthetic playlist for trying the dashboard without an export.
//! Features loosely follow each track's primary genre.
//!

use chrono::{DateTime, Duration, FixedOffset, Local};
use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

use crate::types::{AudioFeatures, Entry, Track};

pub const DEMO_PLAYLIST: &str = "Demo Playlist";
pub const DEMO_SIZE: usize = 50;

const GENRES: [&str; 8] = [
    "Pop", "Rock", "Hip Hop", "Jazz", "Electronic", "Classical", "Indie", "R&B",
];
const ARTISTS: [&str; 10] = [
    "The Cosmic Rays", "Lunar Echoes", "Neon Pulse", "Velvet Shadows",
    "Crystal Tides", "Retro Wave", "Midnight Drivers", "Solar Flares",
    "Quantum Beats", "Stellar Drifters",
];
const ALBUMS: [&str; 8] = [
    "First Contact", "Dark Side of the Moon Base", "Electric Dreams",
    "Neon Nights", "Future Nostalgia", "Retrograde", "Stardust", "Gravity",
];

fn demo_features(primary_genre: &str, rng: &mut impl Rng) -> AudioFeatures {
    let (energy, danceability, acousticness) = match primary_genre {
        "Electronic" | "Pop" | "Hip Hop" => (
            rng.gen_range(0.6..0.95),
            rng.gen_range(0.6..0.9),
            rng.gen_range(0.0..0.3),
        ),
        "Classical" | "Jazz" => (
            rng.gen_range(0.1..0.5),
            rng.gen_range(0.2..0.5),
            rng.gen_range(0.7..1.0),
        ),
        _ => (
            rng.gen_range(0.3..0.8),
            rng.gen_range(0.3..0.7),
            rng.gen_range(0.1..0.6),
        ),
    };
    let instrumentalness = match primary_genre {
        "Electronic" | "Classical" => rng.gen_range(0.0..0.8),
        _ => rng.gen_range(0.0..0.1),
    };

    AudioFeatures {
        danceability: Some(danceability),
        energy: Some(energy),
        valence: Some(rng.gen_range(0.1..0.9)),
        acousticness: Some(acousticness),
        instrumentalness: Some(instrumentalness),
        liveness: Some(rng.gen_range(0.05..0.3)),
        speechiness: Some(rng.gen_range(0.03..0.2)),
        tempo: Some(rng.gen_range(60.0..180.0)),
        popularity: Some(rng.gen_range(20..=90)),
    }
}

/// Fifty entries with one to three genres each, release dates spread
/// over roughly fifty years and add dates within the year before `now`.
pub fn generate_dummy_data(rng: &mut impl Rng, now: DateTime<FixedOffset>) -> Vec<Entry> {
    let today = now.date_naive();

    (0..DEMO_SIZE)
        .map(|i| {
            let genre_count = rng.gen_range(1..=3);
            let genres: Vec<String> = GENRES
                .choose_multiple(rng, genre_count)
                .map(|g| g.to_string())
                .collect();
            let primary = genres.first().map(String::as_str).unwrap_or("Pop");
            let artist = ARTISTS.choose(rng).copied().unwrap_or(ARTISTS[0]);
            let album = ALBUMS.choose(rng).copied().unwrap_or(ALBUMS[0]);
            let features = demo_features(primary, rng);

            let released = today - Duration::days(rng.gen_range(0..=18_000));
            let track = Track {
                uri: format!("spotify:track:dummy{i}"),
                name: format!("Track {} - {primary} Vibes", i + 1),
                artists: vec![artist.to_string()],
                album: album.to_string(),
                duration_ms: Some(rng.gen_range(120_000..=300_000)),
                release_date: Some(released.format("%Y-%m-%d").to_string()),
                genres,
                features,
            };

            let added_at = now - Duration::days(rng.gen_range(0..=365));
            Entry::new(track, DEMO_PLAYLIST).added_at(added_at)
        })
        .collect()
}

/// Demo data from a fresh entropy-seeded generator.
pub fn demo_entries() -> Vec<Entry> {
    let mut rng = SmallRng::from_entropy();
    generate_dummy_data(&mut rng, Local::now().fixed_offset())
}
