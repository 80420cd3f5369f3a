//!
//! src/recommend.rs
//!
//! Encouragement and suggestion lines built from a second, lighter pass
//! over the entries. Independent of the dashboard aggregator.
//!

use chrono::Timelike;

use crate::counter::Counter;
use crate::stats::{round_to, TimeOfDay};
use crate::types::Entry;

pub const FALLBACK: &str = "🎧 Keep exploring music! Your library is growing.";

const HIGH_ENERGY: f64 = 0.7;
const MIN_TIME_OF_DAY_ADDS: u64 = 5;

#[derive(Debug, Default)]
struct Tally {
    track_count: u64,
    total_ms: u64,
    artists: Counter<String>,
    genres: Counter<String>,
    time_of_day: [u64; 4],
    high_energy: u64,
    tempo_sum: f64,
    tempo_known: u64,
}

impl Tally {
    fn push(&mut self, entry: &Entry) {
        let track = &entry.track;
        self.track_count += 1;
        self.total_ms += track.duration_ms.unwrap_or(0);

        for artist in track.artists.iter().filter(|a| !a.trim().is_empty()) {
            self.artists.add(artist.clone(), 1);
        }
        for genre in track.genres.iter().map(|g| g.trim()).filter(|g| !g.is_empty()) {
            self.genres.add(genre.to_string(), 1);
        }
        if let Some(ts) = entry.added_at {
            self.time_of_day[TimeOfDay::from_hour(ts.hour()).slot()] += 1;
        }
        if track.features.energy.is_some_and(|e| e > HIGH_ENERGY) {
            self.high_energy += 1;
        }
        // zero tempos stay in the denominator here, unlike the tempo histogram
        if let Some(tempo) = track.features.tempo {
            self.tempo_sum += tempo;
            self.tempo_known += 1;
        }
    }

    fn count_at(&self, tod: TimeOfDay) -> u64 {
        self.time_of_day[tod.slot()]
    }
}

fn time_of_day_message(tally: &Tally) -> Option<&'static str> {
    let morning = tally.count_at(TimeOfDay::Morning);
    let evening = tally.count_at(TimeOfDay::Evening);
    let night = tally.count_at(TimeOfDay::Night);
    let max = tally.time_of_day.iter().copied().max().unwrap_or(0);

    // afternoon has no message of its own
    if max == morning && morning >= MIN_TIME_OF_DAY_ADDS {
        Some("☀️ You're a morning music curator! Create an energizing wake-up playlist.")
    } else if max == evening && evening >= MIN_TIME_OF_DAY_ADDS {
        Some("🌙 Evening is your music discovery time. Perfect for unwinding with new finds.")
    } else if max == night && night >= MIN_TIME_OF_DAY_ADDS {
        Some("🌃 Late night listener! Your nocturnal sessions deserve a dedicated chill playlist.")
    } else {
        None
    }
}

pub fn build_recommendations<'a, I>(entries: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a Entry>,
{
    let mut tally = Tally::default();
    for entry in entries {
        tally.push(entry);
    }

    let mut recs = Vec::new();
    let track_count = tally.track_count as f64;

    let total_hours = round_to(tally.total_ms as f64 / 3_600_000.0, 1);
    if total_hours > 10.0 {
        recs.push(format!(
            "🎵 You've listened to {total_hours:.1} hours of music! That's dedication to your craft."
        ));
    }

    if let Some((artist, count)) = tally.artists.top() {
        let percentage = round_to(count as f64 / track_count * 100.0, 1);
        if percentage >= 15.0 {
            recs.push(format!(
                "🎤 {artist} makes up {percentage:.1}% of your library. Consider exploring their deep cuts and B-sides."
            ));
        } else if count >= 5 {
            recs.push(format!(
                "🎸 You're a fan of {artist}. Check out similar artists in the same genre."
            ));
        }
    }

    if let Some((top_genre, _)) = tally.genres.top() {
        let total_genres = tally.genres.len();
        if total_genres >= 10 {
            recs.push(format!(
                "🌈 You have {total_genres} different genres! Your taste is wonderfully eclectic."
            ));
        } else if total_genres <= 3 {
            recs.push(format!(
                "🎯 Your music is focused on {top_genre}. Try branching out to discover new sounds."
            ));
        }
    }

    if let Some(message) = time_of_day_message(&tally) {
        recs.push(message.to_string());
    }

    let high_energy = tally.high_energy as f64;
    if high_energy > track_count * 0.6 {
        recs.push("⚡ Your library is high-energy! Balance it out with some mellow tracks for variety."
            .to_string());
    } else if high_energy < track_count * 0.3 {
        recs.push("😌 You prefer chill vibes. Add some upbeat tracks for when you need a boost."
            .to_string());
    }

    let avg_tempo = if tally.tempo_known > 0 {
        tally.tempo_sum / tally.tempo_known as f64
    } else {
        0.0
    };
    if avg_tempo > 120.0 {
        recs.push("🏃‍♂️ High Tempo! Great for workouts.".to_string());
    }

    if recs.is_empty() {
        recs.push(FALLBACK.to_string());
    }
    recs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at_hour, entry, entry_with, track};

    #[test]
    fn empty_input_gets_fallback_only() {
        let empty: Vec<Entry> = Vec::new();
        assert_eq!(build_recommendations(&empty), vec![FALLBACK.to_string()]);
    }

    #[test]
    fn five_adds_by_one_artist() {
        let entries: Vec<Entry> = (0..5)
            .map(|_| entry("Song X", &["Top Artist"]).added_at(at_hour(12)))
            .collect();
        let recs = build_recommendations(&entries);
        assert!(recs.iter().any(|r| r.contains("Top Artist")));
        assert!(recs[0].contains("100.0%"));
        // afternoon dominates but has no message
        assert!(!recs.iter().any(|r| r.contains("morning") || r.contains("Evening")));
    }

    #[test]
    fn morning_curator() {
        let entries: Vec<Entry> = (0..5)
            .map(|i| entry(&format!("t{i}"), &["X"]).added_at(at_hour(8)))
            .collect();
        let recs = build_recommendations(&entries);
        assert!(recs.iter().any(|r| r.contains("morning")));
    }

    #[test]
    fn time_of_day_needs_five_and_checks_in_order() {
        let four: Vec<Entry> = (0..4)
            .map(|i| entry(&format!("t{i}"), &[]).added_at(at_hour(21)))
            .collect();
        assert!(!build_recommendations(&four).iter().any(|r| r.contains("Evening")));

        // afternoon max with a tie on evening: evening message wins
        let mut tied: Vec<Entry> = (0..6)
            .map(|i| entry(&format!("a{i}"), &[]).added_at(at_hour(14)))
            .collect();
        tied.extend((0..6).map(|i| entry(&format!("e{i}"), &[]).added_at(at_hour(20))));
        assert!(build_recommendations(&tied).iter().any(|r| r.contains("Evening")));

        let night: Vec<Entry> = (0..5)
            .map(|i| entry(&format!("n{i}"), &[]).added_at(at_hour(2)))
            .collect();
        assert!(build_recommendations(&night).iter().any(|r| r.contains("Late night")));
    }

    #[test]
    fn high_tempo_tracks() {
        let entries: Vec<Entry> = (0..5)
            .map(|i| {
                let mut t = track(&format!("Fast Song {i}"), &[]);
                t.features.tempo = Some(150.0);
                entry_with(t).added_at(at_hour(12))
            })
            .collect();
        let recs = build_recommendations(&entries);
        assert!(recs.iter().any(|r| r.contains("High Tempo")));
    }

    #[test]
    fn zero_tempo_drags_the_average_down() {
        let entries: Vec<Entry> = [130.0, 0.0].iter()
            .map(|&tempo| {
                let mut t = track("t", &[]);
                t.features.tempo = Some(tempo);
                entry_with(t)
            })
            .collect();
        assert!(!build_recommendations(&entries).iter().any(|r| r.contains("High Tempo")));

        let mut unknown = entries.clone();
        unknown[1].track.features.tempo = None;
        assert!(build_recommendations(&unknown).iter().any(|r| r.contains("High Tempo")));
    }

    #[test]
    fn energy_balance_messages() {
        let energetic: Vec<Entry> = (0..10)
            .map(|i| {
                let mut t = track(&format!("t{i}"), &[]);
                t.features.energy = Some(0.9);
                entry_with(t)
            })
            .collect();
        let recs = build_recommendations(&energetic);
        assert!(recs.iter().any(|r| r.contains("Balance it out")));

        let mellow: Vec<Entry> = (0..10)
            .map(|i| entry(&format!("t{i}"), &[]))
            .collect();
        let recs = build_recommendations(&mellow);
        assert!(recs.iter().any(|r| r.contains("chill vibes")));
    }

    #[test]
    fn genre_breadth_messages() {
        let wide: Vec<Entry> = (0..10)
            .map(|i| {
                let mut t = track(&format!("t{i}"), &[]);
                t.genres = vec![format!("genre{i}")];
                entry_with(t)
            })
            .collect();
        assert!(build_recommendations(&wide).iter().any(|r| r.contains("10 different genres")));

        let mut narrow = wide.clone();
        for e in narrow.iter_mut() {
            e.track.genres = vec!["Jazz".to_string()];
        }
        assert!(build_recommendations(&narrow).iter().any(|r| r.contains("focused on Jazz")));
    }

    #[test]
    fn long_listening_gets_dedication_message() {
        let entries: Vec<Entry> = (0..4)
            .map(|i| {
                let mut t = track(&format!("t{i}"), &[]);
                t.duration_ms = Some(3 * 3_600_000);
                entry_with(t)
            })
            .collect();
        let recs = build_recommendations(&entries);
        assert!(recs[0].contains("12.0 hours"));
    }

    #[test]
    fn fan_message_when_share_is_low_but_count_is_high() {
        let mut entries: Vec<Entry> = (0..5)
            .map(|i| entry(&format!("f{i}"), &["Fav"]))
            .collect();
        entries.extend((0..30).map(|i| entry(&format!("o{i}"), &[])));
        let recs = build_recommendations(&entries);
        assert!(recs.iter().any(|r| r.starts_with("🎸 You're a fan of Fav.")));
    }
}
