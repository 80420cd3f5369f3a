//!
//! src/insights.rs
//!
//! Short observations about a playlist, one rule block per dimension.
//! Blocks run in a fixed order, each adds at most one line, and the
//! result is cut to the first `MAX_INSIGHTS` lines.
//!

use crate::stats::{bucket_count, BucketCount, DashboardContext};

pub const MAX_INSIGHTS: usize = 7;
pub const NOT_ENOUGH_DATA: &str = "Not enough data for insights.";

fn share(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}

/// Largest bucket; the first one wins a tie.
fn dominant(buckets: &[BucketCount]) -> Option<&BucketCount> {
    buckets.iter()
        .filter(|b| b.count > 0)
        .fold(None, |best: Option<&BucketCount>, b| match best {
            Some(current) if current.count >= b.count => Some(current),
            _ => Some(b),
        })
}

fn artist_insight(ctx: &DashboardContext) -> Option<String> {
    let (artist, count) = ctx.top_artists.first()?;
    let pct = share(*count, ctx.total_tracks);
    if pct > 20.0 {
        Some(format!(
            "You're a super-fan of {artist}: {pct:.0}% of your tracks are theirs."
        ))
    } else if pct > 5.0 {
        Some(format!("{artist} is your top artist with {count} tracks."))
    } else {
        None
    }
}

fn genre_insight(ctx: &DashboardContext) -> Option<String> {
    let (genre, count) = ctx.top_genres.first()?;
    let pct = share(*count, ctx.total_tracks);
    if pct > 40.0 {
        Some(format!(
            "Your playlist is heavily {genre}-focused ({pct:.0}% of tracks)."
        ))
    } else {
        Some(format!("Your top genre is {genre}."))
    }
}

fn era_insight(ctx: &DashboardContext) -> Option<String> {
    let era = dominant(&ctx.era_counts)?;
    let pct = share(era.count, ctx.total_tracks);
    if pct > 50.0 {
        Some(format!(
            "You're stuck in the {}! {pct:.0}% of your tracks come from that decade.",
            era.label
        ))
    } else {
        Some(format!("Most of your tracks are from the {}.", era.label))
    }
}

fn popularity_insight(ctx: &DashboardContext) -> Option<String> {
    let obscure = share(bucket_count(&ctx.popularity_counts, "0-20"), ctx.total_tracks);
    let mainstream = share(bucket_count(&ctx.popularity_counts, "81-100"), ctx.total_tracks);
    if obscure > 30.0 {
        Some(format!(
            "You have underground taste: {obscure:.0}% of your tracks are deep obscurities."
        ))
    } else if mainstream > 50.0 {
        Some(format!(
            "You love mainstream hits: {mainstream:.0}% of your tracks are chart regulars."
        ))
    } else {
        None
    }
}

fn tempo_insight(ctx: &DashboardContext) -> Option<String> {
    let fast = share(bucket_count(&ctx.tempo_counts, ">140 BPM"), ctx.total_tracks);
    let slow = share(bucket_count(&ctx.tempo_counts, "<80 BPM"), ctx.total_tracks);
    if fast > 30.0 {
        Some(format!("High energy! {fast:.0}% of your tracks have fast tempos over 140 BPM."))
    } else if slow > 30.0 {
        Some(format!("Slow & steady: {slow:.0}% of your tracks sit under 80 BPM."))
    } else {
        None
    }
}

fn mood_insight(ctx: &DashboardContext) -> Option<String> {
    let valence = ctx.avg_features.valence;
    if valence > 0.65 {
        Some("Your playlist is positive & cheerful.".to_string())
    } else if valence < 0.4 {
        Some("Your playlist leans melancholy.".to_string())
    } else {
        None
    }
}

fn energy_insight(ctx: &DashboardContext) -> Option<String> {
    (ctx.avg_features.energy > 0.7)
        .then(|| "This is a high-energy playlist!".to_string())
}

pub fn generate_insights(ctx: &DashboardContext) -> Vec<String> {
    if ctx.total_tracks == 0 {
        return vec![NOT_ENOUGH_DATA.to_string()];
    }

    let blocks: [fn(&DashboardContext) -> Option<String>; 7] = [
        artist_insight,
        genre_insight,
        era_insight,
        popularity_insight,
        tempo_insight,
        mood_insight,
        energy_insight,
    ];

    let mut insights: Vec<String> = blocks.iter()
        .filter_map(|block| block(ctx))
        .collect();
    insights.truncate(MAX_INSIGHTS);
    insights
}
