//!
//! src/vibe.rs
//!
//! Maps averaged audio features onto one descriptive label.
//! Rules are checked top to bottom and the first match wins.
//!

use serde::Serialize;

use crate::stats::{DashboardContext, FeatureAverages};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "&'static str")]
pub enum Vibe {
    HighVoltageParty,
    ClubDancefloor,
    WorkoutPumpUp,
    Melancholy,
    CoffeeShopAcoustic,
    ChillGoodVibes,
    GroovyFunky,
    FocusStudy,
    MoodyDark,
    EclecticMix,
}

impl Vibe {
    pub fn label(self) -> &'static str {
        match self {
            Vibe::HighVoltageParty   => "High-voltage party",
            Vibe::ClubDancefloor     => "Club/dancefloor",
            Vibe::WorkoutPumpUp      => "Workout/pump-up",
            Vibe::Melancholy         => "Melancholy",
            Vibe::CoffeeShopAcoustic => "Coffee-shop/acoustic",
            Vibe::ChillGoodVibes     => "Chill/good vibes",
            Vibe::GroovyFunky        => "Groovy/funky",
            Vibe::FocusStudy         => "Focus/study",
            Vibe::MoodyDark          => "Moody/dark",
            Vibe::EclecticMix        => "Eclectic mix",
        }
    }
}

impl From<Vibe> for &'static str {
    fn from(vibe: Vibe) -> Self {
        vibe.label()
    }
}

impl std::fmt::Display for Vibe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown averages are already 0 in `FeatureAverages`, so an absent
/// feature reads as "low".
pub fn classify_features(avg: &FeatureAverages) -> Vibe {
    let energy = avg.energy;
    let valence = avg.valence;
    let dance = avg.danceability;

    if energy > 0.75 && valence > 0.6 {
        Vibe::HighVoltageParty
    } else if energy > 0.7 && dance > 0.7 {
        Vibe::ClubDancefloor
    } else if energy > 0.8 {
        Vibe::WorkoutPumpUp
    } else if energy < 0.4 && valence < 0.35 {
        Vibe::Melancholy
    } else if avg.acousticness > 0.7 && energy < 0.5 {
        Vibe::CoffeeShopAcoustic
    } else if energy < 0.55 && valence > 0.6 {
        Vibe::ChillGoodVibes
    } else if dance > 0.75 {
        Vibe::GroovyFunky
    } else if avg.instrumentalness > 0.5 {
        Vibe::FocusStudy
    } else if energy > 0.6 && valence < 0.4 {
        Vibe::MoodyDark
    } else {
        Vibe::EclecticMix
    }
}

/// An empty playlist has nothing to classify.
pub fn classify(ctx: &DashboardContext) -> Vibe {
    if ctx.total_tracks == 0 {
        return Vibe::EclecticMix;
    }
    classify_features(&ctx.avg_features)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn avg(energy: f64, valence: f64, dance: f64) -> FeatureAverages {
        FeatureAverages {
            energy,
            valence,
            danceability: dance,
            ..FeatureAverages::default()
        }
    }

    #[test]
    fn each_rule_fires_in_isolation() {
        assert_eq!(classify_features(&avg(0.9, 0.9, 0.0)), Vibe::HighVoltageParty);
        assert_eq!(classify_features(&avg(0.72, 0.5, 0.8)), Vibe::ClubDancefloor);
        assert_eq!(classify_features(&avg(0.85, 0.5, 0.1)), Vibe::WorkoutPumpUp);
        assert_eq!(classify_features(&avg(0.3, 0.2, 0.1)), Vibe::Melancholy);

        let mut coffee = avg(0.45, 0.5, 0.1);
        coffee.acousticness = 0.8;
        assert_eq!(classify_features(&coffee), Vibe::CoffeeShopAcoustic);

        assert_eq!(classify_features(&avg(0.5, 0.7, 0.1)), Vibe::ChillGoodVibes);
        assert_eq!(classify_features(&avg(0.6, 0.5, 0.8)), Vibe::GroovyFunky);

        let mut focus = avg(0.6, 0.5, 0.1);
        focus.instrumentalness = 0.6;
        assert_eq!(classify_features(&focus), Vibe::FocusStudy);

        assert_eq!(classify_features(&avg(0.65, 0.3, 0.1)), Vibe::MoodyDark);
        assert_eq!(classify_features(&avg(0.5, 0.5, 0.5)), Vibe::EclecticMix);
    }

    #[test]
    fn comparisons_are_strict_at_thresholds() {
        // energy=0.75, valence=0.6 misses rule 1 and every later rule
        assert_eq!(classify_features(&avg(0.75, 0.6, 0.0)), Vibe::EclecticMix);
        // energy=0.7, dance=0.7 misses rule 2
        assert_eq!(classify_features(&avg(0.7, 0.5, 0.7)), Vibe::EclecticMix);
        // energy=0.8 misses rule 3
        assert_eq!(classify_features(&avg(0.8, 0.5, 0.0)), Vibe::EclecticMix);
        // energy=0.4 misses rule 4
        assert_eq!(classify_features(&avg(0.4, 0.34, 0.0)), Vibe::EclecticMix);
        // dance=0.75 misses rule 7
        assert_eq!(classify_features(&avg(0.5, 0.5, 0.75)), Vibe::EclecticMix);
    }

    #[test]
    fn earlier_rules_shadow_later_ones() {
        // matches rules 1, 2 and 3; rule 1 wins
        assert_eq!(classify_features(&avg(0.9, 0.9, 0.9)), Vibe::HighVoltageParty);
        // matches rules 4 and 5; rule 4 wins
        let mut both = avg(0.2, 0.1, 0.0);
        both.acousticness = 0.9;
        assert_eq!(classify_features(&both), Vibe::Melancholy);
    }

    #[test]
    fn all_zero_features_read_as_melancholy() {
        assert_eq!(classify_features(&FeatureAverages::default()), Vibe::Melancholy);
    }

    #[test]
    fn serializes_as_label() -> Result<(), serde_json::Error> {
        assert_eq!(serde_json::to_string(&Vibe::ClubDancefloor)?, "\"Club/dancefloor\"");
        assert_eq!(Vibe::FocusStudy.to_string(), "Focus/study");
        Ok(())
    }
}
