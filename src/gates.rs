use std::collections::{HashMap, HashSet};
use std::path::Path;

use log::warn;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::dataset::BallRecord;
use crate::error::KpiError;
use crate::leaderboard::GroupTotals;
use crate::metrics::Metric;
use crate::scope::SeasonChoice;

/// Stability gate families. Each KPI maps to one family; venue and toss
/// tables carry their own families with all-time and per-season tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateFamily {
    BattingVolume,
    BattingRate,
    BattingAverage,
    BowlingVolume,
    BowlingEconomy,
    BowlingAverage,
    PhaseRate,
    VenueBias,
    VenueBiasSeason,
    TossPattern,
    TossPatternSeason,
}

pub const ALL_FAMILIES: [GateFamily; 11] = [
    GateFamily::BattingVolume,
    GateFamily::BattingRate,
    GateFamily::BattingAverage,
    GateFamily::BowlingVolume,
    GateFamily::BowlingEconomy,
    GateFamily::BowlingAverage,
    GateFamily::PhaseRate,
    GateFamily::VenueBias,
    GateFamily::VenueBiasSeason,
    GateFamily::TossPattern,
    GateFamily::TossPatternSeason,
];

impl GateFamily {
    pub fn name(self) -> &'static str {
        match self {
            GateFamily::BattingVolume => "batting_volume",
            GateFamily::BattingRate => "batting_rate",
            GateFamily::BattingAverage => "batting_average",
            GateFamily::BowlingVolume => "bowling_volume",
            GateFamily::BowlingEconomy => "bowling_economy",
            GateFamily::BowlingAverage => "bowling_average",
            GateFamily::PhaseRate => "phase_rate",
            GateFamily::VenueBias => "venue_bias",
            GateFamily::VenueBiasSeason => "venue_bias_season",
            GateFamily::TossPattern => "toss_pattern",
            GateFamily::TossPatternSeason => "toss_pattern_season",
        }
    }

    pub fn from_name(name: &str) -> Option<GateFamily> {
        let lowered = name.trim().to_ascii_lowercase();
        ALL_FAMILIES.into_iter().find(|f| f.name() == lowered)
    }
}

/// Minimum volumes a group must reach before its metric is allowed to
/// rank. Applied before ranking, never after; a failing group is dropped
/// entirely.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateSpec {
    #[serde(default)]
    pub min_balls: u64,
    #[serde(default)]
    pub min_dismissals: u64,
    #[serde(default)]
    pub min_wickets: u64,
    #[serde(default)]
    pub min_matches: u64,
}

impl GateSpec {
    pub fn passes(&self, metric: Metric, totals: &GroupTotals) -> bool {
        metric.volume(totals) >= self.min_balls
            && totals.dismissals >= self.min_dismissals
            && totals.wickets >= self.min_wickets
            && totals.matches_played() >= self.min_matches
    }
}

/// Resolved thresholds per family. Compiled defaults, optionally
/// overridden row by row from `gates_config.csv`.
#[derive(Debug, Clone)]
pub struct GateConfig {
    families: HashMap<GateFamily, GateSpec>,
}

impl GateConfig {
    pub fn defaults() -> GateConfig {
        let mut families = HashMap::new();
        families.insert(GateFamily::BattingVolume, GateSpec::default());
        families.insert(
            GateFamily::BattingRate,
            GateSpec {
                min_balls: 60,
                ..GateSpec::default()
            },
        );
        families.insert(
            GateFamily::BattingAverage,
            GateSpec {
                min_balls: 300,
                min_dismissals: 15,
                ..GateSpec::default()
            },
        );
        families.insert(GateFamily::BowlingVolume, GateSpec::default());
        families.insert(
            GateFamily::BowlingEconomy,
            GateSpec {
                min_balls: 300,
                ..GateSpec::default()
            },
        );
        families.insert(
            GateFamily::BowlingAverage,
            GateSpec {
                min_balls: 300,
                min_wickets: 15,
                ..GateSpec::default()
            },
        );
        families.insert(
            GateFamily::PhaseRate,
            GateSpec {
                min_balls: 120,
                ..GateSpec::default()
            },
        );
        families.insert(
            GateFamily::VenueBias,
            GateSpec {
                min_matches: 20,
                ..GateSpec::default()
            },
        );
        families.insert(
            GateFamily::VenueBiasSeason,
            GateSpec {
                min_matches: 5,
                ..GateSpec::default()
            },
        );
        families.insert(
            GateFamily::TossPattern,
            GateSpec {
                min_matches: 25,
                ..GateSpec::default()
            },
        );
        families.insert(
            GateFamily::TossPatternSeason,
            GateSpec {
                min_matches: 5,
                ..GateSpec::default()
            },
        );
        GateConfig { families }
    }

    /// Defaults plus per-family overrides from a config table. Rows with
    /// an unrecognized family or an unreadable threshold are skipped with
    /// a warning; a skipped row leaves the default in place.
    pub fn load(path: &Path) -> Result<GateConfig, KpiError> {
        let mut config = GateConfig::defaults();
        let mut reader = crate::dataset::open_reader("gates_config", path)?;
        let headers = reader
            .headers()
            .map_err(|e| crate::dataset::csv_error("gates_config", path, e))?
            .clone();
        crate::dataset::check_columns(
            "gates_config",
            &headers,
            &[
                "family",
                "min_balls",
                "min_dismissals",
                "min_wickets",
                "min_matches",
            ],
        )?;

        for record in reader.deserialize::<RawGateRow>() {
            let raw = record.map_err(|e| crate::dataset::csv_error("gates_config", path, e))?;
            let Some(family) = GateFamily::from_name(&raw.family) else {
                warn!("gates_config: unknown family `{}` skipped", raw.family.trim());
                continue;
            };
            let spec = match parse_gate_row(&raw) {
                Some(spec) => spec,
                None => {
                    warn!("gates_config: unreadable thresholds for `{}` skipped", family.name());
                    continue;
                }
            };
            config.families.insert(family, spec);
        }
        Ok(config)
    }

    pub fn for_family(&self, family: GateFamily) -> GateSpec {
        self.families.get(&family).copied().unwrap_or_default()
    }

    pub fn for_metric(&self, metric: Metric) -> GateSpec {
        self.for_family(metric.family())
    }

    /// Venue chase/defend bias thresholds, relaxed for a single season.
    pub fn venue_bias_gate(&self, season: &SeasonChoice) -> GateSpec {
        match season {
            SeasonChoice::AllTime => self.for_family(GateFamily::VenueBias),
            SeasonChoice::Season(_) => self.for_family(GateFamily::VenueBiasSeason),
        }
    }

    /// Toss pattern thresholds, relaxed for a single season.
    pub fn toss_gate(&self, season: &SeasonChoice) -> GateSpec {
        match season {
            SeasonChoice::AllTime => self.for_family(GateFamily::TossPattern),
            SeasonChoice::Season(_) => self.for_family(GateFamily::TossPatternSeason),
        }
    }
}

static DEFAULT_GATES: Lazy<GateConfig> = Lazy::new(GateConfig::defaults);

/// Process-wide default thresholds.
pub fn default_gates() -> &'static GateConfig {
    &DEFAULT_GATES
}

#[derive(Debug, Deserialize)]
struct RawGateRow {
    #[serde(default)]
    family: String,
    #[serde(default)]
    min_balls: String,
    #[serde(default)]
    min_dismissals: String,
    #[serde(default)]
    min_wickets: String,
    #[serde(default)]
    min_matches: String,
}

fn parse_gate_row(raw: &RawGateRow) -> Option<GateSpec> {
    Some(GateSpec {
        min_balls: parse_threshold(&raw.min_balls)?,
        min_dismissals: parse_threshold(&raw.min_dismissals)?,
        min_wickets: parse_threshold(&raw.min_wickets)?,
        min_matches: parse_threshold(&raw.min_matches)?,
    })
}

fn parse_threshold(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if s.is_empty() {
        return Some(0);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 => Some(v as u64),
        _ => None,
    }
}

/// Career experience bins by lifetime match count. The upper edge of
/// each bin is inclusive, matching the dashboard labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ExperienceBucket {
    UpTo25,
    UpTo50,
    UpTo75,
    Beyond75,
}

pub const ALL_BUCKETS: [ExperienceBucket; 4] = [
    ExperienceBucket::UpTo25,
    ExperienceBucket::UpTo50,
    ExperienceBucket::UpTo75,
    ExperienceBucket::Beyond75,
];

impl ExperienceBucket {
    pub fn label(self) -> &'static str {
        match self {
            ExperienceBucket::UpTo25 => "1-25",
            ExperienceBucket::UpTo50 => "26-50",
            ExperienceBucket::UpTo75 => "51-75",
            ExperienceBucket::Beyond75 => "75+",
        }
    }
}

pub fn bucket_for(matches: u64) -> ExperienceBucket {
    match matches {
        0..=25 => ExperienceBucket::UpTo25,
        26..=50 => ExperienceBucket::UpTo50,
        51..=75 => ExperienceBucket::UpTo75,
        _ => ExperienceBucket::Beyond75,
    }
}

/// Lifetime matches per player across the full unscoped ball table.
/// A player is "in" a match when they batted or bowled at least one ball
/// of it.
pub fn career_matches(balls: &[BallRecord]) -> HashMap<String, u64> {
    let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();
    for ball in balls {
        let Some(match_id) = ball.match_id.as_deref() else {
            continue;
        };
        if let Some(batter) = ball.batter.as_deref() {
            seen.entry(batter).or_default().insert(match_id);
        }
        if let Some(bowler) = ball.bowler.as_deref() {
            seen.entry(bowler).or_default().insert(match_id);
        }
    }
    seen.into_iter()
        .map(|(name, ids)| (name.to_string(), ids.len() as u64))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_edges() {
        assert_eq!(bucket_for(0), ExperienceBucket::UpTo25);
        assert_eq!(bucket_for(25), ExperienceBucket::UpTo25);
        assert_eq!(bucket_for(26), ExperienceBucket::UpTo50);
        assert_eq!(bucket_for(50), ExperienceBucket::UpTo50);
        assert_eq!(bucket_for(51), ExperienceBucket::UpTo75);
        assert_eq!(bucket_for(75), ExperienceBucket::UpTo75);
        assert_eq!(bucket_for(76), ExperienceBucket::Beyond75);
        assert_eq!(bucket_for(200), ExperienceBucket::Beyond75);
    }

    #[test]
    fn family_names_round_trip() {
        for family in ALL_FAMILIES {
            assert_eq!(GateFamily::from_name(family.name()), Some(family));
        }
        assert_eq!(GateFamily::from_name("nonsense"), None);
    }

    #[test]
    fn default_thresholds() {
        let gates = GateConfig::defaults();
        let avg = gates.for_family(GateFamily::BattingAverage);
        assert_eq!(avg.min_balls, 300);
        assert_eq!(avg.min_dismissals, 15);
        let eco = gates.for_family(GateFamily::BowlingEconomy);
        assert_eq!(eco.min_balls, 300);
        assert_eq!(eco.min_wickets, 0);
        assert_eq!(gates.for_family(GateFamily::VenueBias).min_matches, 20);
        assert_eq!(
            gates
                .venue_bias_gate(&SeasonChoice::Season("2019".to_string()))
                .min_matches,
            5
        );
        assert_eq!(gates.toss_gate(&SeasonChoice::AllTime).min_matches, 25);
    }

    #[test]
    fn threshold_parsing() {
        assert_eq!(parse_threshold(""), Some(0));
        assert_eq!(parse_threshold("120"), Some(120));
        assert_eq!(parse_threshold("120.0"), Some(120));
        assert_eq!(parse_threshold("lots"), None);
        assert_eq!(parse_threshold("-5"), None);
    }

    #[test]
    fn career_counting_spans_both_roles() {
        use crate::dataset::BallRecord;
        let mut balls = Vec::new();
        for match_id in ["m1", "m2", "m3"] {
            balls.push(BallRecord {
                match_id: Some(match_id.to_string()),
                season: Some("2023".to_string()),
                venue: None,
                venue_region: None,
                innings: Some(1),
                over: Some(0),
                batter: Some("A".to_string()),
                bowler: Some("X".to_string()),
                batter_runs: Some(0),
                extra_runs: Some(0),
                total_runs: Some(0),
                is_wicket: false,
                wicket_kind: None,
                dismissed_batter: None,
                is_wide: false,
                is_no_ball: false,
            });
        }
        // A also bowls in m1, which must not double count the match.
        balls.push(BallRecord {
            batter: Some("X".to_string()),
            bowler: Some("A".to_string()),
            ..balls[0].clone()
        });
        let career = career_matches(&balls);
        assert_eq!(career.get("A"), Some(&3));
        assert_eq!(career.get("X"), Some(&3));
    }
}
