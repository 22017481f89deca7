use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::dataset::{BallRecord, MatchRecord};

pub const ALL_TIME_LABEL: &str = "All Time";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Region {
    All,
    India,
    Overseas,
}

impl Region {
    pub fn label(self) -> &'static str {
        match self {
            Region::All => "All Venues",
            Region::India => "India",
            Region::Overseas => "Overseas",
        }
    }

    fn keeps(self, venue_region: Option<&str>) -> bool {
        match self {
            Region::All => true,
            Region::India => venue_region.is_some_and(|r| r.eq_ignore_ascii_case("india")),
            Region::Overseas => venue_region.is_some_and(|r| r.eq_ignore_ascii_case("overseas")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SeasonChoice {
    AllTime,
    Season(String),
}

impl SeasonChoice {
    pub fn label(&self) -> &str {
        match self {
            SeasonChoice::AllTime => ALL_TIME_LABEL,
            SeasonChoice::Season(s) => s,
        }
    }

    fn keeps(&self, season: Option<&str>) -> bool {
        match self {
            SeasonChoice::AllTime => true,
            SeasonChoice::Season(want) => season.is_some_and(|s| s == want),
        }
    }
}

/// Request scope. Filtering is the caller's responsibility before any
/// aggregation; aggregates never peek at scope themselves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scope {
    pub region: Region,
    pub season: SeasonChoice,
}

impl Scope {
    pub fn all_time() -> Scope {
        Scope {
            region: Region::All,
            season: SeasonChoice::AllTime,
        }
    }

    pub fn label(&self) -> String {
        match (&self.region, &self.season) {
            (Region::All, SeasonChoice::AllTime) => ALL_TIME_LABEL.to_string(),
            (region, SeasonChoice::AllTime) => region.label().to_string(),
            (Region::All, season) => season.label().to_string(),
            (region, season) => format!("{} {}", region.label(), season.label()),
        }
    }

    pub fn keeps_ball(&self, ball: &BallRecord) -> bool {
        self.region.keeps(ball.venue_region.as_deref())
            && self.season.keeps(ball.season.as_deref())
    }

    pub fn keeps_match(&self, m: &MatchRecord) -> bool {
        self.region.keeps(m.venue_region.as_deref()) && self.season.keeps(m.season.as_deref())
    }
}

pub fn filter_balls(balls: &[BallRecord], scope: &Scope) -> Vec<BallRecord> {
    balls
        .iter()
        .filter(|b| scope.keeps_ball(b))
        .cloned()
        .collect()
}

pub fn filter_matches(matches: &[MatchRecord], scope: &Scope) -> Vec<MatchRecord> {
    matches
        .iter()
        .filter(|m| scope.keeps_match(m))
        .cloned()
        .collect()
}

/// Distinct seasons in ascending order.
pub fn seasons(balls: &[BallRecord]) -> Vec<String> {
    let set: BTreeSet<&str> = balls.iter().filter_map(|b| b.season.as_deref()).collect();
    let mut out: Vec<String> = set.into_iter().map(|s| s.to_string()).collect();
    out.sort_by_key(|s| season_key(s));
    out
}

/// Season choices for a selector: "All Time" first, then seasons ascending.
pub fn season_choices(balls: &[BallRecord]) -> Vec<SeasonChoice> {
    let mut out = vec![SeasonChoice::AllTime];
    out.extend(seasons(balls).into_iter().map(SeasonChoice::Season));
    out
}

/// Sort key that puts year-like seasons in numeric order and anything
/// else after them alphabetically. Handles split seasons like "2007/08"
/// by their leading year.
pub fn season_key(season: &str) -> (u8, u32, String) {
    let digits: String = season.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.len() == 4 {
        if let Ok(year) = digits.parse::<u32>() {
            return (0, year, season.to_string());
        }
    }
    (1, 0, season.to_string())
}
