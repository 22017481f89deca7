use std::collections::{HashMap, HashSet};

use serde::Serialize;

use crate::dataset::BallRecord;
use crate::metrics::pct;
use crate::phase::{Phase, REPORTED_PHASES};
use crate::scope::season_key;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OverviewTotals {
    pub matches: u64,
    pub balls: u64,
    pub runs: u64,
    pub seasons: u64,
}

/// Headline volumes for whatever slice of balls the caller passes in.
pub fn overview(balls: &[BallRecord]) -> OverviewTotals {
    let mut matches: HashSet<&str> = HashSet::new();
    let mut seasons: HashSet<&str> = HashSet::new();
    let mut runs = 0u64;
    for ball in balls {
        if let Some(id) = ball.match_id.as_deref() {
            matches.insert(id);
        }
        if let Some(season) = ball.season.as_deref() {
            seasons.insert(season);
        }
        runs += u64::from(ball.total_runs.unwrap_or(0));
    }
    OverviewTotals {
        matches: matches.len() as u64,
        balls: balls.len() as u64,
        runs,
        seasons: seasons.len() as u64,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonRow {
    pub season: String,
    pub matches: u64,
    pub balls: u64,
    pub total_runs: u64,
    pub batter_runs: u64,
}

/// Season-by-season volumes, oldest season first.
pub fn runs_by_season(balls: &[BallRecord]) -> Vec<SeasonRow> {
    #[derive(Default)]
    struct Acc {
        matches: HashSet<String>,
        balls: u64,
        total_runs: u64,
        batter_runs: u64,
    }

    let mut per: HashMap<String, Acc> = HashMap::new();
    for ball in balls {
        let Some(season) = ball.season.as_deref() else {
            continue;
        };
        let acc = per.entry(season.to_string()).or_default();
        acc.balls += 1;
        acc.total_runs += u64::from(ball.total_runs.unwrap_or(0));
        acc.batter_runs += u64::from(ball.batter_runs.unwrap_or(0));
        if let Some(id) = ball.match_id.as_deref() {
            if !acc.matches.contains(id) {
                acc.matches.insert(id.to_string());
            }
        }
    }

    let mut rows: Vec<SeasonRow> = per
        .into_iter()
        .map(|(season, acc)| SeasonRow {
            season,
            matches: acc.matches.len() as u64,
            balls: acc.balls,
            total_runs: acc.total_runs,
            batter_runs: acc.batter_runs,
        })
        .collect();
    rows.sort_by_key(|row| season_key(&row.season));
    rows
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseSplitRow {
    pub phase: Phase,
    pub runs: u64,
    pub balls: u64,
    pub run_share_pct: Option<f64>,
}

/// Run share across the three reported phases. Balls outside a 20-over
/// innings are left out, and an empty slice yields an empty split rather
/// than a row of NaNs.
pub fn phase_split(balls: &[BallRecord]) -> Vec<PhaseSplitRow> {
    let mut runs: HashMap<Phase, u64> = HashMap::new();
    let mut counts: HashMap<Phase, u64> = HashMap::new();
    for ball in balls {
        let Some(phase) = ball.phase() else {
            continue;
        };
        if phase == Phase::Other {
            continue;
        }
        *runs.entry(phase).or_insert(0) += u64::from(ball.total_runs.unwrap_or(0));
        *counts.entry(phase).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return Vec::new();
    }

    let total: u64 = runs.values().sum();
    REPORTED_PHASES
        .iter()
        .map(|&phase| {
            let phase_runs = runs.get(&phase).copied().unwrap_or(0);
            PhaseSplitRow {
                phase,
                runs: phase_runs,
                balls: counts.get(&phase).copied().unwrap_or(0),
                run_share_pct: pct(phase_runs, total),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ball(season: &str, match_id: &str, over: u32, total_runs: u32) -> BallRecord {
        BallRecord {
            match_id: Some(match_id.to_string()),
            season: Some(season.to_string()),
            venue: Some("Eden Gardens".to_string()),
            venue_region: Some("India".to_string()),
            innings: Some(1),
            over: Some(over),
            batter: Some("A".to_string()),
            bowler: Some("X".to_string()),
            batter_runs: Some(total_runs),
            extra_runs: Some(0),
            total_runs: Some(total_runs),
            is_wicket: false,
            wicket_kind: None,
            dismissed_batter: None,
            is_wide: false,
            is_no_ball: false,
        }
    }

    #[test]
    fn overview_counts_distinct_ids() {
        let balls = vec![
            ball("2019", "m1", 0, 4),
            ball("2019", "m1", 1, 1),
            ball("2020", "m2", 0, 6),
        ];
        let totals = overview(&balls);
        assert_eq!(totals.matches, 2);
        assert_eq!(totals.balls, 3);
        assert_eq!(totals.runs, 11);
        assert_eq!(totals.seasons, 2);
    }

    #[test]
    fn phase_shares_cover_reported_windows_only() {
        let balls = vec![
            ball("2019", "m1", 2, 10),
            ball("2019", "m1", 10, 30),
            ball("2019", "m1", 18, 60),
            // Super over runs never enter the split.
            ball("2019", "m1", 20, 12),
        ];
        let split = phase_split(&balls);
        assert_eq!(split.len(), 3);
        assert_eq!(split[0].phase, Phase::Powerplay);
        assert_eq!(split[0].run_share_pct, Some(10.0));
        assert_eq!(split[2].run_share_pct, Some(60.0));
        let total: f64 = split.iter().filter_map(|r| r.run_share_pct).sum();
        assert!((total - 100.0).abs() < 1e-9);
    }

    #[test]
    fn empty_split_for_empty_input() {
        assert!(phase_split(&[]).is_empty());
    }
}
