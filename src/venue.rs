use std::collections::{HashMap, HashSet};

use log::warn;
use serde::Serialize;

use crate::dataset::{BallRecord, MatchRecord, TossDecision};
use crate::gates::GateSpec;
use crate::metrics::pct;

/// Chase-minus-defend edge (percentage points) before a venue gets a
/// non-neutral recommendation.
pub const BIAS_EDGE_PCT: f64 = 8.0;
pub const TOSS_HIGH_PCT: f64 = 55.0;
pub const TOSS_LOW_PCT: f64 = 45.0;
pub const PREFERENCE_EDGE_PCT: f64 = 10.0;
pub const QUALITY_GOOD_PCT: f64 = 2.0;
pub const QUALITY_OKAY_PCT: f64 = 5.0;
/// An innings needs this many deliveries to count as completed.
pub const COMPLETED_INNINGS_MIN_BALLS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueSummaryRow {
    pub venue: String,
    pub matches: u64,
    pub avg_match_runs: Option<f64>,
    pub avg_run_rate: Option<f64>,
}

/// Per-venue volume and scoring pace, busiest venues first.
pub fn venue_summary(balls: &[BallRecord]) -> Vec<VenueSummaryRow> {
    #[derive(Default)]
    struct Acc {
        matches: HashSet<String>,
        total_runs: u64,
        legal_balls: u64,
    }

    let mut per: HashMap<String, Acc> = HashMap::new();
    let mut skipped = 0u64;
    for ball in balls {
        let Some(venue) = ball.venue.as_deref() else {
            skipped += 1;
            continue;
        };
        let acc = per.entry(venue.to_string()).or_default();
        if let Some(id) = ball.match_id.as_deref() {
            if !acc.matches.contains(id) {
                acc.matches.insert(id.to_string());
            }
        }
        acc.total_runs += u64::from(ball.total_runs.unwrap_or(0));
        if ball.bowler_legal() {
            acc.legal_balls += 1;
        }
    }
    if skipped > 0 {
        warn!("{skipped} balls skipped in venue summary: null venue");
    }

    let mut rows: Vec<VenueSummaryRow> = per
        .into_iter()
        .map(|(venue, acc)| {
            let matches = acc.matches.len() as u64;
            let avg_match_runs = if matches == 0 {
                None
            } else {
                Some(acc.total_runs as f64 / matches as f64)
            };
            let avg_run_rate = if acc.legal_balls == 0 {
                None
            } else {
                Some(acc.total_runs as f64 / (acc.legal_balls as f64 / 6.0))
            };
            VenueSummaryRow {
                venue,
                matches,
                avg_match_runs,
                avg_run_rate,
            }
        })
        .collect();
    rows.sort_by(|a, b| b.matches.cmp(&a.matches).then_with(|| a.venue.cmp(&b.venue)));
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BiasCall {
    Chase,
    Defend,
    Neutral,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueBiasRow {
    pub venue: String,
    pub matches: u64,
    pub chase_win_pct: f64,
    pub defend_win_pct: f64,
    pub other_pct: f64,
    pub delta: f64,
    pub call: BiasCall,
    pub signal: f64,
}

/// Did the side batting second win? `None` when the match has no result
/// or the toss decision is unknown.
fn winner_chased(m: &MatchRecord) -> Option<bool> {
    let winner = m.match_winner.as_deref()?;
    let toss_winner = m.toss_winner.as_deref()?;
    match m.toss_decision {
        TossDecision::Field => Some(winner == toss_winner),
        TossDecision::Bat => Some(winner != toss_winner),
        TossDecision::Unknown => None,
    }
}

pub fn bias_call_for(delta: f64) -> BiasCall {
    if delta >= BIAS_EDGE_PCT {
        BiasCall::Chase
    } else if delta <= -BIAS_EDGE_PCT {
        BiasCall::Defend
    } else {
        BiasCall::Neutral
    }
}

/// Chase versus defend records per venue, strongest signal first. Venues
/// under the gate's match floor are dropped before anything is ranked.
pub fn chase_defend_bias(matches: &[MatchRecord], gate: &GateSpec) -> Vec<VenueBiasRow> {
    #[derive(Default)]
    struct Acc {
        n: u64,
        chase: u64,
        defend: u64,
    }

    let mut per: HashMap<String, Acc> = HashMap::new();
    for m in matches {
        let Some(venue) = m.venue.as_deref() else {
            continue;
        };
        let acc = per.entry(venue.to_string()).or_default();
        acc.n += 1;
        match winner_chased(m) {
            Some(true) => acc.chase += 1,
            Some(false) => acc.defend += 1,
            None => {}
        }
    }

    let mut rows: Vec<VenueBiasRow> = per
        .into_iter()
        .filter(|(_, acc)| acc.n >= gate.min_matches)
        .map(|(venue, acc)| {
            let chase_win_pct = pct(acc.chase, acc.n).unwrap_or(0.0);
            let defend_win_pct = pct(acc.defend, acc.n).unwrap_or(0.0);
            let other_pct = pct(acc.n - acc.chase - acc.defend, acc.n).unwrap_or(0.0);
            let delta = chase_win_pct - defend_win_pct;
            VenueBiasRow {
                venue,
                matches: acc.n,
                chase_win_pct,
                defend_win_pct,
                other_pct,
                delta,
                call: bias_call_for(delta),
                signal: delta.abs(),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.signal
            .partial_cmp(&a.signal)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.matches.cmp(&a.matches))
            .then_with(|| a.venue.cmp(&b.venue))
    });
    rows
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TossImpact {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DecisionLean {
    FieldFirst,
    BatFirst,
    Balanced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataQuality {
    Good,
    Okay,
    Caution,
}

pub fn impact_for(toss_winner_win_pct: f64) -> TossImpact {
    if toss_winner_win_pct >= TOSS_HIGH_PCT {
        TossImpact::High
    } else if toss_winner_win_pct <= TOSS_LOW_PCT {
        TossImpact::Low
    } else {
        TossImpact::Moderate
    }
}

pub fn lean_for(preference: f64) -> DecisionLean {
    if preference >= PREFERENCE_EDGE_PCT {
        DecisionLean::FieldFirst
    } else if preference <= -PREFERENCE_EDGE_PCT {
        DecisionLean::BatFirst
    } else {
        DecisionLean::Balanced
    }
}

pub fn quality_for(unknown_decision_pct: f64) -> DataQuality {
    if unknown_decision_pct <= QUALITY_GOOD_PCT {
        DataQuality::Good
    } else if unknown_decision_pct <= QUALITY_OKAY_PCT {
        DataQuality::Okay
    } else {
        DataQuality::Caution
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TossInfluenceRow {
    pub venue: String,
    pub matches: u64,
    pub toss_winner_win_pct: f64,
    pub impact: TossImpact,
    pub field_first_pct: f64,
    pub bat_first_pct: f64,
    pub preference: f64,
    pub lean: DecisionLean,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TossInfluence {
    pub rows: Vec<TossInfluenceRow>,
    pub unknown_decision_pct: f64,
    pub quality: DataQuality,
}

/// How much the toss matters per venue, plus a scope-wide data-quality
/// grade driven by the share of unreadable toss decisions.
pub fn toss_influence(matches: &[MatchRecord], gate: &GateSpec) -> TossInfluence {
    #[derive(Default)]
    struct Acc {
        n: u64,
        toss_wins: u64,
        field_first: u64,
        bat_first: u64,
    }

    let mut per: HashMap<String, Acc> = HashMap::new();
    let mut total = 0u64;
    let mut unknown = 0u64;
    for m in matches {
        total += 1;
        if m.toss_decision == TossDecision::Unknown {
            unknown += 1;
        }
        let Some(venue) = m.venue.as_deref() else {
            continue;
        };
        let acc = per.entry(venue.to_string()).or_default();
        acc.n += 1;
        if let (Some(t), Some(w)) = (m.toss_winner.as_deref(), m.match_winner.as_deref()) {
            if t == w {
                acc.toss_wins += 1;
            }
        }
        match m.toss_decision {
            TossDecision::Field => acc.field_first += 1,
            TossDecision::Bat => acc.bat_first += 1,
            TossDecision::Unknown => {}
        }
    }

    let mut rows: Vec<TossInfluenceRow> = per
        .into_iter()
        .filter(|(_, acc)| acc.n >= gate.min_matches)
        .map(|(venue, acc)| {
            let toss_winner_win_pct = pct(acc.toss_wins, acc.n).unwrap_or(0.0);
            let field_first_pct = pct(acc.field_first, acc.n).unwrap_or(0.0);
            let bat_first_pct = pct(acc.bat_first, acc.n).unwrap_or(0.0);
            let preference = field_first_pct - bat_first_pct;
            TossInfluenceRow {
                venue,
                matches: acc.n,
                toss_winner_win_pct,
                impact: impact_for(toss_winner_win_pct),
                field_first_pct,
                bat_first_pct,
                preference,
                lean: lean_for(preference),
            }
        })
        .collect();
    rows.sort_by(|a, b| {
        b.toss_winner_win_pct
            .partial_cmp(&a.toss_winner_win_pct)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.venue.cmp(&b.venue))
    });

    let unknown_decision_pct = pct(unknown, total).unwrap_or(0.0);
    TossInfluence {
        rows,
        unknown_decision_pct,
        quality: quality_for(unknown_decision_pct),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InningsTotal {
    pub match_id: String,
    pub venue: String,
    pub season: String,
    pub innings: u8,
    pub runs: u64,
    pub deliveries: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InningsExtremes {
    pub highest: InningsTotal,
    pub lowest: InningsTotal,
}

/// Highest and lowest completed innings totals. Only first and second
/// innings count, and an abandoned start never makes the board.
pub fn innings_extremes(balls: &[BallRecord]) -> Option<InningsExtremes> {
    #[derive(Default)]
    struct Acc {
        runs: u64,
        deliveries: u64,
        venue: String,
        season: String,
    }

    let mut per: HashMap<(String, u8), Acc> = HashMap::new();
    for ball in balls {
        let (Some(id), Some(innings)) = (ball.match_id.as_deref(), ball.innings) else {
            continue;
        };
        if innings != 1 && innings != 2 {
            continue;
        }
        let acc = per.entry((id.to_string(), innings)).or_default();
        acc.deliveries += 1;
        acc.runs += u64::from(ball.total_runs.unwrap_or(0));
        if acc.venue.is_empty() {
            if let Some(v) = ball.venue.as_deref() {
                acc.venue = v.to_string();
            }
        }
        if acc.season.is_empty() {
            if let Some(s) = ball.season.as_deref() {
                acc.season = s.to_string();
            }
        }
    }

    let mut completed: Vec<InningsTotal> = per
        .into_iter()
        .filter(|(_, acc)| acc.deliveries >= COMPLETED_INNINGS_MIN_BALLS)
        .map(|((match_id, innings), acc)| InningsTotal {
            match_id,
            venue: acc.venue,
            season: acc.season,
            innings,
            runs: acc.runs,
            deliveries: acc.deliveries,
        })
        .collect();
    if completed.is_empty() {
        return None;
    }
    completed.sort_by(|a, b| {
        b.runs
            .cmp(&a.runs)
            .then_with(|| a.match_id.cmp(&b.match_id))
            .then_with(|| a.innings.cmp(&b.innings))
    });
    let highest = completed.first()?.clone();
    let lowest = completed.last()?.clone();
    Some(InningsExtremes { highest, lowest })
}
