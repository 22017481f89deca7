use serde::Serialize;

use crate::dataset::{MatchRecord, TossDecision};
use crate::metrics::pct;
use crate::scope::{Region, Scope, SeasonChoice};

/// Advantage (in percentage points) needed before the call leaves
/// Neutral.
pub const CALL_EDGE_PCT: f64 = 1.0;

/// What winning the toss and choosing to field amounts to.
pub fn strategy_label(decision: TossDecision) -> &'static str {
    match decision {
        TossDecision::Field => "Chase",
        TossDecision::Bat => "Defend",
        TossDecision::Unknown => "Unknown",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TossCall {
    Chase,
    Defend,
    Neutral,
}

impl TossCall {
    pub fn label(self) -> &'static str {
        match self {
            TossCall::Chase => "Chase",
            TossCall::Defend => "Defend",
            TossCall::Neutral => "Neutral",
        }
    }
}

/// A comparable slice of history: everything, one region, or one season.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    AllTime,
    Region(Region),
    Season(String),
}

impl Selection {
    pub fn label(&self) -> String {
        match self {
            Selection::AllTime => Scope::all_time().label(),
            Selection::Region(region) => region.label().to_string(),
            Selection::Season(season) => season.clone(),
        }
    }

    fn scope(&self) -> Scope {
        match self {
            Selection::AllTime => Scope::all_time(),
            Selection::Region(region) => Scope {
                region: *region,
                season: SeasonChoice::AllTime,
            },
            Selection::Season(season) => Scope {
                region: Region::All,
                season: SeasonChoice::Season(season.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TossSummary {
    pub label: String,
    pub matches: u64,
    pub decided: u64,
    pub toss_winner_win_pct: Option<f64>,
    pub toss_loser_win_pct: Option<f64>,
    pub chase_matches: u64,
    pub defend_matches: u64,
    pub chase_win_pct: Option<f64>,
    pub defend_win_pct: Option<f64>,
    pub chase_advantage: Option<f64>,
    pub call: TossCall,
}

/// Toss outcomes over one selection. No-result matches stay in every
/// denominator and never in a numerator, so percentages are conservative.
pub fn summarize(matches: &[MatchRecord], selection: &Selection) -> TossSummary {
    let scope = selection.scope();
    let mut n = 0u64;
    let mut decided = 0u64;
    let mut toss_wins = 0u64;
    let mut toss_losses = 0u64;
    let mut chase_n = 0u64;
    let mut chase_wins = 0u64;
    let mut defend_n = 0u64;
    let mut defend_wins = 0u64;

    for m in matches.iter().filter(|m| scope.keeps_match(m)) {
        n += 1;
        let winner = m.match_winner.as_deref();
        if winner.is_some() {
            decided += 1;
        }
        let toss_won = match (m.toss_winner.as_deref(), winner) {
            (Some(t), Some(w)) => Some(t == w),
            _ => None,
        };
        if toss_won == Some(true) {
            toss_wins += 1;
        }
        if toss_won == Some(false) {
            toss_losses += 1;
        }
        match m.toss_decision {
            TossDecision::Field => {
                chase_n += 1;
                if toss_won == Some(true) {
                    chase_wins += 1;
                }
            }
            TossDecision::Bat => {
                defend_n += 1;
                if toss_won == Some(true) {
                    defend_wins += 1;
                }
            }
            TossDecision::Unknown => {}
        }
    }

    let chase_win_pct = pct(chase_wins, chase_n);
    let defend_win_pct = pct(defend_wins, defend_n);
    let chase_advantage = match (chase_win_pct, defend_win_pct) {
        (Some(c), Some(d)) => Some(c - d),
        _ => None,
    };
    let call = match chase_advantage {
        Some(adv) if adv >= CALL_EDGE_PCT => TossCall::Chase,
        Some(adv) if adv <= -CALL_EDGE_PCT => TossCall::Defend,
        _ => TossCall::Neutral,
    };

    TossSummary {
        label: selection.label(),
        matches: n,
        decided,
        toss_winner_win_pct: pct(toss_wins, n),
        toss_loser_win_pct: pct(toss_losses, n),
        chase_matches: chase_n,
        defend_matches: defend_n,
        chase_win_pct,
        defend_win_pct,
        chase_advantage,
        call,
    }
}

/// Two selections side by side.
pub fn compare(
    matches: &[MatchRecord],
    a: &Selection,
    b: &Selection,
) -> (TossSummary, TossSummary) {
    (summarize(matches, a), summarize(matches, b))
}
