use serde::{Deserialize, Serialize};

use crate::gates::GateFamily;
use crate::leaderboard::GroupTotals;

/// Innings score that counts as a "consistent" outing.
pub const CONSISTENT_SCORE: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Polarity {
    HigherBetter,
    LowerBetter,
}

/// The KPI catalog. Each metric knows its sort polarity, which gate
/// family protects it, and how to evaluate itself from group totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    Runs,
    StrikeRate,
    BattingAverage,
    BattingDotPct,
    BoundaryDependencyPct,
    StrikeRotationPct,
    ConsistencyPct,
    Wickets,
    Economy,
    BowlingAverage,
    BowlingStrikeRate,
    BowlingDotPct,
}

pub const ALL_METRICS: [Metric; 12] = [
    Metric::Runs,
    Metric::StrikeRate,
    Metric::BattingAverage,
    Metric::BattingDotPct,
    Metric::BoundaryDependencyPct,
    Metric::StrikeRotationPct,
    Metric::ConsistencyPct,
    Metric::Wickets,
    Metric::Economy,
    Metric::BowlingAverage,
    Metric::BowlingStrikeRate,
    Metric::BowlingDotPct,
];

impl Metric {
    pub fn label(self) -> &'static str {
        match self {
            Metric::Runs => "Runs",
            Metric::StrikeRate => "Strike Rate",
            Metric::BattingAverage => "Batting Average",
            Metric::BattingDotPct => "Dot Ball %",
            Metric::BoundaryDependencyPct => "Boundary Dependency %",
            Metric::StrikeRotationPct => "Strike Rotation %",
            Metric::ConsistencyPct => "20+ Consistency %",
            Metric::Wickets => "Wickets",
            Metric::Economy => "Economy",
            Metric::BowlingAverage => "Bowling Average",
            Metric::BowlingStrikeRate => "Bowling Strike Rate",
            Metric::BowlingDotPct => "Bowling Dot Ball %",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Metric::Runs => "runs",
            Metric::StrikeRate => "strike-rate",
            Metric::BattingAverage => "batting-average",
            Metric::BattingDotPct => "dot-pct",
            Metric::BoundaryDependencyPct => "boundary-pct",
            Metric::StrikeRotationPct => "rotation-pct",
            Metric::ConsistencyPct => "consistency",
            Metric::Wickets => "wickets",
            Metric::Economy => "economy",
            Metric::BowlingAverage => "bowling-average",
            Metric::BowlingStrikeRate => "bowling-strike-rate",
            Metric::BowlingDotPct => "bowling-dot-pct",
        }
    }

    pub fn from_name(name: &str) -> Option<Metric> {
        let lowered = name.trim().to_ascii_lowercase();
        ALL_METRICS.into_iter().find(|m| m.name() == lowered)
    }

    pub fn polarity(self) -> Polarity {
        match self {
            Metric::Runs
            | Metric::StrikeRate
            | Metric::BattingAverage
            | Metric::BoundaryDependencyPct
            | Metric::StrikeRotationPct
            | Metric::ConsistencyPct
            | Metric::Wickets
            | Metric::BowlingDotPct => Polarity::HigherBetter,
            Metric::BattingDotPct
            | Metric::Economy
            | Metric::BowlingAverage
            | Metric::BowlingStrikeRate => Polarity::LowerBetter,
        }
    }

    pub fn family(self) -> GateFamily {
        match self {
            Metric::Runs => GateFamily::BattingVolume,
            Metric::StrikeRate
            | Metric::BattingDotPct
            | Metric::BoundaryDependencyPct
            | Metric::StrikeRotationPct
            | Metric::ConsistencyPct => GateFamily::BattingRate,
            Metric::BattingAverage => GateFamily::BattingAverage,
            Metric::Wickets => GateFamily::BowlingVolume,
            Metric::Economy | Metric::BowlingDotPct => GateFamily::BowlingEconomy,
            Metric::BowlingAverage | Metric::BowlingStrikeRate => GateFamily::BowlingAverage,
        }
    }

    pub fn is_bowling(self) -> bool {
        matches!(
            self,
            Metric::Wickets
                | Metric::Economy
                | Metric::BowlingAverage
                | Metric::BowlingStrikeRate
                | Metric::BowlingDotPct
        )
    }

    /// The volume counter this metric is judged on: balls faced for the
    /// batting side, legal balls bowled for the bowling side.
    pub fn volume(self, totals: &GroupTotals) -> u64 {
        if self.is_bowling() {
            totals.legal_balls
        } else {
            totals.balls_faced
        }
    }

    /// Evaluate against accumulated totals. A zero denominator yields
    /// `None`, never a division by zero.
    pub fn value(self, totals: &GroupTotals) -> Option<f64> {
        match self {
            Metric::Runs => Some(totals.runs as f64),
            Metric::StrikeRate => ratio(totals.runs, totals.balls_faced).map(|r| r * 100.0),
            Metric::BattingAverage => ratio(totals.runs, totals.dismissals),
            Metric::BattingDotPct => ratio(totals.dots, totals.balls_faced).map(|r| r * 100.0),
            Metric::BoundaryDependencyPct => {
                ratio(totals.boundary_runs, totals.runs).map(|r| r * 100.0)
            }
            Metric::StrikeRotationPct => {
                ratio(totals.rotation_balls, totals.balls_faced).map(|r| r * 100.0)
            }
            Metric::ConsistencyPct => {
                let innings = totals.innings_played();
                if innings == 0 {
                    return None;
                }
                let made = totals.innings_with_at_least(CONSISTENT_SCORE);
                Some(made as f64 / innings as f64 * 100.0)
            }
            Metric::Wickets => Some(totals.wickets as f64),
            Metric::Economy => {
                if totals.legal_balls == 0 {
                    return None;
                }
                Some(totals.runs_conceded as f64 / (totals.legal_balls as f64 / 6.0))
            }
            Metric::BowlingAverage => ratio(totals.runs_conceded, totals.wickets),
            Metric::BowlingStrikeRate => ratio(totals.legal_balls, totals.wickets),
            Metric::BowlingDotPct => ratio(totals.dots, totals.legal_balls).map(|r| r * 100.0),
        }
    }

    pub fn display(self, value: Option<f64>) -> String {
        let Some(v) = value else {
            return "-".to_string();
        };
        match self {
            Metric::Runs | Metric::Wickets => format_indian_number(v.round() as i64),
            Metric::BattingDotPct
            | Metric::BoundaryDependencyPct
            | Metric::StrikeRotationPct
            | Metric::ConsistencyPct
            | Metric::BowlingDotPct => format!("{v:.1}%"),
            Metric::StrikeRate
            | Metric::BattingAverage
            | Metric::Economy
            | Metric::BowlingAverage
            | Metric::BowlingStrikeRate => format!("{v:.2}"),
        }
    }
}

fn ratio(num: u64, den: u64) -> Option<f64> {
    if den == 0 {
        None
    } else {
        Some(num as f64 / den as f64)
    }
}

/// Percentage with an explicit null on an empty denominator.
pub fn pct(num: u64, den: u64) -> Option<f64> {
    ratio(num, den).map(|r| r * 100.0)
}

/// Indian digit grouping: last three digits, then pairs. 12345678
/// renders as 1,23,45,678.
pub fn format_indian_number(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let formatted = if digits.len() <= 3 {
        digits
    } else {
        let (head, tail) = digits.split_at(digits.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut idx = head.len();
        while idx > 2 {
            groups.push(&head[idx - 2..idx]);
            idx -= 2;
        }
        groups.push(&head[..idx]);
        groups.reverse();
        format!("{},{}", groups.join(","), tail)
    };
    if n < 0 {
        format!("-{formatted}")
    } else {
        formatted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indian_grouping() {
        assert_eq!(format_indian_number(0), "0");
        assert_eq!(format_indian_number(999), "999");
        assert_eq!(format_indian_number(1000), "1,000");
        assert_eq!(format_indian_number(12345), "12,345");
        assert_eq!(format_indian_number(123456), "1,23,456");
        assert_eq!(format_indian_number(12345678), "1,23,45,678");
        assert_eq!(format_indian_number(-54321), "-54,321");
    }

    #[test]
    fn names_round_trip() {
        for metric in ALL_METRICS {
            assert_eq!(Metric::from_name(metric.name()), Some(metric));
        }
        assert_eq!(Metric::from_name("no-such-metric"), None);
    }

    #[test]
    fn polarity_assignments() {
        assert_eq!(Metric::StrikeRate.polarity(), Polarity::HigherBetter);
        assert_eq!(Metric::Economy.polarity(), Polarity::LowerBetter);
        assert_eq!(Metric::BattingDotPct.polarity(), Polarity::LowerBetter);
        assert_eq!(Metric::BowlingDotPct.polarity(), Polarity::HigherBetter);
    }

    #[test]
    fn zero_denominators_are_none() {
        let totals = GroupTotals::default();
        assert_eq!(Metric::StrikeRate.value(&totals), None);
        assert_eq!(Metric::BattingAverage.value(&totals), None);
        assert_eq!(Metric::Economy.value(&totals), None);
        assert_eq!(Metric::ConsistencyPct.value(&totals), None);
        assert_eq!(Metric::Runs.value(&totals), Some(0.0));
    }
}
