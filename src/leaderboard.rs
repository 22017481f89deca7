use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use log::warn;
use serde::Serialize;

use crate::dataset::BallRecord;
use crate::error::KpiError;
use crate::gates::{ExperienceBucket, GateConfig, GateSpec, bucket_for};
use crate::metrics::{Metric, Polarity, format_indian_number};
use crate::phase::Phase;

/// Fields a leaderboard can group on. Multi-field keys are allowed, e.g.
/// batter plus phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupField {
    Batter,
    Bowler,
    Venue,
    Season,
    Region,
    Phase,
}

/// Ordered key parts, one per requested group field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct GroupKey(pub Vec<String>);

impl GroupKey {
    pub fn label(&self) -> String {
        self.0.join(" / ")
    }
}

/// Volume counters and outcome sums accumulated per group. Metrics read
/// these; nothing here divides, so zero-volume groups stay representable.
#[derive(Debug, Default, Clone)]
pub struct GroupTotals {
    pub deliveries: u64,
    pub balls_faced: u64,
    pub legal_balls: u64,
    pub runs: u64,
    pub boundary_runs: u64,
    pub dots: u64,
    pub rotation_balls: u64,
    pub dismissals: u64,
    pub wickets: u64,
    pub runs_conceded: u64,
    pub total_runs: u64,
    matches: HashSet<String>,
    innings_runs: HashMap<(String, u8), u64>,
}

impl GroupTotals {
    /// Fold one delivery in. Dismissals are attributed by the caller
    /// since the dismissed batter is not always the striker.
    pub fn add(&mut self, ball: &BallRecord) {
        self.deliveries += 1;
        let batter_runs = u64::from(ball.batter_runs.unwrap_or(0));
        let total = u64::from(ball.total_runs.unwrap_or(0));
        self.total_runs += total;
        if let Some(id) = ball.match_id.as_deref() {
            if !self.matches.contains(id) {
                self.matches.insert(id.to_string());
            }
        }
        if ball.faced() {
            self.balls_faced += 1;
            self.runs += batter_runs;
            if total == 0 {
                self.dots += 1;
            }
            if (1..=3).contains(&batter_runs) {
                self.rotation_balls += 1;
            }
            if ball.is_boundary() {
                self.boundary_runs += batter_runs;
            }
            if let (Some(id), Some(innings)) = (ball.match_id.as_deref(), ball.innings) {
                *self
                    .innings_runs
                    .entry((id.to_string(), innings))
                    .or_insert(0) += batter_runs;
            }
        }
        if ball.bowler_legal() {
            self.legal_balls += 1;
        }
        self.runs_conceded += u64::from(ball.runs_conceded());
        if ball.bowler_wicket() {
            self.wickets += 1;
        }
    }

    pub fn matches_played(&self) -> u64 {
        self.matches.len() as u64
    }

    pub fn innings_played(&self) -> u64 {
        self.innings_runs.len() as u64
    }

    pub fn innings_with_at_least(&self, runs: u64) -> u64 {
        self.innings_runs.values().filter(|&&r| r >= runs).count() as u64
    }
}

/// Optional secondary filter over career experience. Independent of the
/// stability gate; lifetime counts come from the unscoped ball table.
#[derive(Debug, Clone)]
pub struct BucketFilter {
    pub include: Vec<ExperienceBucket>,
    pub career_matches: HashMap<String, u64>,
}

impl BucketFilter {
    pub fn keeps(&self, player: &str) -> bool {
        let matches = self.career_matches.get(player).copied().unwrap_or(0);
        self.include.contains(&bucket_for(matches))
    }
}

pub const VOLUME_ADJUST_EXPONENT: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankStrategy {
    /// Order by the metric value alone.
    ByMetric,
    /// Weight the metric by volume^exponent so a rate held over a large
    /// sample outranks the same rate over a small one. The exponent is a
    /// knob; nothing may depend on its exact value.
    VolumeAdjusted { exponent: f64 },
}

impl Default for RankStrategy {
    fn default() -> RankStrategy {
        RankStrategy::ByMetric
    }
}

impl RankStrategy {
    pub fn volume_adjusted() -> RankStrategy {
        RankStrategy::VolumeAdjusted {
            exponent: VOLUME_ADJUST_EXPONENT,
        }
    }

    fn score(self, polarity: Polarity, value: f64, volume: u64) -> f64 {
        match self {
            RankStrategy::ByMetric => value,
            RankStrategy::VolumeAdjusted { exponent } => {
                let weight = (volume as f64).powf(exponent);
                if weight <= 0.0 || !weight.is_finite() {
                    return value;
                }
                match polarity {
                    Polarity::HigherBetter => value * weight,
                    Polarity::LowerBetter => value / weight,
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct LeaderboardRequest {
    pub group_by: Vec<GroupField>,
    pub metric: Metric,
    pub gate: GateSpec,
    pub bucket_filter: Option<BucketFilter>,
    pub top_n: usize,
    pub ranking: RankStrategy,
}

/// Standard single-player board for a metric: batters for batting
/// metrics, bowlers for bowling metrics, gates per the config.
pub fn preset_request(metric: Metric, gates: &GateConfig, top_n: usize) -> LeaderboardRequest {
    let field = if metric.is_bowling() {
        GroupField::Bowler
    } else {
        GroupField::Batter
    };
    LeaderboardRequest {
        group_by: vec![field],
        metric,
        gate: gates.for_metric(metric),
        bucket_filter: None,
        top_n,
        ranking: RankStrategy::ByMetric,
    }
}

/// Why a successful computation came back empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    NoGroupsAfterGate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardRow {
    pub rank: u32,
    pub key: GroupKey,
    pub label: String,
    pub value: Option<f64>,
    pub display: String,
    pub volume: u64,
    pub tooltip: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Leaderboard {
    pub metric: Metric,
    pub rows: Vec<LeaderboardRow>,
    pub reason: Option<ReasonCode>,
    pub skipped_null_keys: u64,
}

struct Candidate {
    key: GroupKey,
    totals: GroupTotals,
    value: Option<f64>,
    score: Option<f64>,
    volume: u64,
}

/// Group, aggregate, gate, filter, rank. Pure over its inputs: identical
/// calls produce identical boards.
pub fn compute_leaderboard(
    balls: &[BallRecord],
    request: &LeaderboardRequest,
) -> Result<Leaderboard, KpiError> {
    if balls.is_empty() {
        return Err(KpiError::EmptyInput);
    }
    if request.group_by.is_empty() {
        return Err(KpiError::InvalidRequest(
            "group_by must name at least one field".to_string(),
        ));
    }
    if request.top_n == 0 {
        return Err(KpiError::InvalidRequest("top_n must be positive".to_string()));
    }
    let player_field = request
        .group_by
        .iter()
        .position(|f| matches!(f, GroupField::Batter | GroupField::Bowler));
    if request.bucket_filter.is_some() && player_field.is_none() {
        return Err(KpiError::InvalidRequest(
            "experience buckets need a batter or bowler grouping".to_string(),
        ));
    }

    let by_batter = request.group_by.contains(&GroupField::Batter);
    let mut groups: HashMap<GroupKey, GroupTotals> = HashMap::new();
    let mut skipped = 0u64;
    for ball in balls {
        let Some(key) = group_key(ball, &request.group_by, None) else {
            skipped += 1;
            continue;
        };
        groups.entry(key.clone()).or_default().add(ball);
        if ball.is_wicket {
            if by_batter {
                // The dismissed batter is not always the striker (run
                // outs at the non-striker's end), so the dismissal can
                // belong to a different group than the ball itself.
                let dismissed = ball.dismissed_batter.as_deref().or(ball.batter.as_deref());
                if let Some(name) = dismissed {
                    if let Some(dkey) = group_key(ball, &request.group_by, Some(name)) {
                        groups.entry(dkey).or_default().dismissals += 1;
                    }
                }
            } else if let Some(totals) = groups.get_mut(&key) {
                totals.dismissals += 1;
            }
        }
    }

    if skipped > 0 {
        warn!("{skipped} rows skipped: null or out-of-range group key");
    }

    let metric = request.metric;
    let polarity = metric.polarity();
    let mut candidates: Vec<Candidate> = groups
        .into_iter()
        .filter(|(_, totals)| request.gate.passes(metric, totals))
        .map(|(key, totals)| {
            let value = metric.value(&totals);
            let volume = metric.volume(&totals);
            let score = value.map(|v| request.ranking.score(polarity, v, volume));
            Candidate {
                key,
                totals,
                value,
                score,
                volume,
            }
        })
        .collect();

    if let (Some(filter), Some(idx)) = (&request.bucket_filter, player_field) {
        candidates.retain(|c| filter.keeps(&c.key.0[idx]));
    }

    if candidates.is_empty() {
        return Ok(Leaderboard {
            metric,
            rows: Vec::new(),
            reason: Some(ReasonCode::NoGroupsAfterGate),
            skipped_null_keys: skipped,
        });
    }

    // Null scores always sort last, whatever the polarity. Ties break on
    // volume (bigger sample first) and then on the key, so the output
    // order is total and independent of input order.
    candidates.sort_by(|a, b| {
        match (a.score, b.score) {
            (None, None) => {}
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ord = match polarity {
                    Polarity::HigherBetter => y.partial_cmp(&x),
                    Polarity::LowerBetter => x.partial_cmp(&y),
                }
                .unwrap_or(Ordering::Equal);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
        b.volume.cmp(&a.volume).then_with(|| a.key.cmp(&b.key))
    });
    candidates.truncate(request.top_n);

    // Dense ranks: equal scores share a rank, the next distinct score
    // takes rank + 1.
    let mut rows = Vec::with_capacity(candidates.len());
    let mut rank = 0u32;
    let mut prev_score: Option<Option<f64>> = None;
    for candidate in candidates {
        let tied = prev_score.is_some_and(|p| score_eq(p, candidate.score));
        if !tied {
            rank += 1;
        }
        prev_score = Some(candidate.score);
        rows.push(LeaderboardRow {
            rank,
            label: candidate.key.label(),
            display: metric.display(candidate.value),
            tooltip: tooltip_for(metric, &candidate.totals),
            key: candidate.key,
            value: candidate.value,
            volume: candidate.volume,
        });
    }

    Ok(Leaderboard {
        metric,
        rows,
        reason: None,
        skipped_null_keys: skipped,
    })
}

fn score_eq(a: Option<f64>, b: Option<f64>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

fn group_key(
    ball: &BallRecord,
    fields: &[GroupField],
    batter_override: Option<&str>,
) -> Option<GroupKey> {
    let mut parts = Vec::with_capacity(fields.len());
    for field in fields {
        parts.push(key_part(ball, *field, batter_override)?);
    }
    Some(GroupKey(parts))
}

fn key_part(ball: &BallRecord, field: GroupField, batter_override: Option<&str>) -> Option<String> {
    match field {
        GroupField::Batter => match batter_override {
            Some(name) => Some(name.to_string()),
            None => ball.batter.clone(),
        },
        GroupField::Bowler => ball.bowler.clone(),
        GroupField::Venue => ball.venue.clone(),
        GroupField::Season => ball.season.clone(),
        GroupField::Region => ball.venue_region.clone(),
        GroupField::Phase => {
            let phase = ball.phase()?;
            if phase == Phase::Other {
                None
            } else {
                Some(phase.label().to_string())
            }
        }
    }
}

fn tooltip_for(metric: Metric, totals: &GroupTotals) -> Vec<(String, String)> {
    let mut out = vec![("Matches".to_string(), totals.matches_played().to_string())];
    if metric.is_bowling() {
        out.push(("Balls".to_string(), totals.legal_balls.to_string()));
        out.push((
            "Runs Conceded".to_string(),
            format_indian_number(totals.runs_conceded as i64),
        ));
        out.push(("Wickets".to_string(), totals.wickets.to_string()));
    } else {
        out.push(("Innings".to_string(), totals.innings_played().to_string()));
        out.push(("Balls".to_string(), totals.balls_faced.to_string()));
        out.push(("Runs".to_string(), format_indian_number(totals.runs as i64)));
        out.push(("Dismissals".to_string(), totals.dismissals.to_string()));
    }
    out
}
