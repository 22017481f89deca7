use std::collections::HashMap;
use std::path::Path;

use log::{debug, warn};
use serde::Deserialize;

use crate::error::KpiError;
use crate::phase::{Phase, classify_over};

pub const BALLS_FILE: &str = "master2_balls_baseline.csv";
pub const MATCHES_FILE: &str = "master1_matches_baseline.csv";
pub const ALIASES_FILE: &str = "master_team_aliases.csv";
pub const GATES_FILE: &str = "gates_config.csv";

const BALL_COLUMNS: [&str; 16] = [
    "match_id",
    "season",
    "venue",
    "venue_region",
    "innings",
    "over",
    "batter",
    "bowler",
    "batter_runs",
    "extra_runs",
    "total_runs",
    "is_wicket",
    "wicket_kind",
    "dismissed_batter",
    "is_wide",
    "is_no_ball",
];

const MATCH_COLUMNS: [&str; 9] = [
    "match_id",
    "season",
    "venue",
    "venue_region",
    "team1",
    "team2",
    "toss_winner",
    "toss_decision",
    "match_winner",
];

/// Dismissal kinds the bowler gets no credit for.
const NON_BOWLER_DISMISSALS: [&str; 6] = [
    "run out",
    "retired hurt",
    "retired out",
    "obstructing the field",
    "handled the ball",
    "timed out",
];

/// One delivery. String key fields are `None` when the source cell is
/// blank, numeric fields are `None` when blank or malformed; a row never
/// fails to load over a bad value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BallRecord {
    pub match_id: Option<String>,
    pub season: Option<String>,
    pub venue: Option<String>,
    pub venue_region: Option<String>,
    pub innings: Option<u8>,
    pub over: Option<u32>,
    pub batter: Option<String>,
    pub bowler: Option<String>,
    pub batter_runs: Option<u32>,
    pub extra_runs: Option<u32>,
    pub total_runs: Option<u32>,
    pub is_wicket: bool,
    pub wicket_kind: Option<String>,
    pub dismissed_batter: Option<String>,
    pub is_wide: bool,
    pub is_no_ball: bool,
}

impl BallRecord {
    /// A batter faces every delivery except a wide.
    pub fn faced(&self) -> bool {
        !self.is_wide
    }

    /// Legal deliveries are what an over is made of: no wides, no no-balls.
    pub fn bowler_legal(&self) -> bool {
        !self.is_wide && !self.is_no_ball
    }

    /// Runs charged to the bowler: off the bat always, extras only on
    /// wides and no-balls (byes and leg byes are not the bowler's).
    pub fn runs_conceded(&self) -> u32 {
        let bat = self.batter_runs.unwrap_or(0);
        if self.is_wide || self.is_no_ball {
            bat + self.extra_runs.unwrap_or(0)
        } else {
            bat
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self.batter_runs, Some(4) | Some(6))
    }

    pub fn phase(&self) -> Option<Phase> {
        self.over.map(classify_over)
    }

    /// Whether this wicket credits the bowler. Unknown kinds do not.
    pub fn bowler_wicket(&self) -> bool {
        if !self.is_wicket {
            return false;
        }
        match self.wicket_kind.as_deref() {
            Some(kind) => !NON_BOWLER_DISMISSALS
                .iter()
                .any(|k| kind.eq_ignore_ascii_case(k)),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TossDecision {
    Bat,
    Field,
    Unknown,
}

impl TossDecision {
    pub fn parse(raw: &str) -> TossDecision {
        match raw.trim().to_ascii_lowercase().as_str() {
            "bat" => TossDecision::Bat,
            "field" => TossDecision::Field,
            _ => TossDecision::Unknown,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TossDecision::Bat => "bat",
            TossDecision::Field => "field",
            TossDecision::Unknown => "unknown",
        }
    }
}

/// One match. Team names are alias-normalized at load time so franchise
/// renames group together across seasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchRecord {
    pub match_id: Option<String>,
    pub season: Option<String>,
    pub venue: Option<String>,
    pub venue_region: Option<String>,
    pub team1: Option<String>,
    pub team2: Option<String>,
    pub toss_winner: Option<String>,
    pub toss_decision: TossDecision,
    pub match_winner: Option<String>,
}

/// Per-table data-quality counters. These are reported, never fatal.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoadSummary {
    pub rows: usize,
    pub coerced_fields: usize,
    pub blank_keys: usize,
    pub unknown_decisions: usize,
}

#[derive(Debug, Clone)]
pub struct Dataset {
    pub balls: Vec<BallRecord>,
    pub matches: Vec<MatchRecord>,
    pub ball_summary: LoadSummary,
    pub match_summary: LoadSummary,
}

/// Load both master tables from a directory, applying the alias table
/// when present.
pub fn load_dir(dir: &Path) -> Result<Dataset, KpiError> {
    let alias_path = dir.join(ALIASES_FILE);
    let aliases = if alias_path.exists() {
        AliasMap::load(&alias_path)?
    } else {
        AliasMap::default()
    };
    let (balls, ball_summary) = load_balls(&dir.join(BALLS_FILE))?;
    let (matches, match_summary) = load_matches(&dir.join(MATCHES_FILE), &aliases)?;
    Ok(Dataset {
        balls,
        matches,
        ball_summary,
        match_summary,
    })
}

#[derive(Debug, Deserialize)]
struct RawBallRow {
    #[serde(default)]
    match_id: String,
    #[serde(default)]
    season: String,
    #[serde(default)]
    venue: String,
    #[serde(default)]
    venue_region: String,
    #[serde(default)]
    innings: String,
    #[serde(default)]
    over: String,
    #[serde(default)]
    batter: String,
    #[serde(default)]
    bowler: String,
    #[serde(default)]
    batter_runs: String,
    #[serde(default)]
    extra_runs: String,
    #[serde(default)]
    total_runs: String,
    #[serde(default)]
    is_wicket: String,
    #[serde(default)]
    wicket_kind: String,
    #[serde(default)]
    dismissed_batter: String,
    #[serde(default)]
    is_wide: String,
    #[serde(default)]
    is_no_ball: String,
}

pub fn load_balls(path: &Path) -> Result<(Vec<BallRecord>, LoadSummary), KpiError> {
    let mut reader = open_reader("balls", path)?;
    let headers = reader
        .headers()
        .map_err(|e| csv_error("balls", path, e))?
        .clone();
    check_columns("balls", &headers, &BALL_COLUMNS)?;

    let mut rows = Vec::new();
    let mut summary = LoadSummary::default();
    for record in reader.deserialize::<RawBallRow>() {
        let raw = record.map_err(|e| csv_error("balls", path, e))?;
        let mut coerced = 0usize;
        let ball = BallRecord {
            match_id: opt_text(&raw.match_id),
            season: opt_text(&raw.season),
            venue: opt_text(&raw.venue),
            venue_region: opt_text(&raw.venue_region),
            innings: opt_number(&raw.innings, &mut coerced)
                .and_then(|v| u8::try_from(v).ok()),
            over: opt_number(&raw.over, &mut coerced),
            batter: opt_text(&raw.batter),
            bowler: opt_text(&raw.bowler),
            batter_runs: opt_number(&raw.batter_runs, &mut coerced),
            extra_runs: opt_number(&raw.extra_runs, &mut coerced),
            total_runs: opt_number(&raw.total_runs, &mut coerced),
            is_wicket: parse_flag(&raw.is_wicket),
            wicket_kind: opt_text(&raw.wicket_kind),
            dismissed_batter: opt_text(&raw.dismissed_batter),
            is_wide: parse_flag(&raw.is_wide),
            is_no_ball: parse_flag(&raw.is_no_ball),
        };
        if ball.match_id.is_none() || ball.batter.is_none() || ball.bowler.is_none() {
            summary.blank_keys += 1;
        }
        summary.coerced_fields += coerced;
        summary.rows += 1;
        rows.push(ball);
    }

    debug!(
        "loaded {} ball rows from {} ({} coerced fields, {} blank-key rows)",
        summary.rows,
        path.display(),
        summary.coerced_fields,
        summary.blank_keys
    );
    Ok((rows, summary))
}

#[derive(Debug, Deserialize)]
struct RawMatchRow {
    #[serde(default)]
    match_id: String,
    #[serde(default)]
    season: String,
    #[serde(default)]
    venue: String,
    #[serde(default)]
    venue_region: String,
    #[serde(default)]
    team1: String,
    #[serde(default)]
    team2: String,
    #[serde(default)]
    toss_winner: String,
    #[serde(default)]
    toss_decision: String,
    #[serde(default)]
    match_winner: String,
}

pub fn load_matches(
    path: &Path,
    aliases: &AliasMap,
) -> Result<(Vec<MatchRecord>, LoadSummary), KpiError> {
    let mut reader = open_reader("matches", path)?;
    let headers = reader
        .headers()
        .map_err(|e| csv_error("matches", path, e))?
        .clone();
    check_columns("matches", &headers, &MATCH_COLUMNS)?;

    let mut rows = Vec::new();
    let mut summary = LoadSummary::default();
    for record in reader.deserialize::<RawMatchRow>() {
        let raw = record.map_err(|e| csv_error("matches", path, e))?;
        let toss_decision = TossDecision::parse(&raw.toss_decision);
        if toss_decision == TossDecision::Unknown {
            summary.unknown_decisions += 1;
        }
        let row = MatchRecord {
            match_id: opt_text(&raw.match_id),
            season: opt_text(&raw.season),
            venue: opt_text(&raw.venue),
            venue_region: opt_text(&raw.venue_region),
            team1: aliases.canonical_opt(&raw.team1),
            team2: aliases.canonical_opt(&raw.team2),
            toss_winner: aliases.canonical_opt(&raw.toss_winner),
            toss_decision,
            match_winner: aliases.canonical_opt(&raw.match_winner),
        };
        if row.match_id.is_none() {
            summary.blank_keys += 1;
        }
        summary.rows += 1;
        rows.push(row);
    }

    debug!(
        "loaded {} match rows from {} ({} unknown toss decisions)",
        summary.rows,
        path.display(),
        summary.unknown_decisions
    );
    Ok((rows, summary))
}

/// Maps franchise aliases to canonical names. Lookup keys are normalized
/// so spacing and punctuation differences still hit.
#[derive(Debug, Default, Clone)]
pub struct AliasMap {
    map: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RawAliasRow {
    #[serde(default)]
    alias: String,
    #[serde(default)]
    canonical: String,
}

impl AliasMap {
    pub fn load(path: &Path) -> Result<AliasMap, KpiError> {
        let mut reader = open_reader("team_aliases", path)?;
        let headers = reader
            .headers()
            .map_err(|e| csv_error("team_aliases", path, e))?
            .clone();
        check_columns("team_aliases", &headers, &["alias", "canonical"])?;

        let mut map = HashMap::new();
        for record in reader.deserialize::<RawAliasRow>() {
            let raw = record.map_err(|e| csv_error("team_aliases", path, e))?;
            let alias = raw.alias.trim();
            let canonical = raw.canonical.trim();
            if alias.is_empty() || canonical.is_empty() {
                warn!("team alias row with blank side skipped: {alias:?} -> {canonical:?}");
                continue;
            }
            map.insert(alias_key(alias), canonical.to_string());
        }
        Ok(AliasMap { map })
    }

    pub fn canonical(&self, name: &str) -> String {
        let trimmed = name.trim();
        match self.map.get(&alias_key(trimmed)) {
            Some(canon) => canon.clone(),
            None => trimmed.to_string(),
        }
    }

    fn canonical_opt(&self, raw: &str) -> Option<String> {
        opt_text(raw).map(|s| self.canonical(&s))
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

fn alias_key(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}

pub(crate) fn open_reader(
    table: &'static str,
    path: &Path,
) -> Result<csv::Reader<std::fs::File>, KpiError> {
    csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| csv_error(table, path, e))
}

pub(crate) fn csv_error(table: &'static str, path: &Path, source: csv::Error) -> KpiError {
    KpiError::Csv {
        table,
        path: path.display().to_string(),
        source,
    }
}

pub(crate) fn check_columns(
    table: &'static str,
    headers: &csv::StringRecord,
    required: &[&'static str],
) -> Result<(), KpiError> {
    for col in required {
        if !headers.iter().any(|h| h.trim() == *col) {
            return Err(KpiError::MissingColumn { table, column: col });
        }
    }
    Ok(())
}

fn opt_text(raw: &str) -> Option<String> {
    let s = raw.trim();
    if s.is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Permissive count parser. Blank and "-" are plain nulls; anything else
/// that fails to parse as a whole non-negative number counts as coerced.
/// Accepts float spellings like "4.0" since upstream exports produce them.
fn opt_number(raw: &str, coerced: &mut usize) -> Option<u32> {
    let s = raw.trim();
    if s.is_empty() || s == "-" {
        return None;
    }
    let cleaned = s.replace(',', "");
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 && v.fract() == 0.0 && v <= u32::MAX as f64 => {
            Some(v as u32)
        }
        _ => {
            *coerced += 1;
            None
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    let s = raw.trim().to_ascii_lowercase();
    match s.as_str() {
        "" | "0" | "false" | "no" => false,
        "1" | "true" | "yes" => true,
        _ => s.parse::<f64>().map(|v| v != 0.0).unwrap_or(false),
    }
}
