use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::dataset::Dataset;
use crate::gates::GateConfig;
use crate::leaderboard::{compute_leaderboard, preset_request};
use crate::metrics::{Metric, format_indian_number};
use crate::scope::{self, SeasonChoice};
use crate::season;
use crate::toss::{self, Selection};
use crate::venue;

const EXPORT_TOP_N: usize = 15;

const BATTING_SHEET_METRICS: [Metric; 4] = [
    Metric::Runs,
    Metric::StrikeRate,
    Metric::BattingAverage,
    Metric::ConsistencyPct,
];

const BOWLING_SHEET_METRICS: [Metric; 3] =
    [Metric::Wickets, Metric::Economy, Metric::BowlingAverage];

pub struct ExportReport {
    pub overview_rows: usize,
    pub season_rows: usize,
    pub phase_rows: usize,
    pub toss_rows: usize,
    pub venue_rows: usize,
    pub bias_rows: usize,
    pub influence_rows: usize,
    pub extremes_rows: usize,
    pub batting_rows: usize,
    pub bowling_rows: usize,
    pub errors: Vec<String>,
}

/// Write every computed table into one workbook. A failing table records
/// an error and leaves its sheet header-only; it never aborts the rest.
pub fn export_workbook(
    path: &Path,
    dataset: &Dataset,
    gates: &GateConfig,
) -> Result<ExportReport> {
    let mut errors: Vec<String> = Vec::new();

    let totals = season::overview(&dataset.balls);
    let overview_rows = vec![
        header(&["Metric", "Value"]),
        vec![
            "Matches".to_string(),
            format_indian_number(totals.matches as i64),
        ],
        vec![
            "Balls".to_string(),
            format_indian_number(totals.balls as i64),
        ],
        vec!["Runs".to_string(), format_indian_number(totals.runs as i64)],
        vec!["Seasons".to_string(), totals.seasons.to_string()],
    ];

    let mut season_rows = vec![header(&[
        "Season",
        "Matches",
        "Balls",
        "Total Runs",
        "Batter Runs",
    ])];
    for row in season::runs_by_season(&dataset.balls) {
        season_rows.push(vec![
            row.season,
            row.matches.to_string(),
            format_indian_number(row.balls as i64),
            format_indian_number(row.total_runs as i64),
            format_indian_number(row.batter_runs as i64),
        ]);
    }

    let mut phase_rows = vec![header(&["Phase", "Runs", "Balls", "Run Share %"])];
    for row in season::phase_split(&dataset.balls) {
        phase_rows.push(vec![
            row.phase.label().to_string(),
            format_indian_number(row.runs as i64),
            format_indian_number(row.balls as i64),
            opt_fixed(row.run_share_pct, 1),
        ]);
    }

    let mut toss_rows = vec![header(&[
        "Scope",
        "Matches",
        "Decided",
        "Toss Winner Win %",
        "Toss Loser Win %",
        "Chase Win %",
        "Defend Win %",
        "Chase Advantage",
        "Call",
    ])];
    let mut selections = vec![Selection::AllTime];
    selections.extend(
        scope::seasons(&dataset.balls)
            .into_iter()
            .map(Selection::Season),
    );
    for selection in &selections {
        let summary = toss::summarize(&dataset.matches, selection);
        toss_rows.push(vec![
            summary.label,
            summary.matches.to_string(),
            summary.decided.to_string(),
            opt_fixed(summary.toss_winner_win_pct, 1),
            opt_fixed(summary.toss_loser_win_pct, 1),
            opt_fixed(summary.chase_win_pct, 1),
            opt_fixed(summary.defend_win_pct, 1),
            opt_fixed(summary.chase_advantage, 1),
            summary.call.label().to_string(),
        ]);
    }

    let mut venue_rows = vec![header(&["Venue", "Matches", "Avg Match Runs", "Avg Run Rate"])];
    for row in venue::venue_summary(&dataset.balls) {
        venue_rows.push(vec![
            row.venue,
            row.matches.to_string(),
            opt_fixed(row.avg_match_runs, 1),
            opt_fixed(row.avg_run_rate, 2),
        ]);
    }

    let mut bias_rows = vec![header(&[
        "Venue",
        "Matches",
        "Chase Win %",
        "Defend Win %",
        "Other %",
        "Delta",
        "Call",
        "Signal",
    ])];
    let bias_gate = gates.venue_bias_gate(&SeasonChoice::AllTime);
    for row in venue::chase_defend_bias(&dataset.matches, &bias_gate) {
        bias_rows.push(vec![
            row.venue,
            row.matches.to_string(),
            format!("{:.1}", row.chase_win_pct),
            format!("{:.1}", row.defend_win_pct),
            format!("{:.1}", row.other_pct),
            format!("{:.1}", row.delta),
            format!("{:?}", row.call),
            format!("{:.1}", row.signal),
        ]);
    }

    let mut influence_rows = vec![header(&[
        "Venue",
        "Matches",
        "Toss Winner Win %",
        "Impact",
        "Field First %",
        "Bat First %",
        "Preference",
        "Lean",
    ])];
    let toss_gate = gates.toss_gate(&SeasonChoice::AllTime);
    let influence = venue::toss_influence(&dataset.matches, &toss_gate);
    for row in &influence.rows {
        influence_rows.push(vec![
            row.venue.clone(),
            row.matches.to_string(),
            format!("{:.1}", row.toss_winner_win_pct),
            format!("{:?}", row.impact),
            format!("{:.1}", row.field_first_pct),
            format!("{:.1}", row.bat_first_pct),
            format!("{:.1}", row.preference),
            format!("{:?}", row.lean),
        ]);
    }

    let mut extremes_rows = vec![header(&[
        "Which",
        "Match",
        "Venue",
        "Season",
        "Innings",
        "Runs",
        "Deliveries",
    ])];
    if let Some(extremes) = venue::innings_extremes(&dataset.balls) {
        for (which, total) in [("Highest", &extremes.highest), ("Lowest", &extremes.lowest)] {
            extremes_rows.push(vec![
                which.to_string(),
                total.match_id.clone(),
                total.venue.clone(),
                total.season.clone(),
                total.innings.to_string(),
                total.runs.to_string(),
                total.deliveries.to_string(),
            ]);
        }
    }

    let mut batting_rows = vec![header(&["Metric", "Rank", "Player", "Value", "Balls"])];
    for metric in BATTING_SHEET_METRICS {
        append_board_rows(&mut batting_rows, &mut errors, dataset, gates, metric);
    }

    let mut bowling_rows = vec![header(&["Metric", "Rank", "Player", "Value", "Balls"])];
    for metric in BOWLING_SHEET_METRICS {
        append_board_rows(&mut bowling_rows, &mut errors, dataset, gates, metric);
    }

    let meta_rows = vec![
        header(&["Key", "Value"]),
        vec!["Generated At".to_string(), Utc::now().to_rfc3339()],
        vec![
            "Ball Rows".to_string(),
            dataset.ball_summary.rows.to_string(),
        ],
        vec![
            "Match Rows".to_string(),
            dataset.match_summary.rows.to_string(),
        ],
        vec![
            "Coerced Fields".to_string(),
            (dataset.ball_summary.coerced_fields + dataset.match_summary.coerced_fields)
                .to_string(),
        ],
        vec![
            "Blank Key Rows".to_string(),
            (dataset.ball_summary.blank_keys + dataset.match_summary.blank_keys).to_string(),
        ],
        vec![
            "Unknown Toss Decisions".to_string(),
            dataset.match_summary.unknown_decisions.to_string(),
        ],
        vec![
            "Unknown Decision %".to_string(),
            format!("{:.1}", influence.unknown_decision_pct),
        ],
        vec![
            "Data Quality".to_string(),
            format!("{:?}", influence.quality),
        ],
    ];

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Overview")?;
        write_rows(sheet, &overview_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("RunsBySeason")?;
        write_rows(sheet, &season_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("PhaseSplit")?;
        write_rows(sheet, &phase_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("TossSummary")?;
        write_rows(sheet, &toss_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("VenueSummary")?;
        write_rows(sheet, &venue_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("VenueBias")?;
        write_rows(sheet, &bias_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("TossInfluence")?;
        write_rows(sheet, &influence_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("InningsExtremes")?;
        write_rows(sheet, &extremes_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Batting")?;
        write_rows(sheet, &batting_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Bowling")?;
        write_rows(sheet, &bowling_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Metadata")?;
        write_rows(sheet, &meta_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        overview_rows: overview_rows.len().saturating_sub(1),
        season_rows: season_rows.len().saturating_sub(1),
        phase_rows: phase_rows.len().saturating_sub(1),
        toss_rows: toss_rows.len().saturating_sub(1),
        venue_rows: venue_rows.len().saturating_sub(1),
        bias_rows: bias_rows.len().saturating_sub(1),
        influence_rows: influence_rows.len().saturating_sub(1),
        extremes_rows: extremes_rows.len().saturating_sub(1),
        batting_rows: batting_rows.len().saturating_sub(1),
        bowling_rows: bowling_rows.len().saturating_sub(1),
        errors,
    })
}

fn append_board_rows(
    rows: &mut Vec<Vec<String>>,
    errors: &mut Vec<String>,
    dataset: &Dataset,
    gates: &GateConfig,
    metric: Metric,
) {
    let request = preset_request(metric, gates, EXPORT_TOP_N);
    match compute_leaderboard(&dataset.balls, &request) {
        Ok(board) => {
            for row in board.rows {
                rows.push(vec![
                    metric.label().to_string(),
                    row.rank.to_string(),
                    row.label,
                    row.display,
                    row.volume.to_string(),
                ]);
            }
        }
        Err(err) => errors.push(format!("{} leaderboard: {err}", metric.label())),
    }
}

fn header(cols: &[&str]) -> Vec<String> {
    cols.iter().map(|c| c.to_string()).collect()
}

fn opt_fixed(value: Option<f64>, places: usize) -> String {
    match value {
        Some(v) => format!("{v:.places$}"),
        None => "-".to_string(),
    }
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
