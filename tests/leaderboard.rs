use std::collections::HashMap;

use ipl_kpi::dataset::BallRecord;
use ipl_kpi::error::KpiError;
use ipl_kpi::gates::{ExperienceBucket, GateSpec, career_matches, default_gates};
use ipl_kpi::leaderboard::{
    BucketFilter, GroupField, LeaderboardRequest, RankStrategy, ReasonCode, compute_leaderboard,
    preset_request,
};
use ipl_kpi::metrics::Metric;

fn ball(match_id: &str, batter: &str, bowler: &str, over: u32, batter_runs: u32) -> BallRecord {
    BallRecord {
        match_id: Some(match_id.to_string()),
        season: Some("2023".to_string()),
        venue: Some("Eden Gardens".to_string()),
        venue_region: Some("India".to_string()),
        innings: Some(1),
        over: Some(over),
        batter: Some(batter.to_string()),
        bowler: Some(bowler.to_string()),
        batter_runs: Some(batter_runs),
        extra_runs: Some(0),
        total_runs: Some(batter_runs),
        is_wicket: false,
        wicket_kind: None,
        dismissed_batter: None,
        is_wide: false,
        is_no_ball: false,
    }
}

fn wicket(match_id: &str, batter: &str, bowler: &str, kind: &str, dismissed: &str) -> BallRecord {
    BallRecord {
        is_wicket: true,
        wicket_kind: Some(kind.to_string()),
        dismissed_batter: Some(dismissed.to_string()),
        ..ball(match_id, batter, bowler, 10, 0)
    }
}

fn volley(
    out: &mut Vec<BallRecord>,
    match_id: &str,
    batter: &str,
    bowler: &str,
    count: usize,
    runs_each: u32,
) {
    for i in 0..count {
        out.push(ball(match_id, batter, bowler, (i / 6 % 20) as u32, runs_each));
    }
}

fn request(metric: Metric, gate: GateSpec, group_by: Vec<GroupField>) -> LeaderboardRequest {
    LeaderboardRequest {
        group_by,
        metric,
        gate,
        bucket_filter: None,
        top_n: 10,
        ranking: RankStrategy::ByMetric,
    }
}

#[test]
fn gate_drops_thin_samples() {
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "A", "X", 250, 1);
    volley(&mut balls, "m1", "B", "X", 180, 1);
    volley(&mut balls, "m1", "C", "X", 400, 2);

    let gate = GateSpec {
        min_balls: 200,
        ..GateSpec::default()
    };
    let board = compute_leaderboard(
        &balls,
        &request(Metric::StrikeRate, gate, vec![GroupField::Batter]),
    )
    .expect("board computes");

    assert_eq!(board.rows.len(), 2);
    assert_eq!(board.reason, None);
    assert_eq!(board.rows[0].label, "C");
    assert_eq!(board.rows[1].label, "A");
    assert!(board.rows.iter().all(|r| r.volume >= 200));
}

#[test]
fn average_needs_dismissals_economy_does_not() {
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "A", "X", 340, 1);
    for _ in 0..10 {
        balls.push(wicket("m1", "A", "X", "bowled", "A"));
    }

    // 350 legal balls but only 10 wickets: under the 15-wicket floor.
    let avg = compute_leaderboard(
        &balls,
        &preset_request(Metric::BowlingAverage, default_gates(), 10),
    )
    .expect("board computes");
    assert!(avg.rows.is_empty());
    assert_eq!(avg.reason, Some(ReasonCode::NoGroupsAfterGate));

    // Economy has no wicket floor, so the same sample ranks.
    let eco = compute_leaderboard(
        &balls,
        &preset_request(Metric::Economy, default_gates(), 10),
    )
    .expect("board computes");
    assert_eq!(eco.rows.len(), 1);
    let row = &eco.rows[0];
    assert_eq!(row.rank, 1);
    assert_eq!(row.volume, 350);
    let expected = 340.0 / (350.0 / 6.0);
    assert!((row.value.unwrap() - expected).abs() < 1e-9);

    let lookup = |k: &str| {
        row.tooltip
            .iter()
            .find(|(key, _)| key == k)
            .map(|(_, v)| v.as_str())
    };
    assert_eq!(lookup("Matches"), Some("1"));
    assert_eq!(lookup("Balls"), Some("350"));
    assert_eq!(lookup("Runs Conceded"), Some("340"));
    assert_eq!(lookup("Wickets"), Some("10"));
}

#[test]
fn dense_ranks_share_and_do_not_gap() {
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "A", "X", 60, 2);
    volley(&mut balls, "m1", "B", "X", 30, 2);
    volley(&mut balls, "m1", "D", "X", 30, 2);
    volley(&mut balls, "m1", "C", "X", 30, 1);

    let board = compute_leaderboard(
        &balls,
        &request(Metric::StrikeRate, GateSpec::default(), vec![GroupField::Batter]),
    )
    .expect("board computes");

    // Three batters tied on 200.0: bigger sample first, then name; the
    // next distinct rate takes rank 2, not rank 4.
    let order: Vec<(&str, u32)> = board
        .rows
        .iter()
        .map(|r| (r.label.as_str(), r.rank))
        .collect();
    assert_eq!(order, [("A", 1), ("B", 1), ("D", 1), ("C", 2)]);
}

#[test]
fn null_values_rank_last_for_both_polarities() {
    // Lower-is-better: a batter with zero balls faced has no dot rate.
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "A", "X", 3, 0);
    volley(&mut balls, "m1", "A", "X", 3, 1);
    let mut only_wides = ball("m1", "W", "X", 3, 0);
    only_wides.is_wide = true;
    only_wides.extra_runs = Some(1);
    only_wides.total_runs = Some(1);
    balls.push(only_wides);

    let board = compute_leaderboard(
        &balls,
        &request(Metric::BattingDotPct, GateSpec::default(), vec![GroupField::Batter]),
    )
    .expect("board computes");
    assert_eq!(board.rows[0].label, "A");
    assert_eq!(board.rows[1].label, "W");
    assert_eq!(board.rows[1].value, None);
    assert_eq!(board.rows[1].display, "-");

    // Higher-is-better: an undismissed batter has no average.
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "ND", "X", 6, 2);
    volley(&mut balls, "m1", "D", "X", 6, 1);
    balls.push(wicket("m1", "D", "X", "bowled", "D"));

    let board = compute_leaderboard(
        &balls,
        &request(Metric::BattingAverage, GateSpec::default(), vec![GroupField::Batter]),
    )
    .expect("board computes");
    assert_eq!(board.rows[0].label, "D");
    assert!((board.rows[0].value.unwrap() - 6.0).abs() < 1e-9);
    assert_eq!(board.rows[1].label, "ND");
    assert_eq!(board.rows[1].value, None);
}

#[test]
fn top_n_truncates_after_sorting() {
    let mut balls = Vec::new();
    for (batter, runs) in [("A", 1), ("B", 2), ("C", 3), ("D", 4), ("E", 5)] {
        volley(&mut balls, "m1", batter, "X", 12, runs);
    }

    let mut req = request(Metric::StrikeRate, GateSpec::default(), vec![GroupField::Batter]);
    req.top_n = 3;
    let board = compute_leaderboard(&balls, &req).expect("board computes");
    let labels: Vec<&str> = board.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["E", "D", "C"]);
    assert_eq!(
        board.rows.iter().map(|r| r.rank).collect::<Vec<_>>(),
        [1, 2, 3]
    );

    // Asking for more rows than groups returns everything.
    req.top_n = 50;
    let board = compute_leaderboard(&balls, &req).expect("board computes");
    assert_eq!(board.rows.len(), 5);
}

#[test]
fn bad_requests_fail_loudly() {
    let balls = vec![ball("m1", "A", "X", 0, 1)];

    let err = compute_leaderboard(
        &[],
        &request(Metric::Runs, GateSpec::default(), vec![GroupField::Batter]),
    )
    .expect_err("empty input");
    assert!(matches!(err, KpiError::EmptyInput));

    let err = compute_leaderboard(
        &balls,
        &request(Metric::Runs, GateSpec::default(), Vec::new()),
    )
    .expect_err("empty grouping");
    assert!(matches!(err, KpiError::InvalidRequest(_)));

    let mut req = request(Metric::Runs, GateSpec::default(), vec![GroupField::Batter]);
    req.top_n = 0;
    let err = compute_leaderboard(&balls, &req).expect_err("zero top_n");
    assert!(matches!(err, KpiError::InvalidRequest(_)));

    // Buckets are defined over players, so a venue board cannot use them.
    let mut req = request(Metric::Runs, GateSpec::default(), vec![GroupField::Venue]);
    req.bucket_filter = Some(BucketFilter {
        include: vec![ExperienceBucket::UpTo25],
        career_matches: HashMap::new(),
    });
    let err = compute_leaderboard(&balls, &req).expect_err("bucket without player");
    assert!(matches!(err, KpiError::InvalidRequest(_)));
}

#[test]
fn null_keys_are_skipped_and_counted() {
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "A", "X", 6, 1);
    let mut blank = ball("m1", "A", "X", 4, 1);
    blank.batter = None;
    balls.push(blank.clone());
    balls.push(blank);

    let board = compute_leaderboard(
        &balls,
        &request(Metric::Runs, GateSpec::default(), vec![GroupField::Batter]),
    )
    .expect("board computes");
    assert_eq!(board.rows.len(), 1);
    assert_eq!(board.skipped_null_keys, 2);
    assert_eq!(board.rows[0].volume, 6);
}

#[test]
fn phase_grouping_excludes_super_overs() {
    let balls = vec![
        ball("m1", "A", "X", 2, 4),
        ball("m1", "A", "X", 10, 2),
        ball("m1", "A", "X", 18, 1),
        ball("m1", "A", "X", 20, 6),
    ];

    let board = compute_leaderboard(
        &balls,
        &request(
            Metric::Runs,
            GateSpec::default(),
            vec![GroupField::Batter, GroupField::Phase],
        ),
    )
    .expect("board computes");

    let labels: Vec<&str> = board.rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, ["A / Powerplay", "A / Middle", "A / Death"]);
    // The over-20 delivery has no phase key and is counted out.
    assert_eq!(board.skipped_null_keys, 1);
}

#[test]
fn experience_buckets_filter_after_the_gate() {
    // Lifetime history: V has 30 matches behind them, R has 2.
    let mut history = Vec::new();
    for i in 0..30 {
        history.push(ball(&format!("c{i}"), "V", "Z", 0, 1));
    }
    for i in 0..2 {
        history.push(ball(&format!("r{i}"), "R", "Z", 0, 1));
    }
    let career = career_matches(&history);

    let mut balls = Vec::new();
    volley(&mut balls, "s1", "V", "X", 12, 1);
    volley(&mut balls, "s1", "R", "X", 12, 2);

    let gate = GateSpec {
        min_balls: 10,
        ..GateSpec::default()
    };
    let open = compute_leaderboard(
        &balls,
        &request(Metric::StrikeRate, gate, vec![GroupField::Batter]),
    )
    .expect("board computes");
    assert_eq!(open.rows.len(), 2);

    let mut req = request(Metric::StrikeRate, gate, vec![GroupField::Batter]);
    req.bucket_filter = Some(BucketFilter {
        include: vec![ExperienceBucket::UpTo25],
        career_matches: career,
    });
    let rookies = compute_leaderboard(&balls, &req).expect("board computes");
    assert_eq!(rookies.rows.len(), 1);
    assert_eq!(rookies.rows[0].label, "R");
    assert_eq!(rookies.reason, None);
}

#[test]
fn dismissals_route_to_the_dismissed_batter() {
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "A", "X", 10, 2);
    volley(&mut balls, "m1", "B", "X", 10, 1);
    // A was on strike when B was run out at the non-striker's end.
    balls.push(wicket("m1", "A", "X", "run out", "B"));

    let board = compute_leaderboard(
        &balls,
        &request(Metric::BattingAverage, GateSpec::default(), vec![GroupField::Batter]),
    )
    .expect("board computes");

    let by_label = |label: &str| {
        board
            .rows
            .iter()
            .find(|r| r.label == label)
            .expect("row present")
    };
    assert!((by_label("B").value.unwrap() - 10.0).abs() < 1e-9);
    assert_eq!(by_label("A").value, None);
    let dismissals = by_label("B")
        .tooltip
        .iter()
        .find(|(k, _)| k == "Dismissals")
        .map(|(_, v)| v.as_str());
    assert_eq!(dismissals, Some("1"));

    // A run out never credits the bowler.
    let wickets = compute_leaderboard(
        &balls,
        &request(Metric::Wickets, GateSpec::default(), vec![GroupField::Bowler]),
    )
    .expect("board computes");
    assert_eq!(wickets.rows[0].label, "X");
    assert_eq!(wickets.rows[0].value, Some(0.0));
}

#[test]
fn volume_adjustment_reorders_close_rates() {
    let mut balls = Vec::new();
    // A: 150.0 over 40 balls. B: 140.0 over 300 balls.
    volley(&mut balls, "m1", "A", "X", 20, 2);
    volley(&mut balls, "m1", "A", "X", 20, 1);
    volley(&mut balls, "m1", "B", "X", 120, 2);
    volley(&mut balls, "m1", "B", "X", 180, 1);

    let raw = compute_leaderboard(
        &balls,
        &request(Metric::StrikeRate, GateSpec::default(), vec![GroupField::Batter]),
    )
    .expect("board computes");
    assert_eq!(raw.rows[0].label, "A");

    let mut req = request(Metric::StrikeRate, GateSpec::default(), vec![GroupField::Batter]);
    req.ranking = RankStrategy::volume_adjusted();
    let adjusted = compute_leaderboard(&balls, &req).expect("board computes");
    assert_eq!(adjusted.rows[0].label, "B");
    // The reported value stays the raw rate; only the ordering shifts.
    assert!((adjusted.rows[0].value.unwrap() - 140.0).abs() < 1e-9);
}

#[test]
fn identical_requests_produce_identical_boards() {
    let mut balls = Vec::new();
    volley(&mut balls, "m1", "A", "X", 80, 1);
    volley(&mut balls, "m1", "B", "Y", 80, 2);
    volley(&mut balls, "m2", "C", "X", 80, 1);
    balls.push(wicket("m1", "A", "Y", "caught", "A"));
    balls.push(wicket("m2", "C", "X", "run out", "C"));

    let req = request(Metric::StrikeRate, GateSpec::default(), vec![GroupField::Batter]);
    let first = compute_leaderboard(&balls, &req).expect("board computes");
    let second = compute_leaderboard(&balls, &req).expect("board computes");
    assert_eq!(first, second);

    // Input order must not leak into the output.
    let reversed: Vec<BallRecord> = balls.iter().rev().cloned().collect();
    let third = compute_leaderboard(&reversed, &req).expect("board computes");
    assert_eq!(first, third);
}
