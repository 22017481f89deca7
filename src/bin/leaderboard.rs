use std::env;
use std::path::PathBuf;

use ipl_kpi::dataset::{self, GATES_FILE};
use ipl_kpi::gates::{self, GateConfig};
use ipl_kpi::leaderboard::{compute_leaderboard, preset_request};
use ipl_kpi::metrics::{ALL_METRICS, Metric};

const TOP_N: usize = 15;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let as_json = args.iter().any(|a| a == "--json");
    args.retain(|a| a != "--json");

    let data_dir = args
        .first()
        .cloned()
        .or_else(|| env::var("IPL_KPI_DATA_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let metric = match args.get(1) {
        Some(name) => Metric::from_name(name).ok_or_else(|| {
            let known: Vec<&str> = ALL_METRICS.iter().map(|m| m.name()).collect();
            anyhow::anyhow!("unknown metric {name:?}; known: {}", known.join(", "))
        })?,
        None => Metric::StrikeRate,
    };

    let dataset = dataset::load_dir(&data_dir)?;
    let gates_path = data_dir.join(GATES_FILE);
    let gates: GateConfig = if gates_path.exists() {
        GateConfig::load(&gates_path)?
    } else {
        gates::default_gates().clone()
    };

    // Intentionally simple: one preset board, printed as-is. Meant for
    // eyeballing gate and metric changes against a local data drop.
    let request = preset_request(metric, &gates, TOP_N);
    let board = compute_leaderboard(&dataset.balls, &request)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&board)?);
        return Ok(());
    }

    println!("{} (top {TOP_N})", metric.label());
    match board.reason {
        Some(reason) => println!("no rows: {reason:?}"),
        None => {
            for row in &board.rows {
                println!(
                    "{:>3}. {:<28} {:>10}  {:>7} balls",
                    row.rank, row.label, row.display, row.volume
                );
            }
        }
    }
    if board.skipped_null_keys > 0 {
        println!("({} balls skipped: null key)", board.skipped_null_keys);
    }

    Ok(())
}
