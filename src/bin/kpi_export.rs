use std::env;
use std::path::PathBuf;

use ipl_kpi::dataset::{self, GATES_FILE};
use ipl_kpi::export::export_workbook;
use ipl_kpi::gates::{self, GateConfig};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let data_dir = env::args()
        .nth(1)
        .or_else(|| env::var("IPL_KPI_DATA_DIR").ok())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let out_path = env::args()
        .nth(2)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("ipl_kpi.xlsx"));

    let dataset = dataset::load_dir(&data_dir)?;
    let gates_path = data_dir.join(GATES_FILE);
    let gates: GateConfig = if gates_path.exists() {
        GateConfig::load(&gates_path)?
    } else {
        gates::default_gates().clone()
    };

    let report = export_workbook(&out_path, &dataset, &gates)?;

    println!("wrote {}", out_path.display());
    println!("overview rows:    {}", report.overview_rows);
    println!("season rows:      {}", report.season_rows);
    println!("phase rows:       {}", report.phase_rows);
    println!("toss rows:        {}", report.toss_rows);
    println!("venue rows:       {}", report.venue_rows);
    println!("bias rows:        {}", report.bias_rows);
    println!("influence rows:   {}", report.influence_rows);
    println!("extremes rows:    {}", report.extremes_rows);
    println!("batting rows:     {}", report.batting_rows);
    println!("bowling rows:     {}", report.bowling_rows);
    for err in &report.errors {
        eprintln!("sheet error: {err}");
    }

    Ok(())
}
