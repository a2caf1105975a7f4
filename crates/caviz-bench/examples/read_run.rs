//! Write a run to a temporary directory, load it, and read every step.
//!
//! Set `RUST_LOG=caviz_stage=debug` to see per-node decode events.

use caviz_bench::reference_profile;
use caviz_stage::{DataFormat, LoadPolicy, Stage, StageReader};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_thread_names(true)
        .init();

    println!("=== caviz stage reader ===\n");

    let profile = reference_profile(DataFormat::Text).unwrap();
    let config = profile.run.config();
    println!(
        "run: {}x{} nodes, {} steps, global grid {}x{}",
        config.node_x, config.node_y, profile.steps, profile.rows, profile.columns
    );

    let mut stage = Stage::prepare(config.node_x, config.node_y);
    let report = stage.load_all(config, LoadPolicy::AbortOnError).unwrap();
    tracing::info!(loaded = report.loaded.len(), "indexes loaded");

    let reader = StageReader::new(&stage, config).unwrap();
    let mut grid = profile.grid();
    for step in reader.available_steps().unwrap() {
        let frame = reader.read_step(step, &mut grid).unwrap();
        let decoded = grid.as_slice().iter().filter(|c| c.decoded).count();
        println!(
            "step {:>4}: {} cells, {} boundary segments",
            frame.step,
            decoded,
            frame.lines.len()
        );
    }
}
