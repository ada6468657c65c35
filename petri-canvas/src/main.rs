use std::path::PathBuf;

use clap::Parser;

use petri_core::{RuleSet, SimConfig};

/// GPU-resident continuous cellular automaton you can paint on.
#[derive(Parser, Debug)]
#[command(name = "petri", version, about)]
struct Args {
    /// Simulation grid width, in cells.
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Simulation grid height, in cells.
    #[arg(long, default_value_t = 256)]
    height: u32,

    /// JSON file with exactly nine rule descriptors; defaults to the
    /// built-in set. Press R in the app to reload it.
    #[arg(long)]
    rules: Option<PathBuf>,

    /// Start paused (Space resumes).
    #[arg(long)]
    paused: bool,

    /// Initial on-screen cell width, in pixels.
    #[arg(long, default_value_t = 4.0)]
    cell_size: f32,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = SimConfig {
        width: args.width,
        height: args.height,
        running: !args.paused,
        cell_size: args.cell_size,
    };
    // Reject bad configuration before touching the GPU.
    config.validate()?;

    let rules = match &args.rules {
        Some(path) => petri_canvas::shell::load_rules(path)?,
        None => RuleSet::default(),
    };

    tracing::info!(
        width = config.width,
        height = config.height,
        running = config.running,
        "petri starting"
    );

    petri_canvas::shell::run(config, rules, args.rules)
}
