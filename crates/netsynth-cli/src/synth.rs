use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use netsynth_engine::{synthesize, CircuitDescription, CoordinateMode, SynthesisRequest};
use std::fs::File;
use std::path::PathBuf;

use crate::config::Config;

#[derive(Args, Debug)]
#[command(about = "Place and wire a circuit description into a KiCad schematic")]
pub struct SynthArgs {
    /// Circuit description JSON (`detected_components` / `component_connections`)
    #[arg(value_name = "CIRCUIT", value_hint = clap::ValueHint::FilePath)]
    pub circuit: PathBuf,

    /// Existing schematic to add to; a new file is created when omitted
    #[arg(long, value_name = "FILE")]
    pub schematic: Option<PathBuf>,

    /// Directory for newly created schematics
    #[arg(long, default_value = ".")]
    pub output_dir: PathBuf,

    /// Coordinate scale factor
    #[arg(long)]
    pub scale: Option<f64>,

    /// How input coordinates are interpreted: absolute or relative
    #[arg(long)]
    pub mode: Option<CoordinateMode>,

    /// Print the routing report as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn execute(args: SynthArgs, config: &Config) -> Result<()> {
    let file = File::open(&args.circuit)
        .with_context(|| format!("Failed to open {}", args.circuit.display()))?;
    let circuit = CircuitDescription::from_reader(file)
        .with_context(|| format!("Failed to read circuit {}", args.circuit.display()))?;

    let catalog = config.load_catalog()?;
    let request = SynthesisRequest {
        target: args.schematic,
        output_dir: args.output_dir,
        options: config.options(args.scale, args.mode),
    };

    let outcome = synthesize(&circuit, &request, &catalog).context("Synthesis failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!(
        "{} {} ({} symbols, {} wires)",
        "✓".green(),
        outcome.path.display().to_string().bold(),
        outcome.placed.len(),
        outcome.report.segments.len()
    );
    println!(
        "  routed {} of {} connections",
        outcome.report.routed_count(),
        circuit.connections.len()
    );
    for skipped in &outcome.report.skipped {
        println!(
            "  {} {}: {}",
            "!".yellow(),
            skipped.connection,
            skipped.reason
        );
    }
    Ok(())
}
