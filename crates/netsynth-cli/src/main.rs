use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod catalog;
mod config;
mod symbols;
mod synth;

#[derive(Parser)]
#[command(name = "netsynth")]
#[command(about = "Generate KiCad schematics from circuit descriptions", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ./netsynth.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize a schematic from a circuit description
    #[command(alias = "s")]
    Synth(synth::SynthArgs),

    /// Show the catalog symbols closest to a search term
    Symbols(symbols::SymbolsArgs),

    /// Inspect or rebuild the symbol catalog cache
    Catalog(catalog::CatalogArgs),
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = config::Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Synth(args) => synth::execute(args, &config),
        Commands::Symbols(args) => symbols::execute(args, &config),
        Commands::Catalog(args) => catalog::execute(args, &config),
    }
}
