use anyhow::Result;
use clap::Args;
use colored::Colorize;
use netsynth_engine::Resolver;

use crate::config::Config;

#[derive(Args, Debug)]
#[command(about = "Search the symbol catalog")]
pub struct SymbolsArgs {
    /// Component type or symbol name to look for
    pub term: String,

    /// Number of suggestions to show
    #[arg(short = 'n', long, default_value_t = 3)]
    pub count: usize,
}

pub fn execute(args: SymbolsArgs, config: &Config) -> Result<()> {
    let catalog = config.load_catalog()?;
    let resolver = Resolver::new(&catalog)?;

    let resolved = resolver.resolve(&args.term).entry();
    println!("{} resolves to {}", args.term, resolved.to_string().bold());

    for (entry, distance) in resolver.closest_matches(&args.term, args.count) {
        println!("  {entry} {}", format!("(distance {distance})").dimmed());
    }
    Ok(())
}
