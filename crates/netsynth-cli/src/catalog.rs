use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use netsynth_eda::Catalog;

use crate::config::Config;

#[derive(Args, Debug)]
#[command(about = "Show the symbol catalog, optionally rescanning the libraries")]
pub struct CatalogArgs {
    /// Rescan the symbol libraries and overwrite the cache
    #[arg(long)]
    pub rebuild: bool,

    /// List every library with its symbol count
    #[arg(short, long)]
    pub verbose: bool,
}

pub fn execute(args: CatalogArgs, config: &Config) -> Result<()> {
    let catalog = if args.rebuild {
        let dir = config.symbol_dir()?;
        let cache = config.cache_path();
        println!("Rescanning {}", dir.display());
        Catalog::rebuild(&dir, &cache).context("Failed to rebuild the symbol catalog")?
    } else {
        config.load_catalog()?
    };

    println!(
        "{} {} symbols in {} libraries ({})",
        "✓".green(),
        catalog.len(),
        catalog.libraries().len(),
        config.cache_path().display()
    );
    if args.verbose {
        for library in catalog.libraries() {
            println!("  {:<32} {}", library.library, library.symbols.len());
        }
    }
    Ok(())
}
