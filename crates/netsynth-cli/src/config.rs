//! `netsynth.toml` and symbol library discovery.

use anyhow::{Context, Result};
use netsynth_eda::Catalog;
use netsynth_engine::{CoordinateMode, SynthesisOptions};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "netsynth.toml";
pub const DEFAULT_CACHE_FILE: &str = "symbol_data.json";
pub const SYMBOL_DIR_ENV: &str = "KICAD_SYMBOL_DIR";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub symbol_library_path: Option<PathBuf>,
    pub cache_path: Option<PathBuf>,
    pub scale: Option<f64>,
    pub mode: Option<CoordinateMode>,

    /// Relative paths in the file are taken from here
    #[serde(skip)]
    base_dir: PathBuf,
}

impl Config {
    /// Read `explicit`, or `./netsynth.toml` if it exists, or fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => {
                let default = PathBuf::from(CONFIG_FILE_NAME);
                if !default.exists() {
                    log::debug!("No {CONFIG_FILE_NAME} found, using defaults");
                    return Ok(Config {
                        base_dir: PathBuf::from("."),
                        ..Default::default()
                    });
                }
                default
            }
        };

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config = Self::parse(&content)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        config.base_dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Symbol library directory: config, then `KICAD_SYMBOL_DIR`, then the usual KiCad install locations.
    pub fn symbol_dir(&self) -> Result<PathBuf> {
        if let Some(path) = &self.symbol_library_path {
            return Ok(self.resolve(path));
        }
        if let Ok(env_path) = std::env::var(SYMBOL_DIR_ENV) {
            return Ok(PathBuf::from(env_path));
        }
        kicad_install_symbol_dirs()
            .into_iter()
            .find(|p| p.exists())
            .with_context(|| {
                format!(
                    "KiCad symbol directory not found. Set symbol_library_path in {CONFIG_FILE_NAME} or the {SYMBOL_DIR_ENV} environment variable"
                )
            })
    }

    pub fn cache_path(&self) -> PathBuf {
        match &self.cache_path {
            Some(path) => self.resolve(path),
            None => self.base_dir.join(DEFAULT_CACHE_FILE),
        }
    }

    /// Options from the file with command-line overrides applied.
    pub fn options(&self, scale: Option<f64>, mode: Option<CoordinateMode>) -> SynthesisOptions {
        let defaults = SynthesisOptions::default();
        SynthesisOptions {
            scale: scale.or(self.scale).unwrap_or(defaults.scale),
            mode: mode.or(self.mode).unwrap_or(defaults.mode),
        }
    }

    pub fn load_catalog(&self) -> Result<Catalog> {
        let dir = self.symbol_dir()?;
        let cache = self.cache_path();
        log::debug!(
            "Loading symbol catalog from {} (cache {})",
            dir.display(),
            cache.display()
        );
        Catalog::load(&dir, &cache).context("Failed to load the symbol catalog")
    }
}

fn kicad_install_symbol_dirs() -> Vec<PathBuf> {
    if cfg!(target_os = "macos") {
        vec![
            PathBuf::from("/Applications/KiCad/KiCad.app/Contents/SharedSupport/symbols"),
            PathBuf::from("/Library/Application Support/kicad/symbols"),
            dirs::home_dir()
                .map(|h| h.join("Library/Application Support/kicad/symbols"))
                .unwrap_or_default(),
        ]
    } else if cfg!(target_os = "windows") {
        vec![
            PathBuf::from("C:\\Program Files\\KiCad\\share\\kicad\\symbols"),
            PathBuf::from("C:\\Program Files (x86)\\KiCad\\share\\kicad\\symbols"),
            dirs::config_dir()
                .map(|c| c.join("kicad\\symbols"))
                .unwrap_or_default(),
        ]
    } else {
        vec![
            PathBuf::from("/usr/share/kicad/symbols"),
            PathBuf::from("/usr/local/share/kicad/symbols"),
            PathBuf::from("/opt/kicad/share/kicad/symbols"),
            dirs::data_dir()
                .map(|d| d.join("kicad/symbols"))
                .unwrap_or_default(),
        ]
    }
}
