//! The symbol catalog: every `Library:Symbol` available for placement.
//!
//! Built by scanning a directory of `.kicad_sym` files and cached as JSON so
//! later runs skip the scan. Full symbol definitions are loaded lazily from
//! the same directory when a symbol is placed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::kicad::symbol_library::{top_level_symbol_names, KicadSymbolLibrary};
use crate::LibrarySymbol;

pub const SYMBOL_LIBRARY_EXTENSION: &str = "kicad_sym";

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("symbol library directory {path} is unavailable: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no symbols found in the symbol catalog")]
    Empty,

    #[error("catalog has no symbol library directory to load {0} from")]
    NoLibrarySource(CatalogEntry),

    #[error("failed to read symbol library {path}: {source}")]
    LibraryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse symbol library {path}: {source}")]
    LibraryParse {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    #[error("symbol {0} not found in its library")]
    SymbolNotFound(CatalogEntry),

    #[error("invalid library identifier '{0}', expected 'Library:Symbol'")]
    InvalidLibId(String),
}

/// A fully-qualified library symbol, written `Library:Symbol`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub library: String,
    pub symbol: String,
}

impl CatalogEntry {
    pub fn new(library: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            library: library.into(),
            symbol: symbol.into(),
        }
    }

    pub fn lib_id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.library, self.symbol)
    }
}

impl FromStr for CatalogEntry {
    type Err = CatalogError;

    fn from_str(lib_id: &str) -> Result<Self, Self::Err> {
        match lib_id.split_once(':') {
            Some((library, symbol)) if !library.is_empty() && !symbol.is_empty() => {
                Ok(CatalogEntry::new(library, symbol))
            }
            _ => Err(CatalogError::InvalidLibId(lib_id.to_string())),
        }
    }
}

/// Symbols of one library file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryListing {
    #[serde(rename = "lib")]
    pub library: String,
    pub symbols: Vec<String>,
}

#[derive(Serialize, Deserialize)]
struct CacheFile {
    symbols: Vec<LibraryListing>,
}

/// Loads full symbol definitions for catalog entries.
pub trait SymbolSource {
    fn symbol(&self, entry: &CatalogEntry) -> Result<LibrarySymbol, CatalogError>;
}

/// Immutable once built; parsed libraries are memoized behind a mutex so a
/// catalog can be shared across threads.
#[derive(Debug, Default)]
pub struct Catalog {
    libraries: Vec<LibraryListing>,
    source_dir: Option<PathBuf>,
    loaded: Mutex<HashMap<String, Arc<LoadedLibrary>>>,
}

struct LoadedLibrary(KicadSymbolLibrary);

impl fmt::Debug for LoadedLibrary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.0.symbol_names()).finish()
    }
}

impl Catalog {
    /// Load the catalog from `cache_path`, or scan `source_dir` and write the cache.
    pub fn load(source_dir: &Path, cache_path: &Path) -> Result<Self, CatalogError> {
        let libraries = match read_cache(cache_path) {
            Some(libraries) => {
                log::debug!("Loaded symbol catalog from {}", cache_path.display());
                libraries
            }
            None => {
                let libraries = scan_directory(source_dir)?;
                if let Err(e) = write_cache(cache_path, &libraries) {
                    log::warn!(
                        "Failed to write symbol catalog cache {}: {e}",
                        cache_path.display()
                    );
                }
                libraries
            }
        };

        Self::with_source(libraries, source_dir)
    }

    /// Scan `source_dir` and overwrite the cache even if one exists.
    pub fn rebuild(source_dir: &Path, cache_path: &Path) -> Result<Self, CatalogError> {
        let libraries = scan_directory(source_dir)?;
        write_cache(cache_path, &libraries).map_err(|source| CatalogError::Unavailable {
            path: cache_path.to_path_buf(),
            source,
        })?;
        Self::with_source(libraries, source_dir)
    }

    /// Scan without touching any cache.
    pub fn scan(source_dir: &Path) -> Result<Self, CatalogError> {
        Self::with_source(scan_directory(source_dir)?, source_dir)
    }

    /// A catalog of names only; it can resolve but not load definitions.
    pub fn from_listings(libraries: Vec<LibraryListing>) -> Self {
        Catalog {
            libraries,
            ..Default::default()
        }
    }

    fn with_source(libraries: Vec<LibraryListing>, source_dir: &Path) -> Result<Self, CatalogError> {
        let catalog = Catalog {
            libraries,
            source_dir: Some(source_dir.to_path_buf()),
            ..Default::default()
        };
        if catalog.is_empty() {
            return Err(CatalogError::Empty);
        }
        log::info!(
            "Symbol catalog ready: {} symbols in {} libraries",
            catalog.len(),
            catalog.libraries.len()
        );
        Ok(catalog)
    }

    pub fn libraries(&self) -> &[LibraryListing] {
        &self.libraries
    }

    /// All entries in catalog order (libraries in listing order, symbols in file order).
    pub fn entries(&self) -> impl Iterator<Item = CatalogEntry> + '_ {
        self.libraries.iter().flat_map(|lib| {
            lib.symbols
                .iter()
                .map(|symbol| CatalogEntry::new(lib.library.clone(), symbol.clone()))
        })
    }

    pub fn contains(&self, entry: &CatalogEntry) -> bool {
        self.libraries
            .iter()
            .any(|lib| lib.library == entry.library && lib.symbols.contains(&entry.symbol))
    }

    /// Exact `Library:Symbol` lookup
    pub fn lookup_exact(&self, lib_id: &str) -> Option<CatalogEntry> {
        let entry: CatalogEntry = lib_id.parse().ok()?;
        self.contains(&entry).then_some(entry)
    }

    pub fn len(&self) -> usize {
        self.libraries.iter().map(|lib| lib.symbols.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn library(&self, entry: &CatalogEntry) -> Result<Arc<LoadedLibrary>, CatalogError> {
        let dir = self
            .source_dir
            .as_ref()
            .ok_or_else(|| CatalogError::NoLibrarySource(entry.clone()))?;

        let mut loaded = self.loaded.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(library) = loaded.get(&entry.library) {
            return Ok(library.clone());
        }

        let path = dir.join(format!("{}.{SYMBOL_LIBRARY_EXTENSION}", entry.library));
        log::debug!("Loading symbol library {}", path.display());
        let content = fs::read_to_string(&path).map_err(|source| CatalogError::LibraryRead {
            path: path.clone(),
            source,
        })?;
        let library = KicadSymbolLibrary::from_string(&content)
            .map_err(|source| CatalogError::LibraryParse { path, source })?;

        let library = Arc::new(LoadedLibrary(library));
        loaded.insert(entry.library.clone(), library.clone());
        Ok(library)
    }
}

impl SymbolSource for Catalog {
    fn symbol(&self, entry: &CatalogEntry) -> Result<LibrarySymbol, CatalogError> {
        let library = self.library(entry)?;
        library
            .0
            .get_symbol(&entry.symbol)
            .cloned()
            .map(Into::into)
            .ok_or_else(|| CatalogError::SymbolNotFound(entry.clone()))
    }
}

fn read_cache(cache_path: &Path) -> Option<Vec<LibraryListing>> {
    if !cache_path.exists() {
        return None;
    }
    let parsed = fs::read_to_string(cache_path)
        .map_err(anyhow::Error::from)
        .and_then(|content| Ok(serde_json::from_str::<CacheFile>(&content)?));
    match parsed {
        Ok(cache) => Some(cache.symbols),
        Err(e) => {
            log::warn!(
                "Ignoring unreadable symbol catalog cache {}: {e}",
                cache_path.display()
            );
            None
        }
    }
}

fn write_cache(cache_path: &Path, libraries: &[LibraryListing]) -> std::io::Result<()> {
    let cache = CacheFile {
        symbols: libraries.to_vec(),
    };
    let json = serde_json::to_string_pretty(&cache)?;
    if let Some(parent) = cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(cache_path, json)
}

fn scan_directory(source_dir: &Path) -> Result<Vec<LibraryListing>, CatalogError> {
    log::debug!("Scanning symbol libraries in {}", source_dir.display());
    let unavailable = |source| CatalogError::Unavailable {
        path: source_dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(source_dir).map_err(unavailable)? {
        let path = entry.map_err(unavailable)?.path();
        if path
            .extension()
            .is_some_and(|ext| ext == SYMBOL_LIBRARY_EXTENSION)
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut libraries = Vec::new();
    for path in paths {
        let Some(library) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let symbols = match fs::read_to_string(&path)
            .map_err(anyhow::Error::from)
            .and_then(|content| top_level_symbol_names(&content))
        {
            Ok(symbols) => symbols,
            Err(e) => {
                log::warn!("Skipping symbol library {}: {e}", path.display());
                continue;
            }
        };
        if !symbols.is_empty() {
            libraries.push(LibraryListing {
                library: library.to_string(),
                symbols,
            });
        }
    }

    Ok(libraries)
}
