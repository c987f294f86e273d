//! KiCad schematic documents (`.kicad_sch`).
//!
//! A [`Schematic`] owns the S-expression tree of one sheet. Symbols are placed
//! from catalog definitions, wires are appended as axis-aligned segments, and
//! pin locations are projected from the embedded library symbols so routing
//! always sees what KiCad will draw.

mod document;
mod elements;
pub mod geometry;

pub use document::Schematic;
pub use geometry::Mirror;

use netsynth_eda::{CatalogEntry, CatalogError};
use netsynth_sexpr::ParseError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version written into new documents
pub const SCHEMATIC_VERSION: &str = "20231120";
pub const GENERATOR: &str = "netsynth";

#[derive(Debug, thiserror::Error)]
pub enum SchematicError {
    #[error("failed to load schematic {}: {source}", path.display())]
    Load {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("failed to load symbol {entry} for placement: {source}")]
    Symbol {
        entry: CatalogEntry,
        #[source]
        source: CatalogError,
    },

    #[error("failed to write schematic {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("root element is not kicad_sch")]
    NotASchematic,
}

/// Why a pin could not be located on the sheet
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PinLookupError {
    #[error("no symbol with reference {reference}")]
    MissingReference { reference: String },

    #[error("{reference} has no pin {pin} ({available} pins available)")]
    PinOutOfRange {
        reference: String,
        pin: u32,
        available: usize,
    },
}

/// A component ready to be written into a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolPlacement {
    pub reference: String,
    /// Falls back to the library symbol's own value when absent
    pub value: Option<String>,
    pub entry: CatalogEntry,
    pub x: f64,
    pub y: f64,
    /// One of 0, 90, 180, 270
    pub angle: u16,
}

/// A `symbol` block already present in a document
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacedSymbol {
    pub lib_id: String,
    pub reference: String,
    pub value: String,
    pub position: (f64, f64),
    pub angle: f64,
    pub mirror: Option<Mirror>,
    pub unit: u32,
    pub uuid: String,
}

/// A pin of a placed symbol, in sheet coordinates
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchematicPin {
    pub reference: String,
    /// 1-based position in the symbol's pin definition order
    pub index: u32,
    pub number: String,
    pub name: String,
    pub location: (f64, f64),
}

/// A straight wire between two sheet points
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireSegment {
    pub x: f64,
    pub y: f64,
    pub end_x: f64,
    pub end_y: f64,
}

impl WireSegment {
    pub fn new(x: f64, y: f64, end_x: f64, end_y: f64) -> Self {
        Self { x, y, end_x, end_y }
    }

    pub fn between(start: (f64, f64), end: (f64, f64)) -> Self {
        Self::new(start.0, start.1, end.0, end.1)
    }

    pub fn start(&self) -> (f64, f64) {
        (self.x, self.y)
    }

    pub fn end(&self) -> (f64, f64) {
        (self.end_x, self.end_y)
    }

    pub fn is_horizontal(&self) -> bool {
        self.y == self.end_y
    }

    pub fn is_vertical(&self) -> bool {
        self.x == self.end_x
    }

    pub fn is_axis_aligned(&self) -> bool {
        self.is_horizontal() || self.is_vertical()
    }

    pub fn is_zero_length(&self) -> bool {
        self.is_horizontal() && self.is_vertical()
    }
}
