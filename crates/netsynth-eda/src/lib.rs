pub mod catalog;
pub mod kicad;

pub use catalog::{Catalog, CatalogEntry, CatalogError, LibraryListing, SymbolSource};

use anyhow::Result;
use kicad::symbol::parse_symbol;
use netsynth_sexpr::Sexpr;
use serde::Serialize;

use std::collections::HashMap;

/// A library symbol definition together with its pin geometry
#[derive(Debug, Clone, Serialize)]
pub struct LibrarySymbol {
    pub name: String,
    pub pins: Vec<Pin>,
    pub properties: HashMap<String, String>,
    #[serde(skip)]
    pub raw_sexp: Sexpr,
}

/// A pin in library coordinates (millimetres, Y axis pointing up).
///
/// `position` is the electrical connection point of the pin.
#[derive(Debug, Clone, Serialize)]
pub struct Pin {
    pub name: String,
    pub number: String,
    pub position: (f64, f64),
    /// 0 when the pin is shared by all units
    pub unit: u32,
    pub style: u32,
}

impl Pin {
    /// Whether this pin is drawn for the given unit in the default body style.
    pub fn belongs_to(&self, unit: u32) -> bool {
        (self.unit == 0 || self.unit == unit) && self.style <= 1
    }
}

impl LibrarySymbol {
    /// Build from a `(symbol ...)` block, e.g. one embedded in a schematic's `lib_symbols`.
    pub fn from_sexpr(sexpr: &Sexpr) -> Result<Self> {
        Ok(parse_symbol(sexpr)?.into())
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Pins of one unit, in definition order
    pub fn unit_pins(&self, unit: u32) -> impl Iterator<Item = &Pin> {
        self.pins.iter().filter(move |pin| pin.belongs_to(unit))
    }
}
