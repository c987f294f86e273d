//! # netsynth-engine
//!
//! Turns an abstract circuit description (typed components with rough
//! positions plus pin-to-pin connections) into a KiCad schematic.
//!
//! The stages run strictly in order: resolve each component against the
//! symbol catalog, map its coordinates onto the sheet, place it, then route
//! wires between the pins the document reports and write them in a second
//! pass.

pub mod layout;
pub mod resolver;
pub mod router;
mod synthesize;

pub use layout::CoordinateMode;
pub use resolver::{ComponentKind, ResolvedComponent, Resolver};
pub use router::{RouteOutcome, RoutingReport, SkipReason, SkippedConnection};
pub use synthesize::{synthesize, SynthesisOutcome, SynthesisRequest};

pub use netsynth_eda::{Catalog, CatalogEntry};
pub use netsynth_schematic::{Schematic, SymbolPlacement, WireSegment};

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("symbol catalog unavailable: {0}")]
    CatalogUnavailable(#[from] netsynth_eda::CatalogError),

    #[error("cannot load target schematic: {0}")]
    DocumentLoad(#[source] netsynth_schematic::SchematicError),

    /// The symbol a component resolved to cannot be loaded from its library.
    #[error("symbol for {reference} ('{type_hint}') cannot be loaded: {source}")]
    UnresolvedSymbol {
        reference: String,
        type_hint: String,
        #[source]
        source: netsynth_eda::CatalogError,
    },

    #[error("failed to write schematic {}: {source}", path.display())]
    Persist {
        path: PathBuf,
        #[source]
        source: netsynth_schematic::SchematicError,
    },

    #[error("invalid circuit description: {0}")]
    InvalidCircuit(#[from] serde_json::Error),
}

/// A component as described upstream, before resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentSpec {
    #[serde(alias = "reference_name")]
    pub reference: String,
    /// Free-text or abbreviated component type, e.g. `resistor` or `Device:R`
    #[serde(alias = "lib_id", alias = "type")]
    pub type_hint: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub angle: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// A pin-to-pin connection; pins are 1-based
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    #[serde(alias = "A_ref", alias = "componentA_reference")]
    pub a_ref: String,
    #[serde(alias = "A_pin", alias = "componentA_pin")]
    pub a_pin: u32,
    #[serde(alias = "B_ref", alias = "componentB_reference")]
    pub b_ref: String,
    #[serde(alias = "B_pin", alias = "componentB_pin")]
    pub b_pin: u32,
}

impl Connection {
    pub fn new(a_ref: &str, a_pin: u32, b_ref: &str, b_pin: u32) -> Self {
        Self {
            a_ref: a_ref.to_string(),
            a_pin,
            b_ref: b_ref.to_string(),
            b_pin,
        }
    }
}

impl std::fmt::Display for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{} -> {}.{}", self.a_ref, self.a_pin, self.b_ref, self.b_pin)
    }
}

/// Components and connections of one synthesis run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitDescription {
    #[serde(rename = "detected_components", alias = "components", default)]
    pub components: Vec<ComponentSpec>,
    #[serde(rename = "component_connections", alias = "connections", default)]
    pub connections: Vec<Connection>,
}

impl CircuitDescription {
    pub fn from_json(json: &str) -> Result<Self, SynthesisError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_reader(reader: impl Read) -> Result<Self, SynthesisError> {
        Ok(serde_json::from_reader(reader)?)
    }
}

/// Geometry settings for one run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisOptions {
    pub scale: f64,
    pub mode: CoordinateMode,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            scale: 0.2,
            mode: CoordinateMode::Absolute,
        }
    }
}
