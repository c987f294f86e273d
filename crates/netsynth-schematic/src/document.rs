use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use netsynth_eda::{CatalogEntry, LibrarySymbol, SymbolSource};
use netsynth_sexpr::{format_sexpr, parse, Sexpr};
use uuid::Uuid;

use crate::elements::{self, SymbolBlock};
use crate::geometry::{self, Mirror};
use crate::{
    LoadError, PinLookupError, PlacedSymbol, SchematicError, SchematicPin, SymbolPlacement,
    WireSegment, GENERATOR, SCHEMATIC_VERSION,
};

// Header entries that precede `lib_symbols`
const HEADER_TAGS: &[&str] = &[
    "version",
    "generator",
    "generator_version",
    "uuid",
    "paper",
    "title_block",
];

// Entries that stay at the end of the sheet, after symbols and wires
const TRAILER_TAGS: &[&str] = &["sheet_instances", "symbol_instances", "embedded_fonts"];

const DEFAULT_PROJECT: &str = "netsynth";

/// One schematic sheet.
///
/// Until something is placed or wired, a document opened from disk renders
/// as its exact source text.
#[derive(Debug, Clone)]
pub struct Schematic {
    root: Sexpr,
    source: Option<String>,
    uuids: HashSet<String>,
    dirty: bool,
    project: String,
}

impl Default for Schematic {
    fn default() -> Self {
        Self::new()
    }
}

impl Schematic {
    /// An empty A4 sheet.
    pub fn new() -> Self {
        Self::with_project(DEFAULT_PROJECT)
    }

    fn with_project(project: &str) -> Self {
        let sheet_uuid = Uuid::new_v4().to_string();
        let root = Sexpr::tagged(
            "kicad_sch",
            [
                Sexpr::tagged("version", [Sexpr::symbol(SCHEMATIC_VERSION)]),
                Sexpr::tagged("generator", [Sexpr::string(GENERATOR)]),
                Sexpr::tagged(
                    "generator_version",
                    [Sexpr::string(env!("CARGO_PKG_VERSION"))],
                ),
                elements::uuid(&sheet_uuid),
                Sexpr::tagged("paper", [Sexpr::string("A4")]),
                Sexpr::tagged(
                    "title_block",
                    [Sexpr::tagged(
                        "date",
                        [Sexpr::string(
                            chrono::Local::now().format("%Y-%m-%d").to_string(),
                        )],
                    )],
                ),
                Sexpr::list(vec![Sexpr::symbol("lib_symbols")]),
                Sexpr::tagged(
                    "sheet_instances",
                    [Sexpr::tagged(
                        "path",
                        [
                            Sexpr::string("/"),
                            Sexpr::tagged("page", [Sexpr::string("1")]),
                        ],
                    )],
                ),
            ],
        );

        Schematic {
            root,
            source: None,
            uuids: HashSet::from([sheet_uuid]),
            dirty: true,
            project: project.to_string(),
        }
    }

    /// Open the document at `path`; no path, or a path that does not exist yet,
    /// gives a new empty document.
    pub fn open(path: Option<&Path>) -> Result<Self, SchematicError> {
        let Some(path) = path else {
            return Ok(Self::new());
        };
        let project = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(DEFAULT_PROJECT);

        if !path.exists() {
            log::debug!("Creating new schematic for {}", path.display());
            return Ok(Self::with_project(project));
        }

        let load_error = |source: LoadError| SchematicError::Load {
            path: path.to_path_buf(),
            source,
        };
        let content = fs::read_to_string(path).map_err(|e| load_error(e.into()))?;
        let mut schematic = Self::from_source(content).map_err(load_error)?;
        schematic.project = project.to_string();

        log::debug!(
            "Loaded schematic {} ({} symbols)",
            path.display(),
            schematic.root.children("symbol").count()
        );
        Ok(schematic)
    }

    /// Parse schematic text; the text is kept for a verbatim write-back.
    pub fn from_source(content: String) -> Result<Self, LoadError> {
        let root = parse(&content)?;
        if !root.is_tagged("kicad_sch") {
            return Err(LoadError::NotASchematic);
        }

        let mut uuids = HashSet::new();
        root.walk(&mut |list| {
            if list.is_tagged("uuid") {
                if let Some(id) = list.atom_at(1) {
                    uuids.insert(id.to_string());
                }
            }
        });

        Ok(Schematic {
            root,
            source: Some(content),
            uuids,
            dirty: false,
            project: DEFAULT_PROJECT.to_string(),
        })
    }

    pub fn root(&self) -> &Sexpr {
        &self.root
    }

    /// Whether the tree differs from the text the document was loaded from
    pub fn is_modified(&self) -> bool {
        self.dirty
    }

    /// The sheet's own uuid
    pub fn uuid(&self) -> Option<&str> {
        self.root.child("uuid").and_then(|u| u.atom_at(1))
    }

    pub fn contains_uuid(&self, id: &str) -> bool {
        self.uuids.contains(id)
    }

    fn fresh_uuid(&mut self) -> String {
        loop {
            let id = Uuid::new_v4().to_string();
            if self.uuids.insert(id.clone()) {
                return id;
            }
            log::debug!("Regenerating colliding uuid {id}");
        }
    }

    /// Place symbols and return the uuid of each new `symbol` block, in input order.
    ///
    /// Every definition is fetched before the document is touched, so a
    /// failure leaves the document unchanged.
    pub fn place(
        &mut self,
        placements: &[SymbolPlacement],
        symbols: &dyn SymbolSource,
    ) -> Result<Vec<String>, SchematicError> {
        let mut definitions: BTreeMap<String, LibrarySymbol> = BTreeMap::new();
        let mut missing: Vec<(CatalogEntry, LibrarySymbol)> = Vec::new();

        for placement in placements {
            let lib_id = placement.entry.lib_id();
            if definitions.contains_key(&lib_id) {
                continue;
            }
            let definition = match self.lib_symbol(&lib_id) {
                Some(embedded) => embedded,
                None => {
                    let fetched = symbols.symbol(&placement.entry).map_err(|source| {
                        SchematicError::Symbol {
                            entry: placement.entry.clone(),
                            source,
                        }
                    })?;
                    missing.push((placement.entry.clone(), fetched.clone()));
                    fetched
                }
            };
            definitions.insert(lib_id, definition);
        }

        for (entry, definition) in missing {
            log::debug!("Embedding library symbol {entry}");
            self.embed_lib_symbol(&entry, &definition);
        }

        let sheet_path = match self.uuid() {
            Some(id) => format!("/{id}"),
            None => "/".to_string(),
        };
        let project = self.project.clone();

        let mut placed = Vec::with_capacity(placements.len());
        for placement in placements {
            let definition = definitions.get(&placement.entry.lib_id());
            let value = placement
                .value
                .clone()
                .or_else(|| definition.and_then(|d| d.property("Value").map(str::to_string)))
                .unwrap_or_else(|| placement.entry.symbol.clone());
            let pin_numbers: Vec<String> = definition
                .map(|d| d.unit_pins(1).map(|pin| pin.number.clone()).collect())
                .unwrap_or_default();

            let symbol_uuid = self.fresh_uuid();
            let pins = pin_numbers
                .into_iter()
                .map(|number| (number, self.fresh_uuid()))
                .collect();

            let block = SymbolBlock {
                placement,
                value: &value,
                uuid: &symbol_uuid,
                pins,
                project: &project,
                sheet_path: &sheet_path,
            };
            self.insert_body_item(block.to_sexpr());

            log::debug!(
                "Placed {} ({}) at ({}, {}) angle {}",
                placement.reference,
                placement.entry,
                placement.x,
                placement.y,
                placement.angle
            );
            placed.push(symbol_uuid);
        }

        self.dirty |= !placements.is_empty();
        Ok(placed)
    }

    /// Append one `wire` block per segment.
    pub fn add_wires(&mut self, segments: &[WireSegment]) {
        for segment in segments {
            let wire_uuid = self.fresh_uuid();
            self.insert_body_item(elements::wire(segment, &wire_uuid));
        }
        self.dirty |= !segments.is_empty();
    }

    /// Every `symbol` block on the sheet, in document order.
    pub fn placed_symbols(&self) -> Vec<PlacedSymbol> {
        self.root
            .children("symbol")
            .filter_map(placed_symbol)
            .collect()
    }

    /// First symbol whose `Reference` property equals `reference`.
    pub fn find_symbol(&self, reference: &str) -> Option<PlacedSymbol> {
        self.root
            .children("symbol")
            .filter_map(placed_symbol)
            .find(|symbol| symbol.reference == reference)
    }

    /// The library definition embedded under `lib_symbols` for `lib_id`.
    pub fn lib_symbol(&self, lib_id: &str) -> Option<LibrarySymbol> {
        let definition = self
            .root
            .child("lib_symbols")?
            .children("symbol")
            .find(|s| s.atom_at(1) == Some(lib_id))?;
        match LibrarySymbol::from_sexpr(definition) {
            Ok(symbol) => Some(symbol),
            Err(e) => {
                log::warn!("Embedded library symbol {lib_id} is unreadable: {e}");
                None
            }
        }
    }

    /// Pins of a placed symbol in definition order, projected onto the sheet.
    pub fn pins(&self, reference: &str) -> Result<Vec<SchematicPin>, PinLookupError> {
        let symbol = self
            .find_symbol(reference)
            .ok_or_else(|| PinLookupError::MissingReference {
                reference: reference.to_string(),
            })?;

        let Some(definition) = self.lib_symbol(&symbol.lib_id) else {
            log::warn!(
                "{reference} uses {} which has no embedded definition",
                symbol.lib_id
            );
            return Ok(Vec::new());
        };

        Ok(definition
            .unit_pins(symbol.unit)
            .zip(1..)
            .map(|(pin, index)| SchematicPin {
                reference: reference.to_string(),
                index,
                number: pin.number.clone(),
                name: pin.name.clone(),
                location: geometry::to_sheet(
                    symbol.position,
                    symbol.angle,
                    symbol.mirror,
                    pin.position,
                ),
            })
            .collect())
    }

    /// Sheet location of pin `index` of `reference`.
    ///
    /// `index` is the 1-based position of the pin in definition order; pin
    /// numbers play no part.
    pub fn pin_location(&self, reference: &str, index: u32) -> Result<(f64, f64), PinLookupError> {
        let pins = self.pins(reference)?;

        pins.iter()
            .find(|pin| pin.index == index)
            .map(|pin| pin.location)
            .ok_or_else(|| PinLookupError::PinOutOfRange {
                reference: reference.to_string(),
                pin: index,
                available: pins.len(),
            })
    }

    /// Write the document to `path` through a temporary file in the same directory.
    ///
    /// A modified document is re-rendered from its tree, which does not keep
    /// `;` comments or the original whitespace.
    pub fn persist(&self, path: &Path) -> Result<(), SchematicError> {
        let persist_error = |source: std::io::Error| SchematicError::Persist {
            path: path.to_path_buf(),
            source,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut file = tempfile::NamedTempFile::new_in(&dir).map_err(persist_error)?;
        file.write_all(self.to_string().as_bytes())
            .map_err(persist_error)?;
        file.as_file().sync_all().map_err(persist_error)?;
        file.persist(path).map_err(|e| persist_error(e.error))?;

        log::debug!("Wrote schematic {}", path.display());
        Ok(())
    }

    fn embed_lib_symbol(&mut self, entry: &CatalogEntry, definition: &LibrarySymbol) {
        let mut sexpr = definition.raw_sexp.clone();
        if let Some(items) = sexpr.as_list_mut() {
            if items.len() > 1 {
                items[1] = Sexpr::string(entry.lib_id());
            }
        }

        if self.root.child("lib_symbols").is_none() {
            let index = self.header_end();
            if let Some(items) = self.root.as_list_mut() {
                items.insert(index, Sexpr::list(vec![Sexpr::symbol("lib_symbols")]));
            }
        }
        if let Some(items) = self
            .root
            .child_mut("lib_symbols")
            .and_then(Sexpr::as_list_mut)
        {
            items.push(sexpr);
        }
    }

    fn header_end(&self) -> usize {
        let items = self.root.as_list().unwrap_or(&[]);
        items
            .iter()
            .skip(1)
            .position(|item| !item.tag().is_some_and(|tag| HEADER_TAGS.contains(&tag)))
            .map_or(items.len(), |i| i + 1)
    }

    // Body items go after everything except the trailing instance tables
    fn insert_body_item(&mut self, item: Sexpr) {
        if let Some(items) = self.root.as_list_mut() {
            let index = items
                .iter()
                .position(|i| i.tag().is_some_and(|tag| TRAILER_TAGS.contains(&tag)))
                .unwrap_or(items.len());
            items.insert(index, item);
        }
    }
}

fn placed_symbol(block: &Sexpr) -> Option<PlacedSymbol> {
    let lib_id = block.child("lib_id")?.atom_at(1)?.to_string();
    let at = block.child("at");
    let property = |key: &str| {
        block
            .children("property")
            .find(|p| p.atom_at(1) == Some(key))
            .and_then(|p| p.atom_at(2))
            .unwrap_or_default()
            .to_string()
    };

    Some(PlacedSymbol {
        reference: property("Reference"),
        value: property("Value"),
        position: (
            at.and_then(|a| a.f64_at(1)).unwrap_or(0.0),
            at.and_then(|a| a.f64_at(2)).unwrap_or(0.0),
        ),
        angle: at.and_then(|a| a.f64_at(3)).unwrap_or(0.0),
        mirror: block
            .child("mirror")
            .and_then(|m| m.atom_at(1))
            .and_then(Mirror::from_atom),
        unit: block
            .child("unit")
            .and_then(|u| u.f64_at(1))
            .map_or(1, |u| u as u32),
        uuid: block
            .child("uuid")
            .and_then(|u| u.atom_at(1))
            .unwrap_or_default()
            .to_string(),
        lib_id,
    })
}

impl fmt::Display for Schematic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) if !self.dirty => f.write_str(source),
            _ => writeln!(f, "{}", format_sexpr(&self.root, 0)),
        }
    }
}
