use anyhow::Result;
use netsynth_sexpr::Sexpr;
use std::collections::HashMap;

use crate::{LibrarySymbol, Pin};

#[derive(Debug, Clone)]
pub struct KicadSymbol {
    pub(super) name: String,
    pub(super) extends: Option<String>,
    pub(super) pins: Vec<KicadPin>,
    pub(super) properties: HashMap<String, String>,
    pub(super) raw_sexp: Sexpr,
}

impl KicadSymbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn extends(&self) -> Option<&str> {
        self.extends.as_deref()
    }

    pub fn raw_sexp(&self) -> &Sexpr {
        &self.raw_sexp
    }
}

#[derive(Debug, Default, Clone)]
pub(super) struct KicadPin {
    pub(super) name: String,
    pub(super) number: String,
    pub(super) position: (f64, f64),
    pub(super) unit: u32,
    pub(super) style: u32,
}

impl From<KicadSymbol> for LibrarySymbol {
    fn from(symbol: KicadSymbol) -> Self {
        LibrarySymbol {
            name: symbol.name,
            properties: symbol.properties,
            pins: symbol
                .pins
                .into_iter()
                .map(|pin| Pin {
                    name: pin.name,
                    number: pin.number,
                    position: pin.position,
                    unit: pin.unit,
                    style: pin.style,
                })
                .collect(),
            raw_sexp: symbol.raw_sexp,
        }
    }
}

/// Parse a `(symbol "Name" ...)` block, collecting pins from every unit section.
pub fn parse_symbol(symbol_sexp: &Sexpr) -> Result<KicadSymbol> {
    if !symbol_sexp.is_tagged("symbol") {
        anyhow::bail!("Expected a 'symbol' expression");
    }
    let name = symbol_sexp
        .atom_at(1)
        .ok_or(anyhow::anyhow!("Symbol name not found"))?
        .to_string();

    let mut symbol = KicadSymbol {
        name,
        extends: None,
        pins: Vec::new(),
        properties: HashMap::new(),
        raw_sexp: symbol_sexp.clone(),
    };

    for item in symbol_sexp.as_list().unwrap_or(&[]).iter().skip(2) {
        match item.tag() {
            Some("extends") => symbol.extends = item.atom_at(1).map(str::to_string),
            Some("property") => {
                if let (Some(key), Some(value)) = (item.atom_at(1), item.atom_at(2)) {
                    symbol.properties.insert(key.to_string(), value.to_string());
                }
            }
            // Legacy layout: pins directly under the symbol belong to every unit
            Some("pin") => symbol.pins.extend(parse_pin(item, 0, 0)),
            Some("symbol") => parse_unit_section(&mut symbol, item),
            _ => {}
        }
    }

    Ok(symbol)
}

/// Unit sections are named `<symbol>_<unit>_<body style>`; unit 0 is shared by all units.
fn parse_unit_section(symbol: &mut KicadSymbol, section: &Sexpr) {
    let (unit, style) = section
        .atom_at(1)
        .and_then(unit_and_style)
        .unwrap_or((0, 0));

    for pin in section.children("pin") {
        symbol.pins.extend(parse_pin(pin, unit, style));
    }
}

fn unit_and_style(section_name: &str) -> Option<(u32, u32)> {
    let mut parts = section_name.rsplitn(3, '_');
    let style = parts.next()?.parse().ok()?;
    let unit = parts.next()?.parse().ok()?;
    parts.next()?;
    Some((unit, style))
}

// (pin passive line (at X Y ANGLE) (length L) (name "~") (number "1")); only X and Y matter for routing
fn parse_pin(pin: &Sexpr, unit: u32, style: u32) -> Option<KicadPin> {
    let at = pin.child("at")?;
    let number = pin.child("number")?.atom_at(1)?.to_string();
    let name = pin
        .child("name")
        .and_then(|n| n.atom_at(1))
        .unwrap_or_default()
        .to_string();

    Some(KicadPin {
        name,
        number,
        position: (at.f64_at(1)?, at.f64_at(2)?),
        unit,
        style,
    })
}
