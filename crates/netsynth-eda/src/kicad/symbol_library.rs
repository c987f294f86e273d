use anyhow::Result;
use netsynth_sexpr::{parse, Sexpr};
use std::collections::HashMap;

use super::symbol::{parse_symbol, KicadSymbol};

/// A KiCad symbol library (`.kicad_sym`) with `extends` inheritance resolved
pub struct KicadSymbolLibrary {
    symbols: Vec<KicadSymbol>,
}

impl KicadSymbolLibrary {
    pub fn from_string(content: &str) -> Result<Self> {
        let root = parse_library_root(content)?;

        let mut raw: Vec<KicadSymbol> = Vec::new();
        for item in root.children("symbol") {
            match parse_symbol(item) {
                Ok(symbol) => raw.push(symbol),
                Err(e) => log::warn!("Failed to parse symbol: {e}"),
            }
        }

        let by_name: HashMap<&str, &KicadSymbol> =
            raw.iter().map(|s| (s.name(), s)).collect();

        let mut symbols = Vec::with_capacity(raw.len());
        for symbol in &raw {
            if symbol.extends().is_none() {
                symbols.push(symbol.clone());
                continue;
            }
            let flattened = flatten(symbol, &by_name, &mut Vec::new());
            symbols.push(parse_symbol(&flattened)?);
        }

        Ok(KicadSymbolLibrary { symbols })
    }

    pub fn get_symbol(&self, name: &str) -> Option<&KicadSymbol> {
        self.symbols.iter().find(|s| s.name() == name)
    }

    pub fn symbol_names(&self) -> Vec<&str> {
        self.symbols.iter().map(|s| s.name()).collect()
    }
}

fn parse_library_root(content: &str) -> Result<Sexpr> {
    let root = parse(content)?;
    if !root.is_tagged("kicad_symbol_lib") {
        anyhow::bail!("Invalid KiCad symbol library format");
    }
    Ok(root)
}

/// Names of the top-level symbols of a library, as listed in the catalog.
///
/// A name of the form `<previous>_<digit>...` directly after `<previous>` is a
/// unit/variant definition of that symbol and is not listed.
pub fn top_level_symbol_names(content: &str) -> Result<Vec<String>> {
    let root = parse_library_root(content)?;

    let mut names: Vec<String> = Vec::new();
    for name in root.children("symbol").filter_map(|s| s.atom_at(1)) {
        if names.last().is_some_and(|previous| is_variant_of(name, previous)) {
            log::trace!("Skipping variant definition {name}");
            continue;
        }
        names.push(name.to_string());
    }
    Ok(names)
}

fn is_variant_of(name: &str, parent: &str) -> bool {
    name.strip_prefix(parent)
        .and_then(|rest| rest.strip_prefix('_'))
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_digit()))
}

/// Resolve the `extends` chain of `symbol` into a single self-contained definition.
fn flatten(
    symbol: &KicadSymbol,
    by_name: &HashMap<&str, &KicadSymbol>,
    chain: &mut Vec<String>,
) -> Sexpr {
    let Some(parent_name) = symbol.extends() else {
        return symbol.raw_sexp().clone();
    };

    if chain.iter().any(|seen| seen == parent_name) {
        log::warn!(
            "Circular extends dependency detected for symbol '{}'",
            symbol.name()
        );
        return symbol.raw_sexp().clone();
    }

    let Some(parent) = by_name.get(parent_name) else {
        log::warn!(
            "Symbol '{}' extends '{}' but parent not found",
            symbol.name(),
            parent_name
        );
        return symbol.raw_sexp().clone();
    };

    chain.push(symbol.name().to_string());
    let parent_sexp = flatten(parent, by_name, chain);
    merge_symbol_sexprs(&parent_sexp, symbol.raw_sexp())
}

/// Merge a derived symbol onto its parent; entries in the child override the parent's.
fn merge_symbol_sexprs(parent: &Sexpr, child: &Sexpr) -> Sexpr {
    let (Some(parent_items), Some(child_items)) = (parent.as_list(), child.as_list()) else {
        return child.clone();
    };
    let parent_name = parent.atom_at(1).unwrap_or_default();
    let child_name = child.atom_at(1).unwrap_or_default();

    let overrides: Vec<&Sexpr> = child_items
        .iter()
        .skip(2)
        .filter(|item| !item.is_tagged("extends"))
        .collect();
    let child_has_units = overrides.iter().any(|item| item.is_tagged("symbol"));

    let mut merged = vec![Sexpr::symbol("symbol"), Sexpr::string(child_name)];
    for item in parent_items.iter().skip(2) {
        if item.is_tagged("symbol") {
            if !child_has_units {
                merged.push(rename_unit_section(item, parent_name, child_name));
            }
        } else if !overrides.iter().any(|o| same_slot(o, item)) {
            merged.push(item.clone());
        }
    }
    merged.extend(overrides.into_iter().cloned());

    Sexpr::List(merged)
}

// Two entries occupy the same slot if they share a tag (and a key, for properties)
fn same_slot(a: &Sexpr, b: &Sexpr) -> bool {
    a.tag() == b.tag() && (!a.is_tagged("property") || a.atom_at(1) == b.atom_at(1))
}

fn rename_unit_section(section: &Sexpr, parent_name: &str, child_name: &str) -> Sexpr {
    let mut section = section.clone();
    if let Some(items) = section.as_list_mut() {
        if let Some(suffix) = items
            .get(1)
            .and_then(|n| n.as_atom())
            .and_then(|n| n.strip_prefix(parent_name))
        {
            items[1] = Sexpr::string(format!("{child_name}{suffix}"));
        }
    }
    section
}
