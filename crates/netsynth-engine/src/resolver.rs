//! Symbol resolution: free-text component types to catalog entries.
//!
//! A fixed alias table is consulted first, exactly as written (no case
//! folding). Anything else goes to a nearest-neighbour search by edit
//! distance over the whole catalog.

use netsynth_eda::{Catalog, CatalogEntry, CatalogError};
use serde::Serialize;

use crate::{ComponentSpec, SynthesisError};

/// What a component is, as far as layout rules are concerned
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "entry", rename_all = "snake_case")]
pub enum ComponentKind {
    Resistor,
    Capacitor,
    Battery,
    Led,
    Switch,
    Other(CatalogEntry),
}

const KNOWN_KINDS: [ComponentKind; 5] = [
    ComponentKind::Resistor,
    ComponentKind::Capacitor,
    ComponentKind::Battery,
    ComponentKind::Led,
    ComponentKind::Switch,
];

const ALIASES: &[(&str, ComponentKind)] = &[
    ("resistor", ComponentKind::Resistor),
    ("R", ComponentKind::Resistor),
    ("Resistor", ComponentKind::Resistor),
    ("capacitor", ComponentKind::Capacitor),
    ("C", ComponentKind::Capacitor),
    ("C_Small", ComponentKind::Capacitor),
    ("battery", ComponentKind::Battery),
    ("cell", ComponentKind::Battery),
    ("BAT", ComponentKind::Battery),
    ("led", ComponentKind::Led),
    ("LED", ComponentKind::Led),
    ("switch", ComponentKind::Switch),
    ("SW", ComponentKind::Switch),
    ("switch_spst", ComponentKind::Switch),
];

impl ComponentKind {
    /// The catalog entry this kind is placed as.
    pub fn entry(&self) -> CatalogEntry {
        let (library, symbol) = match self {
            ComponentKind::Resistor => ("Device", "R"),
            ComponentKind::Capacitor => ("Device", "C"),
            ComponentKind::Battery => ("Device", "Battery"),
            ComponentKind::Led => ("Device", "LED"),
            ComponentKind::Switch => ("Switch", "SW_SPST"),
            ComponentKind::Other(entry) => return entry.clone(),
        };
        CatalogEntry::new(library, symbol)
    }

    /// The known kind for `entry`, or `Other`.
    pub fn from_entry(entry: CatalogEntry) -> Self {
        KNOWN_KINDS
            .into_iter()
            .find(|kind| kind.entry() == entry)
            .unwrap_or(ComponentKind::Other(entry))
    }

    /// Alias table lookup; case-sensitive.
    pub fn from_alias(hint: &str) -> Option<Self> {
        ALIASES
            .iter()
            .find(|(alias, _)| *alias == hint)
            .map(|(_, kind)| kind.clone())
    }
}

/// A component spec together with what it resolved to
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedComponent {
    pub spec: ComponentSpec,
    pub kind: ComponentKind,
}

impl ResolvedComponent {
    pub fn entry(&self) -> CatalogEntry {
        self.kind.entry()
    }
}

pub struct Resolver<'a> {
    catalog: &'a Catalog,
    first: CatalogEntry,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog) -> Result<Self, SynthesisError> {
        let first = catalog
            .entries()
            .next()
            .ok_or(SynthesisError::CatalogUnavailable(CatalogError::Empty))?;
        Ok(Self { catalog, first })
    }

    /// Resolve a type hint. Never fails once the catalog is non-empty.
    pub fn resolve(&self, hint: &str) -> ComponentKind {
        if let Some(kind) = ComponentKind::from_alias(hint) {
            if !self.catalog.contains(&kind.entry()) {
                log::warn!(
                    "Alias '{hint}' maps to {} which is not in the symbol catalog",
                    kind.entry()
                );
            }
            return kind;
        }

        if let Some(entry) = self.catalog.lookup_exact(hint) {
            return ComponentKind::from_entry(entry);
        }

        let (entry, distance) = self
            .closest_matches(hint, 1)
            .into_iter()
            .next()
            .unwrap_or_else(|| (self.first.clone(), usize::MAX));
        log::debug!("Resolved '{hint}' to {entry} (distance {distance})");
        ComponentKind::from_entry(entry)
    }

    pub fn resolve_component(&self, spec: &ComponentSpec) -> ResolvedComponent {
        ResolvedComponent {
            spec: spec.clone(),
            kind: self.resolve(&spec.type_hint),
        }
    }

    /// The `n` catalog entries closest to `term`, nearest first; ties keep catalog order.
    pub fn closest_matches(&self, term: &str, n: usize) -> Vec<(CatalogEntry, usize)> {
        let term = term.to_lowercase();
        let mut scored: Vec<(CatalogEntry, usize)> = self
            .catalog
            .entries()
            .map(|entry| {
                let distance = levenshtein(&term, &entry.symbol.to_lowercase());
                (entry, distance)
            })
            .collect();
        // stable sort keeps catalog order among equal distances
        scored.sort_by_key(|(_, distance)| *distance);
        scored.truncate(n);
        scored
    }
}

/// Edit distance counting single-character insertions, deletions and substitutions.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != *cb);
            current[j + 1] = substitution.min(previous[j + 1] + 1).min(current[j] + 1);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use netsynth_eda::LibraryListing;

    fn catalog() -> Catalog {
        Catalog::from_listings(vec![
            LibraryListing {
                library: "Device".to_string(),
                symbols: ["Battery", "C", "LED", "R", "R_Small", "L"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            },
            LibraryListing {
                library: "Switch".to_string(),
                symbols: vec!["SW_SPST".to_string(), "SW_Push".to_string()],
            },
        ])
    }

    #[test]
    fn test_levenshtein() {
        assert_eq!(levenshtein("", ""), 0);
        assert_eq!(levenshtein("abc", ""), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("r_small", "r"), 6);
        assert_eq!(levenshtein("led", "led"), 0);
    }

    #[test]
    fn test_aliases_take_precedence() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog).unwrap();
        for (alias, kind) in ALIASES {
            assert_eq!(&resolver.resolve(alias), kind, "alias {alias}");
        }
        // "bat" is closer to "c" than to "battery"; the table still wins
        let nearest = &resolver.closest_matches("BAT", 1)[0].0;
        assert_eq!(nearest, &CatalogEntry::new("Device", "C"));
        assert_eq!(resolver.resolve("BAT"), ComponentKind::Battery);
    }

    #[test]
    fn test_aliases_are_case_sensitive() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog).unwrap();
        // "Led" is not an alias; fuzzy matching still lands on LED
        assert_eq!(resolver.resolve("Led"), ComponentKind::Led);
        assert_eq!(ComponentKind::from_alias("RESISTOR"), None);
        assert_eq!(ComponentKind::from_alias("Capacitor"), None);
    }

    #[test]
    fn test_fuzzy_is_minimal_and_stable() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog).unwrap();
        let kind = resolver.resolve("push button");
        let entry = kind.entry();
        let best = levenshtein("push button", &entry.symbol.to_lowercase());
        for other in catalog.entries() {
            assert!(best <= levenshtein("push button", &other.symbol.to_lowercase()));
        }
        for _ in 0..5 {
            assert_eq!(resolver.resolve("push button"), kind);
        }
    }

    #[test]
    fn test_fuzzy_ties_follow_catalog_order() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog).unwrap();
        // "x" is distance 1 from each of C, R, L; C comes first
        assert_eq!(resolver.resolve("x"), ComponentKind::Capacitor);
    }

    #[test]
    fn test_qualified_lib_id_resolves_to_itself() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog).unwrap();
        assert_eq!(
            resolver.resolve("Switch:SW_Push"),
            ComponentKind::Other(CatalogEntry::new("Switch", "SW_Push"))
        );
        assert_eq!(resolver.resolve("Device:R"), ComponentKind::Resistor);
    }

    #[test]
    fn test_fuzzy_result_normalizes_to_known_kind() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog).unwrap();
        assert_eq!(resolver.resolve("sw_spst"), ComponentKind::Switch);
        assert_eq!(resolver.resolve("Battery"), ComponentKind::Battery);
    }

    #[test]
    fn test_closest_matches() {
        let catalog = catalog();
        let resolver = Resolver::new(&catalog).unwrap();
        let matches = resolver.closest_matches("sw_pus", 2);
        assert_eq!(matches[0], (CatalogEntry::new("Switch", "SW_Push"), 1));
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_empty_catalog_is_unavailable() {
        let catalog = Catalog::from_listings(Vec::new());
        assert!(matches!(
            Resolver::new(&catalog),
            Err(SynthesisError::CatalogUnavailable(_))
        ));
    }

    #[test]
    fn test_kind_entries() {
        assert_eq!(ComponentKind::Resistor.entry().lib_id(), "Device:R");
        assert_eq!(ComponentKind::Switch.entry().lib_id(), "Switch:SW_SPST");
        assert_eq!(
            ComponentKind::from_entry(CatalogEntry::new("Device", "Battery")),
            ComponentKind::Battery
        );
    }
}
