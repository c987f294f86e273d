
use netsynth_eda::{Catalog, CatalogEntry, CatalogError, SymbolSource};
use std::fs;
use test_utils::setup_test_env;

#[test]
fn test_scan_lists_libraries_in_file_order() {
    let env = setup_test_env();
    let catalog = Catalog::scan(&env.path().join("symbols")).unwrap();

    let ids: Vec<String> = catalog.entries().map(|e| e.lib_id()).collect();
    assert_eq!(
        ids,
        vec![
            "Device:Battery",
            "Device:C",
            "Device:LED",
            "Device:R",
            "Device:R_Shunt",
            "Switch:SW_SPST",
            "Switch:SW_Push",
        ]
    );
}

#[test]
fn test_load_writes_cache_and_reuses_it() {
    let env = setup_test_env();
    let symbols = env.path().join("symbols");
    let cache = env.path().join("cache/symbol_data.json");

    let first = Catalog::load(&symbols, &cache).unwrap();
    assert!(cache.exists());

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(json["symbols"][1]["lib"], "Switch");
    assert_eq!(json["symbols"][1]["symbols"][0], "SW_SPST");

    // The cache wins over the directory contents until rebuilt
    fs::remove_file(symbols.join("Switch.kicad_sym")).unwrap();
    let second = Catalog::load(&symbols, &cache).unwrap();
    assert_eq!(second.len(), first.len());
    assert!(second.contains(&CatalogEntry::new("Switch", "SW_SPST")));

    let rebuilt = Catalog::rebuild(&symbols, &cache).unwrap();
    assert!(!rebuilt.contains(&CatalogEntry::new("Switch", "SW_SPST")));
    assert_eq!(rebuilt.len(), 5);
}

#[test]
fn test_corrupt_cache_is_rebuilt() {
    let env = setup_test_env();
    let cache = env.path().join("symbol_data.json");
    fs::write(&cache, "{ not json").unwrap();

    let catalog = Catalog::load(&env.path().join("symbols"), &cache).unwrap();
    assert_eq!(catalog.len(), 7);

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&cache).unwrap()).unwrap();
    assert_eq!(json["symbols"][0]["lib"], "Device");
}

#[test]
fn test_missing_directory_is_unavailable() {
    let env = setup_test_env();
    let err = Catalog::load(
        &env.path().join("does-not-exist"),
        &env.path().join("symbol_data.json"),
    )
    .unwrap_err();
    assert!(matches!(err, CatalogError::Unavailable { .. }));
}

#[test]
fn test_directory_without_libraries_is_empty() {
    let env = setup_test_env();
    let empty = env.path().join("empty");
    fs::create_dir_all(&empty).unwrap();
    fs::write(empty.join("notes.txt"), "not a library").unwrap();

    let err = Catalog::scan(&empty).unwrap_err();
    assert!(matches!(err, CatalogError::Empty));
}

#[test]
fn test_unparseable_library_is_skipped() {
    let env = setup_test_env();
    let symbols = env.path().join("symbols");
    fs::write(symbols.join("Broken.kicad_sym"), "(kicad_symbol_lib (symbol \"X\"").unwrap();

    let catalog = Catalog::scan(&symbols).unwrap();
    assert!(catalog.libraries().iter().all(|lib| lib.library != "Broken"));
    assert_eq!(catalog.len(), 7);
}

#[test]
fn test_symbol_source_loads_definitions() {
    let env = setup_test_env();
    let catalog = Catalog::scan(&env.path().join("symbols")).unwrap();

    let led = catalog.symbol(&CatalogEntry::new("Device", "LED")).unwrap();
    assert_eq!(led.name, "LED");
    let pins: Vec<(&str, &str)> = led
        .unit_pins(1)
        .map(|p| (p.number.as_str(), p.name.as_str()))
        .collect();
    assert_eq!(pins, vec![("1", "K"), ("2", "A")]);
    assert_eq!(led.pins[0].position, (-3.81, 0.0));
}

#[test]
fn test_symbol_source_resolves_extends() {
    let env = setup_test_env();
    let catalog = Catalog::scan(&env.path().join("symbols")).unwrap();

    let shunt = catalog
        .symbol(&CatalogEntry::new("Device", "R_Shunt"))
        .unwrap();
    assert_eq!(shunt.pins.len(), 2);
    assert_eq!(shunt.property("Value"), Some("R_Shunt"));
    assert_eq!(shunt.property("Description"), Some("Shunt resistor"));
    assert!(shunt.raw_sexp.child("extends").is_none());
}

#[test]
fn test_symbol_source_unknown_symbol() {
    let env = setup_test_env();
    let catalog = Catalog::scan(&env.path().join("symbols")).unwrap();

    let err = catalog
        .symbol(&CatalogEntry::new("Device", "L"))
        .unwrap_err();
    assert!(matches!(err, CatalogError::SymbolNotFound(_)));

    let err = catalog
        .symbol(&CatalogEntry::new("Nope", "L"))
        .unwrap_err();
    assert!(matches!(err, CatalogError::LibraryRead { .. }));
}
