use netsynth_eda::{Catalog, CatalogEntry};
use netsynth_schematic::{
    PinLookupError, Schematic, SchematicError, SymbolPlacement, WireSegment,
};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn catalog() -> Catalog {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../netsynth-eda/tests/resources/symbols");
    Catalog::scan(&dir).expect("fixture libraries should scan")
}

fn placement(reference: &str, lib_id: &str, x: f64, y: f64, angle: u16) -> SymbolPlacement {
    SymbolPlacement {
        reference: reference.to_string(),
        value: None,
        entry: lib_id.parse().unwrap(),
        x,
        y,
        angle,
    }
}

const HAND_WRITTEN: &str = "(kicad_sch (version 20231120) (generator \"eeschema\")\n\n  (uuid \"5b1c3d2e-0000-4000-8000-000000000001\")\n  (paper \"A4\")\n  (lib_symbols)\n  (wire (pts (xy 10 10) (xy 20 10))\n    (stroke (width 0) (type default))\n    (uuid \"5b1c3d2e-0000-4000-8000-000000000002\"))\n  (sheet_instances (path \"/\" (page \"1\")))\n)\n";

#[test]
fn test_unmodified_document_round_trips_byte_for_byte() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("input.kicad_sch");
    let output = dir.path().join("output.kicad_sch");
    fs::write(&input, HAND_WRITTEN).unwrap();

    let sch = Schematic::open(Some(&input)).unwrap();
    assert!(!sch.is_modified());
    sch.persist(&output).unwrap();

    assert_eq!(fs::read(&output).unwrap(), HAND_WRITTEN.as_bytes());
}

#[test]
fn test_open_missing_path_creates_new_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("fresh.kicad_sch");

    let sch = Schematic::open(Some(&path)).unwrap();
    assert!(sch.placed_symbols().is_empty());
    assert!(!path.exists());

    sch.persist(&path).unwrap();
    let reopened = Schematic::open(Some(&path)).unwrap();
    assert_eq!(reopened.uuid(), sch.uuid());
}

#[test]
fn test_invalid_document_is_rejected_and_untouched() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("broken.kicad_sch");
    fs::write(&path, "(kicad_sch (version 20231120)").unwrap();

    let err = Schematic::open(Some(&path)).unwrap_err();
    assert!(matches!(err, SchematicError::Load { .. }));
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "(kicad_sch (version 20231120)"
    );
}

#[test]
fn test_new_uuids_avoid_existing_ones() {
    let catalog = catalog();
    let mut sch = Schematic::from_source(HAND_WRITTEN.to_string()).unwrap();
    let existing: HashSet<String> = [
        "5b1c3d2e-0000-4000-8000-000000000001",
        "5b1c3d2e-0000-4000-8000-000000000002",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    let placed = sch
        .place(
            &[
                placement("R1", "Device:R", 50.8, 50.8, 0),
                placement("R2", "Device:R", 76.2, 50.8, 0),
            ],
            &catalog,
        )
        .unwrap();
    sch.add_wires(&[WireSegment::new(50.8, 46.99, 76.2, 46.99)]);

    let mut seen = HashSet::new();
    sch.root().walk(&mut |list| {
        if list.is_tagged("uuid") {
            let id = list.atom_at(1).unwrap().to_string();
            assert!(seen.insert(id), "duplicate uuid in document");
        }
    });
    assert!(existing.is_subset(&seen));
    assert!(placed.iter().all(|id| !existing.contains(id)));
}

#[test]
fn test_pins_follow_rotation() {
    let catalog = catalog();
    let mut sch = Schematic::new();
    sch.place(
        &[
            placement("R1", "Device:R", 100.0, 50.0, 90),
            placement("BT1", "Device:Battery", 50.0, 50.0, 0),
            placement("D1", "Device:LED", 20.0, 20.0, 180),
            placement("SW1", "Switch:SW_SPST", 30.0, 80.0, 270),
        ],
        &catalog,
    )
    .unwrap();

    assert_eq!(sch.pin_location("R1", 1), Ok((96.19, 50.0)));
    assert_eq!(sch.pin_location("R1", 2), Ok((103.81, 50.0)));
    assert_eq!(sch.pin_location("BT1", 1), Ok((50.0, 44.92)));
    assert_eq!(sch.pin_location("BT1", 2), Ok((50.0, 55.08)));
    assert_eq!(sch.pin_location("D1", 1), Ok((23.81, 20.0)));
    assert_eq!(sch.pin_location("SW1", 1), Ok((30.0, 74.92)));

    let led_pins = sch.pins("D1").unwrap();
    let names: Vec<&str> = led_pins.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["K", "A"]);
}

#[test]
fn test_pin_lookup_errors() {
    let catalog = catalog();
    let mut sch = Schematic::new();
    sch.place(&[placement("C1", "Device:C", 10.0, 10.0, 0)], &catalog)
        .unwrap();

    assert!(matches!(
        sch.pin_location("C2", 1),
        Err(PinLookupError::MissingReference { .. })
    ));
    assert!(matches!(
        sch.pin_location("C1", 5),
        Err(PinLookupError::PinOutOfRange { available: 2, .. })
    ));
}

#[test]
fn test_persisted_placement_reloads() {
    let catalog = catalog();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("board.kicad_sch");

    let mut sch = Schematic::open(Some(&path)).unwrap();
    let mut r1 = placement("R1", "Device:R", 121.92, 67.31, 0);
    r1.value = Some("10k".to_string());
    sch.place(&[r1], &catalog).unwrap();
    sch.add_wires(&[WireSegment::new(121.92, 63.5, 121.92, 50.8)]);
    sch.persist(&path).unwrap();

    let reloaded = Schematic::open(Some(&path)).unwrap();
    let r1 = reloaded.find_symbol("R1").unwrap();
    assert_eq!(r1.lib_id, "Device:R");
    assert_eq!(r1.value, "10k");
    assert_eq!(r1.position, (121.92, 67.31));
    assert_eq!(reloaded.pin_location("R1", 1), Ok((121.92, 63.5)));
    assert_eq!(reloaded.root().children("wire").count(), 1);

    let embedded = reloaded.lib_symbol("Device:R").unwrap();
    assert_eq!(embedded.pins.len(), 2);

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("(project \"board\""));
    assert!(text.contains(&format!("(path \"/{}\"", reloaded.uuid().unwrap())));
}

#[test]
fn test_placing_existing_symbol_reuses_embedded_definition() {
    let catalog = catalog();
    let mut sch = Schematic::new();
    sch.place(&[placement("R1", "Device:R", 0.0, 0.0, 0)], &catalog)
        .unwrap();
    sch.place(&[placement("R2", "Device:R", 10.0, 0.0, 0)], &catalog)
        .unwrap();

    let count = sch
        .root()
        .child("lib_symbols")
        .unwrap()
        .children("symbol")
        .count();
    assert_eq!(count, 1);
    assert_eq!(sch.placed_symbols().len(), 2);
    // Placement is not idempotent: the same reference twice gives two blocks
    sch.place(&[placement("R2", "Device:R", 10.0, 0.0, 0)], &catalog)
        .unwrap();
    assert_eq!(sch.placed_symbols().len(), 3);
}

#[test]
fn test_persist_into_missing_directory_fails_cleanly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope").join("x.kicad_sch");
    let err = Schematic::new().persist(&path).unwrap_err();
    assert!(matches!(err, SchematicError::Persist { .. }));
    assert!(!path.exists());
}

#[test]
fn test_unknown_entry_is_a_symbol_error() {
    let catalog = catalog();
    let mut sch = Schematic::new();
    let mut bogus = placement("U1", "Device:R", 0.0, 0.0, 0);
    bogus.entry = CatalogEntry::new("Device", "NotThere");
    assert!(matches!(
        sch.place(&[bogus], &catalog),
        Err(SchematicError::Symbol { .. })
    ));
    assert!(sch.placed_symbols().is_empty());
}
