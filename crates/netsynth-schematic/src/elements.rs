//! Builders for the S-expression blocks written into a schematic.

use netsynth_sexpr::Sexpr;

use crate::{SymbolPlacement, WireSegment};

pub(crate) const FONT_SIZE: f64 = 1.27;
const REFERENCE_OFFSET: f64 = 5.08;

fn yes_no(flag: bool) -> Sexpr {
    Sexpr::symbol(if flag { "yes" } else { "no" })
}

fn at(x: f64, y: f64, angle: f64) -> Sexpr {
    Sexpr::tagged(
        "at",
        [Sexpr::number(x), Sexpr::number(y), Sexpr::number(angle)],
    )
}

pub(crate) fn uuid(value: &str) -> Sexpr {
    Sexpr::tagged("uuid", [Sexpr::string(value)])
}

pub(crate) fn property(key: &str, value: &str, x: f64, y: f64, hide: bool) -> Sexpr {
    let mut effects = vec![Sexpr::tagged(
        "font",
        [Sexpr::tagged(
            "size",
            [Sexpr::number(FONT_SIZE), Sexpr::number(FONT_SIZE)],
        )],
    )];
    if hide {
        effects.push(Sexpr::tagged("hide", [yes_no(true)]));
    }

    Sexpr::tagged(
        "property",
        [
            Sexpr::string(key),
            Sexpr::string(value),
            at(x, y, 0.0),
            Sexpr::tagged("effects", effects),
        ],
    )
}

/// Everything needed to write one placed `symbol` block.
pub(crate) struct SymbolBlock<'a> {
    pub placement: &'a SymbolPlacement,
    pub value: &'a str,
    pub uuid: &'a str,
    /// `(number, uuid)` for every pin of the placed unit
    pub pins: Vec<(String, String)>,
    pub project: &'a str,
    pub sheet_path: &'a str,
}

impl SymbolBlock<'_> {
    pub(crate) fn to_sexpr(&self) -> Sexpr {
        let p = self.placement;
        let angle = f64::from(p.angle);

        let mut items = vec![
            Sexpr::tagged("lib_id", [Sexpr::string(p.entry.lib_id())]),
            at(p.x, p.y, angle),
            Sexpr::tagged("unit", [Sexpr::number(1.0)]),
            Sexpr::tagged("exclude_from_sim", [yes_no(false)]),
            Sexpr::tagged("in_bom", [yes_no(true)]),
            Sexpr::tagged("on_board", [yes_no(true)]),
            Sexpr::tagged("dnp", [yes_no(false)]),
            uuid(self.uuid),
            property("Reference", &p.reference, p.x, p.y - REFERENCE_OFFSET, false),
            property("Value", self.value, p.x, p.y + REFERENCE_OFFSET, false),
            property("Footprint", "", p.x, p.y, true),
            property("Datasheet", "~", p.x, p.y, true),
        ];

        for (number, pin_uuid) in &self.pins {
            items.push(Sexpr::tagged(
                "pin",
                [Sexpr::string(number.as_str()), uuid(pin_uuid)],
            ));
        }

        items.push(Sexpr::tagged(
            "instances",
            [Sexpr::tagged(
                "project",
                [
                    Sexpr::string(self.project),
                    Sexpr::tagged(
                        "path",
                        [
                            Sexpr::string(self.sheet_path),
                            Sexpr::tagged("reference", [Sexpr::string(p.reference.as_str())]),
                            Sexpr::tagged("unit", [Sexpr::number(1.0)]),
                        ],
                    ),
                ],
            )],
        ));

        Sexpr::tagged("symbol", items)
    }
}

// (wire (pts (xy X1 Y1) (xy X2 Y2)) (stroke (width 0) (type default)) (uuid "..."))
pub(crate) fn wire(segment: &WireSegment, wire_uuid: &str) -> Sexpr {
    Sexpr::tagged(
        "wire",
        [
            Sexpr::tagged(
                "pts",
                [
                    Sexpr::tagged("xy", [Sexpr::number(segment.x), Sexpr::number(segment.y)]),
                    Sexpr::tagged(
                        "xy",
                        [Sexpr::number(segment.end_x), Sexpr::number(segment.end_y)],
                    ),
                ],
            ),
            Sexpr::tagged(
                "stroke",
                [
                    Sexpr::tagged("width", [Sexpr::number(0.0)]),
                    Sexpr::tagged("type", [Sexpr::symbol("default")]),
                ],
            ),
            uuid(wire_uuid),
        ],
    )
}
