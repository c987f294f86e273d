//! Placement transform from library coordinates to sheet coordinates.
//!
//! Library symbols are drawn with +Y pointing up, schematic sheets with +Y
//! pointing down. A pin at library position `p` on a symbol placed at `(X, Y)`
//! with rotation `a` lands at `(X + r.x, Y - r.y)` where `r` is `p` rotated
//! counter-clockwise by `a` and then mirrored.

use serde::{Deserialize, Serialize};

/// Mirror axis of a placed symbol, as written in `(mirror x)` / `(mirror y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mirror {
    /// Flip across the horizontal axis
    X,
    /// Flip across the vertical axis
    Y,
}

impl Mirror {
    pub fn from_atom(atom: &str) -> Option<Self> {
        match atom {
            "x" => Some(Mirror::X),
            "y" => Some(Mirror::Y),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> &'static str {
        match self {
            Mirror::X => "x",
            Mirror::Y => "y",
        }
    }
}

/// Number of counter-clockwise quarter turns nearest to `angle` degrees, in `0..4`.
pub fn quarter_turns(angle: f64) -> u8 {
    ((angle / 90.0).round() as i64).rem_euclid(4) as u8
}

/// Rotate a library-space point counter-clockwise by a multiple of 90°.
pub fn rotate(point: (f64, f64), angle: f64) -> (f64, f64) {
    let (x, y) = point;
    match quarter_turns(angle) {
        0 => (x, y),
        1 => (-y, x),
        2 => (-x, -y),
        _ => (y, -x),
    }
}

/// Project a pin's library position onto the sheet.
pub fn to_sheet(
    origin: (f64, f64),
    angle: f64,
    mirror: Option<Mirror>,
    local: (f64, f64),
) -> (f64, f64) {
    let (mut rx, mut ry) = rotate(local, angle);
    match mirror {
        Some(Mirror::X) => ry = -ry,
        Some(Mirror::Y) => rx = -rx,
        None => {}
    }
    (round_coord(origin.0 + rx), round_coord(origin.1 - ry))
}

/// Round to the 0.1µm grid the file format can represent.
pub fn round_coord(value: f64) -> f64 {
    let rounded = (value * 10_000.0).round() / 10_000.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}
