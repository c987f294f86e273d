//! Mapping from the upstream coordinate space onto the sheet grid.

use serde::{Deserialize, Serialize};

use crate::resolver::{ComponentKind, ResolvedComponent};
use netsynth_schematic::SymbolPlacement;

/// Distance of the drawing origin from the sheet corner in relative mode (mm)
pub const RELATIVE_OFFSET: f64 = 25.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoordinateMode {
    /// Coordinates share one absolute space; they are scaled towards the
    /// bounding-box minimum and truncated to whole units.
    #[default]
    Absolute,
    /// Coordinates are small offsets from an origin placed [`RELATIVE_OFFSET`] in.
    Relative,
}

impl std::str::FromStr for CoordinateMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "absolute" => Ok(CoordinateMode::Absolute),
            "relative" => Ok(CoordinateMode::Relative),
            other => Err(format!("unknown coordinate mode '{other}'")),
        }
    }
}

type OrientationFix = fn(u16) -> u16;

// Library resistors are drawn vertically while upstream angles assume horizontal
fn swap_horizontal_vertical(angle: u16) -> u16 {
    match angle {
        0 => 90,
        90 => 0,
        other => other,
    }
}

fn is_resistor(kind: &ComponentKind) -> bool {
    matches!(kind, ComponentKind::Resistor)
}

/// Per-kind orientation corrections, applied after scaling
const ORIENTATION_FIXES: &[(fn(&ComponentKind) -> bool, OrientationFix)] =
    &[(is_resistor, swap_horizontal_vertical)];

fn orient(kind: &ComponentKind, angle: u16) -> u16 {
    ORIENTATION_FIXES
        .iter()
        .filter(|(applies, _)| applies(kind))
        .fold(angle, |angle, (_, fix)| fix(angle))
}

/// Snap an angle in degrees to the nearest quarter turn in `[0, 360)`.
pub fn snap_angle(angle: f64) -> u16 {
    if !angle.is_finite() {
        return 0;
    }
    (((angle / 90.0).round() as i64).rem_euclid(4) * 90) as u16
}

struct AxisRange {
    min: f64,
    max: f64,
}

impl AxisRange {
    fn of(values: impl Iterator<Item = f64>) -> Option<Self> {
        values.fold(None, |range, v| match range {
            None => Some(AxisRange { min: v, max: v }),
            Some(AxisRange { min, max }) => Some(AxisRange {
                min: min.min(v),
                max: max.max(v),
            }),
        })
    }

    fn scale(&self, value: f64, factor: f64) -> f64 {
        // A degenerate axis keeps its coordinates as they are
        if self.max == self.min {
            return value;
        }
        (self.min + (value - self.min) * factor).trunc()
    }
}

/// Map resolved components onto the sheet, one placement per component in input order.
pub fn transform(
    components: &[ResolvedComponent],
    scale: f64,
    mode: CoordinateMode,
) -> Vec<SymbolPlacement> {
    let xs = AxisRange::of(components.iter().map(|c| c.spec.x));
    let ys = AxisRange::of(components.iter().map(|c| c.spec.y));

    components
        .iter()
        .map(|component| {
            let spec = &component.spec;
            let (x, y) = match (mode, &xs, &ys) {
                (CoordinateMode::Absolute, Some(xs), Some(ys)) => {
                    (xs.scale(spec.x, scale), ys.scale(spec.y, scale))
                }
                _ => (
                    RELATIVE_OFFSET + spec.x * scale,
                    RELATIVE_OFFSET + spec.y * scale,
                ),
            };
            let angle = orient(&component.kind, snap_angle(spec.angle));

            log::trace!(
                "{}: ({}, {}) @ {} -> ({x}, {y}) @ {angle}",
                spec.reference,
                spec.x,
                spec.y,
                spec.angle
            );

            SymbolPlacement {
                reference: spec.reference.clone(),
                value: spec.value.clone(),
                entry: component.entry(),
                x,
                y,
                angle,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ComponentSpec;
    use netsynth_eda::CatalogEntry;

    fn component(reference: &str, kind: ComponentKind, x: f64, y: f64, angle: f64) -> ResolvedComponent {
        ResolvedComponent {
            spec: ComponentSpec {
                reference: reference.to_string(),
                type_hint: String::new(),
                x,
                y,
                angle,
                value: None,
            },
            kind,
        }
    }

    #[test]
    fn test_absolute_scales_towards_minimum() {
        let placed = transform(
            &[
                component("C1", ComponentKind::Capacitor, 100.0, 200.0, 0.0),
                component("C2", ComponentKind::Capacitor, 600.0, 450.0, 0.0),
            ],
            0.2,
            CoordinateMode::Absolute,
        );
        assert_eq!((placed[0].x, placed[0].y), (100.0, 200.0));
        assert_eq!((placed[1].x, placed[1].y), (200.0, 250.0));
    }

    #[test]
    fn test_absolute_truncates() {
        let placed = transform(
            &[
                component("C1", ComponentKind::Capacitor, 0.0, 0.0, 0.0),
                component("C2", ComponentKind::Capacitor, 17.0, 9.0, 0.0),
            ],
            0.2,
            CoordinateMode::Absolute,
        );
        assert_eq!((placed[1].x, placed[1].y), (3.0, 1.0));
    }

    #[test]
    fn test_single_component_is_unchanged() {
        for scale in [0.0, 0.2, 1.0, 7.5] {
            let placed = transform(
                &[component("D1", ComponentKind::Led, 123.45, 67.8, 0.0)],
                scale,
                CoordinateMode::Absolute,
            );
            assert_eq!((placed[0].x, placed[0].y), (123.45, 67.8));
            assert!(placed[0].x.is_finite() && placed[0].y.is_finite());
        }
    }

    #[test]
    fn test_zero_extent_axis_is_identity() {
        let placed = transform(
            &[
                component("C1", ComponentKind::Capacitor, 10.0, 33.3, 0.0),
                component("C2", ComponentKind::Capacitor, 60.0, 33.3, 0.0),
            ],
            0.5,
            CoordinateMode::Absolute,
        );
        assert_eq!((placed[1].x, placed[1].y), (35.0, 33.3));
        assert_eq!(placed[0].y, 33.3);
    }

    #[test]
    fn test_relative_offsets_origin() {
        let placed = transform(
            &[component("C1", ComponentKind::Capacitor, 0.0, 10.0, 0.0)],
            0.5,
            CoordinateMode::Relative,
        );
        assert_eq!((placed[0].x, placed[0].y), (RELATIVE_OFFSET, 30.4));
    }

    #[test]
    fn test_resistor_orientation_swap() {
        let placed = transform(
            &[
                component("R1", ComponentKind::Resistor, 0.0, 0.0, 0.0),
                component("R2", ComponentKind::Resistor, 1.0, 0.0, 90.0),
                component("R3", ComponentKind::Resistor, 2.0, 0.0, 180.0),
                component("C1", ComponentKind::Capacitor, 3.0, 0.0, 0.0),
                component("C2", ComponentKind::Capacitor, 4.0, 0.0, 90.0),
                component(
                    "U1",
                    ComponentKind::Other(CatalogEntry::new("Device", "L")),
                    5.0,
                    0.0,
                    270.0,
                ),
            ],
            1.0,
            CoordinateMode::Absolute,
        );
        let angles: Vec<u16> = placed.iter().map(|p| p.angle).collect();
        assert_eq!(angles, vec![90, 0, 180, 0, 90, 270]);
    }

    #[test]
    fn test_placement_keeps_identity() {
        let mut r1 = component("R1", ComponentKind::Resistor, 0.0, 0.0, 0.0);
        r1.spec.value = Some("4k7".to_string());
        let placed = transform(&[r1], 1.0, CoordinateMode::Absolute);
        assert_eq!(placed[0].reference, "R1");
        assert_eq!(placed[0].value.as_deref(), Some("4k7"));
        assert_eq!(placed[0].entry, CatalogEntry::new("Device", "R"));
    }

    #[test]
    fn test_snap_angle() {
        assert_eq!(snap_angle(0.0), 0);
        assert_eq!(snap_angle(44.0), 0);
        assert_eq!(snap_angle(46.0), 90);
        assert_eq!(snap_angle(-90.0), 270);
        assert_eq!(snap_angle(360.0), 0);
        assert_eq!(snap_angle(f64::NAN), 0);
    }

    #[test]
    fn test_empty_input() {
        assert!(transform(&[], 0.2, CoordinateMode::Absolute).is_empty());
    }
}
