//! Orthogonal wire routing between placed pins.
//!
//! Pin locations always come from the document, so wires end exactly where
//! KiCad draws the pins. A connection whose component or pin cannot be found
//! is skipped and reported; it never stops the remaining connections.

use serde::Serialize;

use crate::Connection;
use netsynth_schematic::{PinLookupError, Schematic, WireSegment};

/// Why a connection was not routed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    MissingReference { reference: String },
    PinOutOfRange {
        reference: String,
        pin: u32,
        available: usize,
    },
}

impl From<PinLookupError> for SkipReason {
    fn from(error: PinLookupError) -> Self {
        match error {
            PinLookupError::MissingReference { reference } => {
                SkipReason::MissingReference { reference }
            }
            PinLookupError::PinOutOfRange {
                reference,
                pin,
                available,
            } => SkipReason::PinOutOfRange {
                reference,
                pin,
                available,
            },
        }
    }
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::MissingReference { reference } => {
                write!(f, "missing_reference: {reference}")
            }
            SkipReason::PinOutOfRange {
                reference,
                pin,
                available,
            } => write!(
                f,
                "pin_out_of_range: {reference} pin {pin} ({available} available)"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedConnection {
    pub connection: Connection,
    pub reason: SkipReason,
}

/// Result of routing a single connection
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Routed(WireSegment),
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutingReport {
    /// Axis-aligned segments in connection order
    pub segments: Vec<WireSegment>,
    pub routed: Vec<Connection>,
    pub skipped: Vec<SkippedConnection>,
}

impl RoutingReport {
    pub fn routed_count(&self) -> usize {
        self.routed.len()
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Straight segment from pin A to pin B, or the reason it cannot be drawn.
pub fn route_connection(connection: &Connection, schematic: &Schematic) -> RouteOutcome {
    let endpoints = schematic
        .pin_location(&connection.a_ref, connection.a_pin)
        .and_then(|a| Ok((a, schematic.pin_location(&connection.b_ref, connection.b_pin)?)));

    match endpoints {
        Ok((a, b)) => RouteOutcome::Routed(WireSegment::between(a, b)),
        Err(e) => RouteOutcome::Skipped(e.into()),
    }
}

/// Route every connection against the document's placed symbols.
pub fn route(connections: &[Connection], schematic: &Schematic) -> RoutingReport {
    let mut report = RoutingReport::default();

    for connection in connections {
        match route_connection(connection, schematic) {
            RouteOutcome::Routed(segment) => {
                log::debug!("Routed {connection}: {segment:?}");
                report.segments.extend(orthogonalize(segment));
                report.routed.push(connection.clone());
            }
            RouteOutcome::Skipped(reason) => {
                log::warn!("Skipping connection {connection}: {reason}");
                report.skipped.push(SkippedConnection {
                    connection: connection.clone(),
                    reason,
                });
            }
        }
    }

    log::info!(
        "Routed {} connections into {} segments, skipped {}",
        report.routed_count(),
        report.segments.len(),
        report.skipped_count()
    );
    report
}

/// Split a diagonal segment into a horizontal leg followed by a vertical leg.
///
/// Axis-aligned segments pass through; zero-length segments are dropped.
pub fn orthogonalize(segment: WireSegment) -> Vec<WireSegment> {
    if segment.is_zero_length() {
        return Vec::new();
    }
    if segment.is_axis_aligned() {
        return vec![segment];
    }

    let corner = (segment.end_x, segment.y);
    vec![
        WireSegment::between(segment.start(), corner),
        WireSegment::between(corner, segment.end()),
    ]
}
