use std::path::PathBuf;

use netsynth_eda::Catalog;
use netsynth_schematic::{Schematic, SchematicError};
use serde::Serialize;
use uuid::Uuid;

use crate::layout::transform;
use crate::resolver::{ResolvedComponent, Resolver};
use crate::router::{route, RoutingReport};
use crate::{CircuitDescription, SynthesisError, SynthesisOptions};

/// Where and how to write one synthesis run
#[derive(Debug, Clone, Default)]
pub struct SynthesisRequest {
    /// Existing or new schematic; `None` writes a fresh file into `output_dir`
    pub target: Option<PathBuf>,
    pub output_dir: PathBuf,
    pub options: SynthesisOptions,
}

impl SynthesisRequest {
    /// The file this request writes to.
    pub fn resolve_target(&self) -> PathBuf {
        match &self.target {
            Some(path) => path.clone(),
            None => self
                .output_dir
                .join(format!("temp_{}.kicad_sch", Uuid::new_v4().simple())),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisOutcome {
    pub path: PathBuf,
    /// uuids of the placed symbol blocks, in component order
    pub placed: Vec<String>,
    pub report: RoutingReport,
}

/// Run the full pipeline: resolve, lay out, place, route, wire, persist.
///
/// Any fatal error is raised before the document is written, so an existing
/// target file is never left half-updated.
pub fn synthesize(
    circuit: &CircuitDescription,
    request: &SynthesisRequest,
    catalog: &Catalog,
) -> Result<SynthesisOutcome, SynthesisError> {
    let resolver = Resolver::new(catalog)?;

    let resolved: Vec<ResolvedComponent> = circuit
        .components
        .iter()
        .map(|spec| resolver.resolve_component(spec))
        .collect();
    log::debug!("Resolved {} components", resolved.len());

    let placements = transform(&resolved, request.options.scale, request.options.mode);

    let path = request.resolve_target();
    let mut schematic = Schematic::open(Some(&path)).map_err(SynthesisError::DocumentLoad)?;

    let placed = schematic
        .place(&placements, catalog)
        .map_err(|e| match e {
            SchematicError::Symbol { entry, source } => {
                let component = resolved.iter().find(|c| c.entry() == entry);
                SynthesisError::UnresolvedSymbol {
                    reference: component
                        .map(|c| c.spec.reference.clone())
                        .unwrap_or_default(),
                    type_hint: component
                        .map(|c| c.spec.type_hint.clone())
                        .unwrap_or_else(|| entry.lib_id()),
                    source,
                }
            }
            other => SynthesisError::DocumentLoad(other),
        })?;
    log::debug!("Placed {} symbols", placed.len());

    // Second pass: pins are read back from the symbols just placed
    let report = route(&circuit.connections, &schematic);
    schematic.add_wires(&report.segments);

    schematic
        .persist(&path)
        .map_err(|source| SynthesisError::Persist {
            path: path.clone(),
            source,
        })?;

    log::info!(
        "Wrote {} ({} symbols, {} wires, {} connections skipped)",
        path.display(),
        placed.len(),
        report.segments.len(),
        report.skipped_count()
    );

    Ok(SynthesisOutcome {
        path,
        placed,
        report,
    })
}
