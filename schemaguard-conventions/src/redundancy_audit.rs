//! Reports foreign keys whose index would be redundant.
//!
//! A foreign key covered by a strictly longer key or index visible on its
//! declaring type doesn't need an index of its own. Hosts usually want to
//! hear about these because the wider structure was often declared by
//! accident.

use crate::covering::properties_covered;
use crate::diagnostics::{Diagnostic, DiagnosticEvent, Diagnostics};
use crate::error::ConventionResult;
use schemaguard_model::{EntityType, ForeignKey, SchemaModel};
use schemaguard_types::PropertyId;
use tracing::info;

/// Emits one `RedundantIndex` diagnostic per (foreign key, covering key or
/// index) pair and returns how many were emitted.
///
/// Does nothing when the channel is disabled.
pub fn report_redundant_indexes(
    model: &SchemaModel,
    diagnostics: &mut dyn Diagnostics,
) -> ConventionResult<usize> {
    if !diagnostics.is_enabled(DiagnosticEvent::RedundantIndex) {
        return Ok(0);
    }

    let mut reported = 0;
    for entity_type in model.entity_types() {
        for fk in model.declared_foreign_keys(entity_type.id()) {
            for key in model.keys(entity_type.id()) {
                if is_redundant(model, fk, key.properties(), true) {
                    diagnostics.emit(redundant_index(model, entity_type, fk, "key", key.properties()))?;
                    reported += 1;
                }
            }
            for index in model.indexes(entity_type.id()) {
                if is_redundant(model, fk, index.properties(), index.is_unique()) {
                    diagnostics.emit(redundant_index(
                        model,
                        entity_type,
                        fk,
                        "index",
                        index.properties(),
                    ))?;
                    reported += 1;
                }
            }
        }
    }

    if reported > 0 {
        info!("Reported {} redundant foreign key index(es)", reported);
    }
    Ok(reported)
}

fn is_redundant(
    model: &SchemaModel,
    fk: &ForeignKey,
    candidate: &[PropertyId],
    candidate_unique: bool,
) -> bool {
    fk.properties().len() != candidate.len()
        && properties_covered(model, fk.properties(), fk.is_unique(), candidate, candidate_unique)
}

fn redundant_index(
    model: &SchemaModel,
    entity_type: &EntityType,
    fk: &ForeignKey,
    covered_by: &str,
    candidate: &[PropertyId],
) -> Diagnostic {
    let fk_properties = model.format_properties(fk.properties());
    let covering = model.format_properties(candidate);
    Diagnostic::new(
        DiagnosticEvent::RedundantIndex,
        entity_type.name(),
        format!(
            "The foreign key {} on '{}' is covered by the {} {}, so an index for it is redundant",
            fk_properties,
            entity_type.name(),
            covered_by,
            covering
        ),
    )
    .with_detail("foreign_key", fk_properties)
    .with_detail("covered_by", covered_by)
    .with_detail("covering_properties", covering)
}
