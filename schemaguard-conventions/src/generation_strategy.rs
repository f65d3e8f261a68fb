//! Keeps column-generation strategies mutually exclusive.
//!
//! Setting one strategy clears the competing ones when the new value comes
//! from a strictly higher configuration source. Whatever is left over, for
//! example two explicit strategies on the same property, fails validation
//! when the model is finalized.

use crate::convention::{Convention, ConventionOutcome, Mutation};
use crate::diagnostics::Diagnostics;
use crate::error::{ConventionError, ConventionResult};
use schemaguard_model::SchemaModel;
use schemaguard_types::ModelEvent;
use tracing::trace;

#[derive(Debug, Clone, Copy, Default)]
pub struct GenerationStrategyConvention;

impl Convention for GenerationStrategyConvention {
    fn name(&self) -> &'static str {
        "generation_strategy"
    }

    fn handle(&self, model: &SchemaModel, event: &ModelEvent) -> ConventionOutcome {
        // Only an unset -> set transition; re-assignments and clears pass.
        let ModelEvent::PropertyAnnotationChanged {
            property,
            strategy,
            old_value: None,
            new_value: Some(_),
            source,
        } = event
        else {
            return ConventionOutcome::none();
        };
        let Some(prop) = model.property(*property) else {
            return ConventionOutcome::none();
        };
        if prop.annotation(*strategy).is_none() {
            // Already cleared again by an earlier cascade.
            return ConventionOutcome::none();
        }

        let mutations: Vec<Mutation> = strategy
            .competitors()
            .filter(|other| prop.annotation(*other).is_some())
            .map(|other| Mutation::ClearAnnotation {
                property: *property,
                strategy: other,
                source: *source,
            })
            .collect();
        if !mutations.is_empty() {
            trace!("{} set on {}, clearing {} competitor(s)", strategy, property, mutations.len());
        }
        ConventionOutcome::halt_on_refusal(mutations)
    }

    fn finalize(
        &self,
        model: &SchemaModel,
        _diagnostics: &mut dyn Diagnostics,
    ) -> ConventionResult<()> {
        validate_generation_strategies(model)
    }
}

/// Fails on the first declared property carrying more than one strategy,
/// naming the property and the first two strategies in canonical order.
pub fn validate_generation_strategies(model: &SchemaModel) -> ConventionResult<()> {
    for entity_type in model.entity_types() {
        for property in model.declared_properties(entity_type.id()) {
            if let [first, second, ..] = property.configured_strategies().as_slice() {
                return Err(ConventionError::ConflictingGenerationStrategies {
                    property: format!("{}.{}", entity_type.name(), property.name()),
                    first: *first,
                    second: *second,
                });
            }
        }
    }
    Ok(())
}
