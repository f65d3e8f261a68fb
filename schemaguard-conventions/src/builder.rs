//! Model construction with conventions attached.
//!
//! [`ModelBuilder`] wraps a [`SchemaModel`], mirrors its mutators, and after
//! each one delivers the recorded events to every convention in order. The
//! mutations a convention requests are applied immediately and the events
//! they produce are dispatched depth-first before the next convention sees
//! the triggering event.

use crate::config::ConventionConfig;
use crate::convention::{ConventionSet, HaltPolicy, Mutation, MutationResult};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{ConventionError, ConventionResult};
use crate::foreign_key_index::{IndexRequest, create_index_if_needed};
use schemaguard_model::SchemaModel;
use schemaguard_types::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, GenerationStrategy, IndexId, KeyId,
    ModelEvent, PropertyId,
};
use tracing::{debug, info, trace, warn};

const CONVENTION: ConfigurationSource = ConfigurationSource::Convention;

/// Builds a [`SchemaModel`] while conventions keep it consistent.
pub struct ModelBuilder<D: Diagnostics = TracingDiagnostics> {
    model: SchemaModel,
    conventions: ConventionSet,
    diagnostics: D,
    config: ConventionConfig,
}

impl ModelBuilder {
    /// A builder with the default conventions and configuration.
    pub fn new() -> Self {
        Self::with_config(ConventionConfig::default())
    }

    pub fn with_config(config: ConventionConfig) -> Self {
        let diagnostics = TracingDiagnostics::new(config.diagnostics.clone());
        Self::with_parts(ConventionSet::default(), diagnostics, config)
    }
}

impl Default for ModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: Diagnostics> ModelBuilder<D> {
    pub fn with_parts(conventions: ConventionSet, diagnostics: D, config: ConventionConfig) -> Self {
        debug!(
            "Creating model builder with conventions {:?}",
            conventions.names()
        );
        Self {
            model: SchemaModel::new(),
            conventions,
            diagnostics,
            config,
        }
    }

    pub fn model(&self) -> &SchemaModel {
        &self.model
    }

    pub fn diagnostics(&self) -> &D {
        &self.diagnostics
    }

    pub fn config(&self) -> &ConventionConfig {
        &self.config
    }

    pub fn into_model(self) -> SchemaModel {
        self.model
    }

    // ── Mutators ─────────────────────────────────────────────────

    pub fn add_entity_type(&mut self, name: impl Into<String>) -> ConventionResult<EntityTypeId> {
        let id = self.model.add_entity_type(name)?;
        self.flush()?;
        Ok(id)
    }

    pub fn add_property(
        &mut self,
        entity_type: EntityTypeId,
        name: impl Into<String>,
    ) -> ConventionResult<PropertyId> {
        let id = self.model.add_property(entity_type, name)?;
        self.flush()?;
        Ok(id)
    }

    pub fn set_base_type(
        &mut self,
        entity_type: EntityTypeId,
        base_type: Option<EntityTypeId>,
    ) -> ConventionResult<()> {
        self.model.set_base_type(entity_type, base_type)?;
        self.flush()
    }

    pub fn add_key(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> ConventionResult<KeyId> {
        let id = self.model.add_key(entity_type, properties, source)?;
        self.flush()?;
        Ok(id)
    }

    pub fn remove_key(
        &mut self,
        key: KeyId,
        source: ConfigurationSource,
    ) -> ConventionResult<Option<KeyId>> {
        let removed = self.model.remove_key(key, source)?;
        self.flush()?;
        Ok(removed)
    }

    pub fn add_foreign_key(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
        principal_key: KeyId,
        unique: bool,
        source: ConfigurationSource,
    ) -> ConventionResult<ForeignKeyId> {
        let id = self
            .model
            .add_foreign_key(entity_type, properties, principal_key, unique, source)?;
        self.flush()?;
        Ok(id)
    }

    pub fn remove_foreign_key(
        &mut self,
        foreign_key: ForeignKeyId,
        source: ConfigurationSource,
    ) -> ConventionResult<Option<ForeignKeyId>> {
        let removed = self.model.remove_foreign_key(foreign_key, source)?;
        self.flush()?;
        Ok(removed)
    }

    pub fn set_foreign_key_properties(
        &mut self,
        foreign_key: ForeignKeyId,
        properties: &[PropertyId],
    ) -> ConventionResult<ForeignKeyId> {
        let id = self.model.set_foreign_key_properties(foreign_key, properties)?;
        self.flush()?;
        Ok(id)
    }

    pub fn set_foreign_key_unique(
        &mut self,
        foreign_key: ForeignKeyId,
        unique: bool,
    ) -> ConventionResult<ForeignKeyId> {
        let id = self.model.set_foreign_key_unique(foreign_key, unique)?;
        self.flush()?;
        Ok(id)
    }

    pub fn add_index(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> ConventionResult<IndexId> {
        let id = self.model.add_index(entity_type, properties, source)?;
        self.flush()?;
        Ok(id)
    }

    pub fn remove_index(
        &mut self,
        index: IndexId,
        source: ConfigurationSource,
    ) -> ConventionResult<Option<IndexId>> {
        let removed = self.model.remove_index(index, source)?;
        self.flush()?;
        Ok(removed)
    }

    pub fn set_index_unique(
        &mut self,
        index: IndexId,
        unique: bool,
        source: ConfigurationSource,
    ) -> ConventionResult<Option<IndexId>> {
        let id = self.model.set_index_unique(index, unique, source)?;
        self.flush()?;
        Ok(id)
    }

    pub fn set_annotation(
        &mut self,
        property: PropertyId,
        strategy: GenerationStrategy,
        value: impl Into<String>,
        source: ConfigurationSource,
    ) -> ConventionResult<Option<PropertyId>> {
        let id = self.model.set_annotation(property, strategy, value, source)?;
        self.flush()?;
        Ok(id)
    }

    pub fn clear_annotation(
        &mut self,
        property: PropertyId,
        strategy: GenerationStrategy,
        source: ConfigurationSource,
    ) -> ConventionResult<Option<PropertyId>> {
        let id = self.model.clear_annotation(property, strategy, source)?;
        self.flush()?;
        Ok(id)
    }

    /// Delivers `ModelFinalizing`, seals the model, then runs every
    /// convention's finalization pass in registration order.
    ///
    /// The first validation failure or thrown diagnostic aborts finalization.
    pub fn finalize(&mut self) -> ConventionResult<()> {
        self.model.finalize()?;
        self.flush()?;
        self.model.seal();

        for convention in self.conventions.iter() {
            trace!("Finalizing convention {}", convention.name());
            convention.finalize(&self.model, &mut self.diagnostics)?;
        }
        info!(
            "Model finalized with {} entity type(s)",
            self.model.entity_types().count()
        );
        Ok(())
    }

    // ── Dispatch ─────────────────────────────────────────────────

    fn flush(&mut self) -> ConventionResult<()> {
        for event in self.model.take_events() {
            self.dispatch(event, 0)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, event: ModelEvent, depth: usize) -> ConventionResult<()> {
        let max_depth = self.config.max_cascade_depth;
        if depth > max_depth {
            warn!("Convention cascade exceeded depth {} at {}", max_depth, event.kind());
            return Err(ConventionError::CascadeOverflow { depth: max_depth });
        }
        trace!("Dispatching {} at depth {}", event.kind(), depth);

        for position in 0..self.conventions.len() {
            let Some(convention) = self.conventions.get(position) else {
                break;
            };
            let name = convention.name();
            let outcome = convention.handle(&self.model, &event);
            if outcome.is_empty() {
                continue;
            }

            let mut refused = false;
            for mutation in outcome.mutations {
                let description = mutation.to_string();
                let result = self.apply(mutation)?;
                trace!("{}: {} -> {:?}", name, description, result);
                refused |= result == MutationResult::Refused;

                for follow_up in self.model.take_events() {
                    self.dispatch(follow_up, depth + 1)?;
                }
            }

            if refused && outcome.halt == HaltPolicy::HaltOnRefusal {
                debug!("{} halted dispatch of {}", name, event.kind());
                break;
            }
        }
        Ok(())
    }

    fn apply(&mut self, mutation: Mutation) -> ConventionResult<MutationResult> {
        let result = match mutation {
            Mutation::EnsureIndex {
                entity_type,
                properties,
                unique,
            } => self.ensure_index(entity_type, &properties, unique)?,
            Mutation::RemoveIndex { index } => {
                if self.model.index(index).is_none() {
                    MutationResult::NoOp
                } else {
                    outcome_of(self.model.remove_index(index, CONVENTION)?)
                }
            }
            Mutation::SetIndexUnique { index, unique } => match self.model.index(index) {
                None => MutationResult::NoOp,
                Some(existing) if existing.is_unique() == unique => MutationResult::NoOp,
                Some(_) => outcome_of(self.model.set_index_unique(index, unique, CONVENTION)?),
            },
            Mutation::ClearAnnotation {
                property,
                strategy,
                source,
            } => {
                let existing = self
                    .model
                    .property(property)
                    .and_then(|p| p.annotation(strategy))
                    .map(|a| a.source);
                match existing {
                    None => MutationResult::NoOp,
                    Some(existing) if !source.outranks(Some(existing)) => MutationResult::Refused,
                    Some(_) => outcome_of(self.model.clear_annotation(property, strategy, source)?),
                }
            }
        };
        Ok(result)
    }

    fn ensure_index(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
        unique: bool,
    ) -> ConventionResult<MutationResult> {
        let usable = self.model.entity_type(entity_type).is_some()
            && properties
                .iter()
                .all(|p| self.model.is_visible(entity_type, *p));
        if !usable {
            return Ok(MutationResult::NoOp);
        }

        match create_index_if_needed(&self.model, entity_type, properties, unique) {
            IndexRequest::Covered => Ok(MutationResult::NoOp),
            IndexRequest::Strengthen(index) => {
                Ok(outcome_of(self.model.set_index_unique(index, true, CONVENTION)?))
            }
            IndexRequest::Create => {
                let index = self.model.add_index(entity_type, properties, CONVENTION)?;
                debug!(
                    "Created {} over {}",
                    index,
                    self.model.format_properties(properties)
                );
                if unique && self.model.set_index_unique(index, true, CONVENTION)?.is_none() {
                    return Ok(MutationResult::Refused);
                }
                Ok(MutationResult::Applied)
            }
        }
    }
}

fn outcome_of<T>(applied: Option<T>) -> MutationResult {
    match applied {
        Some(_) => MutationResult::Applied,
        None => MutationResult::Refused,
    }
}
