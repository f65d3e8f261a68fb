//! The convention contract.
//!
//! A convention observes the model after a change and answers with the
//! mutations it wants applied. Conventions never mutate the model
//! themselves; the [`ModelBuilder`](crate::ModelBuilder) applies their
//! requests and dispatches whatever events those produce.

use crate::diagnostics::Diagnostics;
use crate::error::ConventionResult;
use crate::foreign_key_index::ForeignKeyIndexConvention;
use crate::generation_strategy::GenerationStrategyConvention;
use schemaguard_model::SchemaModel;
use schemaguard_types::{
    ConfigurationSource, EntityTypeId, GenerationStrategy, IndexId, ModelEvent, PropertyId,
};
use std::fmt;

/// A change a convention asks the builder to make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Make sure `properties` on `entity_type` are served by an index. No-op
    /// when a visible key or index already covers them; an existing exact
    /// index is made unique if `unique` is requested.
    EnsureIndex {
        entity_type: EntityTypeId,
        properties: Vec<PropertyId>,
        unique: bool,
    },
    RemoveIndex {
        index: IndexId,
    },
    SetIndexUnique {
        index: IndexId,
        unique: bool,
    },
    /// Clear a generation annotation. Only applied when `source` strictly
    /// outranks the source of the current value.
    ClearAnnotation {
        property: PropertyId,
        strategy: GenerationStrategy,
        source: ConfigurationSource,
    },
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EnsureIndex {
                entity_type,
                properties,
                unique,
            } => write!(
                f,
                "ensure index on {} over {} properties (unique: {})",
                entity_type,
                properties.len(),
                unique
            ),
            Self::RemoveIndex { index } => write!(f, "remove {}", index),
            Self::SetIndexUnique { index, unique } => {
                write!(f, "set {} unique={}", index, unique)
            }
            Self::ClearAnnotation {
                property,
                strategy,
                source,
            } => write!(f, "clear {} on {} from {} source", strategy, property, source),
        }
    }
}

/// How a single mutation request turned out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationResult {
    Applied,
    /// Nothing to do: the model already satisfied the request, or the target
    /// no longer exists.
    NoOp,
    /// The configuration source was not strong enough.
    Refused,
}

/// Whether later conventions still see the event after a refusal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HaltPolicy {
    #[default]
    Continue,
    /// Stop dispatching the current event to later conventions if any of
    /// this outcome's mutations is refused.
    HaltOnRefusal,
}

/// A convention's answer to one event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConventionOutcome {
    pub mutations: Vec<Mutation>,
    pub halt: HaltPolicy,
}

impl ConventionOutcome {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn apply(mutations: Vec<Mutation>) -> Self {
        Self {
            mutations,
            halt: HaltPolicy::Continue,
        }
    }

    pub fn halt_on_refusal(mutations: Vec<Mutation>) -> Self {
        Self {
            mutations,
            halt: HaltPolicy::HaltOnRefusal,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

/// A reactive rule over the model.
pub trait Convention {
    /// Stable name used in logs.
    fn name(&self) -> &'static str;

    /// Reacts to `event`. The model already reflects the change.
    fn handle(&self, _model: &SchemaModel, _event: &ModelEvent) -> ConventionOutcome {
        ConventionOutcome::none()
    }

    /// Runs once the model is sealed. Validation failures are returned as
    /// errors; advisory findings go to `diagnostics`.
    fn finalize(
        &self,
        _model: &SchemaModel,
        _diagnostics: &mut dyn Diagnostics,
    ) -> ConventionResult<()> {
        Ok(())
    }
}

/// Ordered list of conventions. Events are delivered in registration order.
pub struct ConventionSet {
    conventions: Vec<Box<dyn Convention>>,
}

impl ConventionSet {
    /// An empty set.
    pub fn new() -> Self {
        Self {
            conventions: Vec::new(),
        }
    }

    pub fn push(&mut self, convention: impl Convention + 'static) {
        self.conventions.push(Box::new(convention));
    }

    pub fn with(mut self, convention: impl Convention + 'static) -> Self {
        self.push(convention);
        self
    }

    pub fn len(&self) -> usize {
        self.conventions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conventions.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&dyn Convention> {
        self.conventions.get(position).map(|c| &**c)
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Convention> + '_ {
        self.conventions.iter().map(|c| &**c)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(|c| c.name()).collect()
    }
}

impl Default for ConventionSet {
    /// Foreign key indexing first, then generation strategy exclusivity.
    fn default() -> Self {
        Self::new()
            .with(ForeignKeyIndexConvention)
            .with(GenerationStrategyConvention)
    }
}

impl fmt::Debug for ConventionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
