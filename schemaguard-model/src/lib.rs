//! Mutable relational schema model for SchemaGuard.
//!
//! Defines the model that conventions observe and mutate:
//! - [`SchemaModel`]: arena of entity types, properties, keys, foreign keys and indexes
//! - [`EntityType`]: a node in a single-inheritance tree
//! - [`Key`], [`ForeignKey`], [`Index`]: ordered property sequences
//! - [`Property`]: carries the column-generation annotations
//!
//! Every mutator records a [`schemaguard_types::ModelEvent`]; callers drain
//! them with [`SchemaModel::take_events`] and deliver them to conventions.
//! Mutators whose configuration source is overridden return `Ok(None)`.

mod elements;
mod error;
mod model;
mod navigation;

pub use elements::{Annotation, EntityType, ForeignKey, Index, Key, Property};
pub use error::{ModelError, ModelResult};
pub use model::SchemaModel;
pub use navigation::{AncestorsInclusive, DerivedTypesInclusive};
