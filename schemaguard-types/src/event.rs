//! Schema mutation events.
//!
//! Every structural change to the schema model is recorded as exactly one
//! [`ModelEvent`], in the order the mutations occur. Events carry ids rather
//! than references: a handler resolves them against the current model and
//! treats an id that no longer resolves as a stale notification.
//!
//! Removal events carry a snapshot of the removed element's property sequence
//! (and uniqueness, for indexes) since the element itself is gone by the time
//! the event is observed.

use crate::{ConfigurationSource, EntityTypeId, ForeignKeyId, GenerationStrategy, IndexId, KeyId, PropertyId};
use serde::{Deserialize, Serialize};

/// A single schema mutation notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "data")]
pub enum ModelEvent {
    /// A foreign key was added.
    ForeignKeyAdded { foreign_key: ForeignKeyId },

    /// A foreign key was removed from `entity_type`.
    ForeignKeyRemoved {
        entity_type: EntityTypeId,
        foreign_key: ForeignKeyId,
        /// Dependent properties of the removed foreign key.
        properties: Vec<PropertyId>,
    },

    /// The dependent properties of a foreign key were replaced.
    ForeignKeyPropertiesChanged {
        foreign_key: ForeignKeyId,
        entity_type: EntityTypeId,
        /// Dependent properties after the change.
        properties: Vec<PropertyId>,
        old_properties: Vec<PropertyId>,
        old_principal_key: KeyId,
    },

    /// A foreign key's uniqueness flag flipped.
    ForeignKeyUniquenessChanged { foreign_key: ForeignKeyId },

    /// A key was added.
    KeyAdded { key: KeyId },

    /// A key was removed from `entity_type`.
    KeyRemoved {
        entity_type: EntityTypeId,
        key: KeyId,
        properties: Vec<PropertyId>,
    },

    /// An entity type was re-parented.
    EntityTypeBaseTypeChanged {
        entity_type: EntityTypeId,
        new_base: Option<EntityTypeId>,
        old_base: Option<EntityTypeId>,
    },

    /// An index was added.
    IndexAdded { index: IndexId },

    /// An index was removed from `entity_type`.
    IndexRemoved {
        entity_type: EntityTypeId,
        index: IndexId,
        properties: Vec<PropertyId>,
        unique: bool,
    },

    /// An index's uniqueness flag flipped.
    IndexUniquenessChanged { index: IndexId },

    /// A generation annotation on a property was set, replaced or cleared.
    PropertyAnnotationChanged {
        property: PropertyId,
        strategy: GenerationStrategy,
        old_value: Option<String>,
        new_value: Option<String>,
        /// Source of the new value, or of the clear request.
        source: ConfigurationSource,
    },

    /// All structural mutation is complete; the model is about to be sealed.
    ModelFinalizing,
}

impl ModelEvent {
    /// Short name of the event kind, used in log output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ForeignKeyAdded { .. } => "foreign_key_added",
            Self::ForeignKeyRemoved { .. } => "foreign_key_removed",
            Self::ForeignKeyPropertiesChanged { .. } => "foreign_key_properties_changed",
            Self::ForeignKeyUniquenessChanged { .. } => "foreign_key_uniqueness_changed",
            Self::KeyAdded { .. } => "key_added",
            Self::KeyRemoved { .. } => "key_removed",
            Self::EntityTypeBaseTypeChanged { .. } => "entity_type_base_type_changed",
            Self::IndexAdded { .. } => "index_added",
            Self::IndexRemoved { .. } => "index_removed",
            Self::IndexUniquenessChanged { .. } => "index_uniqueness_changed",
            Self::PropertyAnnotationChanged { .. } => "property_annotation_changed",
            Self::ModelFinalizing => "model_finalizing",
        }
    }
}
