//! Schema elements owned by [`SchemaModel`](crate::SchemaModel).
//!
//! Elements refer to each other by id only. Fields are crate-private so that
//! every structural change goes through a model mutator and is recorded as an
//! event.

use schemaguard_types::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, GenerationStrategy, IndexId, KeyId,
    PropertyId,
};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A node in the single-inheritance tree.
#[derive(Debug, Clone, Serialize)]
pub struct EntityType {
    pub(crate) id: EntityTypeId,
    pub(crate) name: String,
    pub(crate) base_type: Option<EntityTypeId>,
    pub(crate) derived_types: BTreeSet<EntityTypeId>,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) keys: Vec<KeyId>,
    pub(crate) foreign_keys: Vec<ForeignKeyId>,
    pub(crate) indexes: Vec<IndexId>,
}

impl EntityType {
    pub(crate) fn new(id: EntityTypeId, name: String) -> Self {
        Self {
            id,
            name,
            base_type: None,
            derived_types: BTreeSet::new(),
            properties: Vec::new(),
            keys: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
        }
    }

    pub fn id(&self) -> EntityTypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn base_type(&self) -> Option<EntityTypeId> {
        self.base_type
    }

    /// Direct children in the inheritance tree.
    pub fn derived_types(&self) -> impl Iterator<Item = EntityTypeId> + '_ {
        self.derived_types.iter().copied()
    }

    /// Properties declared on this type (not inherited ones).
    pub fn declared_properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn declared_keys(&self) -> &[KeyId] {
        &self.keys
    }

    pub fn declared_foreign_keys(&self) -> &[ForeignKeyId] {
        &self.foreign_keys
    }

    pub fn declared_indexes(&self) -> &[IndexId] {
        &self.indexes
    }
}

/// A generation annotation value together with the source that set it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Annotation {
    pub value: String,
    pub source: ConfigurationSource,
}

/// A named property on exactly one declaring entity type.
#[derive(Debug, Clone, Serialize)]
pub struct Property {
    pub(crate) id: PropertyId,
    pub(crate) name: String,
    pub(crate) declaring_type: EntityTypeId,
    pub(crate) annotations: BTreeMap<GenerationStrategy, Annotation>,
}

impl Property {
    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn declaring_type(&self) -> EntityTypeId {
        self.declaring_type
    }

    /// Returns the annotation for `strategy`, if set.
    pub fn annotation(&self, strategy: GenerationStrategy) -> Option<&Annotation> {
        self.annotations.get(&strategy)
    }

    /// Strategies currently set on this property, in canonical order.
    pub fn configured_strategies(&self) -> Vec<GenerationStrategy> {
        GenerationStrategy::ALL
            .into_iter()
            .filter(|s| self.annotations.contains_key(s))
            .collect()
    }
}

/// An ordered, non-empty, implicitly unique property sequence.
#[derive(Debug, Clone, Serialize)]
pub struct Key {
    pub(crate) id: KeyId,
    pub(crate) declaring_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) source: ConfigurationSource,
}

impl Key {
    pub fn id(&self) -> KeyId {
        self.id
    }

    pub fn declaring_type(&self) -> EntityTypeId {
        self.declaring_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }
}

/// Dependent properties referencing a principal key.
#[derive(Debug, Clone, Serialize)]
pub struct ForeignKey {
    pub(crate) id: ForeignKeyId,
    pub(crate) declaring_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) principal_key: KeyId,
    pub(crate) principal_type: EntityTypeId,
    pub(crate) unique: bool,
    pub(crate) source: ConfigurationSource,
}

impl ForeignKey {
    pub fn id(&self) -> ForeignKeyId {
        self.id
    }

    pub fn declaring_type(&self) -> EntityTypeId {
        self.declaring_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn principal_key(&self) -> KeyId {
        self.principal_key
    }

    pub fn principal_type(&self) -> EntityTypeId {
        self.principal_type
    }

    /// Whether the dependent side is unique (one-to-one).
    pub fn is_unique(&self) -> bool {
        self.unique
    }

    pub fn source(&self) -> ConfigurationSource {
        self.source
    }
}

/// An ordered property sequence with a uniqueness flag.
#[derive(Debug, Clone, Serialize)]
pub struct Index {
    pub(crate) id: IndexId,
    pub(crate) declaring_type: EntityTypeId,
    pub(crate) properties: Vec<PropertyId>,
    pub(crate) unique: bool,
    pub(crate) source: ConfigurationSource,
    pub(crate) unique_source: Option<ConfigurationSource>,
}

impl Index {
    pub fn id(&self) -> IndexId {
        self.id
    }

    pub fn declaring_type(&self) -> EntityTypeId {
        self.declaring_type
    }

    pub fn properties(&self) -> &[PropertyId] {
        &self.properties
    }

    pub fn is_unique(&self) -> bool {
        self.unique
    }

    /// Source that created (or last claimed) the index.
    pub fn source(&self) -> ConfigurationSource {
        self.source
    }

    /// Source that last set the uniqueness flag, if it was ever set.
    pub fn unique_source(&self) -> Option<ConfigurationSource> {
        self.unique_source
    }
}
