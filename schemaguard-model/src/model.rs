//! The mutable schema model and its mutators.
//!
//! Every mutator validates its input, applies the change, and records exactly
//! one [`ModelEvent`] per structural change (a key removal that cascades to
//! its referencing foreign keys records one event per removed element). The
//! recorded events are drained by the caller with [`SchemaModel::take_events`]
//! and handed to the conventions in order.
//!
//! Mutators that can be overridden by configuration-source priority return
//! `Ok(None)` when the requesting source does not override the existing one.

use crate::elements::{Annotation, EntityType, ForeignKey, Index, Key, Property};
use crate::error::{ModelError, ModelResult};
use schemaguard_types::{
    ConfigurationSource, EntityTypeId, ForeignKeyId, GenerationStrategy, IndexId, KeyId,
    ModelEvent, PropertyId,
};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, trace};

/// An in-memory schema model: entity types in a single-inheritance tree, plus
/// the properties, keys, foreign keys and indexes they declare.
#[derive(Debug, Default)]
pub struct SchemaModel {
    pub(crate) entity_types: BTreeMap<EntityTypeId, EntityType>,
    pub(crate) properties: BTreeMap<PropertyId, Property>,
    pub(crate) keys: BTreeMap<KeyId, Key>,
    pub(crate) foreign_keys: BTreeMap<ForeignKeyId, ForeignKey>,
    pub(crate) indexes: BTreeMap<IndexId, Index>,
    next_id: u32,
    events: VecDeque<ModelEvent>,
    finalizing: bool,
    sealed: bool,
}

impl SchemaModel {
    /// Creates an empty model.
    pub fn new() -> Self {
        Self::default()
    }

    /// Drains the events recorded since the last call, in mutation order.
    pub fn take_events(&mut self) -> Vec<ModelEvent> {
        self.events.drain(..).collect()
    }

    /// Returns true if events are waiting to be drained.
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Returns true once the model has been sealed by [`SchemaModel::seal`].
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    // ── Entity types & properties ────────────────────────────────

    /// Adds a root entity type. Names are unique within the model.
    pub fn add_entity_type(&mut self, name: impl Into<String>) -> ModelResult<EntityTypeId> {
        self.ensure_mutable()?;
        let name = name.into();
        if self.entity_types.values().any(|e| e.name == name) {
            return Err(ModelError::DuplicateName(name));
        }

        let id = EntityTypeId::new(self.allocate());
        debug!("Added entity type {} ({})", name, id);
        self.entity_types.insert(id, EntityType::new(id, name));
        Ok(id)
    }

    /// Declares a property on `entity_type`.
    ///
    /// Property names are unique across the whole inheritance chain: neither an
    /// ancestor nor a descendant may already declare the same name.
    pub fn add_property(
        &mut self,
        entity_type: EntityTypeId,
        name: impl Into<String>,
    ) -> ModelResult<PropertyId> {
        self.ensure_mutable()?;
        let name = name.into();
        let owner = self.require_entity_type(entity_type)?.name.clone();

        let visible = self
            .ancestors_inclusive(entity_type)
            .chain(self.derived_types_inclusive(entity_type).skip(1))
            .any(|t| self.declared_properties(t).any(|p| p.name == name));
        if visible {
            return Err(ModelError::DuplicateName(format!("{owner}.{name}")));
        }

        let id = PropertyId::new(self.allocate());
        self.properties.insert(
            id,
            Property {
                id,
                name,
                declaring_type: entity_type,
                annotations: BTreeMap::new(),
            },
        );
        self.entity_type_mut(entity_type)?.properties.push(id);
        Ok(id)
    }

    /// Sets (or clears, with `None`) the base type of `entity_type`.
    ///
    /// Rejects cycles, property-name clashes with the new ancestors, and
    /// re-parenting that would leave a key, foreign key or index in the
    /// subtree referring to a property that is no longer visible.
    pub fn set_base_type(
        &mut self,
        entity_type: EntityTypeId,
        base_type: Option<EntityTypeId>,
    ) -> ModelResult<EntityTypeId> {
        self.ensure_mutable()?;
        let old_base = self.require_entity_type(entity_type)?.base_type;
        if let Some(base) = base_type {
            self.require_entity_type(base)?;
            if self.ancestors_inclusive(base).any(|t| t == entity_type) {
                return Err(ModelError::InheritanceCycle {
                    entity_type,
                    base_type: base,
                });
            }
        }
        if old_base == base_type {
            return Ok(entity_type);
        }

        self.check_reparenting(entity_type, base_type)?;

        if let Some(old) = old_base {
            self.entity_type_mut(old)?.derived_types.remove(&entity_type);
        }
        if let Some(base) = base_type {
            self.entity_type_mut(base)?.derived_types.insert(entity_type);
        }
        self.entity_type_mut(entity_type)?.base_type = base_type;

        self.record(ModelEvent::EntityTypeBaseTypeChanged {
            entity_type,
            new_base: base_type,
            old_base,
        });
        Ok(entity_type)
    }

    // ── Keys ─────────────────────────────────────────────────────

    /// Adds a key over `properties`. Re-adding an existing sequence returns the
    /// existing key, raising its source if `source` is higher.
    pub fn add_key(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> ModelResult<KeyId> {
        self.ensure_mutable()?;
        self.require_entity_type(entity_type)?;
        self.validate_properties(entity_type, properties)?;

        let existing = self
            .declared_keys(entity_type)
            .find(|k| k.properties == properties)
            .map(|k| k.id);
        if let Some(id) = existing {
            if let Some(key) = self.keys.get_mut(&id) {
                key.source = source.max_with(Some(key.source));
            }
            return Ok(id);
        }

        let id = KeyId::new(self.allocate());
        self.keys.insert(
            id,
            Key {
                id,
                declaring_type: entity_type,
                properties: properties.to_vec(),
                source,
            },
        );
        self.entity_type_mut(entity_type)?.keys.push(id);
        self.record(ModelEvent::KeyAdded { key: id });
        Ok(id)
    }

    /// Removes a key together with every foreign key that references it.
    ///
    /// Refused when `source` does not override the key or any referencing
    /// foreign key.
    pub fn remove_key(
        &mut self,
        key: KeyId,
        source: ConfigurationSource,
    ) -> ModelResult<Option<KeyId>> {
        self.ensure_mutable()?;
        let existing = self.keys.get(&key).ok_or(ModelError::KeyNotFound(key))?;
        if !source.overrides(Some(existing.source)) {
            return Ok(None);
        }

        let referencing: Vec<&ForeignKey> = self
            .foreign_keys
            .values()
            .filter(|fk| fk.principal_key == key)
            .collect();
        if referencing.iter().any(|fk| !source.overrides(Some(fk.source))) {
            return Ok(None);
        }
        let referencing: Vec<ForeignKeyId> = referencing.iter().map(|fk| fk.id).collect();
        for fk in referencing {
            self.detach_foreign_key(fk)?;
        }

        let removed = self.keys.remove(&key).ok_or(ModelError::KeyNotFound(key))?;
        self.entity_type_mut(removed.declaring_type)?
            .keys
            .retain(|k| *k != key);
        self.record(ModelEvent::KeyRemoved {
            entity_type: removed.declaring_type,
            key,
            properties: removed.properties,
        });
        Ok(Some(key))
    }

    // ── Foreign keys ─────────────────────────────────────────────

    /// Adds a foreign key over `properties` referencing `principal_key`.
    ///
    /// Several foreign keys may share the same dependent properties.
    pub fn add_foreign_key(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
        principal_key: KeyId,
        unique: bool,
        source: ConfigurationSource,
    ) -> ModelResult<ForeignKeyId> {
        self.ensure_mutable()?;
        self.require_entity_type(entity_type)?;
        self.validate_properties(entity_type, properties)?;
        let principal_type = self.check_arity(principal_key, properties)?;

        let id = ForeignKeyId::new(self.allocate());
        self.foreign_keys.insert(
            id,
            ForeignKey {
                id,
                declaring_type: entity_type,
                properties: properties.to_vec(),
                principal_key,
                principal_type,
                unique,
                source,
            },
        );
        self.entity_type_mut(entity_type)?.foreign_keys.push(id);
        self.record(ModelEvent::ForeignKeyAdded { foreign_key: id });
        Ok(id)
    }

    /// Removes a foreign key. Refused when `source` does not override it.
    pub fn remove_foreign_key(
        &mut self,
        foreign_key: ForeignKeyId,
        source: ConfigurationSource,
    ) -> ModelResult<Option<ForeignKeyId>> {
        self.ensure_mutable()?;
        let existing = self
            .foreign_keys
            .get(&foreign_key)
            .ok_or(ModelError::ForeignKeyNotFound(foreign_key))?;
        if !source.overrides(Some(existing.source)) {
            return Ok(None);
        }

        self.detach_foreign_key(foreign_key)?;
        Ok(Some(foreign_key))
    }

    /// Replaces the dependent properties of a foreign key.
    pub fn set_foreign_key_properties(
        &mut self,
        foreign_key: ForeignKeyId,
        properties: &[PropertyId],
    ) -> ModelResult<ForeignKeyId> {
        self.ensure_mutable()?;
        let fk = self
            .foreign_keys
            .get(&foreign_key)
            .ok_or(ModelError::ForeignKeyNotFound(foreign_key))?;
        let (entity_type, principal_key) = (fk.declaring_type, fk.principal_key);
        if fk.properties == properties {
            return Ok(foreign_key);
        }

        self.validate_properties(entity_type, properties)?;
        self.check_arity(principal_key, properties)?;

        let fk = self
            .foreign_keys
            .get_mut(&foreign_key)
            .ok_or(ModelError::ForeignKeyNotFound(foreign_key))?;
        let old_properties = std::mem::replace(&mut fk.properties, properties.to_vec());
        self.record(ModelEvent::ForeignKeyPropertiesChanged {
            foreign_key,
            entity_type,
            properties: properties.to_vec(),
            old_properties,
            old_principal_key: principal_key,
        });
        Ok(foreign_key)
    }

    /// Sets the uniqueness of the dependent side of a foreign key.
    pub fn set_foreign_key_unique(
        &mut self,
        foreign_key: ForeignKeyId,
        unique: bool,
    ) -> ModelResult<ForeignKeyId> {
        self.ensure_mutable()?;
        let fk = self
            .foreign_keys
            .get_mut(&foreign_key)
            .ok_or(ModelError::ForeignKeyNotFound(foreign_key))?;
        if fk.unique != unique {
            fk.unique = unique;
            self.record(ModelEvent::ForeignKeyUniquenessChanged { foreign_key });
        }
        Ok(foreign_key)
    }

    // ── Indexes ──────────────────────────────────────────────────

    /// Adds a non-unique index over `properties`.
    ///
    /// If `entity_type` already declares an index with the same sequence the
    /// existing index is returned (its source raised if `source` is higher)
    /// and no event is recorded.
    pub fn add_index(
        &mut self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
        source: ConfigurationSource,
    ) -> ModelResult<IndexId> {
        self.ensure_mutable()?;
        self.require_entity_type(entity_type)?;
        self.validate_properties(entity_type, properties)?;

        let existing = self
            .declared_indexes(entity_type)
            .find(|i| i.properties == properties)
            .map(|i| i.id);
        if let Some(id) = existing {
            if let Some(index) = self.indexes.get_mut(&id) {
                index.source = source.max_with(Some(index.source));
            }
            return Ok(id);
        }

        let id = IndexId::new(self.allocate());
        self.indexes.insert(
            id,
            Index {
                id,
                declaring_type: entity_type,
                properties: properties.to_vec(),
                unique: false,
                source,
                unique_source: None,
            },
        );
        self.entity_type_mut(entity_type)?.indexes.push(id);
        self.record(ModelEvent::IndexAdded { index: id });
        Ok(id)
    }

    /// Removes an index. Refused when `source` does not override it.
    pub fn remove_index(
        &mut self,
        index: IndexId,
        source: ConfigurationSource,
    ) -> ModelResult<Option<IndexId>> {
        self.ensure_mutable()?;
        let existing = self
            .indexes
            .get(&index)
            .ok_or(ModelError::IndexNotFound(index))?;
        if !source.overrides(Some(existing.source)) {
            trace!("Refused removal of {} from {} source", index, source);
            return Ok(None);
        }

        let removed = self
            .indexes
            .remove(&index)
            .ok_or(ModelError::IndexNotFound(index))?;
        self.entity_type_mut(removed.declaring_type)?
            .indexes
            .retain(|i| *i != index);
        self.record(ModelEvent::IndexRemoved {
            entity_type: removed.declaring_type,
            index,
            properties: removed.properties,
            unique: removed.unique,
        });
        Ok(Some(index))
    }

    /// Sets an index's uniqueness flag. Refused when `source` does not
    /// override the source that last set the flag.
    pub fn set_index_unique(
        &mut self,
        index: IndexId,
        unique: bool,
        source: ConfigurationSource,
    ) -> ModelResult<Option<IndexId>> {
        self.ensure_mutable()?;
        let existing = self
            .indexes
            .get_mut(&index)
            .ok_or(ModelError::IndexNotFound(index))?;
        if !source.overrides(existing.unique_source) {
            trace!("Refused uniqueness change of {} from {} source", index, source);
            return Ok(None);
        }

        existing.unique_source = Some(source.max_with(existing.unique_source));
        if existing.unique != unique {
            existing.unique = unique;
            self.record(ModelEvent::IndexUniquenessChanged { index });
        }
        Ok(Some(index))
    }

    // ── Annotations ──────────────────────────────────────────────

    /// Sets a generation annotation. Refused when `source` does not override
    /// the source of the current value.
    pub fn set_annotation(
        &mut self,
        property: PropertyId,
        strategy: GenerationStrategy,
        value: impl Into<String>,
        source: ConfigurationSource,
    ) -> ModelResult<Option<PropertyId>> {
        self.ensure_mutable()?;
        let value = value.into();
        let prop = self
            .properties
            .get_mut(&property)
            .ok_or(ModelError::PropertyNotFound(property))?;

        let existing = prop.annotations.get(&strategy);
        if !source.overrides(existing.map(|a| a.source)) {
            return Ok(None);
        }
        let old_value = existing.map(|a| a.value.clone());
        let source = source.max_with(existing.map(|a| a.source));
        prop.annotations.insert(
            strategy,
            Annotation {
                value: value.clone(),
                source,
            },
        );

        if old_value.as_deref() != Some(value.as_str()) {
            self.record(ModelEvent::PropertyAnnotationChanged {
                property,
                strategy,
                old_value,
                new_value: Some(value),
                source,
            });
        }
        Ok(Some(property))
    }

    /// Clears a generation annotation. Clearing an unset annotation succeeds
    /// without recording an event.
    pub fn clear_annotation(
        &mut self,
        property: PropertyId,
        strategy: GenerationStrategy,
        source: ConfigurationSource,
    ) -> ModelResult<Option<PropertyId>> {
        self.ensure_mutable()?;
        let prop = self
            .properties
            .get_mut(&property)
            .ok_or(ModelError::PropertyNotFound(property))?;

        let Some(existing) = prop.annotations.get(&strategy) else {
            return Ok(Some(property));
        };
        if !source.overrides(Some(existing.source)) {
            return Ok(None);
        }

        let removed = prop.annotations.remove(&strategy);
        self.record(ModelEvent::PropertyAnnotationChanged {
            property,
            strategy,
            old_value: removed.map(|a| a.value),
            new_value: None,
            source,
        });
        Ok(Some(property))
    }

    // ── Finalization ─────────────────────────────────────────────

    /// Records the single `ModelFinalizing` event. Mutations stay possible
    /// until [`SchemaModel::seal`] so conventions can still react to it.
    pub fn finalize(&mut self) -> ModelResult<()> {
        if self.finalizing || self.sealed {
            return Err(ModelError::Finalized);
        }
        self.finalizing = true;
        self.record(ModelEvent::ModelFinalizing);
        Ok(())
    }

    /// Seals the model; every later mutation fails with `ModelError::Finalized`.
    pub fn seal(&mut self) {
        self.finalizing = true;
        self.sealed = true;
    }

    // ── Internals ────────────────────────────────────────────────

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn record(&mut self, event: ModelEvent) {
        trace!(kind = event.kind(), "Recorded model event");
        self.events.push_back(event);
    }

    fn ensure_mutable(&self) -> ModelResult<()> {
        if self.sealed {
            Err(ModelError::Finalized)
        } else {
            Ok(())
        }
    }

    fn require_entity_type(&self, id: EntityTypeId) -> ModelResult<&EntityType> {
        self.entity_types
            .get(&id)
            .ok_or(ModelError::EntityTypeNotFound(id))
    }

    fn entity_type_mut(&mut self, id: EntityTypeId) -> ModelResult<&mut EntityType> {
        self.entity_types
            .get_mut(&id)
            .ok_or(ModelError::EntityTypeNotFound(id))
    }

    fn validate_properties(
        &self,
        entity_type: EntityTypeId,
        properties: &[PropertyId],
    ) -> ModelResult<()> {
        if properties.is_empty() {
            return Err(ModelError::EmptyPropertyList);
        }
        for &property in properties {
            if !self.properties.contains_key(&property) {
                return Err(ModelError::PropertyNotFound(property));
            }
            if !self.is_visible(entity_type, property) {
                return Err(ModelError::PropertyNotVisible {
                    entity_type,
                    property,
                });
            }
        }
        Ok(())
    }

    // Returns the principal entity type when the arities match.
    fn check_arity(
        &self,
        principal_key: KeyId,
        properties: &[PropertyId],
    ) -> ModelResult<EntityTypeId> {
        let principal = self
            .keys
            .get(&principal_key)
            .ok_or(ModelError::KeyNotFound(principal_key))?;
        if principal.properties.len() != properties.len() {
            return Err(ModelError::ArityMismatch {
                principal_key,
                dependent: properties.len(),
                principal: principal.properties.len(),
            });
        }
        Ok(principal.declaring_type)
    }

    fn check_reparenting(
        &self,
        entity_type: EntityTypeId,
        base_type: Option<EntityTypeId>,
    ) -> ModelResult<()> {
        let subtree: BTreeSet<EntityTypeId> = self.derived_types_inclusive(entity_type).collect();
        let new_ancestors: BTreeSet<EntityTypeId> = base_type
            .map(|base| self.ancestors_inclusive(base).collect())
            .unwrap_or_default();

        let inherited_names: BTreeSet<&str> = new_ancestors
            .iter()
            .flat_map(|t| self.declared_properties(*t))
            .map(|p| p.name.as_str())
            .collect();
        for t in &subtree {
            if let Some(clash) = self
                .declared_properties(*t)
                .find(|p| inherited_names.contains(p.name.as_str()))
            {
                let owner = self.require_entity_type(*t)?.name.as_str();
                return Err(ModelError::DuplicateName(format!("{owner}.{}", clash.name)));
            }
        }

        for t in &subtree {
            let referenced = self
                .declared_keys(*t)
                .flat_map(|k| k.properties.iter())
                .chain(self.declared_foreign_keys(*t).flat_map(|fk| fk.properties.iter()))
                .chain(self.declared_indexes(*t).flat_map(|i| i.properties.iter()));
            for property in referenced {
                let Some(declaring) = self.properties.get(property).map(|p| p.declaring_type)
                else {
                    continue;
                };
                if !subtree.contains(&declaring) && !new_ancestors.contains(&declaring) {
                    return Err(ModelError::PropertyNotVisible {
                        entity_type: *t,
                        property: *property,
                    });
                }
            }
        }
        Ok(())
    }

    fn detach_foreign_key(&mut self, foreign_key: ForeignKeyId) -> ModelResult<ForeignKey> {
        let removed = self
            .foreign_keys
            .remove(&foreign_key)
            .ok_or(ModelError::ForeignKeyNotFound(foreign_key))?;
        self.entity_type_mut(removed.declaring_type)?
            .foreign_keys
            .retain(|fk| *fk != foreign_key);
        self.record(ModelEvent::ForeignKeyRemoved {
            entity_type: removed.declaring_type,
            foreign_key,
            properties: removed.properties.clone(),
        });
        Ok(removed)
    }
}
