//! Keeps every foreign key served by an index.
//!
//! For each foreign key the model should hold, on the declaring type or an
//! ancestor, a key or index that covers the dependent properties, and no
//! index the convention created should be shadowed by a wider key or index.
//! The handlers below restore that after each kind of structural change.
//! Indexes are created with `ConfigurationSource::Convention`, so annotated
//! or explicit indexes are never removed or altered here.

use crate::convention::{Convention, ConventionOutcome, Mutation};
use crate::covering::properties_covered;
use crate::diagnostics::Diagnostics;
use crate::error::ConventionResult;
use crate::redundancy_audit::report_redundant_indexes;
use schemaguard_model::{ForeignKey, SchemaModel};
use schemaguard_types::{EntityTypeId, ForeignKeyId, IndexId, KeyId, ModelEvent, PropertyId};
use tracing::{debug, trace};

/// What an index request over a property sequence needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexRequest {
    /// A visible key or index already covers the sequence.
    Covered,
    /// An index with exactly this sequence exists but must be made unique.
    Strengthen(IndexId),
    /// A new index is needed.
    Create,
}

/// Decides whether `entity_type` needs a new index over `properties`.
pub fn create_index_if_needed(
    model: &SchemaModel,
    entity_type: EntityTypeId,
    properties: &[PropertyId],
    unique: bool,
) -> IndexRequest {
    let key_covers = model
        .keys(entity_type)
        .any(|k| properties_covered(model, properties, unique, k.properties(), true));
    if key_covers {
        return IndexRequest::Covered;
    }
    let index_covers = model
        .indexes(entity_type)
        .any(|i| properties_covered(model, properties, unique, i.properties(), i.is_unique()));
    if index_covers {
        return IndexRequest::Covered;
    }
    match model.find_index(entity_type, properties) {
        Some(index) if unique => IndexRequest::Strengthen(index.id()),
        Some(_) => IndexRequest::Covered,
        None => IndexRequest::Create,
    }
}

/// What covers a foreign key from a new base type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coverage {
    Key(KeyId),
    Index(IndexId),
}

/// Creates, strengthens and removes indexes as foreign keys, keys, indexes
/// and the inheritance tree change.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForeignKeyIndexConvention;

impl Convention for ForeignKeyIndexConvention {
    fn name(&self) -> &'static str {
        "foreign_key_index"
    }

    fn handle(&self, model: &SchemaModel, event: &ModelEvent) -> ConventionOutcome {
        let mutations = match event {
            ModelEvent::ForeignKeyAdded { foreign_key } => on_foreign_key_added(model, *foreign_key),
            ModelEvent::ForeignKeyRemoved {
                entity_type,
                properties,
                ..
            } => on_foreign_key_removed(model, *entity_type, properties),
            ModelEvent::ForeignKeyPropertiesChanged {
                foreign_key,
                entity_type,
                properties,
                old_properties,
                ..
            } => on_foreign_key_properties_changed(
                model,
                *foreign_key,
                *entity_type,
                properties,
                old_properties,
            ),
            ModelEvent::ForeignKeyUniquenessChanged { foreign_key } => {
                on_foreign_key_uniqueness_changed(model, *foreign_key)
            }
            ModelEvent::KeyAdded { key } => on_key_added(model, *key),
            ModelEvent::KeyRemoved {
                entity_type,
                properties,
                ..
            } => on_key_removed(model, *entity_type, properties),
            ModelEvent::EntityTypeBaseTypeChanged {
                entity_type,
                new_base,
                ..
            } => on_base_type_changed(model, *entity_type, *new_base),
            ModelEvent::IndexAdded { index } => on_index_added(model, *index),
            ModelEvent::IndexRemoved {
                entity_type,
                properties,
                unique,
                ..
            } => on_index_removed(model, *entity_type, properties, *unique),
            ModelEvent::IndexUniquenessChanged { index } => on_index_uniqueness_changed(model, *index),
            ModelEvent::PropertyAnnotationChanged { .. } | ModelEvent::ModelFinalizing => Vec::new(),
        };
        if !mutations.is_empty() {
            trace!("{} requested {} mutation(s) for {}", self.name(), mutations.len(), event.kind());
        }
        ConventionOutcome::apply(mutations)
    }

    fn finalize(
        &self,
        model: &SchemaModel,
        diagnostics: &mut dyn Diagnostics,
    ) -> ConventionResult<()> {
        report_redundant_indexes(model, diagnostics)?;
        Ok(())
    }
}

fn ensure_index_for(fk: &ForeignKey) -> Mutation {
    Mutation::EnsureIndex {
        entity_type: fk.declaring_type(),
        properties: fk.properties().to_vec(),
        unique: fk.is_unique(),
    }
}

// ── Foreign key handlers ─────────────────────────────────────────

fn on_foreign_key_added(model: &SchemaModel, foreign_key: ForeignKeyId) -> Vec<Mutation> {
    model
        .foreign_key(foreign_key)
        .map(|fk| vec![ensure_index_for(fk)])
        .unwrap_or_default()
}

/// Drops the index over `properties` once no foreign key in the index's
/// subtree uses that exact sequence. If sharers remain but none is unique, a
/// unique index is relaxed instead.
fn on_foreign_key_removed(
    model: &SchemaModel,
    entity_type: EntityTypeId,
    properties: &[PropertyId],
) -> Vec<Mutation> {
    let Some(index) = model.find_index(entity_type, properties) else {
        return Vec::new();
    };

    let sharers: Vec<&ForeignKey> = model
        .derived_types_inclusive(index.declaring_type())
        .flat_map(|t| model.declared_foreign_keys(t))
        .filter(|fk| fk.properties() == properties)
        .collect();

    if sharers.is_empty() {
        debug!(
            "No foreign key left over {}, removing {}",
            model.format_properties(properties),
            index.id()
        );
        return vec![Mutation::RemoveIndex { index: index.id() }];
    }
    if index.is_unique() && sharers.iter().all(|fk| !fk.is_unique()) {
        return vec![Mutation::SetIndexUnique {
            index: index.id(),
            unique: false,
        }];
    }
    Vec::new()
}

fn on_foreign_key_properties_changed(
    model: &SchemaModel,
    foreign_key: ForeignKeyId,
    entity_type: EntityTypeId,
    properties: &[PropertyId],
    old_properties: &[PropertyId],
) -> Vec<Mutation> {
    let fk = model.foreign_key(foreign_key);
    let current = fk.map(|fk| fk.properties()).unwrap_or(properties);
    if current == old_properties {
        return Vec::new();
    }

    let mut mutations = on_foreign_key_removed(model, entity_type, old_properties);
    if let Some(fk) = fk {
        mutations.push(ensure_index_for(fk));
    }
    mutations
}

fn on_foreign_key_uniqueness_changed(
    model: &SchemaModel,
    foreign_key: ForeignKeyId,
) -> Vec<Mutation> {
    let Some(fk) = model.foreign_key(foreign_key) else {
        return Vec::new();
    };
    let entity_type = fk.declaring_type();
    let Some(index) = model.find_index(entity_type, fk.properties()) else {
        return if fk.is_unique() {
            vec![ensure_index_for(fk)]
        } else {
            Vec::new()
        };
    };

    if !fk.is_unique() {
        let unique_sharer = model
            .find_foreign_keys(entity_type, fk.properties())
            .any(|other| other.id() != fk.id() && other.is_unique());
        if unique_sharer {
            return Vec::new();
        }

        // A non-unique foreign key may now be served by something wider.
        let key_covers = model
            .keys(entity_type)
            .any(|k| properties_covered(model, fk.properties(), false, k.properties(), true));
        let other_index_covers = || {
            model.indexes(entity_type).any(|other| {
                other.id() != index.id()
                    && properties_covered(
                        model,
                        fk.properties(),
                        false,
                        other.properties(),
                        other.is_unique(),
                    )
            })
        };
        if key_covers || other_index_covers() {
            return vec![Mutation::RemoveIndex { index: index.id() }];
        }
    }

    vec![Mutation::SetIndexUnique {
        index: index.id(),
        unique: fk.is_unique(),
    }]
}

// ── Key handlers ─────────────────────────────────────────────────

/// Removes indexes in the key's subtree that the new key covers.
fn on_key_added(model: &SchemaModel, key: KeyId) -> Vec<Mutation> {
    let Some(key) = model.key(key) else {
        return Vec::new();
    };
    model
        .derived_types_inclusive(key.declaring_type())
        .flat_map(|t| model.declared_indexes(t))
        .filter(|i| properties_covered(model, i.properties(), i.is_unique(), key.properties(), true))
        .map(|i| Mutation::RemoveIndex { index: i.id() })
        .collect()
}

/// Re-indexes foreign keys in the subtree that only the removed key covered.
fn on_key_removed(
    model: &SchemaModel,
    entity_type: EntityTypeId,
    properties: &[PropertyId],
) -> Vec<Mutation> {
    model
        .derived_types_inclusive(entity_type)
        .flat_map(|t| model.declared_foreign_keys(t))
        .filter(|fk| properties_covered(model, fk.properties(), fk.is_unique(), properties, true))
        .map(ensure_index_for)
        .collect()
}

// ── Inheritance ──────────────────────────────────────────────────

fn on_base_type_changed(
    model: &SchemaModel,
    entity_type: EntityTypeId,
    new_base: Option<EntityTypeId>,
) -> Vec<Mutation> {
    if model.entity_type(entity_type).is_none() || model.base_type(entity_type) != new_base {
        // Superseded by a later reparenting that has its own event.
        return Vec::new();
    }

    let mut mutations = Vec::new();
    for fk in model
        .derived_types_inclusive(entity_type)
        .flat_map(|t| model.declared_foreign_keys(t))
    {
        let Some(index) = model.find_index(fk.declaring_type(), fk.properties()) else {
            mutations.push(ensure_index_for(fk));
            continue;
        };
        let Some(base) = new_base else {
            continue;
        };
        match find_base_coverage(model, base, fk, index.id()) {
            Some(Coverage::Key(key)) => {
                debug!("{} is redundant with {} on the new base type", index.id(), key);
            }
            Some(Coverage::Index(other)) => {
                debug!("{} is redundant with {} on the new base type", index.id(), other);
            }
            None => continue,
        }
        mutations.push(Mutation::RemoveIndex { index: index.id() });
    }
    mutations
}

/// Looks for a key, then an index other than `own_index`, visible on `base`
/// that covers `fk`.
fn find_base_coverage(
    model: &SchemaModel,
    base: EntityTypeId,
    fk: &ForeignKey,
    own_index: IndexId,
) -> Option<Coverage> {
    if let Some(key) = model
        .keys(base)
        .find(|k| properties_covered(model, fk.properties(), fk.is_unique(), k.properties(), true))
    {
        return Some(Coverage::Key(key.id()));
    }
    model
        .indexes(base)
        .find(|i| {
            i.id() != own_index
                && properties_covered(model, fk.properties(), fk.is_unique(), i.properties(), i.is_unique())
        })
        .map(|i| Coverage::Index(i.id()))
}

// ── Index handlers ───────────────────────────────────────────────

/// Removes other indexes in the subtree that the new index covers.
fn on_index_added(model: &SchemaModel, index: IndexId) -> Vec<Mutation> {
    let Some(index) = model.index(index) else {
        return Vec::new();
    };
    model
        .derived_types_inclusive(index.declaring_type())
        .flat_map(|t| model.declared_indexes(t))
        .filter(|other| {
            other.id() != index.id()
                && properties_covered(
                    model,
                    other.properties(),
                    other.is_unique(),
                    index.properties(),
                    index.is_unique(),
                )
        })
        .map(|other| Mutation::RemoveIndex { index: other.id() })
        .collect()
}

/// Re-indexes foreign keys in the subtree that the removed index covered.
fn on_index_removed(
    model: &SchemaModel,
    entity_type: EntityTypeId,
    properties: &[PropertyId],
    unique: bool,
) -> Vec<Mutation> {
    model
        .derived_types_inclusive(entity_type)
        .flat_map(|t| model.declared_foreign_keys(t))
        .filter(|fk| properties_covered(model, fk.properties(), fk.is_unique(), properties, unique))
        .map(ensure_index_for)
        .collect()
}

fn on_index_uniqueness_changed(model: &SchemaModel, index: IndexId) -> Vec<Mutation> {
    let Some(index) = model.index(index) else {
        return Vec::new();
    };
    let subtree = model.derived_types_inclusive(index.declaring_type());

    if index.is_unique() {
        // Now unique: it may shadow an identical unique index below it.
        subtree
            .flat_map(|t| model.declared_indexes(t))
            .filter(|other| {
                other.id() != index.id()
                    && properties_covered(
                        model,
                        other.properties(),
                        other.is_unique(),
                        index.properties(),
                        true,
                    )
            })
            .map(|other| Mutation::RemoveIndex { index: other.id() })
            .collect()
    } else {
        // No longer unique: unique foreign keys it served need their own.
        subtree
            .flat_map(|t| model.declared_foreign_keys(t))
            .filter(|fk| {
                fk.is_unique()
                    && properties_covered(model, fk.properties(), true, index.properties(), true)
            })
            .map(ensure_index_for)
            .collect()
    }
}
