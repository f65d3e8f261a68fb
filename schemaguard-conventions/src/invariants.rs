//! Whole-model checks for the properties the conventions maintain.
//!
//! The builder never calls these. They exist so tests and hosts can assert
//! that a model reached a consistent state regardless of how it got there.

use crate::covering::properties_covered;
use schemaguard_model::{ForeignKey, SchemaModel};
use schemaguard_types::{EntityTypeId, ForeignKeyId, PropertyId};
use std::collections::BTreeSet;

/// Returns true if a key or index visible on the foreign key's declaring
/// type covers its dependent properties.
pub fn is_foreign_key_covered(model: &SchemaModel, fk: &ForeignKey) -> bool {
    let entity_type = fk.declaring_type();
    model
        .keys(entity_type)
        .any(|k| properties_covered(model, fk.properties(), fk.is_unique(), k.properties(), true))
        || model.indexes(entity_type).any(|i| {
            properties_covered(model, fk.properties(), fk.is_unique(), i.properties(), i.is_unique())
        })
}

/// Foreign keys that no visible key or index covers.
pub fn uncovered_foreign_keys(model: &SchemaModel) -> Vec<ForeignKeyId> {
    model
        .all_foreign_keys()
        .filter(|fk| !is_foreign_key_covered(model, fk))
        .map(|fk| fk.id())
        .collect()
}

/// Entity types declaring more than one index over the same sequence.
pub fn duplicate_index_sequences(model: &SchemaModel) -> Vec<(EntityTypeId, Vec<PropertyId>)> {
    let mut duplicates = Vec::new();
    for entity_type in model.entity_types() {
        let mut seen = BTreeSet::new();
        for index in model.declared_indexes(entity_type.id()) {
            if !seen.insert(index.properties().to_vec()) {
                duplicates.push((entity_type.id(), index.properties().to_vec()));
            }
        }
    }
    duplicates
}
