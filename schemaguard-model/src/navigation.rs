//! Read-only navigation over the schema model.
//!
//! "Declared" lookups return only what a type declares itself; the plain
//! lookups (`keys`, `indexes`, ...) also include everything inherited from
//! ancestors, self first.

use crate::elements::{EntityType, ForeignKey, Index, Key, Property};
use crate::model::SchemaModel;
use schemaguard_types::{EntityTypeId, ForeignKeyId, IndexId, KeyId, PropertyId};
use std::fmt::Write;

/// Walks from an entity type up to the root: self, base, base's base, ...
#[derive(Debug, Clone)]
pub struct AncestorsInclusive<'a> {
    model: &'a SchemaModel,
    next: Option<EntityTypeId>,
}

impl Iterator for AncestorsInclusive<'_> {
    type Item = EntityTypeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.model.base_type(current);
        Some(current)
    }
}

/// Pre-order walk of an entity type and all of its descendants.
///
/// Lazy and finite; clone it (or call
/// [`SchemaModel::derived_types_inclusive`] again) to restart.
#[derive(Debug, Clone)]
pub struct DerivedTypesInclusive<'a> {
    model: &'a SchemaModel,
    stack: Vec<EntityTypeId>,
}

impl Iterator for DerivedTypesInclusive<'_> {
    type Item = EntityTypeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        if let Some(entity_type) = self.model.entity_types.get(&current) {
            self.stack
                .extend(entity_type.derived_types.iter().rev().copied());
        }
        Some(current)
    }
}

impl SchemaModel {
    // ── Element lookup ───────────────────────────────────────────

    pub fn entity_type(&self, id: EntityTypeId) -> Option<&EntityType> {
        self.entity_types.get(&id)
    }

    pub fn entity_type_by_name(&self, name: &str) -> Option<&EntityType> {
        self.entity_types.values().find(|e| e.name == name)
    }

    /// All entity types, in creation order.
    pub fn entity_types(&self) -> impl Iterator<Item = &EntityType> + '_ {
        self.entity_types.values()
    }

    pub fn property(&self, id: PropertyId) -> Option<&Property> {
        self.properties.get(&id)
    }

    pub fn key(&self, id: KeyId) -> Option<&Key> {
        self.keys.get(&id)
    }

    pub fn foreign_key(&self, id: ForeignKeyId) -> Option<&ForeignKey> {
        self.foreign_keys.get(&id)
    }

    pub fn index(&self, id: IndexId) -> Option<&Index> {
        self.indexes.get(&id)
    }

    /// Every index in the model, in creation order.
    pub fn all_indexes(&self) -> impl Iterator<Item = &Index> + '_ {
        self.indexes.values()
    }

    /// Every foreign key in the model, in creation order.
    pub fn all_foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> + '_ {
        self.foreign_keys.values()
    }

    // ── Inheritance ──────────────────────────────────────────────

    pub fn base_type(&self, id: EntityTypeId) -> Option<EntityTypeId> {
        self.entity_types.get(&id).and_then(|e| e.base_type)
    }

    /// Self followed by every ancestor up to the root. Empty for unknown ids.
    pub fn ancestors_inclusive(&self, id: EntityTypeId) -> AncestorsInclusive<'_> {
        AncestorsInclusive {
            model: self,
            next: self.entity_types.contains_key(&id).then_some(id),
        }
    }

    /// Self followed by every descendant, pre-order. Empty for unknown ids.
    pub fn derived_types_inclusive(&self, id: EntityTypeId) -> DerivedTypesInclusive<'_> {
        let stack = if self.entity_types.contains_key(&id) {
            vec![id]
        } else {
            Vec::new()
        };
        DerivedTypesInclusive { model: self, stack }
    }

    /// Returns true if `property` is declared on `entity_type` or an ancestor.
    pub fn is_visible(&self, entity_type: EntityTypeId, property: PropertyId) -> bool {
        self.properties
            .get(&property)
            .is_some_and(|p| self.ancestors_inclusive(entity_type).any(|t| t == p.declaring_type))
    }

    // ── Declared members ─────────────────────────────────────────

    pub fn declared_properties(&self, id: EntityTypeId) -> impl Iterator<Item = &Property> + '_ {
        self.entity_types
            .get(&id)
            .into_iter()
            .flat_map(|e| e.properties.iter())
            .filter_map(move |p| self.properties.get(p))
    }

    pub fn declared_keys(&self, id: EntityTypeId) -> impl Iterator<Item = &Key> + '_ {
        self.entity_types
            .get(&id)
            .into_iter()
            .flat_map(|e| e.keys.iter())
            .filter_map(move |k| self.keys.get(k))
    }

    pub fn declared_foreign_keys(&self, id: EntityTypeId) -> impl Iterator<Item = &ForeignKey> + '_ {
        self.entity_types
            .get(&id)
            .into_iter()
            .flat_map(|e| e.foreign_keys.iter())
            .filter_map(move |fk| self.foreign_keys.get(fk))
    }

    pub fn declared_indexes(&self, id: EntityTypeId) -> impl Iterator<Item = &Index> + '_ {
        self.entity_types
            .get(&id)
            .into_iter()
            .flat_map(|e| e.indexes.iter())
            .filter_map(move |i| self.indexes.get(i))
    }

    // ── Inherited members ────────────────────────────────────────

    pub fn properties(&self, id: EntityTypeId) -> impl Iterator<Item = &Property> + '_ {
        self.ancestors_inclusive(id)
            .flat_map(move |t| self.declared_properties(t))
    }

    pub fn keys(&self, id: EntityTypeId) -> impl Iterator<Item = &Key> + '_ {
        self.ancestors_inclusive(id)
            .flat_map(move |t| self.declared_keys(t))
    }

    pub fn foreign_keys(&self, id: EntityTypeId) -> impl Iterator<Item = &ForeignKey> + '_ {
        self.ancestors_inclusive(id)
            .flat_map(move |t| self.declared_foreign_keys(t))
    }

    pub fn indexes(&self, id: EntityTypeId) -> impl Iterator<Item = &Index> + '_ {
        self.ancestors_inclusive(id)
            .flat_map(move |t| self.declared_indexes(t))
    }

    /// Finds the index visible on `entity_type` whose sequence is exactly
    /// `properties`.
    pub fn find_index(&self, entity_type: EntityTypeId, properties: &[PropertyId]) -> Option<&Index> {
        self.indexes(entity_type).find(|i| i.properties == properties)
    }

    /// Foreign keys visible on `entity_type` whose dependent sequence is
    /// exactly `properties`.
    pub fn find_foreign_keys<'a>(
        &'a self,
        entity_type: EntityTypeId,
        properties: &'a [PropertyId],
    ) -> impl Iterator<Item = &'a ForeignKey> + 'a {
        self.foreign_keys(entity_type)
            .filter(move |fk| fk.properties == properties)
    }

    // ── Rendering ────────────────────────────────────────────────

    /// Resolves property ids to names. Unknown ids are skipped.
    pub fn property_names(&self, properties: &[PropertyId]) -> Vec<&str> {
        properties
            .iter()
            .filter_map(move |p| self.properties.get(p))
            .map(|p| p.name.as_str())
            .collect()
    }

    /// Renders a property sequence as `{A, B}`.
    pub fn format_properties(&self, properties: &[PropertyId]) -> String {
        format!("{{{}}}", self.property_names(properties).join(", "))
    }

    /// Human-readable rendering of the whole model, one entity type per block.
    pub fn debug_view(&self) -> String {
        let mut out = String::new();
        for entity_type in self.entity_types.values() {
            let _ = write!(out, "EntityType: {}", entity_type.name);
            if let Some(base) = entity_type.base_type.and_then(|b| self.entity_types.get(&b)) {
                let _ = write!(out, " Base: {}", base.name);
            }
            out.push('\n');

            if !entity_type.properties.is_empty() {
                out.push_str("  Properties:\n");
                for property in self.declared_properties(entity_type.id) {
                    let _ = write!(out, "    {}", property.name);
                    for (strategy, annotation) in &property.annotations {
                        let _ = write!(
                            out,
                            " {strategy}='{}' [{}]",
                            annotation.value, annotation.source
                        );
                    }
                    out.push('\n');
                }
            }
            if !entity_type.keys.is_empty() {
                out.push_str("  Keys:\n");
                for key in self.declared_keys(entity_type.id) {
                    let _ = writeln!(
                        out,
                        "    {} [{}]",
                        self.format_properties(&key.properties),
                        key.source
                    );
                }
            }
            if !entity_type.foreign_keys.is_empty() {
                out.push_str("  ForeignKeys:\n");
                for fk in self.declared_foreign_keys(entity_type.id) {
                    let principal = self
                        .entity_types
                        .get(&fk.principal_type)
                        .map_or("?", |e| e.name.as_str());
                    let principal_key = self
                        .keys
                        .get(&fk.principal_key)
                        .map(|k| self.format_properties(&k.properties))
                        .unwrap_or_default();
                    let _ = writeln!(
                        out,
                        "    {} -> {} {}{} [{}]",
                        self.format_properties(&fk.properties),
                        principal,
                        principal_key,
                        if fk.unique { " Unique" } else { "" },
                        fk.source
                    );
                }
            }
            if !entity_type.indexes.is_empty() {
                out.push_str("  Indexes:\n");
                for index in self.declared_indexes(entity_type.id) {
                    let _ = writeln!(
                        out,
                        "    {}{} [{}]",
                        self.format_properties(&index.properties),
                        if index.unique { " Unique" } else { "" },
                        index.source
                    );
                }
            }
        }
        out
    }
}
