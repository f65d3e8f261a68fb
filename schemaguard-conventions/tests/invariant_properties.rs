use proptest::prelude::*;
use schemaguard_conventions::ModelBuilder;
use schemaguard_conventions::invariants::{duplicate_index_sequences, uncovered_foreign_keys};
use schemaguard_types::{ConfigurationSource, EntityTypeId, KeyId, PropertyId};

const CONVENTION: ConfigurationSource = ConfigurationSource::Convention;
const ANNOTATION: ConfigurationSource = ConfigurationSource::DataAnnotation;
const EXPLICIT: ConfigurationSource = ConfigurationSource::Explicit;

/// One user-level change. Selectors are reduced modulo whatever exists.
#[derive(Debug, Clone)]
enum Op {
    AddForeignKey { entity: u8, props: Vec<u8>, unique: bool },
    RemoveForeignKey(u8),
    SetForeignKeyUnique(u8, bool),
    SetForeignKeyProperties(u8, Vec<u8>),
    AddKey { entity: u8, props: Vec<u8> },
    RemoveKey(u8),
    AddIndex { entity: u8, props: Vec<u8>, unique: bool },
    RemoveIndex(u8),
    SetIndexUnique(u8, bool),
    ToggleDerivedBase,
    ReparentLeaf(u8),
}

fn props() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=3)
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (any::<u8>(), props(), any::<bool>())
            .prop_map(|(entity, props, unique)| Op::AddForeignKey { entity, props, unique }),
        1 => any::<u8>().prop_map(Op::RemoveForeignKey),
        2 => (any::<u8>(), any::<bool>()).prop_map(|(n, u)| Op::SetForeignKeyUnique(n, u)),
        1 => (any::<u8>(), props()).prop_map(|(n, p)| Op::SetForeignKeyProperties(n, p)),
        2 => (any::<u8>(), props()).prop_map(|(entity, props)| Op::AddKey { entity, props }),
        1 => any::<u8>().prop_map(Op::RemoveKey),
        2 => (any::<u8>(), props(), any::<bool>())
            .prop_map(|(entity, props, unique)| Op::AddIndex { entity, props, unique }),
        1 => any::<u8>().prop_map(Op::RemoveIndex),
        2 => (any::<u8>(), any::<bool>()).prop_map(|(n, u)| Op::SetIndexUnique(n, u)),
        1 => Just(Op::ToggleDerivedBase),
        1 => any::<u8>().prop_map(Op::ReparentLeaf),
    ]
}

/// Principal { Id, Code, Rank } keyed by {Id}, {Id, Code} and {Id, Code, Rank};
/// Base { P0, P1 } ← Derived { P2 } ← Leaf { P5 }; Other { P3, P4 }.
struct World {
    builder: ModelBuilder,
    base: EntityTypeId,
    derived: EntityTypeId,
    leaf: EntityTypeId,
    dependents: [EntityTypeId; 4],
    principal_keys: [KeyId; 3],
}

fn world() -> World {
    let mut builder = ModelBuilder::new();
    let principal = builder.add_entity_type("Principal").unwrap();
    let id = builder.add_property(principal, "Id").unwrap();
    let code = builder.add_property(principal, "Code").unwrap();
    let rank = builder.add_property(principal, "Rank").unwrap();
    let single = builder.add_key(principal, &[id], EXPLICIT).unwrap();
    let pair = builder.add_key(principal, &[id, code], EXPLICIT).unwrap();
    let triple = builder.add_key(principal, &[id, code, rank], EXPLICIT).unwrap();

    let base = builder.add_entity_type("Base").unwrap();
    builder.add_property(base, "P0").unwrap();
    builder.add_property(base, "P1").unwrap();
    let derived = builder.add_entity_type("Derived").unwrap();
    builder.add_property(derived, "P2").unwrap();
    builder.set_base_type(derived, Some(base)).unwrap();
    let other = builder.add_entity_type("Other").unwrap();
    builder.add_property(other, "P3").unwrap();
    builder.add_property(other, "P4").unwrap();
    let leaf = builder.add_entity_type("Leaf").unwrap();
    builder.add_property(leaf, "P5").unwrap();
    builder.set_base_type(leaf, Some(derived)).unwrap();

    World {
        builder,
        base,
        derived,
        leaf,
        dependents: [base, derived, leaf, other],
        principal_keys: [single, pair, triple],
    }
}

impl World {
    fn entity(&self, selector: u8) -> EntityTypeId {
        self.dependents[selector as usize % self.dependents.len()]
    }

    /// Picks distinct properties visible on `entity`.
    fn pick(&self, entity: EntityTypeId, selectors: &[u8]) -> Vec<PropertyId> {
        let visible: Vec<PropertyId> = self.builder.model().properties(entity).map(|p| p.id()).collect();
        let mut picked = Vec::new();
        for s in selectors {
            let candidate = visible[*s as usize % visible.len()];
            if !picked.contains(&candidate) {
                picked.push(candidate);
            }
        }
        picked
    }

    fn nth<T: Copy>(items: &[T], selector: u8) -> Option<T> {
        if items.is_empty() {
            None
        } else {
            Some(items[selector as usize % items.len()])
        }
    }

    fn apply(&mut self, op: &Op) {
        let model = self.builder.model();
        let fks: Vec<_> = model.all_foreign_keys().map(|fk| fk.id()).collect();
        let dependent_keys: Vec<_> = self
            .dependents
            .iter()
            .flat_map(|t| model.declared_keys(*t))
            .map(|k| k.id())
            .collect();
        let indexes: Vec<_> = model.all_indexes().map(|i| i.id()).collect();

        // Model-level rejections (arity, visibility, reparenting) are fine;
        // only the invariants afterwards matter.
        match op {
            Op::AddForeignKey {
                entity,
                props,
                unique,
            } => {
                let entity = self.entity(*entity);
                let props = self.pick(entity, props);
                let key = self.principal_keys[props.len() - 1];
                let _ = self
                    .builder
                    .add_foreign_key(entity, &props, key, *unique, CONVENTION);
            }
            Op::RemoveForeignKey(n) => {
                if let Some(fk) = Self::nth(&fks, *n) {
                    let _ = self.builder.remove_foreign_key(fk, ANNOTATION);
                }
            }
            Op::SetForeignKeyUnique(n, unique) => {
                if let Some(fk) = Self::nth(&fks, *n) {
                    let _ = self.builder.set_foreign_key_unique(fk, *unique);
                }
            }
            Op::SetForeignKeyProperties(n, props) => {
                if let Some(fk) = Self::nth(&fks, *n) {
                    let entity = self.builder.model().foreign_key(fk).map(|fk| fk.declaring_type());
                    if let Some(entity) = entity {
                        let props = self.pick(entity, props);
                        let _ = self.builder.set_foreign_key_properties(fk, &props);
                    }
                }
            }
            Op::AddKey { entity, props } => {
                let entity = self.entity(*entity);
                let props = self.pick(entity, props);
                let _ = self.builder.add_key(entity, &props, ANNOTATION);
            }
            Op::RemoveKey(n) => {
                if let Some(key) = Self::nth(&dependent_keys, *n) {
                    let _ = self.builder.remove_key(key, ANNOTATION);
                }
            }
            Op::AddIndex {
                entity,
                props,
                unique,
            } => {
                let entity = self.entity(*entity);
                let props = self.pick(entity, props);
                if let Ok(index) = self.builder.add_index(entity, &props, EXPLICIT) {
                    if *unique {
                        let _ = self.builder.set_index_unique(index, true, EXPLICIT);
                    }
                }
            }
            Op::RemoveIndex(n) => {
                if let Some(index) = Self::nth(&indexes, *n) {
                    let _ = self.builder.remove_index(index, ANNOTATION);
                }
            }
            Op::SetIndexUnique(n, unique) => {
                if let Some(index) = Self::nth(&indexes, *n) {
                    let _ = self.builder.set_index_unique(index, *unique, CONVENTION);
                }
            }
            Op::ToggleDerivedBase => {
                let next = match self.builder.model().base_type(self.derived) {
                    Some(_) => None,
                    None => Some(self.base),
                };
                let _ = self.builder.set_base_type(self.derived, next);
            }
            Op::ReparentLeaf(n) => {
                let next = [None, Some(self.base), Some(self.derived)][*n as usize % 3];
                let _ = self.builder.set_base_type(self.leaf, next);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn every_foreign_key_stays_covered(ops in prop::collection::vec(op(), 1..40)) {
        let mut world = world();
        for op in &ops {
            world.apply(op);
            let model = world.builder.model();
            prop_assert!(
                uncovered_foreign_keys(model).is_empty(),
                "after {:?}:\n{}",
                op,
                model.debug_view()
            );
            prop_assert!(duplicate_index_sequences(model).is_empty());
        }
    }
}
