//! The covering predicate.
//!
//! A candidate property sequence covers a target when a database index over
//! the candidate already serves lookups over the target:
//!
//! - a non-unique target is covered by any candidate that starts with it;
//! - a unique target is covered only by a unique candidate with exactly the
//!   same sequence.
//!
//! Sequences are compared by property name, so a derived type's index and a
//! base type's key over the same columns compare equal.

use schemaguard_model::SchemaModel;
use schemaguard_types::PropertyId;

/// Returns true if `candidate` covers `target`.
pub fn covers<T: PartialEq>(
    target: &[T],
    target_unique: bool,
    candidate: &[T],
    candidate_unique: bool,
) -> bool {
    if target_unique {
        candidate_unique && candidate == target
    } else {
        candidate.starts_with(target)
    }
}

/// [`covers`] over property ids, compared by their names in `model`.
pub fn properties_covered(
    model: &SchemaModel,
    target: &[PropertyId],
    target_unique: bool,
    candidate: &[PropertyId],
    candidate_unique: bool,
) -> bool {
    covers(
        &model.property_names(target),
        target_unique,
        &model.property_names(candidate),
        candidate_unique,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_unique_target_is_covered_by_prefix() {
        assert!(covers(&["A"], false, &["A", "B"], false));
        assert!(covers(&["A", "B"], false, &["A", "B"], true));
        assert!(!covers(&["B"], false, &["A", "B"], false));
        assert!(!covers(&["A", "B"], false, &["A"], true));
    }

    #[test]
    fn unique_target_needs_unique_exact_match() {
        assert!(covers(&["A"], true, &["A"], true));
        assert!(!covers(&["A"], true, &["A"], false));
        assert!(!covers(&["A"], true, &["A", "B"], true));
    }

    #[test]
    fn order_matters() {
        assert!(!covers(&["A", "B"], false, &["B", "A"], false));
    }
}
