//! Identifier types for schema model elements.
//!
//! All identifiers are allocated by the schema model from a single monotonic
//! counter, so an id is never reused within one model even after its element
//! is removed. Each kind gets its own newtype so a key id cannot be passed
//! where an index id is expected.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! model_id {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Creates an identifier from its raw value.
            #[must_use]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// Returns the raw value.
            #[must_use]
            pub const fn raw(&self) -> u32 {
                self.0
            }

            /// Parses an identifier from either `"label#N"` or a bare number.
            pub fn parse(s: &str) -> Result<Self, Error> {
                let digits = s
                    .strip_prefix(concat!($label, "#"))
                    .unwrap_or(s);
                digits
                    .parse::<u32>()
                    .map(Self)
                    .map_err(|_| Error::InvalidId(s.to_string()))
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }

        impl FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

model_id!(
    /// Identifier of an entity type (a node in the inheritance tree).
    EntityTypeId,
    "entity"
);

model_id!(
    /// Identifier of a property declared on an entity type.
    PropertyId,
    "property"
);

model_id!(
    /// Identifier of a key (always unique).
    KeyId,
    "key"
);

model_id!(
    /// Identifier of a foreign key.
    ForeignKeyId,
    "fk"
);

model_id!(
    /// Identifier of an index.
    IndexId,
    "index"
);
