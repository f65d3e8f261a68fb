use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where a piece of configuration came from.
///
/// Variants are ordered by priority: a convention-derived setting yields to a
/// data annotation, which yields to explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigurationSource {
    /// Derived by a convention.
    Convention,
    /// Declared through an attribute/annotation on the mapped type.
    DataAnnotation,
    /// Configured explicitly by the user.
    Explicit,
}

impl ConfigurationSource {
    /// Returns true if a write from `self` may replace a value set by `existing`.
    ///
    /// Equal priority overrides; an unset value is always overridable.
    #[must_use]
    pub fn overrides(self, existing: Option<Self>) -> bool {
        existing.is_none_or(|existing| self >= existing)
    }

    /// Returns true if `self` has strictly higher priority than `existing`.
    #[must_use]
    pub fn outranks(self, existing: Option<Self>) -> bool {
        existing.is_none_or(|existing| self > existing)
    }

    /// Returns the higher-priority of `self` and `other`.
    #[must_use]
    pub fn max_with(self, other: Option<Self>) -> Self {
        match other {
            Some(other) if other > self => other,
            _ => self,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Convention => "convention",
            Self::DataAnnotation => "data_annotation",
            Self::Explicit => "explicit",
        }
    }
}

impl fmt::Display for ConfigurationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigurationSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "convention" => Ok(Self::Convention),
            "data_annotation" => Ok(Self::DataAnnotation),
            "explicit" => Ok(Self::Explicit),
            _ => Err(Error::UnknownSource(s.to_string())),
        }
    }
}
