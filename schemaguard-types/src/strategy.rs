use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the three ways a column value can be generated by the store.
///
/// At most one may be configured on a property at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStrategy {
    /// A fixed default value.
    DefaultValue,
    /// A default value computed by a SQL expression on insert.
    DefaultValueSql,
    /// A computed column defined by a SQL expression.
    ComputedColumnSql,
}

impl GenerationStrategy {
    /// All strategies, in canonical order.
    pub const ALL: [Self; 3] = [
        Self::DefaultValue,
        Self::DefaultValueSql,
        Self::ComputedColumnSql,
    ];

    /// Returns the two strategies that compete with `self`.
    pub fn competitors(self) -> impl Iterator<Item = Self> {
        Self::ALL.into_iter().filter(move |s| *s != self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DefaultValue => "default_value",
            Self::DefaultValueSql => "default_value_sql",
            Self::ComputedColumnSql => "computed_column_sql",
        }
    }
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStrategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == s)
            .ok_or_else(|| Error::UnknownStrategy(s.to_string()))
    }
}
