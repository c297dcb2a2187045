//! Typed identifiers used by the service.
//!
//! IDs use the platform's prefixed ULID format: `{prefix}_{ulid}`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use ulid::Ulid;

/// Errors that can occur when parsing an ID.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("ID cannot be empty")]
    Empty,

    #[error("ID missing underscore separator")]
    MissingSeparator,

    #[error("invalid ID prefix: expected '{expected}', got '{actual}'")]
    InvalidPrefix {
        expected: &'static str,
        actual: String,
    },

    #[error("invalid ULID: {0}")]
    InvalidUlid(String),
}

/// Identifier of one physical equipment instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InstanceId(Ulid);

impl InstanceId {
    pub const PREFIX: &'static str = "eqi";

    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    pub fn parse(s: &str) -> Result<Self, IdError> {
        if s.is_empty() {
            return Err(IdError::Empty);
        }

        let Some((prefix, ulid_str)) = s.split_once('_') else {
            return Err(IdError::MissingSeparator);
        };

        if prefix != Self::PREFIX {
            return Err(IdError::InvalidPrefix {
                expected: Self::PREFIX,
                actual: prefix.to_string(),
            });
        }

        ulid_str
            .parse::<Ulid>()
            .map(Self)
            .map_err(|e| IdError::InvalidUlid(e.to_string()))
    }
}

impl Default for InstanceId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for InstanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", Self::PREFIX, self.0)
    }
}

impl std::str::FromStr for InstanceId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for InstanceId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for InstanceId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Correlation ID attached to API error responses.
pub fn new_request_id() -> String {
    format!("req_{}", Ulid::new())
}
