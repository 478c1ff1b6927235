//! Domain identifiers.
//!
//! Fragment ids are ULID-backed: 128-bit like a UUID, generated without
//! coordination, but with a timestamp prefix so ids sort by creation instant.
//! Owner ids are opaque strings resolved upstream (the HTTP layer hashes the
//! authenticated identity before it reaches this core); the only invariant we
//! hold is that they are never empty.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ulid::Ulid;

use super::errors::FragmentError;

/// Identifier of a stored fragment, unique within its owner's namespace.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FragmentId(Ulid);

impl FragmentId {
    /// Generate a fresh id for the given creation instant.
    ///
    /// The timestamp half comes from the caller's clock; the remaining 80
    /// bits are random, so ids collide with only negligible probability even
    /// across uncoordinated producers.
    pub fn generate(timestamp_ms: u64) -> Self {
        Self(Ulid::from_parts(timestamp_ms, rand::random()))
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for FragmentId {
    fn from(ulid: Ulid) -> Self {
        Self(ulid)
    }
}

impl fmt::Display for FragmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for FragmentId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Ulid::from_string(s)?))
    }
}

/// Opaque id of the principal that owns a set of fragments.
///
/// Construction rejects the empty string; every other shape is accepted
/// as-is, since this core never interprets the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(value: impl Into<String>) -> Result<Self, FragmentError> {
        let value = value.into();
        if value.is_empty() {
            return Err(FragmentError::InvalidArgument("ownerId is required"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for OwnerId {
    type Error = FragmentError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
