//! Internal implementation of the identifier types.

use crate::{UuidError, UuidResult};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// Prefix carried by every entity ID minted with [`EntityId::generate`].
pub const ENTITY_ID_PREFIX: &str = "uuid:";

/// Name stem for a stored content file (32 lowercase hex characters, no hyphens).
///
/// Tokens are only ever generated, never parsed from input, so a token is always safe to use
/// as a single path component.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContentToken(Uuid);

impl Default for ContentToken {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentToken {
    /// Generates a new random token (RFC 4122 version 4).
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Builds a content file name from this token and an extension.
    ///
    /// `extension` is appended verbatim, so callers pass it with its leading dot (or empty).
    pub fn file_name(&self, extension: &str) -> String {
        format!("{}{}", self, extension)
    }
}

impl fmt::Display for ContentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

/// External identifier of a stored entity.
///
/// Entity IDs are opaque to the store: any non-empty string (after trimming) is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
pub struct EntityId(String);

impl EntityId {
    /// Mints a fresh entity ID of the form `uuid:<hyphenated v4>`.
    pub fn generate() -> Self {
        Self(format!("{}{}", ENTITY_ID_PREFIX, Uuid::new_v4().hyphenated()))
    }

    /// Wraps a caller-supplied entity ID.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if the trimmed input is empty.
    pub fn parse(input: impl AsRef<str>) -> UuidResult<Self> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(UuidError::InvalidInput("entity ID cannot be empty".into()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for EntityId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EntityId::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = UuidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        EntityId::parse(value)
    }
}

impl From<EntityId> for String {
    fn from(value: EntityId) -> Self {
        value.0
    }
}
