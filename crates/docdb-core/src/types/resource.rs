//! Resource addressing types.

use std::fmt;

use crate::error::{Error, InvalidInputError};

/// The category of an addressed resource.
///
/// Used both for path construction and as the second line of the canonical
/// signing string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceType {
    /// Database container (`dbs`).
    Databases,
    /// Collection container (`colls`).
    Collections,
    /// Document container (`docs`).
    Documents,
}

impl ResourceType {
    /// Returns the wire segment for this resource type.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Databases => "dbs",
            ResourceType::Collections => "colls",
            ResourceType::Documents => "docs",
        }
    }

    /// Returns the response body field holding query results of this type.
    pub fn result_field(&self) -> &'static str {
        match self {
            ResourceType::Databases => "Databases",
            ResourceType::Collections => "DocumentCollections",
            ResourceType::Documents => "Documents",
        }
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceType::Databases => "database",
            ResourceType::Collections => "collection",
            ResourceType::Documents => "document",
        };
        f.write_str(name)
    }
}

/// HTTP verbs used by the protocol.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Verb {
    Post,
    Put,
    Delete,
}

impl Verb {
    /// Returns the upper-case method name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque server-assigned resource identifier (`_rid`).
///
/// The empty id addresses the account root and is used when signing
/// database-level requests.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ResourceId(String);

impl ResourceId {
    /// Wrap a server-assigned id.
    pub fn new(rid: impl Into<String>) -> Self {
        Self(rid.into())
    }

    /// The empty id of the account root.
    pub fn root() -> Self {
        Self(String::new())
    }

    /// Returns the id string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for the account root id.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A caller-chosen logical name for a database or collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceName(String);

impl ResourceName {
    /// Create a new resource name.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is blank or contains a path separator.
    pub fn new(s: impl Into<String>) -> Result<Self, Error> {
        let s = s.into();
        Self::validate(&s)?;
        Ok(Self(s))
    }

    /// Returns the name string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<(), Error> {
        if s.trim().is_empty() {
            return Err(InvalidInputError::ResourceName {
                value: s.to_string(),
                reason: "cannot be empty".to_string(),
            }
            .into());
        }

        if let Some(c) = s.chars().find(|c| matches!(c, '/' | '\\' | '?' | '#')) {
            return Err(InvalidInputError::ResourceName {
                value: s.to_string(),
                reason: format!("contains invalid character '{}'", c),
            }
            .into());
        }

        Ok(())
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An opaque cursor returned by the service when more result pages remain.
///
/// Forwarded verbatim on the next request; never inspected or modified.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ContinuationToken(String);

impl ContinuationToken {
    /// Wrap a token, returning `None` for an empty string.
    pub fn new(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        if token.is_empty() { None } else { Some(Self(token)) }
    }

    /// Returns the raw token.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
