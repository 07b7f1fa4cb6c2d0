//! Service endpoint type.

use std::fmt;
use url::Url;

use super::ResourceId;
use crate::error::{Error, InvalidInputError};

/// A validated document database account endpoint.
///
/// Endpoints must use HTTPS. Plain HTTP is accepted only for loopback hosts,
/// which is what the local emulator and mock servers listen on.
///
/// Resource URLs are always built from resolved resource ids, never from
/// logical names.
///
/// # Example
///
/// ```
/// use docdb_core::{Endpoint, ResourceId};
///
/// let endpoint = Endpoint::new("https://myaccount.documents.azure.com:443/").unwrap();
/// assert_eq!(endpoint.databases_url(), "https://myaccount.documents.azure.com/dbs");
///
/// let db = ResourceId::new("Abc123==");
/// assert_eq!(
///     endpoint.collections_url(&db),
///     "https://myaccount.documents.azure.com/dbs/Abc123==/colls"
/// );
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Endpoint(Url);

impl Endpoint {
    /// Create a new endpoint from a string, validating the format.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is blank, not absolute, or not HTTPS.
    pub fn new(s: impl AsRef<str>) -> Result<Self, Error> {
        let s = s.as_ref().trim();
        if s.is_empty() {
            return Err(InvalidInputError::Endpoint {
                value: s.to_string(),
                reason: "cannot be empty".to_string(),
            }
            .into());
        }

        let url = Url::parse(s).map_err(|e| InvalidInputError::Endpoint {
            value: s.to_string(),
            reason: e.to_string(),
        })?;

        Self::validate(&url, s)?;

        Ok(Self(url))
    }

    /// Returns `{endpoint}/dbs`.
    pub fn databases_url(&self) -> String {
        format!("{}/dbs", self.base())
    }

    /// Returns `{endpoint}/dbs/{db}/colls`.
    pub fn collections_url(&self, db: &ResourceId) -> String {
        format!("{}/dbs/{}/colls", self.base(), db)
    }

    /// Returns `{endpoint}/dbs/{db}/colls/{coll}/docs`.
    pub fn documents_url(&self, db: &ResourceId, coll: &ResourceId) -> String {
        format!("{}/dbs/{}/colls/{}/docs", self.base(), db, coll)
    }

    /// Returns `{endpoint}/dbs/{db}/colls/{coll}/docs/{doc}`.
    pub fn document_url(&self, db: &ResourceId, coll: &ResourceId, doc: &ResourceId) -> String {
        format!("{}/dbs/{}/colls/{}/docs/{}", self.base(), db, coll, doc)
    }

    /// Returns the base URL as a string.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Returns the host string.
    pub fn host(&self) -> Option<&str> {
        self.0.host_str()
    }

    // The URL crate always keeps a trailing slash on root paths.
    fn base(&self) -> &str {
        self.0.as_str().trim_end_matches('/')
    }

    fn validate(url: &Url, original: &str) -> Result<(), Error> {
        if url.cannot_be_a_base() {
            return Err(InvalidInputError::Endpoint {
                value: original.to_string(),
                reason: "must be an absolute URL".to_string(),
            }
            .into());
        }

        let is_loopback = url
            .host_str()
            .is_some_and(|h| h == "localhost" || h == "127.0.0.1" || h == "[::1]");

        let scheme = url.scheme();
        if scheme != "https" && !(scheme == "http" && is_loopback) {
            return Err(InvalidInputError::Endpoint {
                value: original.to_string(),
                reason: "must use HTTPS (HTTP allowed only for localhost)".to_string(),
            }
            .into());
        }

        if url.host_str().is_none() {
            return Err(InvalidInputError::Endpoint {
                value: original.to_string(),
                reason: "must have a host".to_string(),
            }
            .into());
        }

        if url.query().is_some() || url.fragment().is_some() {
            return Err(InvalidInputError::Endpoint {
                value: original.to_string(),
                reason: "must not carry a query or fragment".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
