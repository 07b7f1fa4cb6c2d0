//! Master-key request signing.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::form_urlencoded;

use super::MasterKey;
use crate::error::{AuthError, Error};
use crate::types::{ResourceId, ResourceType, Verb};

type HmacSha256 = Hmac<Sha256>;

/// RFC 1123 date format, always expressed in GMT.
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// The date of a single request, in RFC 1123 format.
///
/// The same value must be sent as the `x-ms-date` header and fed to the
/// signer, otherwise the service rejects the request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestDate(String);

impl RequestDate {
    /// The current UTC time.
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// A fixed UTC time.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(HTTP_DATE_FORMAT).to_string())
    }

    /// Returns the header value, e.g. `Wed, 08 Apr 2015 03:52:31 GMT`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A percent-encoded `type=master&ver=1.0&sig=...` header value.
///
/// # Security
///
/// Never logged or displayed in Debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthorizationToken(String);

impl AuthorizationToken {
    /// Returns the header value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthorizationToken")
            .field(&"[REDACTED]")
            .finish()
    }
}

/// Produces per-request authorization tokens from the account master key.
///
/// # Example
///
/// ```
/// use docdb_core::{MasterKey, RequestDate, ResourceId, ResourceType, Signer, Verb};
///
/// let signer = Signer::new(MasterKey::from_base64("c2VjcmV0LWtleQ==").unwrap()).unwrap();
/// let date = RequestDate::now();
/// let token = signer.sign(Verb::Post, ResourceType::Databases, &ResourceId::root(), &date);
/// assert!(token.as_str().starts_with("type%3Dmaster%26ver%3D1.0%26sig%3D"));
/// ```
#[derive(Clone)]
pub struct Signer {
    mac: HmacSha256,
}

impl Signer {
    /// Create a signer for the given key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the key cannot seed an HMAC.
    pub fn new(key: MasterKey) -> Result<Self, Error> {
        let mac = HmacSha256::new_from_slice(key.as_bytes())
            .map_err(|e| AuthError::InvalidCredentials(e.to_string()))?;
        Ok(Self { mac })
    }

    /// Sign a request.
    ///
    /// `resource_id` is the id of the addressed resource, or of the parent
    /// scope when creating or querying children (empty for databases).
    pub fn sign(
        &self,
        verb: Verb,
        resource_type: ResourceType,
        resource_id: &ResourceId,
        date: &RequestDate,
    ) -> AuthorizationToken {
        let payload = canonical_string(verb, resource_type, resource_id, date);

        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let raw = format!("type=master&ver=1.0&sig={}", signature);
        AuthorizationToken(form_urlencoded::byte_serialize(raw.as_bytes()).collect())
    }
}

impl fmt::Debug for Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signer").field("key", &"[REDACTED]").finish()
    }
}

/// Builds the newline-joined, lower-cased string that gets hashed.
///
/// The trailing empty line is part of the protocol.
pub(crate) fn canonical_string(
    verb: Verb,
    resource_type: ResourceType,
    resource_id: &ResourceId,
    date: &RequestDate,
) -> String {
    format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.as_str().to_lowercase(),
        resource_type.as_str().to_lowercase(),
        resource_id.as_str().to_lowercase(),
        date.as_str().to_lowercase()
    )
}
