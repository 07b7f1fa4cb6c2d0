//! Account master key type.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::error::{AuthError, Error};

/// The decoded account master key.
///
/// The key is supplied base64-encoded and decoded once at construction.
///
/// # Security
///
/// - Never logged or displayed in Debug output
/// - Only the [`Signer`](super::Signer) reads the key bytes
#[derive(Clone)]
pub struct MasterKey(Vec<u8>);

impl MasterKey {
    /// Decode a base64-encoded master key.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if the key is blank or not
    /// valid base64.
    pub fn from_base64(encoded: impl AsRef<str>) -> Result<Self, Error> {
        let encoded = encoded.as_ref().trim();
        if encoded.is_empty() {
            return Err(AuthError::InvalidCredentials("master key is empty".to_string()).into());
        }

        // Never echo the key itself in the error.
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|e| AuthError::InvalidCredentials(format!("master key is not base64: {e}")))?;

        if bytes.is_empty() {
            return Err(AuthError::InvalidCredentials("master key is empty".to_string()).into());
        }

        Ok(Self(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MasterKey").field(&"[REDACTED]").finish()
    }
}
