//! Client configuration.

use tracing::debug;

use crate::auth::MasterKey;
use crate::error::{Error, InvalidInputError};
use crate::retry::RetryPolicy;
use crate::traits::ConfigProvider;
use crate::types::{Endpoint, ResourceName};

/// Setting holding the account endpoint URL.
pub const ENDPOINT_SETTING: &str = "docdb.EndpointUrl";

/// Setting holding the base64 master key.
pub const KEY_SETTING: &str = "docdb.PrimaryAuthorizationKey";

/// Setting holding the database name.
pub const DATABASE_SETTING: &str = "docdb.DatabaseId";

/// Setting holding the collection name.
pub const COLLECTION_SETTING: &str = "docdb.DocumentCollectionId";

/// Everything a client needs, validated up front.
#[derive(Debug, Clone)]
pub struct DocDbConfig {
    /// Account endpoint.
    pub endpoint: Endpoint,
    /// Account master key.
    pub master_key: MasterKey,
    /// Logical database name.
    pub database: ResourceName,
    /// Logical collection name.
    pub collection: ResourceName,
    /// Retry policy applied to every request.
    pub retry: RetryPolicy,
}

impl DocDbConfig {
    /// Create a configuration with the default retry policy.
    pub fn new(
        endpoint: Endpoint,
        master_key: MasterKey,
        database: ResourceName,
        collection: ResourceName,
    ) -> Self {
        Self {
            endpoint,
            master_key,
            database,
            collection,
            retry: RetryPolicy::default(),
        }
    }

    /// Validate raw setting values.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank or malformed endpoint or name, and
    /// `Auth` for a malformed key.
    pub fn from_settings(
        endpoint: &str,
        master_key: &str,
        database: &str,
        collection: &str,
    ) -> Result<Self, Error> {
        Ok(Self::new(
            Endpoint::new(endpoint)?,
            MasterKey::from_base64(master_key)?,
            ResourceName::new(database)?,
            ResourceName::new(collection)?,
        ))
    }

    /// Read the four `docdb.*` settings from a provider.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a setting is missing or blank, plus any
    /// error from [`from_settings`](Self::from_settings).
    pub fn from_provider(provider: &dyn ConfigProvider) -> Result<Self, Error> {
        let endpoint = required(provider, ENDPOINT_SETTING)?;
        let key = required(provider, KEY_SETTING)?;
        let database = required(provider, DATABASE_SETTING)?;
        let collection = required(provider, COLLECTION_SETTING)?;

        let config = Self::from_settings(&endpoint, &key, &database, &collection)?;
        debug!(endpoint = %config.endpoint, database = %config.database, collection = %config.collection, "Loaded configuration");
        Ok(config)
    }

    /// Replace the retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn required(provider: &dyn ConfigProvider, name: &str) -> Result<String, Error> {
    provider
        .setting(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            InvalidInputError::MissingSetting {
                name: name.to_string(),
            }
            .into()
        })
}

/// Reads settings from environment variables.
///
/// A setting name maps to a variable by upper-casing it and replacing `.`
/// with `_`, so `docdb.EndpointUrl` is read from `DOCDB_ENDPOINTURL`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigProvider;

impl EnvConfigProvider {
    /// The environment variable backing a setting.
    pub fn variable_name(setting: &str) -> String {
        setting.replace('.', "_").to_uppercase()
    }
}

impl ConfigProvider for EnvConfigProvider {
    fn setting(&self, name: &str) -> Option<String> {
        std::env::var(Self::variable_name(name)).ok()
    }
}
