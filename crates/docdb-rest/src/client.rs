//! The document database client.

use std::sync::Arc;

use tracing::{debug, info, instrument};

use docdb_core::error::{InvalidInputError, PreconditionError};
use docdb_core::{
    ContinuationToken, DocDbConfig, Document, Error, QueryParameters, QueryResult, ResourceId,
    ResourceName, ResourceType, Result, Signer, Transport, Verb,
};

use crate::pager::QueryPages;
use crate::resolver::{self, ResolutionState, ResourceCell};
use crate::rest::client::{RestClient, Target};
use crate::transport::ReqwestTransport;

/// Client for one collection of one database.
///
/// The database and collection are addressed by logical name in the
/// configuration and resolved to server resource ids by
/// [`initialize`](Self::initialize). Query and document operations fail with
/// [`Error::NotInitialized`] until that has happened.
///
/// Cloning is cheap; clones share resolved ids and the connection pool.
///
/// # Example
///
/// ```no_run
/// use docdb_core::{DocDbConfig, Document, QueryParameters};
/// use docdb_rest::DocDbClient;
/// use serde_json::json;
///
/// # async fn example() -> Result<(), docdb_core::Error> {
/// let config = DocDbConfig::from_settings(
///     "https://myaccount.documents.azure.com",
///     "c2VjcmV0LWtleQ==",
///     "iot-db",
///     "devices",
/// )?;
/// let client = DocDbClient::new(config)?;
/// client.initialize().await?;
///
/// let created = client
///     .create_document(Document::new(json!({"type": "sensor"}))?)
///     .await?;
///
/// let params = QueryParameters::new().with("@t", "sensor")?;
/// let page = client
///     .query("SELECT * FROM docs d WHERE d.type = @t", &params, Some(50), None)
///     .await?;
/// println!("{} documents", page.documents.len());
///
/// client.delete_document(&created).await?;
/// # Ok(())
/// # }
/// ```
pub struct DocDbClient<T: Transport = ReqwestTransport> {
    inner: Arc<ClientInner<T>>,
}

struct ClientInner<T> {
    rest: RestClient<T>,
    database_name: ResourceName,
    collection_name: ResourceName,
    database: ResourceCell,
    collection: ResourceCell,
}

impl DocDbClient<ReqwestTransport> {
    /// Create a client that talks HTTPS through reqwest.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key cannot seed the signer or the HTTP
    /// client cannot be built.
    pub fn new(config: DocDbConfig) -> Result<Self> {
        let transport = ReqwestTransport::new().map_err(|e| InvalidInputError::Other {
            message: format!("cannot build HTTP client: {}", e),
        })?;
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> DocDbClient<T> {
    /// Create a client over a custom transport.
    ///
    /// # Errors
    ///
    /// Returns an error if the master key cannot seed the signer.
    pub fn with_transport(config: DocDbConfig, transport: T) -> Result<Self> {
        let signer = Signer::new(config.master_key)?;
        let rest = RestClient::new(config.endpoint, signer, transport, config.retry);

        Ok(Self {
            inner: Arc::new(ClientInner {
                rest,
                database_name: config.database,
                collection_name: config.collection,
                database: ResourceCell::new(),
                collection: ResourceCell::new(),
            }),
        })
    }

    /// Resolve (or create) the database and then the collection.
    #[instrument(skip(self), fields(database = %self.inner.database_name, collection = %self.inner.collection_name))]
    pub async fn initialize(&self) -> Result<()> {
        let collection = self.resolve_collection().await?;
        info!(%collection, "Client initialized");
        Ok(())
    }

    /// Resolve the database id, creating the database if it does not exist.
    ///
    /// Returns immediately once resolved.
    pub async fn resolve_database(&self) -> Result<ResourceId> {
        let inner = &self.inner;
        inner
            .database
            .get_or_resolve(move || async move {
                resolver::resolve_or_create(
                    &inner.rest,
                    ResourceType::Databases,
                    &ResourceId::root(),
                    &inner.database_name,
                )
                .await
            })
            .await
    }

    /// Resolve the collection id, creating the collection if it does not
    /// exist. Resolves the database first.
    pub async fn resolve_collection(&self) -> Result<ResourceId> {
        let database = self.resolve_database().await?;
        let inner = &self.inner;
        inner
            .collection
            .get_or_resolve(move || async move {
                resolver::resolve_or_create(
                    &inner.rest,
                    ResourceType::Collections,
                    &database,
                    &inner.collection_name,
                )
                .await
            })
            .await
    }

    /// The resolved database id, if resolution has completed.
    pub fn database_id(&self) -> Option<ResourceId> {
        self.inner.database.get().cloned()
    }

    /// The resolved collection id, if resolution has completed.
    pub fn collection_id(&self) -> Option<ResourceId> {
        self.inner.collection.get().cloned()
    }

    /// Where database resolution stands.
    pub fn database_state(&self) -> ResolutionState {
        self.inner.database.state()
    }

    /// Where collection resolution stands.
    pub fn collection_state(&self) -> ResolutionState {
        self.inner.collection.state()
    }

    /// Run one page of a query against the collection's documents.
    ///
    /// Pass the previous page's continuation token to fetch the next page;
    /// `page_size` caps the number of documents per page.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a blank query and `NotInitialized` if the
    /// collection has not been resolved.
    #[instrument(skip(self, parameters), fields(collection = %self.inner.collection_name))]
    pub async fn query(
        &self,
        query: &str,
        parameters: &QueryParameters,
        page_size: Option<u32>,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryResult> {
        docdb_core::document::validate_query(query)?;
        let (database, collection) = self.resolved_ids()?;

        let target = Target::new(
            Verb::Post,
            ResourceType::Documents,
            collection.clone(),
            self.inner.rest.endpoint().documents_url(&database, &collection),
        );

        self.inner
            .rest
            .query(
                &target,
                ResourceType::Documents.result_field(),
                query,
                parameters,
                page_size,
                continuation,
            )
            .await
    }

    /// Stream every page of a query, following continuation tokens.
    ///
    /// The stream ends after the terminal page or the first error.
    pub fn query_pages(
        &self,
        query: impl Into<String>,
        parameters: QueryParameters,
        page_size: Option<u32>,
    ) -> QueryPages
    where
        T: 'static,
    {
        QueryPages::new(self.clone(), query.into(), parameters, page_size)
    }

    /// Store a new document, assigning a UUID `id` if it has none.
    ///
    /// Returns the stored document including server metadata such as `_rid`.
    /// Not idempotent: each call without an `id` creates a new document.
    #[instrument(skip(self, document), fields(collection = %self.inner.collection_name))]
    pub async fn create_document(&self, mut document: Document) -> Result<Document> {
        let id = document.ensure_id()?.to_string();
        let (database, collection) = self.resolved_ids()?;
        debug!(%id, "Creating document");

        let target = Target::new(
            Verb::Post,
            ResourceType::Documents,
            collection.clone(),
            self.inner.rest.endpoint().documents_url(&database, &collection),
        );

        self.inner.rest.send_json(&target, &document).await
    }

    /// Replace a stored document.
    ///
    /// # Errors
    ///
    /// Fails with `Precondition` before any request if the document has no
    /// `_rid`.
    #[instrument(skip(self, document), fields(collection = %self.inner.collection_name))]
    pub async fn update_document(&self, document: &Document) -> Result<Document> {
        let target = self.document_target(Verb::Put, document, "updated")?;
        debug!(rid = %target.resource_id, "Updating document");

        self.inner.rest.send_json(&target, document).await
    }

    /// Delete a stored document. Success carries no body.
    ///
    /// # Errors
    ///
    /// Fails with `Precondition` before any request if the document has no
    /// `_rid`.
    #[instrument(skip(self, document), fields(collection = %self.inner.collection_name))]
    pub async fn delete_document(&self, document: &Document) -> Result<()> {
        let target = self.document_target(Verb::Delete, document, "deleted")?;
        debug!(rid = %target.resource_id, "Deleting document");

        self.inner.rest.send_empty(&target).await
    }

    fn document_target(
        &self,
        verb: Verb,
        document: &Document,
        operation: &'static str,
    ) -> Result<Target> {
        let rid = document
            .resource_id()
            .ok_or(PreconditionError::MissingResourceId { operation })?;
        let (database, collection) = self.resolved_ids()?;
        let url = self
            .inner
            .rest
            .endpoint()
            .document_url(&database, &collection, &rid);

        Ok(Target::new(verb, ResourceType::Documents, rid, url))
    }

    fn resolved_ids(&self) -> Result<(ResourceId, ResourceId)> {
        let database = self.database_id().ok_or(Error::NotInitialized {
            resource: ResourceType::Databases,
        })?;
        let collection = self.collection_id().ok_or(Error::NotInitialized {
            resource: ResourceType::Collections,
        })?;
        Ok((database, collection))
    }
}

impl<T: Transport> Clone for DocDbClient<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Transport> std::fmt::Debug for DocDbClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocDbClient")
            .field("endpoint", &self.inner.rest.endpoint().as_str())
            .field("database", &self.inner.database_name)
            .field("collection", &self.inner.collection_name)
            .field("database_id", &self.inner.database.get())
            .field("collection_id", &self.inner.collection.get())
            .field("key", &"[REDACTED]")
            .finish()
    }
}
