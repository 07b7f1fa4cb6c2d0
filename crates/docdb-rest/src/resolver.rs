//! Database and collection resolution.
//!
//! A logical name is turned into a server resource id by querying the parent
//! scope for it and creating it when absent. Each id is resolved at most once
//! per client; concurrent callers share a single in-flight attempt.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use docdb_core::error::{InvalidInputError, ProtocolError};
use docdb_core::{
    ContinuationToken, Document, Error, QueryParameters, ResourceId, ResourceName, ResourceType,
    Result, Transport, Verb,
};

use crate::rest::client::{RestClient, Target};
use crate::rest::wire::CreateResourceRequest;

/// Lifecycle of a resolved resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    /// No attempt has succeeded yet.
    Unresolved,
    /// An attempt is in flight.
    Resolving,
    /// The id is known and will not change.
    Resolved,
}

/// A write-once resource id with single-flight initialization.
#[derive(Debug, Default)]
pub(crate) struct ResourceCell {
    id: OnceCell<ResourceId>,
    resolving: AtomicBool,
}

impl ResourceCell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<&ResourceId> {
        self.id.get()
    }

    pub fn state(&self) -> ResolutionState {
        if self.id.initialized() {
            ResolutionState::Resolved
        } else if self.resolving.load(Ordering::Acquire) {
            ResolutionState::Resolving
        } else {
            ResolutionState::Unresolved
        }
    }

    /// Return the id, running `resolve` if no attempt has succeeded yet.
    ///
    /// Only one `resolve` runs at a time; other callers wait for it. A failed
    /// attempt leaves the cell unresolved.
    pub async fn get_or_resolve<F, Fut>(&self, resolve: F) -> Result<ResourceId>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<ResourceId>>,
    {
        self.id
            .get_or_try_init(move || async move {
                let _guard = ResolvingGuard::enter(&self.resolving);
                resolve().await
            })
            .await
            .cloned()
    }
}

/// Clears the in-flight flag even if the attempt is cancelled.
struct ResolvingGuard<'a>(&'a AtomicBool);

impl<'a> ResolvingGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::Release);
        Self(flag)
    }
}

impl Drop for ResolvingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Find `name` under `parent`, creating it when absent.
///
/// `kind` is the child container type: databases live under the account root
/// (empty `parent`), collections under a database id.
#[instrument(skip_all, fields(kind = kind.as_str(), %name, %parent))]
pub(crate) async fn resolve_or_create<T: Transport>(
    rest: &RestClient<T>,
    kind: ResourceType,
    parent: &ResourceId,
    name: &ResourceName,
) -> Result<ResourceId> {
    if let Some(rid) = find(rest, kind, parent, name).await? {
        info!(%rid, "Found existing {}", kind);
        return Ok(rid);
    }

    debug!("No existing {} named '{}', creating", kind, name);

    match create(rest, kind, parent, name).await {
        Ok(rid) => {
            info!(%rid, "Created {}", kind);
            Ok(rid)
        }
        Err(Error::Protocol(err)) if err.is_conflict() => {
            // Someone else created it between our query and create.
            warn!("{} '{}' already exists, looking it up again", kind, name);
            match find(rest, kind, parent, name).await? {
                Some(rid) => {
                    info!(%rid, "Found concurrently created {}", kind);
                    Ok(rid)
                }
                None => Err(Error::Protocol(err)),
            }
        }
        Err(err) => Err(err),
    }
}

fn container_target<T: Transport>(
    rest: &RestClient<T>,
    kind: ResourceType,
    parent: &ResourceId,
) -> Result<Target> {
    let url = match kind {
        ResourceType::Databases => rest.endpoint().databases_url(),
        ResourceType::Collections => rest.endpoint().collections_url(parent),
        ResourceType::Documents => {
            return Err(InvalidInputError::Other {
                message: "documents are not resolved by name".to_string(),
            }
            .into());
        }
    };
    Ok(Target::new(Verb::Post, kind, parent.clone(), url))
}

async fn find<T: Transport>(
    rest: &RestClient<T>,
    kind: ResourceType,
    parent: &ResourceId,
    name: &ResourceName,
) -> Result<Option<ResourceId>> {
    let target = container_target(rest, kind, parent)?;
    let query = format!("SELECT * FROM {} c WHERE c.id = @id", kind.as_str());
    let parameters = QueryParameters::new().with("@id", name.as_str())?;

    let mut continuation: Option<ContinuationToken> = None;
    loop {
        let page = rest
            .query(
                &target,
                kind.result_field(),
                &query,
                &parameters,
                None,
                continuation.as_ref(),
            )
            .await?;

        let found = page
            .documents
            .iter()
            .filter(|doc| doc.id() == Some(name.as_str()))
            .find_map(Document::resource_id);
        if found.is_some() {
            return Ok(found);
        }

        match page.continuation {
            Some(next) => continuation = Some(next),
            None => return Ok(None),
        }
    }
}

async fn create<T: Transport>(
    rest: &RestClient<T>,
    kind: ResourceType,
    parent: &ResourceId,
    name: &ResourceName,
) -> Result<ResourceId> {
    let target = container_target(rest, kind, parent)?;
    let created: Document = rest
        .send_json(&target, &CreateResourceRequest { id: name.as_str() })
        .await?;

    created.resource_id().ok_or_else(|| {
        ProtocolError::invalid_response(
            format!("created {} has no _rid", kind),
            target.context(),
        )
        .into()
    })
}
