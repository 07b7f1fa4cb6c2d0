//! Signed request execution.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, trace};

use docdb_core::error::{InvalidInputError, ProtocolError};
use docdb_core::{
    ContinuationToken, Document, Endpoint, Error, HttpRequest, HttpResponse, QueryParameters,
    QueryResult, RequestContext, RequestDate, ResourceId, ResourceType, Result, RetryPolicy,
    Signer, Transport, Verb,
};

use super::wire::{self, ErrorResponse, QueryRequest};

/// The addressed resource of one request.
///
/// `resource_type` and `resource_id` are what the request is signed with;
/// `url` is where it is sent.
#[derive(Debug, Clone)]
pub(crate) struct Target {
    pub verb: Verb,
    pub resource_type: ResourceType,
    pub resource_id: ResourceId,
    pub url: String,
}

impl Target {
    pub fn new(verb: Verb, resource_type: ResourceType, resource_id: ResourceId, url: String) -> Self {
        Self {
            verb,
            resource_type,
            resource_id,
            url,
        }
    }

    pub fn context(&self) -> RequestContext {
        RequestContext::new(self.verb, self.resource_type, self.resource_id.clone())
    }
}

/// Signs, sends, and retries requests.
#[derive(Debug)]
pub(crate) struct RestClient<T> {
    endpoint: Endpoint,
    signer: Signer,
    transport: T,
    retry: RetryPolicy,
}

impl<T: Transport> RestClient<T> {
    pub fn new(endpoint: Endpoint, signer: Signer, transport: T, retry: RetryPolicy) -> Self {
        Self {
            endpoint,
            signer,
            transport,
            retry,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Send a JSON body and parse a JSON response.
    pub async fn send_json<B, R>(&self, target: &Target, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let body = encode(body)?;
        let response = self.execute(target, wire::APPLICATION_JSON, &[], &body).await?;
        decode(&response, target)
    }

    /// Send a request with an empty body and ignore the response body.
    pub async fn send_empty(&self, target: &Target) -> Result<()> {
        self.execute(target, wire::APPLICATION_JSON, &[], "").await?;
        Ok(())
    }

    /// Run one page of a query.
    ///
    /// `result_field` names the response body field holding the results.
    #[instrument(skip(self, parameters), fields(resource_type = target.resource_type.as_str()))]
    pub async fn query(
        &self,
        target: &Target,
        result_field: &str,
        query: &str,
        parameters: &QueryParameters,
        page_size: Option<u32>,
        continuation: Option<&ContinuationToken>,
    ) -> Result<QueryResult> {
        docdb_core::document::validate_query(query)?;
        if page_size == Some(0) {
            return Err(InvalidInputError::Other {
                message: "page size must be positive".to_string(),
            }
            .into());
        }

        debug!(params = parameters.len(), ?page_size, has_continuation = continuation.is_some(), "Query");

        let mut headers = vec![(wire::IS_QUERY, "true".to_string())];
        if let Some(size) = page_size {
            headers.push((wire::MAX_ITEM_COUNT, size.to_string()));
        }
        if let Some(token) = continuation {
            headers.push((wire::CONTINUATION, token.as_str().to_string()));
        }

        let body = encode(&QueryRequest::new(query, parameters))?;
        let response = self.execute(target, wire::QUERY_JSON, &headers, &body).await?;

        let context = target.context();
        let item_count = match response.header(wire::ITEM_COUNT) {
            Some(raw) => Some(raw.trim().parse::<u32>().map_err(|_| {
                ProtocolError::invalid_response(
                    format!("malformed {} header '{}'", wire::ITEM_COUNT, raw),
                    context.clone(),
                )
            })?),
            None => None,
        };
        let continuation = response
            .header(wire::CONTINUATION)
            .and_then(ContinuationToken::new);

        let body: Value = decode(&response, target)?;
        let documents = match body.get(result_field) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(|item| {
                    Document::new(item).map_err(|e| {
                        Error::Protocol(ProtocolError::invalid_response(
                            format!("{} entry is not a document: {}", result_field, e),
                            context.clone(),
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?,
            Some(_) => {
                return Err(ProtocolError::invalid_response(
                    format!("'{}' is not an array", result_field),
                    context,
                )
                .into());
            }
        };

        trace!(documents = documents.len(), ?item_count, terminal = continuation.is_none(), "Query page");

        Ok(QueryResult {
            documents,
            item_count,
            continuation,
        })
    }

    /// Sign and send a request, retrying transient failures.
    ///
    /// Every attempt gets a fresh date, and the same date value is used for
    /// both the signature and the `x-ms-date` header.
    async fn execute(
        &self,
        target: &Target,
        content_type: &str,
        extra_headers: &[(&str, String)],
        body: &str,
    ) -> Result<HttpResponse> {
        let context = &target.context();

        self.retry
            .run(move || async move {
                let date = RequestDate::now();
                let token = self.signer.sign(
                    target.verb,
                    target.resource_type,
                    &target.resource_id,
                    &date,
                );

                let mut headers = vec![
                    (wire::CONTENT_TYPE.to_string(), content_type.to_string()),
                    (wire::ACCEPT.to_string(), wire::APPLICATION_JSON.to_string()),
                    (wire::MS_VERSION.to_string(), wire::API_VERSION.to_string()),
                    (wire::MS_DATE.to_string(), date.as_str().to_string()),
                    (wire::AUTHORIZATION.to_string(), token.as_str().to_string()),
                ];
                headers.extend(
                    extra_headers
                        .iter()
                        .map(|(name, value)| (name.to_string(), value.clone())),
                );

                debug!(verb = %target.verb, url = %target.url, "Sending request");

                let response = self
                    .transport
                    .send(HttpRequest {
                        method: target.verb,
                        url: target.url.clone(),
                        headers,
                        body: body.to_string(),
                    })
                    .await
                    .map_err(|source| Error::Transport {
                        context: context.clone(),
                        source,
                    })?;

                trace!(status = response.status, "Response");

                if response.is_success() {
                    Ok(response)
                } else {
                    Err(Error::Protocol(parse_error(&response, context.clone())))
                }
            })
            .await
    }
}

fn encode<B: Serialize + ?Sized>(body: &B) -> Result<String> {
    serde_json::to_string(body).map_err(|e| {
        InvalidInputError::Other {
            message: format!("request body is not serializable: {}", e),
        }
        .into()
    })
}

fn decode<R: DeserializeOwned>(response: &HttpResponse, target: &Target) -> Result<R> {
    serde_json::from_slice(&response.body).map_err(|e| {
        ProtocolError::invalid_response(
            format!("unexpected response body: {}", e),
            target.context(),
        )
        .into()
    })
}

fn parse_error(response: &HttpResponse, context: RequestContext) -> ProtocolError {
    match serde_json::from_slice::<ErrorResponse>(&response.body) {
        Ok(body) => ProtocolError::new(response.status, body.code, body.message, context),
        Err(_) => ProtocolError::new(response.status, None, None, context),
    }
}
