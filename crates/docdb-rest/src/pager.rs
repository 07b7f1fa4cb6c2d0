//! Page-by-page query streaming.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use tracing::debug;

use docdb_core::{ContinuationToken, QueryParameters, QueryResult, Result, Transport};

use crate::client::DocDbClient;

/// Stream of query result pages.
///
/// Each page's continuation token is passed verbatim to the next request.
/// The stream ends after a page without a token, or after yielding an error.
pub struct QueryPages {
    inner: Pin<Box<dyn Stream<Item = Result<QueryResult>> + Send>>,
}

impl QueryPages {
    pub(crate) fn new<T>(
        client: DocDbClient<T>,
        query: String,
        parameters: QueryParameters,
        page_size: Option<u32>,
    ) -> Self
    where
        T: Transport + 'static,
    {
        let stream = async_stream::stream! {
            let mut continuation: Option<ContinuationToken> = None;
            let mut page_number = 0u32;

            loop {
                let result = client
                    .query(&query, &parameters, page_size, continuation.as_ref())
                    .await;

                match result {
                    Ok(page) => {
                        page_number += 1;
                        debug!(page_number, documents = page.documents.len(), "Fetched page");
                        continuation = page.continuation.clone();
                        let terminal = continuation.is_none();
                        yield Ok(page);
                        if terminal {
                            break;
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Self {
            inner: Box::pin(stream),
        }
    }
}

impl Stream for QueryPages {
    type Item = Result<QueryResult>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

impl std::fmt::Debug for QueryPages {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryPages").finish_non_exhaustive()
    }
}
