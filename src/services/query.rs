//! Upstream REST queries: current round snapshot and recent results.

use futures::{FutureExt, future::BoxFuture};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::dto::snapshot::{CurrentRoundDto, ResultEntryDto};

/// Result alias for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Failure of a REST query. The coordinator keeps its state; the caller decides on retries.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Abstraction over the game query API so tests can swap in canned responses.
pub trait GameQueryService: Send + Sync {
    /// Snapshot of the round the server considers active, `None` when there is none.
    fn current_round(&self) -> BoxFuture<'static, QueryResult<Option<CurrentRoundDto>>>;
    /// Most recent results, newest first.
    fn recent_results(&self, limit: usize) -> BoxFuture<'static, QueryResult<Vec<ResultEntryDto>>>;
}

/// [`GameQueryService`] backed by the upstream HTTP API.
#[derive(Clone)]
pub struct HttpGameQueryService {
    client: Client,
    base_url: String,
}

impl HttpGameQueryService {
    /// Query service rooted at `base_url`.
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

impl GameQueryService for HttpGameQueryService {
    fn current_round(&self) -> BoxFuture<'static, QueryResult<Option<CurrentRoundDto>>> {
        let client = self.client.clone();
        let url = format!("{}/rounds/current", self.base_url);

        async move {
            let response = client
                .get(&url)
                .send()
                .await
                .map_err(|source| QueryError::Request {
                    url: url.clone(),
                    source,
                })?;

            match response.status() {
                StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => return Ok(None),
                status if !status.is_success() => {
                    return Err(QueryError::Status {
                        url,
                        status: status.as_u16(),
                    });
                }
                _ => {}
            }

            response
                .json::<Option<CurrentRoundDto>>()
                .await
                .map_err(|source| QueryError::Request { url, source })
        }
        .boxed()
    }

    fn recent_results(&self, limit: usize) -> BoxFuture<'static, QueryResult<Vec<ResultEntryDto>>> {
        let client = self.client.clone();
        let url = format!("{}/rounds/results", self.base_url);

        async move {
            let response = client
                .get(&url)
                .query(&[("limit", limit)])
                .send()
                .await
                .map_err(|source| QueryError::Request {
                    url: url.clone(),
                    source,
                })?;

            let status = response.status();
            if !status.is_success() {
                return Err(QueryError::Status {
                    url,
                    status: status.as_u16(),
                });
            }

            response
                .json::<Vec<ResultEntryDto>>()
                .await
                .map_err(|source| QueryError::Request { url, source })
        }
        .boxed()
    }
}
