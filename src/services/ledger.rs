//! Upstream betting ledger: accepts bet submissions and returns the updated balance.

use futures::{FutureExt, future::BoxFuture};
use reqwest::Client;
use thiserror::Error;

use crate::dto::bets::{BetReceipt, BetSubmission};

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failure of a bet submission.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger request failed")]
    Request(#[source] reqwest::Error),
    #[error("ledger rejected the bets ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Abstraction over the ledger so tests can record submissions in memory.
pub trait BettingLedger: Send + Sync {
    /// Submit a slip and return the ledger's receipt.
    fn submit(&self, submission: BetSubmission) -> BoxFuture<'static, LedgerResult<BetReceipt>>;
}

/// [`BettingLedger`] backed by the upstream HTTP API.
#[derive(Clone)]
pub struct HttpBettingLedger {
    client: Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpBettingLedger {
    /// Ledger rooted at `base_url`, sending `access_token` as a bearer token when set.
    pub fn new(client: Client, base_url: impl Into<String>, access_token: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token,
        }
    }
}

impl BettingLedger for HttpBettingLedger {
    fn submit(&self, submission: BetSubmission) -> BoxFuture<'static, LedgerResult<BetReceipt>> {
        let mut request = self
            .client
            .post(format!("{}/bets", self.base_url))
            .json(&submission);
        if let Some(token) = &self.access_token {
            request = request.bearer_auth(token);
        }

        async move {
            let response = request.send().await.map_err(LedgerError::Request)?;
            let status = response.status();
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(LedgerError::Rejected {
                    status: status.as_u16(),
                    message,
                });
            }

            response.json::<BetReceipt>().await.map_err(LedgerError::Request)
        }
        .boxed()
    }
}
