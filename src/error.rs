use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;

use crate::services::{event_normalizer::NormalizeError, ledger::LedgerError, query::QueryError};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The upstream query API failed; the current round state is retained.
    #[error("round query failed")]
    Query(#[from] QueryError),
    /// The upstream returned a body the normalization boundary rejected.
    #[error("upstream payload rejected: {0}")]
    Malformed(#[from] NormalizeError),
    /// The betting ledger refused or could not be reached.
    #[error("bet submission failed")]
    Ledger(#[from] LedgerError),
    /// Operation cannot be performed in the current round state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

/// Application-level errors that are converted to HTTP responses.
#[derive(Debug, Error)]
pub enum AppError {
    /// Bad request with invalid input.
    #[error("bad request: {0}")]
    BadRequest(String),
    /// Requested resource not found.
    #[error("not found: {0}")]
    NotFound(String),
    /// Conflict with current round state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Upstream answered with something unusable.
    #[error("bad gateway: {0}")]
    BadGateway(String),
    /// Upstream unreachable.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Query(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Malformed(source) => AppError::BadGateway(source.to_string()),
            ServiceError::Ledger(LedgerError::Rejected { status, message })
                if (400..500).contains(&status) =>
            {
                AppError::BadRequest(message)
            }
            ServiceError::Ledger(source) => AppError::BadGateway(source.to_string()),
            ServiceError::InvalidState(message) => AppError::Conflict(message),
            ServiceError::NotFound(message) => AppError::NotFound(message),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::BadGateway(_) => StatusCode::BAD_GATEWAY,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        };

        let payload = Json(ErrorBody {
            message: self.to_string(),
        });

        (status, payload).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_failures_map_to_service_unavailable() {
        let err: AppError = ServiceError::Query(QueryError::Status {
            url: "http://upstream/rounds/current".into(),
            status: 500,
        })
        .into();
        assert_eq!(
            err.into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn ledger_client_errors_are_bad_requests() {
        let err: AppError = ServiceError::Ledger(LedgerError::Rejected {
            status: 402,
            message: "insufficient balance".into(),
        })
        .into();
        assert!(matches!(&err, AppError::BadRequest(message) if message == "insufficient balance"));

        let err: AppError = ServiceError::Ledger(LedgerError::Rejected {
            status: 503,
            message: String::new(),
        })
        .into();
        assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn closed_betting_is_a_conflict() {
        let err: AppError = ServiceError::InvalidState("betting is closed".into()).into();
        assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
    }
}
