use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;

use crate::{
    dao::storage::StorageError,
    state::{
        generation::{CompositionError, ValidationError},
        match_state::MatchError,
    },
};

/// Errors that can occur in service layer operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// A write reached the storage backend and failed. Local state is kept.
    #[error("persistence failed: {0}")]
    Persistence(#[source] StorageError),
    /// Application is running in degraded mode without storage.
    #[error("storage unavailable (degraded mode)")]
    Degraded,
    /// Invalid input provided by the client.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// Tournament composition rules were violated.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Operation cannot be performed in the current state.
    #[error("invalid state: {0}")]
    InvalidState(String),
    /// Requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<StorageError> for ServiceError {
    fn from(err: StorageError) -> Self {
        ServiceError::Persistence(err)
    }
}

impl From<MatchError> for ServiceError {
    fn from(err: MatchError) -> Self {
        match err {
            MatchError::InvalidTransition(invalid) => ServiceError::InvalidState(invalid.to_string()),
            MatchError::InvalidState(message) => ServiceError::InvalidState(message),
            MatchError::NotFound(id) => ServiceError::NotFound(format!("match `{id}` not found")),
        }
    }
}

impl From<CompositionError> for ServiceError {
    fn from(err: CompositionError) -> Self {
        match err {
            CompositionError::Invalid(validation) => ServiceError::Validation(validation),
            other @ (CompositionError::Locked | CompositionError::TypeChangeAfterProgress) => {
                ServiceError::InvalidState(other.to_string())
            }
        }
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(err: ValidationErrors) -> Self {
        ServiceError::InvalidInput(format!("validation failed: {err}"))
    }
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
    /// Conflict with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// Service unavailable or degraded.
    #[error("service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Persistence(source) => AppError::ServiceUnavailable(source.to_string()),
            ServiceError::Degraded => AppError::ServiceUnavailable("degraded mode".into()),
            ServiceError::InvalidInput(message) => AppError::BadRequest(message),
            ServiceError::Validation(validation) => AppError::BadRequest(validation.to_string()),
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
    use crate::state::match_state::{InvalidTransition, MatchAction, MatchPhase};

    fn status_of(err: ServiceError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn match_errors_map_to_conflict_and_not_found() {
        let invalid = MatchError::InvalidTransition(InvalidTransition {
            from: MatchPhase::Completed,
            action: MatchAction::AddPoint,
        });
        assert_eq!(status_of(invalid.into()), StatusCode::CONFLICT);
        assert_eq!(
            status_of(MatchError::NotFound(3).into()),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn composition_errors_split_between_bad_request_and_conflict() {
        let invalid = CompositionError::Invalid(ValidationError {
            violations: vec!["singles require 2 to 8 players (got 1)".into()],
        });
        assert_eq!(status_of(invalid.into()), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(CompositionError::Locked.into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn persistence_failures_are_unavailable() {
        let err = StorageError::Missing("match 4".into());
        assert_eq!(status_of(err.into()), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(ServiceError::Degraded), StatusCode::SERVICE_UNAVAILABLE);
    }
}
