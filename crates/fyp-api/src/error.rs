use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;

use fyp_core::{ErrorKind, MatchError};
use fyp_types::api::ErrorResponse;

/// Handler error: either a domain failure or a bare status.
#[derive(Debug)]
pub enum ApiError {
    Match(MatchError),
    Status(StatusCode),
}

impl ApiError {
    pub fn internal() -> Self {
        Self::Status(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        Self::Match(err)
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        Self::Status(status)
    }
}

pub fn status_for(err: &MatchError) -> StatusCode {
    match err.kind() {
        ErrorKind::Validation if matches!(err, MatchError::NotFound { .. }) => StatusCode::NOT_FOUND,
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::Eligibility => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Authorization => StatusCode::FORBIDDEN,
        ErrorKind::RetryableConflict => StatusCode::SERVICE_UNAVAILABLE,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Status(status) => status.into_response(),
            Self::Match(err) => {
                let status = status_for(&err);
                // Storage details stay in the log
                let message = if err.kind() == ErrorKind::Internal {
                    error!("Storage error: {:#}", err);
                    "internal error".to_string()
                } else {
                    err.to_string()
                };
                let body = ErrorResponse {
                    error: err.code().to_string(),
                    kind: err.kind().as_str().to_string(),
                    message,
                    retryable: err.is_retryable(),
                };
                (status, Json(body)).into_response()
            }
        }
    }
}

/// Run synchronous core work off the async runtime.
pub async fn blocking<F, T>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> fyp_core::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn maps_kinds_to_statuses() {
        assert_eq!(
            status_for(&MatchError::NotFound { entity: "Request", id: Uuid::nil() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&MatchError::SelfRequest), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&MatchError::SemesterMismatch(5, 6)), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(&MatchError::GroupFull(Uuid::nil())), StatusCode::CONFLICT);
        assert_eq!(status_for(&MatchError::Unauthorized(Uuid::nil())), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&MatchError::RetryableConflict), StatusCode::SERVICE_UNAVAILABLE);
    }
}
