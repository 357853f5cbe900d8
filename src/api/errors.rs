use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

use crate::service::{ErrorKind, ServiceError};

#[derive(ThisError, Debug)]
pub enum Error {
    /// A lifecycle check or the store turned the request down
    #[error(transparent)]
    Service(#[from] ServiceError),

    /// Body was not valid JSON of the expected shape
    #[error("{}", .0.body_text())]
    Json(#[from] JsonRejection),

    /// Query string could not be parsed
    #[error("{}", .0.body_text())]
    Query(#[from] QueryRejection),

    /// Path segment could not be parsed
    #[error("{}", .0.body_text())]
    Path(#[from] PathRejection),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Json(_) | Error::Query(_) | Error::Path(_) => StatusCode::BAD_REQUEST,
            Error::Service(e) => match e {
                ServiceError::ReservationNotFound(_) => StatusCode::NOT_FOUND,
                // A missing lane on create is the caller's mistake, not a missing resource.
                ServiceError::LaneNotFound(_) => StatusCode::BAD_REQUEST,
                ServiceError::Forbidden => StatusCode::FORBIDDEN,
                ServiceError::ConcurrentConflict => StatusCode::SERVICE_UNAVAILABLE,
                ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                _ => StatusCode::BAD_REQUEST,
            },
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Service(ServiceError::Storage(_)) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Service(e) => match e.kind() {
                ErrorKind::Persistence => tracing::error!("Persistence error: {}", self),
                ErrorKind::Authorization => tracing::info!("Authorization error: {}", self),
                _ => tracing::debug!("Client error: {}", self),
            },
            Error::Json(_) | Error::Query(_) | Error::Path(_) => {
                tracing::debug!("Client error: {}", self)
            }
        }

        let status = self.status_code();
        let body = json!({ "message": self.user_message() });
        (status, Json(body)).into_response()
    }
}
