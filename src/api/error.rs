//! Mapping of domain errors onto HTTP responses.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::error::LimitlabError;

/// Error returned by every handler
///
/// Wraps the `anyhow::Error` coming out of the service layer; the status
/// code is chosen by downcasting to [`LimitlabError`].
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(LimitlabError::Validation(message.into()).into())
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

/// Malformed JSON bodies and wrongly typed fields are client errors
pub fn json_rejection(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

pub fn query_rejection(rejection: QueryRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self.0.downcast_ref::<LimitlabError>() {
            Some(LimitlabError::Validation(message)) => {
                tracing::debug!(%message, "request rejected");
                (StatusCode::BAD_REQUEST, json!({ "message": message }))
            }
            Some(LimitlabError::ConfirmationRequired { message, warning }) => (
                StatusCode::BAD_REQUEST,
                json!({ "message": message, "warning": warning }),
            ),
            Some(LimitlabError::NotFound(message)) => {
                tracing::debug!(%message, "not found");
                (StatusCode::NOT_FOUND, json!({ "message": message }))
            }
            Some(LimitlabError::Conflict(message)) => {
                (StatusCode::CONFLICT, json!({ "message": message }))
            }
            _ => {
                tracing::error!("request failed: {:#}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "message": "Internal Server Error", "error": self.0.to_string() }),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}
