//! Conversion of errors into HTTP responses
//!
//! Every failure leaves the server as `{"success": false, "error": "..."}`
//! with a status derived from the [`FormcraftError`] variant.

use crate::error::FormcraftError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error returned by route handlers
#[derive(Debug)]
pub struct ApiError(anyhow::Error);

impl ApiError {
    /// HTTP status for the wrapped error
    pub fn status(&self) -> StatusCode {
        match self.0.downcast_ref::<FormcraftError>() {
            Some(FormcraftError::Validation(_)) => StatusCode::BAD_REQUEST,
            Some(FormcraftError::NotFound(_)) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self(FormcraftError::Validation(message.into()).into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self(FormcraftError::NotFound(message.into()).into())
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

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {:#}", self.0);
        } else {
            tracing::debug!("Request rejected: {}", self.0);
        }
        let body = Json(json!({
            "success": false,
            "error": self.0.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::validation("An image is required").status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::not_found("x").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::from(FormcraftError::MissingCredentials("openrouter".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(FormcraftError::Upstream {
                status: 401,
                message: "unauthorized".into()
            })
            .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::from(anyhow::anyhow!("unexpected")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_status() {
        let response = ApiError::validation("A prompt is required").into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
