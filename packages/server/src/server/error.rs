//! Translation of service errors into the JSON error envelope.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::common::ServiceError;

/// Wrapper so handlers can use `?` on service results.
pub struct ApiError(pub ServiceError);

pub type ApiResult<T> = Result<T, ApiError>;

impl From<ServiceError> for ApiError {
    fn from(err: ServiceError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            ServiceError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) => StatusCode::CONFLICT,
            ServiceError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.0.to_string();

        if status.is_client_error() {
            tracing::warn!(error = %message, "request rejected");
        } else {
            tracing::error!(error = %message, "request failed");
        }

        (
            status,
            Json(ErrorBody {
                code: self.0.code(),
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError(ServiceError::bad_request("x")).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError(ServiceError::not_found("x")).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError(ServiceError::conflict("x")).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError(ServiceError::Internal(anyhow::anyhow!("x"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
