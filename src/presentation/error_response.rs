// Maps service errors onto HTTP responses
use crate::application::errors::ServiceError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::Validation(violations) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({ "violations": violations })),
            )
                .into_response(),
            ServiceError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": format!("{} not found", what) })),
            )
                .into_response(),
            ServiceError::Repository(e) => {
                tracing::error!("Dashboard API error: {:#}", e);
                (
                    StatusCode::BAD_GATEWAY,
                    Json(json!({ "error": "dashboard API request failed" })),
                )
                    .into_response()
            }
        }
    }
}
