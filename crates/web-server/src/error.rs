use crate::AppState;
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use core_types::CoreError;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

/// Generic message for every storage failure shown to clients.
pub const INTERNAL_ERROR_MESSAGE: &str = "An internal database error occurred";

/// The driver message behind a 500, carried in the response extensions so
/// `attach_details` can decide whether the client sees it.
#[derive(Debug, Clone)]
pub struct ErrorDetails(pub String);

#[derive(Error, Debug)]
pub enum AppError {
    /// A missing or malformed input, or a reference that does not resolve.
    #[error("{0}")]
    Validation(String),
    /// A lookup by path id found nothing.
    #[error("{0}")]
    NotFound(String),
    #[error("Database error: {0}")]
    Database(#[from] database::DbError),
}

impl AppError {
    /// The status and JSON body for this error. `details` is only present on
    /// 500s and only when `expose` is set.
    pub fn status_and_body(&self, expose: bool) -> (StatusCode, Value) {
        match self {
            AppError::Validation(message) => (StatusCode::BAD_REQUEST, json!({ "error": message })),
            AppError::NotFound(message) => (StatusCode::NOT_FOUND, json!({ "error": message })),
            AppError::Database(db_err) => {
                let mut body = json!({ "error": INTERNAL_ERROR_MESSAGE });
                if expose {
                    body["details"] = Value::String(db_err.to_string());
                }
                (StatusCode::INTERNAL_SERVER_ERROR, body)
            }
        }
    }
}

/// Converts our custom `AppError` into an HTTP response.
///
/// The body never carries `details` here; storage failures leave the driver
/// message in an `ErrorDetails` extension instead.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Database(db_err) => tracing::error!(error = ?db_err, "Database error."),
            AppError::Validation(message) => tracing::debug!(%message, "Rejected request."),
            AppError::NotFound(message) => tracing::debug!(%message, "Resource not found."),
        }
        let (status, body) = self.status_and_body(false);
        let mut response = (status, Json(body)).into_response();
        if let AppError::Database(db_err) = &self {
            response.extensions_mut().insert(ErrorDetails(db_err.to_string()));
        }
        response
    }
}

/// Response middleware: puts the driver message into 500 bodies when the
/// deployment asked for it, and strips the extension either way.
pub async fn attach_details(State(state): State<Arc<AppState>>, mut response: Response) -> Response {
    let Some(ErrorDetails(details)) = response.extensions_mut().remove::<ErrorDetails>() else {
        return response;
    };
    if !state.expose_details {
        return response;
    }
    let body = json!({ "error": INTERNAL_ERROR_MESSAGE, "details": details });
    (response.status(), Json(body)).into_response()
}

impl From<CoreError> for AppError {
    fn from(err: CoreError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        AppError::Validation(format!("Invalid path parameter: {}", rejection.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use database::DbError;

    #[test]
    fn validation_and_not_found_carry_their_message() {
        let (status, body) = AppError::Validation("Missing type parameter".into()).status_and_body(false);
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Missing type parameter" }));

        let (status, body) = AppError::NotFound("gone".into()).status_and_body(true);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "error": "gone" }));
    }

    #[test]
    fn database_details_are_gated() {
        let err = AppError::from(DbError::ConnectionError("connection refused".into()));

        let (status, hidden) = err.status_and_body(false);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(hidden.get("details").is_none());

        let (_, shown) = err.status_and_body(true);
        assert!(shown["details"].as_str().unwrap().contains("connection refused"));
    }

    #[test]
    fn timeouts_are_internal_errors() {
        let err = AppError::from(DbError::Timeout(std::time::Duration::from_secs(10)));
        let (status, body) = err.status_and_body(true);
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], INTERNAL_ERROR_MESSAGE);
        assert!(body["details"].as_str().unwrap().contains("timeout"));
    }

    #[test]
    fn response_carries_details_only_as_an_extension() {
        let response = AppError::from(DbError::ConnectionError("connection refused".into())).into_response();
        let details = response.extensions().get::<ErrorDetails>().map(|d| d.0.clone());
        assert!(details.unwrap().contains("connection refused"));

        let response = AppError::NotFound("gone".into()).into_response();
        assert!(response.extensions().get::<ErrorDetails>().is_none());
    }
}
