use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::chatbot::ChatError;
use crate::db::DbError;
use crate::password::PasswordError;
use crate::services::medicine::MedicineError;
use crate::services::places::PlacesError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database is not connected")]
    DatabaseUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Template rendering error: {0}")]
    Template(#[from] tera::Error),

    #[error("Please login first")]
    Unauthenticated,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0} is not configured on this server")]
    FeatureUnavailable(&'static str),

    #[error("Hospital search failed: {0}")]
    Places(#[from] PlacesError),

    #[error("Medicine lookup failed: {0}")]
    Medicine(#[from] MedicineError),

    #[error("Chatbot error: {0}")]
    Chat(#[from] ChatError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Status code and client-facing message. Internal details are logged, not returned.
    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Unauthenticated => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::DatabaseUnavailable | AppError::FeatureUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, self.to_string())
            }
            AppError::Places(_) | AppError::Medicine(_) | AppError::Chat(_) => {
                tracing::warn!(error = %self, "Upstream service error");
                (StatusCode::BAD_GATEWAY, self.to_string())
            }
            _ => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_message().0
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "success": false, "error": message }))).into_response()
    }
}

/// Error wrapper for handlers that render HTML pages.
#[derive(Debug)]
pub struct PageError(pub AppError);

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        PageError(err)
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = self.0.status_and_message();

        let body = format!(
            r#"<!DOCTYPE html>
<html>
<head>
    <title>Error {}</title>
    <link rel="stylesheet" href="/static/css/style.css">
</head>
<body>
    <div class="container">
        <div class="error-page">
            <h1>Error {}</h1>
            <p>{}</p>
            <a href="/">Return to homepage</a>
        </div>
    </div>
</body>
</html>"#,
            status.as_u16(),
            status.as_u16(),
            message
        );

        (status, Html(body)).into_response()
    }
}
