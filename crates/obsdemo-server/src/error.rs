//! HTTP mapping of [`ObsDemoError`].

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use obsdemo_core::error::{ClientCode, ObsDemoError};
use obsdemo_core::protocol::body::ErrorBody;
use thiserror::Error;

/// Error returned by handlers; renders as `{error, statusCode, message}`.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct AppError(#[from] pub ObsDemoError);

impl AppError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self(ObsDemoError::Internal(msg.into()))
    }

    pub fn status(&self) -> StatusCode {
        match self.0.client_code() {
            ClientCode::BadRequest => StatusCode::BAD_REQUEST,
            ClientCode::NotFound => StatusCode::NOT_FOUND,
            ClientCode::AlreadyRegistered
            | ClientCode::InvalidName
            | ClientCode::InvalidLabels
            | ClientCode::UnsupportedVersion
            | ClientCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        }
        let body = ErrorBody::new(self.0.client_code().as_str(), status.as_u16())
            .with_message(self.0.to_string());
        (status, Json(body)).into_response()
    }
}
