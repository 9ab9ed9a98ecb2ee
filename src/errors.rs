use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use crate::authz::AuthzError;

#[derive(Debug, Error, Diagnostic)]
pub enum AppError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(prefix_authz::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(prefix_authz::config))]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Authz(#[from] AuthzError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::Authz(e) => e.into_response(),
            other => {
                let body = json!({ "error": other.to_string() });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
