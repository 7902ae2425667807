//! Mapping of domain errors onto the boundary's result codes.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use provctl_core::error::{ProvError, ProvResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultCode {
    Ok,
    NoContent,
    BadRequest,
    Unauthorized,
    Conflict,
    NotFound,
    InternalError,
}

impl ResultCode {
    pub fn status(self) -> StatusCode {
        match self {
            ResultCode::Ok => StatusCode::OK,
            ResultCode::NoContent => StatusCode::NO_CONTENT,
            ResultCode::BadRequest => StatusCode::BAD_REQUEST,
            ResultCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ResultCode::Conflict => StatusCode::CONFLICT,
            ResultCode::NotFound => StatusCode::NOT_FOUND,
            ResultCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Classify a failure. Deterministic; depends only on the variant.
pub fn classify(err: &ProvError) -> ResultCode {
    match err {
        ProvError::NotFound { .. } => ResultCode::NotFound,
        ProvError::InvalidInput(_) | ProvError::Validation { .. } => ResultCode::BadRequest,
        ProvError::Unauthorized | ProvError::AuthenticationFailed { .. } => {
            ResultCode::Unauthorized
        }
        ProvError::Conflict(_) => ResultCode::Conflict,
        ProvError::AuditUnavailable(_) | ProvError::Store(_) | ProvError::Internal(_) => {
            ResultCode::InternalError
        }
    }
}

/// A classified failure, carrying the message shown to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Failure {
    pub code: ResultCode,
    pub message: String,
}

impl From<ProvError> for Failure {
    fn from(err: ProvError) -> Self {
        Self {
            code: classify(&err),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.code.status(), Json(body)).into_response()
    }
}

/// Outcome of one gateway operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    Ok(T),
    NoContent,
    Failed(Failure),
}

impl<T> Reply<T> {
    pub fn code(&self) -> ResultCode {
        match self {
            Reply::Ok(_) => ResultCode::Ok,
            Reply::NoContent => ResultCode::NoContent,
            Reply::Failed(failure) => failure.code,
        }
    }

    pub fn failed(err: ProvError) -> Self {
        Reply::Failed(err.into())
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Reply<U> {
        match self {
            Reply::Ok(value) => Reply::Ok(f(value)),
            Reply::NoContent => Reply::NoContent,
            Reply::Failed(failure) => Reply::Failed(failure),
        }
    }
}

impl<T> From<ProvResult<T>> for Reply<T> {
    fn from(result: ProvResult<T>) -> Self {
        match result {
            Ok(value) => Reply::Ok(value),
            Err(err) => Reply::failed(err),
        }
    }
}

impl<T> Reply<Vec<T>> {
    /// An empty collection is reported as `NoContent`.
    pub fn collection(result: ProvResult<Vec<T>>) -> Self {
        match result {
            Ok(items) if items.is_empty() => Reply::NoContent,
            other => other.into(),
        }
    }
}

impl<T: IntoResponse> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        match self {
            Reply::Ok(body) => body.into_response(),
            Reply::NoContent => StatusCode::NO_CONTENT.into_response(),
            Reply::Failed(failure) => failure.into_response(),
        }
    }
}
