use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{
    application::repos::RepoError, cache::CacheError, domain::error::DomainError,
    infra::error::InfraError,
};

/// Error chain attached to failed responses and picked up by the response
/// logging middleware.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<CacheError> for HttpError {
    fn from(error: CacheError) -> Self {
        const SOURCE: &str = "infra::http::cache_error_to_http_error";

        let (status, message) = match &error {
            CacheError::NotFound => (StatusCode::NOT_FOUND, "Not found"),
            CacheError::PageNotFound { .. } => (StatusCode::NOT_FOUND, "Page not found"),
            CacheError::InvalidKey { .. } => (StatusCode::BAD_REQUEST, "Invalid request"),
            CacheError::Repo(RepoError::Timeout) => {
                (StatusCode::SERVICE_UNAVAILABLE, "Database timeout")
            }
            CacheError::Repo(_)
            | CacheError::Encode(_)
            | CacheError::Render(_)
            | CacheError::UnexpectedShape { .. }
            | CacheError::BuildAborted(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        HttpError::from_error(SOURCE, status, message, &error)
    }
}

impl From<DomainError> for HttpError {
    fn from(error: DomainError) -> Self {
        HttpError::from_error(
            "infra::http::domain_error_to_http_error",
            StatusCode::BAD_REQUEST,
            "Invalid request",
            &error,
        )
    }
}

/// Top-level error of the binary.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}
