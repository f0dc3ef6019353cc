use actix_web::{HttpResponse, ResponseError};
use serde::Serialize;

use crate::repo::RepoError;

/// Errors surfaced by the service layer.
///
/// A version conflict is not represented here: it is internal to
/// [`crate::retry`] and only ever escapes as `ConcurrentModification`.
#[derive(thiserror::Error, Debug)]
pub enum DomainError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error("concurrent modification: {0}")]
    ConcurrentModification(String),
    #[error("interrupted: {0}")]
    Interrupted(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] BadRequest(String),
    #[error("{0}")] InvalidState(String),
    #[error("{0}, please retry the request")] Retry(String),
    #[error("request interrupted")] Unavailable,
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(msg) => {
                tracing::error!("repository failure: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(e: DomainError) -> Self {
        match e {
            DomainError::InvalidArgument(msg) => ApiError::BadRequest(msg),
            DomainError::InvalidState(msg) => ApiError::InvalidState(msg),
            DomainError::ConcurrentModification(msg) => ApiError::Retry(msg),
            DomainError::Interrupted(_) => ApiError::Unavailable,
            DomainError::Repo(r) => r.into(),
        }
    }
}

impl ResponseError for ApiError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;
        let status = match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::InvalidState(_) => StatusCode::CONFLICT,
            ApiError::Retry(_) => StatusCode::CONFLICT,
            ApiError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        };
        HttpResponse::build(status).json(ApiErrorBody { error: self.to_string() })
    }
}
