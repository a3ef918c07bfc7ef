use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;

/// AppError
///
/// The single failure taxonomy shared by every layer below the transport boundary.
/// Handlers, the toggle engine, the ownership guard and the repositories all return it,
/// and `IntoResponse` turns it into a status code plus an `ErrorBody`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// The addressed record does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),
    /// The caller is authenticated but does not own the resource.
    #[error("{0}")]
    Forbidden(String),
    /// Missing, malformed or expired credential.
    #[error("unauthorized")]
    Unauthorized,
    /// The request body failed schema validation.
    #[error("{0}")]
    InvalidInput(String),
    /// Well-formed request that the relationship rules reject (e.g. following yourself).
    #[error("{0}")]
    InvalidOperation(String),
    /// A unique key is already taken.
    #[error("{0}")]
    Conflict(String),
    /// Unexpected store or library failure. The detail is logged, never returned in release builds.
    #[error("internal error: {0}")]
    Internal(String),
}

/// ErrorKind
///
/// The `kind` discriminator of the result record sent to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub enum ErrorKind {
    NotFound,
    Forbidden,
    Unauthorized,
    InvalidInput,
    InvalidOperation,
    Conflict,
    Internal,
}

/// ErrorBody
///
/// JSON body returned for every failed request.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Forbidden(_) => ErrorKind::Forbidden,
            AppError::Unauthorized => ErrorKind::Unauthorized,
            AppError::InvalidInput(_) => ErrorKind::InvalidInput,
            AppError::InvalidOperation(_) => ErrorKind::InvalidOperation,
            AppError::Conflict(_) => ErrorKind::Conflict,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidOperation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message. Internal failures are reduced to a fixed string outside debug builds.
    fn public_message(&self) -> String {
        match self {
            AppError::Internal(detail) if cfg!(debug_assertions) => detail.clone(),
            AppError::Internal(_) => "internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return AppError::Conflict("record already exists".to_string());
            }
        }
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let AppError::Internal(detail) = &self {
            tracing::error!("internal error: {}", detail);
        }

        let body = ErrorBody {
            kind: self.kind(),
            message: self.public_message(),
        };
        (self.status(), Json(body)).into_response()
    }
}
