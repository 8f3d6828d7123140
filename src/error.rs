use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Failures of the on-device cache.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache query failed: {0}")]
    Query(#[from] sqlx::Error),

    #[error("cache migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

/// Failures of the remote record store.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote transport error: {0}")]
    Transport(#[from] sqlx::Error),

    #[error("remote record could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("remote record not found in {table}")]
    NotFound { table: &'static str },

    #[error("unknown column {column} for table {table}")]
    UnknownColumn {
        table: &'static str,
        column: String,
    },

    #[error("invalid row for {table}: {reason}")]
    InvalidRow {
        table: &'static str,
        reason: &'static str,
    },

    #[error("remote store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("not logged in")]
    NotAuthenticated,

    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("{0}")]
    Conflict(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("background task did not complete: {0}")]
    Task(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) | AppError::Remote(RemoteError::NotFound { .. }) => {
                StatusCode::NOT_FOUND
            }
            AppError::NotAuthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Remote(_) => StatusCode::BAD_GATEWAY,
            AppError::Auth(_) | AppError::Cache(_) | AppError::Task(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        AppError::Remote(RemoteError::Transport(e))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, %status, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}
