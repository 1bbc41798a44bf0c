//! Application error type shared by services and handlers.
//!
//! Every variant carries the user-facing message; database and internal
//! failures are logged and replaced by a generic message in the response.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Stok tidak mencukupi untuk {0}")]
    InsufficientStock(String),

    #[error("Saldo tidak mencukupi")]
    InsufficientBalance,

    #[error("{0}")]
    InvalidTransition(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Body for mutations with no natural payload.
#[derive(Debug, Serialize)]
pub struct MessageBody {
    pub message: String,
}

impl MessageBody {
    pub fn json(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) | Self::InsufficientBalance => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) | Self::InsufficientStock(_) | Self::InvalidTransition(_) => {
                StatusCode::CONFLICT
            }
            Self::Database(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} tidak ditemukan"))
    }
}

fn has_sqlstate(err: &anyhow::Error, sqlstate: &str) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .and_then(|d| d.code())
        .is_some_and(|code| code == sqlstate)
}

/// True when the error chain holds a Postgres unique-constraint violation.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    has_sqlstate(err, "23505")
}

/// True when a delete or insert tripped a foreign key.
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    has_sqlstate(err, "23503")
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            Self::Database(_) | Self::Internal(_) => {
                tracing::error!(error = %self, "request failed");
                "Terjadi kesalahan pada server".to_string()
            }
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(AppError::not_found("Produk").status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InsufficientStock("X".into()).status(),
            StatusCode::CONFLICT
        );
        assert_eq!(AppError::InsufficientBalance.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::Internal(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn messages_are_user_facing() {
        assert_eq!(AppError::not_found("Pesanan").to_string(), "Pesanan tidak ditemukan");
        assert_eq!(
            AppError::InsufficientStock("ThinkPad X1".into()).to_string(),
            "Stok tidak mencukupi untuk ThinkPad X1"
        );
    }

    #[derive(Debug)]
    struct PgFailure(&'static str);

    impl std::fmt::Display for PgFailure {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for PgFailure {}

    impl sqlx::error::DatabaseError for PgFailure {
        fn message(&self) -> &str {
            "constraint failed"
        }
        fn code(&self) -> Option<std::borrow::Cow<'_, str>> {
            Some(std::borrow::Cow::Borrowed(self.0))
        }
        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }
        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }
        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    fn pg_error(sqlstate: &'static str) -> anyhow::Error {
        anyhow::Error::from(sqlx::Error::Database(Box::new(PgFailure(sqlstate))))
            .context("delete product")
    }

    #[test]
    fn constraint_violations_are_told_apart() {
        assert!(is_foreign_key_violation(&pg_error("23503")));
        assert!(!is_unique_violation(&pg_error("23503")));
        assert!(is_unique_violation(&pg_error("23505")));
        assert!(!is_foreign_key_violation(&pg_error("23505")));
        assert!(!is_foreign_key_violation(&anyhow::anyhow!("plain failure")));
    }

    #[test]
    fn internal_errors_hide_details() {
        let res = AppError::Internal(anyhow::anyhow!("secret detail")).into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
