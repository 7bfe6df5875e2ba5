use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::{ApiResponse, Meta};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Insufficient stock for {product}: {available} left, {requested} requested")]
    InsufficientStock {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("Voucher code is not registered for this account")]
    InvalidVoucher,

    #[error("Voucher has already been used")]
    VoucherAlreadyUsed,

    #[error("Invalid admin key")]
    InvalidAdminKey,

    #[error("Cannot commit stock for {product}: {available} left, {requested} required")]
    StockConflict {
        product: String,
        available: i32,
        requested: i32,
    },

    #[error("Conflict {0}")]
    Conflict(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

/// Coarse error category reported to clients next to the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    StateConflict,
    Persistence,
    Unauthorized,
    Forbidden,
    Internal,
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_) | AppError::EmptyCart | AppError::InsufficientStock { .. } => {
                ErrorKind::Validation
            }
            AppError::NotFound(_) | AppError::InvalidVoucher => ErrorKind::NotFound,
            AppError::VoucherAlreadyUsed
            | AppError::InvalidAdminKey
            | AppError::StockConflict { .. }
            | AppError::Conflict(_) => ErrorKind::StateConflict,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Persistence(_) => {
                ErrorKind::Persistence
            }
            AppError::Unauthorized(_) => ErrorKind::Unauthorized,
            AppError::Forbidden => ErrorKind::Forbidden,
            AppError::Serialization(_) | AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::StateConflict => StatusCode::CONFLICT,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Persistence | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct ErrorData {
    pub error: String,
    pub kind: ErrorKind,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Persistence(msg) => tracing::error!(error = %msg, "persistence error"),
            AppError::Serialization(err) => tracing::error!(error = %err, "serialization error"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let body = ApiResponse::failure(
            self.to_string(),
            ErrorData {
                error: self.to_string(),
                kind: self.kind(),
            },
        );

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;
