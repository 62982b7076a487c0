use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use log::error;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

use crate::storage::StorageError;

/// Field name to human readable message.
pub type FieldErrors = BTreeMap<String, String>;

/// Submitted non-file form values, echoed back so the client can re-display them.
pub type OldInput = BTreeMap<String, String>;

pub const PERSISTENCE_FAILED_MESSAGE: &str =
    "An error occurred while creating employee. Please try again.";

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    NotImplemented(String),
    ValidationFailed { errors: FieldErrors, old: OldInput },
    PersistenceFailed { old: OldInput },
    InternalServerError(String),
    DatabaseError(String),
    StorageError(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct FormErrorResponse<'a> {
    errors: &'a FieldErrors,
    old: &'a OldInput,
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not Found: {}", msg),
            AppError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            AppError::NotImplemented(msg) => write!(f, "Not Implemented: {}", msg),
            AppError::ValidationFailed { errors, .. } => {
                let fields = errors.keys().cloned().collect::<Vec<_>>().join(", ");
                write!(f, "Validation Failed: {}", fields)
            }
            AppError::PersistenceFailed { .. } => {
                write!(f, "Persistence Failed: {}", PERSISTENCE_FAILED_MESSAGE)
            }
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database Error: {}", msg),
            AppError::StorageError(msg) => write!(f, "Storage Error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::NotImplemented(_) => StatusCode::NOT_IMPLEMENTED,
            AppError::ValidationFailed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::PersistenceFailed { .. }
            | AppError::InternalServerError(_)
            | AppError::DatabaseError(_)
            | AppError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Unauthorized(msg)
            | AppError::NotImplemented(msg) => builder.json(ErrorResponse { error: msg.clone() }),
            AppError::ValidationFailed { errors, old } => {
                builder.json(FormErrorResponse { errors, old })
            }
            AppError::PersistenceFailed { old } => {
                let mut errors = FieldErrors::new();
                errors.insert("error".to_string(), PERSISTENCE_FAILED_MESSAGE.to_string());
                builder.json(FormErrorResponse {
                    errors: &errors,
                    old,
                })
            }
            AppError::InternalServerError(detail)
            | AppError::DatabaseError(detail)
            | AppError::StorageError(detail) => {
                error!("{}: {}", self.status_code(), detail);
                builder.json(ErrorResponse {
                    error: "An unexpected error occurred".to_string(),
                })
            }
        }
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::DatabaseError(err.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::StorageError(err.to_string())
    }
}
