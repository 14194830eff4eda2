use std::fmt;
use serde::{Deserialize, Serialize};
use crate::errors::{DomainError, DbError, ValidationError};

/// Error codes for FFI boundary
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Success (no error)
    Success = 0,

    // General errors (1-99)
    Unknown = 1,
    InvalidArgument = 2,
    NullPointer = 3,
    InvalidUtf8 = 4,
    InternalError = 6,
    NotInitialized = 7,

    // Database errors (100-199)
    DatabaseGeneral = 100,
    DatabaseNotFound = 101,
    DatabaseConflict = 102,
    DatabaseLocked = 103,
    DatabaseTransaction = 105,
    DatabaseMigration = 106,

    // Domain errors (200-299)
    DomainGeneral = 200,
    EntityNotFound = 201,
    CascadeResolutionFailed = 203,
    ValidationFailed = 204,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, *self as i32)
    }
}

/// Error type for FFI boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FFIError {
    /// Error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message
    pub message: String,

    /// Optional additional details (JSON string)
    pub details: Option<String>,
}

impl fmt::Display for FFIError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(details) = &self.details {
            write!(f, "{}: {} ({})", self.code, self.message, details)
        } else {
            write!(f, "{}: {}", self.code, self.message)
        }
    }
}

impl std::error::Error for FFIError {}

impl FFIError {
    pub fn new(code: ErrorCode, message: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: &str, details: &str) -> Self {
        Self {
            code,
            message: message.to_string(),
            details: Some(details.to_string()),
        }
    }

    pub fn invalid_argument(message: &str) -> Self {
        Self::new(ErrorCode::InvalidArgument, message)
    }

    pub fn not_initialized(what: &str) -> Self {
        Self::new(ErrorCode::NotInitialized, &format!("{} not initialized", what))
    }

    pub fn internal(message: String) -> Self {
        Self::new(ErrorCode::InternalError, &message)
    }
}

/// Build the `details` JSON with serde so ids containing quotes stay well formed
fn details_json(value: serde_json::Value) -> String {
    value.to_string()
}

impl From<DbError> for FFIError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound(entity, id) => Self::with_details(
                ErrorCode::DatabaseNotFound,
                &format!("Record not found: {} with ID {}", entity, id),
                &details_json(serde_json::json!({ "entity": entity, "id": id })),
            ),
            DbError::Conflict(msg) => Self::new(ErrorCode::DatabaseConflict, &msg),
            DbError::Locked => Self::new(ErrorCode::DatabaseLocked, "Database is locked"),
            DbError::Transaction(msg) => Self::new(ErrorCode::DatabaseTransaction, &msg),
            DbError::Migration(msg) => Self::new(ErrorCode::DatabaseMigration, &msg),
            other => Self::new(ErrorCode::DatabaseGeneral, &other.to_string()),
        }
    }
}

impl From<DomainError> for FFIError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Database(db_err) => db_err.into(),
            DomainError::EntityNotFound(entity, id) => Self::with_details(
                ErrorCode::EntityNotFound,
                &format!("Entity not found: {} with ID {}", entity, id),
                &details_json(serde_json::json!({ "entity": entity, "id": id })),
            ),
            DomainError::CascadeResolution { kind, id, reason } => Self::with_details(
                ErrorCode::CascadeResolutionFailed,
                &format!("Could not enumerate dependents of {} {}", kind, id),
                &details_json(serde_json::json!({ "entity": kind, "id": id, "reason": reason })),
            ),
            DomainError::Validation(val_err) => val_err.into(),
            DomainError::Internal(msg) => Self::new(ErrorCode::InternalError, &msg),
        }
    }
}

impl From<ValidationError> for FFIError {
    fn from(err: ValidationError) -> Self {
        let details = match &err {
            ValidationError::Required { field } => {
                serde_json::json!({ "field": field, "type": "required" })
            }
            ValidationError::InvalidValue { field, reason } => {
                serde_json::json!({ "field": field, "type": "invalid_value", "reason": reason })
            }
            ValidationError::Custom(msg) => serde_json::json!({ "type": "custom", "message": msg }),
        };
        Self::with_details(ErrorCode::ValidationFailed, &err.to_string(), &details_json(details))
    }
}

impl From<std::ffi::NulError> for FFIError {
    fn from(_: std::ffi::NulError) -> Self {
        Self::new(ErrorCode::InvalidUtf8, "String contains null bytes, cannot create CString")
    }
}

pub type FFIResult<T> = Result<T, FFIError>;
