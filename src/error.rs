/// Unified error handling for the portal's session service.
///
/// Control flow uses `Result<_, AppError>` throughout; HTTP mapping lives
/// in the `ResponseError` impl so handlers never build error responses by
/// hand. Token failures are tagged variants, not strings: callers branch
/// on `AuthError::TokenExpired` vs `AuthError::TokenInvalid`, which is
/// what lets the client decide between refreshing and giving up.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::error::Error as StdError;
use std::fmt;

/// Validation errors for input data
#[derive(Debug, Clone)]
pub enum ValidationError {
    EmptyField(String),
    TooShort(String, usize),
    TooLong(String, usize),
    InvalidFormat(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
        }
    }
}

impl StdError for ValidationError {}

/// Database operation errors
#[derive(Debug)]
pub enum DatabaseError {
    NotFound(String),
    QueryExecution(String),
    ConnectionPool(String),
    UnexpectedError(String),
}

impl fmt::Display for DatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatabaseError::NotFound(msg) => write!(f, "Not found: {}", msg),
            DatabaseError::QueryExecution(msg) => write!(f, "Query error: {}", msg),
            DatabaseError::ConnectionPool(msg) => write!(f, "Database connection error: {}", msg),
            DatabaseError::UnexpectedError(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl StdError for DatabaseError {}

/// Session and token errors.
///
/// `TokenExpired` is the only recoverable kind: the client reacts to it
/// by refreshing. Everything else surfaces to the caller as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No bearer token or a malformed Authorization header.
    MissingToken,
    /// Access token past its expiry. Recoverable through a refresh.
    TokenExpired,
    /// Bad signature, malformed token, or a refresh token presented as
    /// an access token. Not recoverable client-side.
    TokenInvalid,
    /// Refresh token past its expiry.
    RefreshExpired,
    /// Refresh token failed verification, carries the wrong type, or the
    /// account behind it is gone or inactive. Deliberately one variant:
    /// the refresh flow must not leak which check failed.
    RefreshInvalid,
    InvalidCredentials,
    AccountInactive,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::MissingToken => write!(f, "Access token required"),
            AuthError::TokenExpired => write!(f, "Access token expired"),
            AuthError::TokenInvalid => write!(f, "Invalid token"),
            AuthError::RefreshExpired => write!(f, "Refresh token expired"),
            AuthError::RefreshInvalid => write!(f, "Invalid refresh token"),
            AuthError::InvalidCredentials => write!(f, "Invalid username or password"),
            AuthError::AccountInactive => write!(f, "Account is inactive"),
        }
    }
}

impl StdError for AuthError {}

/// Central error type that all application errors map to
#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Database(DatabaseError),
    Auth(AuthError),
    Internal(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Database(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<DatabaseError> for AppError {
    fn from(err: DatabaseError) -> Self {
        AppError::Database(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        let error_msg = err.to_string();

        if error_msg.contains("no rows") {
            AppError::Database(DatabaseError::NotFound("Record not found".to_string()))
        } else if error_msg.contains("pool") || error_msg.contains("connect") {
            AppError::Database(DatabaseError::ConnectionPool(error_msg))
        } else {
            AppError::Database(DatabaseError::UnexpectedError(error_msg))
        }
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Internal(msg)
    }
}

/// Wire shape for every error response: `{ "message": ..., "code": ... }`.
/// The `code` is the machine-readable discriminator clients branch on
/// (`TOKEN_EXPIRED` triggers a refresh, nothing else does).
#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    pub message: String,
    pub code: String,
}

impl AppError {
    fn status_message_code(&self) -> (StatusCode, String, &'static str) {
        match self {
            AppError::Validation(e) => (StatusCode::BAD_REQUEST, e.to_string(), "VALIDATION_ERROR"),

            AppError::Database(e) => match e {
                DatabaseError::NotFound(_) => (StatusCode::NOT_FOUND, e.to_string(), "NOT_FOUND"),
                DatabaseError::ConnectionPool(_) => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Database service temporarily unavailable".to_string(),
                    "SERVICE_UNAVAILABLE",
                ),
                _ => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error occurred".to_string(),
                    "DATABASE_ERROR",
                ),
            },

            AppError::Auth(e) => {
                let status = match e {
                    AuthError::MissingToken
                    | AuthError::TokenExpired
                    | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                    AuthError::TokenInvalid
                    | AuthError::RefreshExpired
                    | AuthError::RefreshInvalid
                    | AuthError::AccountInactive => StatusCode::FORBIDDEN,
                };
                let code = match e {
                    AuthError::MissingToken => "UNAUTHORIZED",
                    AuthError::TokenExpired => "TOKEN_EXPIRED",
                    AuthError::TokenInvalid => "TOKEN_INVALID",
                    AuthError::RefreshExpired => "REFRESH_EXPIRED",
                    AuthError::RefreshInvalid => "REFRESH_INVALID",
                    AuthError::InvalidCredentials => "INVALID_CREDENTIALS",
                    AuthError::AccountInactive => "ACCOUNT_INACTIVE",
                };
                (status, e.to_string(), code)
            }

            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "INTERNAL_ERROR",
            ),
        }
    }

    fn log(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Database(e) => {
                tracing::error!(request_id = request_id, error = %e, "Database error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log(&request_id);

        let (status, message, code) = self.status_message_code();
        HttpResponse::build(status).json(ErrorResponse {
            message,
            code: code.to_string(),
        })
    }

    fn status_code(&self) -> StatusCode {
        self.status_message_code().0
    }
}

/// Error context for request-scoped logging
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub request_id: String,
    pub operation: String,
}

impl ErrorContext {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            operation: operation.into(),
        }
    }
}
