//! Error types for the MySQL MCP Server.
//!
//! All fallible operations return [`DbResult`]. Errors are converted into the
//! response envelope's `{code, message, details}` block at the handler
//! boundary via [`DbError::to_error_detail`], so nothing escapes to the
//! transport layer unhandled.

use crate::models::ErrorDetail;
use thiserror::Error;

/// Error codes carried by the response envelope.
pub mod codes {
    pub const INVALID_PARAMETERS: &str = "INVALID_PARAMETERS";
    pub const SESSION_REQUIRED: &str = "SESSION_REQUIRED";
    pub const SESSION_NOT_FOUND: &str = "SESSION_NOT_FOUND";
    pub const UNSUPPORTED_ACTION: &str = "UNSUPPORTED_ACTION";
    pub const NO_DATABASE_SELECTED: &str = "NO_DATABASE_SELECTED";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const INTERNAL_ERROR: &str = "INTERNAL-ERROR";
}

/// MySQL client error number for "can't connect to server".
pub const CR_CONN_HOST_ERROR: u16 = 2003;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {message}")]
    Database {
        /// MySQL error number, e.g. 1146 for an unknown table
        code: Option<u16>,
        sql_state: Option<String>,
        message: String,
    },

    #[error("Connection failed: {message}")]
    Connection { code: u16, message: String },

    #[error("No active connection found for session ID: {session_id}")]
    SessionNotFound { session_id: String },

    #[error("{message}")]
    InvalidInput { message: String },

    #[error("No database selected")]
    NoDatabaseSelected,

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u64,
    },

    #[error("{message}")]
    Internal { kind: &'static str, message: String },
}

impl DbError {
    /// Create a native database error.
    pub fn database(code: Option<u16>, sql_state: Option<String>, message: impl Into<String>) -> Self {
        Self::Database {
            code,
            sql_state,
            message: message.into(),
        }
    }

    /// Create a connection error carrying a MySQL client error number.
    pub fn connection(code: u16, message: impl Into<String>) -> Self {
        Self::Connection {
            code,
            message: message.into(),
        }
    }

    /// Create a session not found error.
    pub fn session_not_found(session_id: impl Into<String>) -> Self {
        Self::SessionNotFound {
            session_id: session_id.into(),
        }
    }

    /// Create an invalid input error.
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an internal error tagged with the kind of the underlying failure.
    pub fn internal(kind: &'static str, message: impl Into<String>) -> Self {
        Self::Internal {
            kind,
            message: message.into(),
        }
    }

    /// The MySQL error number, when this error came from the server or client library.
    pub fn mysql_code(&self) -> Option<u16> {
        match self {
            Self::Database { code, .. } => *code,
            Self::Connection { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Convert into the `error` block of the response envelope.
    pub fn to_error_detail(&self) -> ErrorDetail {
        match self {
            Self::Database {
                code,
                sql_state,
                message,
            } => match code {
                Some(code) => mysql_error_detail(*code, message, sql_state.as_deref()),
                None => ErrorDetail::new("MYSQL-ERROR", message.clone())
                    .with_details_opt(sql_state.as_ref().map(|s| format!("SQLSTATE {}", s))),
            },
            Self::Connection { code, message } => mysql_error_detail(*code, message, None),
            Self::SessionNotFound { .. } => {
                ErrorDetail::new(codes::SESSION_NOT_FOUND, self.to_string()).with_details(
                    "The session may have expired or been closed; call test_connection to open a new one",
                )
            }
            Self::InvalidInput { message } => {
                ErrorDetail::new(codes::INVALID_PARAMETERS, message.clone())
            }
            Self::NoDatabaseSelected => ErrorDetail::new(codes::NO_DATABASE_SELECTED, self.to_string())
                .with_details("Specify a database in the connection settings"),
            Self::Timeout { .. } => ErrorDetail::new(codes::TIMEOUT, self.to_string()),
            Self::Internal { kind, message } => {
                ErrorDetail::new(codes::INTERNAL_ERROR, message.clone()).with_details(*kind)
            }
        }
    }
}

/// Friendlier text for the MySQL errors callers hit most often.
fn friendly_message(code: u16) -> Option<&'static str> {
    match code {
        1045 => Some("Access denied. Please check your username and password."),
        1049 => Some("Database does not exist."),
        1044 => Some("Access denied for the specified database."),
        CR_CONN_HOST_ERROR => Some("Could not connect to MySQL server. Please verify host and port."),
        _ => None,
    }
}

fn mysql_error_detail(code: u16, message: &str, sql_state: Option<&str>) -> ErrorDetail {
    let code_str = format!("MYSQL-{}", code);
    match friendly_message(code) {
        // Keep the server's own wording around when we replace it
        Some(friendly) => ErrorDetail::new(code_str, friendly).with_details(message),
        None => ErrorDetail::new(code_str, message)
            .with_details_opt(sql_state.map(|s| format!("SQLSTATE {}", s))),
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Database(db_err) => {
                let sql_state = db_err.code().map(|c| c.to_string());
                let code = db_err
                    .try_downcast_ref::<sqlx::mysql::MySqlDatabaseError>()
                    .map(|e| e.number());
                DbError::database(code, sql_state, db_err.message())
            }
            sqlx::Error::Io(io_err) => {
                DbError::connection(CR_CONN_HOST_ERROR, format!("I/O error: {}", io_err))
            }
            sqlx::Error::Configuration(msg) => {
                DbError::internal("ConfigurationError", msg.to_string())
            }
            sqlx::Error::Tls(tls_err) => DbError::internal("TlsError", tls_err.to_string()),
            sqlx::Error::Protocol(msg) => DbError::internal("ProtocolError", msg),
            sqlx::Error::RowNotFound => DbError::internal("RowNotFound", "No rows returned"),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal("ColumnNotFound", format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnDecode { index, source } => DbError::internal(
                "ColumnDecodeError",
                format!("Failed to decode column {}: {}", index, source),
            ),
            sqlx::Error::Decode(source) => {
                DbError::internal("DecodeError", format!("Decode error: {}", source))
            }
            sqlx::Error::WorkerCrashed => {
                DbError::internal("WorkerCrashed", "Database worker crashed")
            }
            other => DbError::internal("DriverError", other.to_string()),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;
