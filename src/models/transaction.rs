//! Transaction data models.

use serde::Serialize;

/// Isolation levels accepted by `SET TRANSACTION ISOLATION LEVEL`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub const VALID_VALUES: &'static str =
        "READ UNCOMMITTED, READ COMMITTED, REPEATABLE READ, SERIALIZABLE";

    /// Parse a level name, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_uppercase().as_str() {
            "READ UNCOMMITTED" => Some(Self::ReadUncommitted),
            "READ COMMITTED" => Some(Self::ReadCommitted),
            "REPEATABLE READ" => Some(Self::RepeatableRead),
            "SERIALIZABLE" => Some(Self::Serializable),
            _ => None,
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

impl std::fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Transaction control operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionOperation {
    Begin,
    Commit,
    Rollback,
}

impl TransactionOperation {
    pub const VALID_VALUES: &'static str = "begin, commit, rollback";

    /// Parse an operation name, ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "begin" => Some(Self::Begin),
            "commit" => Some(Self::Commit),
            "rollback" => Some(Self::Rollback),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Begin => "begin",
            Self::Commit => "commit",
            Self::Rollback => "rollback",
        }
    }

    /// Status text reported after the operation succeeds.
    pub fn status_message(&self) -> &'static str {
        match self {
            Self::Begin => "Transaction started",
            Self::Commit => "Transaction committed",
            Self::Rollback => "Transaction rolled back",
        }
    }
}

/// Outcome of a begin/commit/rollback request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionResult {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isolation_level: Option<String>,
    pub status: String,
}

impl TransactionResult {
    pub fn new(operation: TransactionOperation) -> Self {
        Self {
            operation: operation.as_str().to_string(),
            isolation_level: None,
            status: operation.status_message().to_string(),
        }
    }

    pub fn with_isolation_level(mut self, level: IsolationLevel) -> Self {
        self.isolation_level = Some(level.as_sql().to_string());
        self
    }
}

/// Transaction state read back from the connection. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionStatus {
    pub in_transaction: bool,
    pub autocommit: bool,
    pub isolation_level: Option<String>,
}
