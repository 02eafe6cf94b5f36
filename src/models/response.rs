//! Response envelope.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

/// The `error` block of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn with_details_opt(mut self, details: Option<String>) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseMetadata {
    /// Seconds spent handling the request
    pub execution_time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
    /// Seconds spent executing the statement itself
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query_execution_time: Option<f64>,
}

/// Every action answers with one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ResponseMetadata>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl Response {
    /// A successful response carrying `data` and the elapsed handling time.
    pub fn success(data: JsonValue, elapsed: Duration) -> Self {
        Self {
            success: true,
            data: Some(data),
            metadata: Some(ResponseMetadata {
                execution_time: elapsed.as_secs_f64(),
                ..Default::default()
            }),
            error: None,
        }
    }

    /// A failed response. Failures caught before any work started carry no metadata.
    pub fn failure(error: ErrorDetail, elapsed: Option<Duration>) -> Self {
        Self {
            success: false,
            data: None,
            metadata: elapsed.map(|e| ResponseMetadata {
                execution_time: e.as_secs_f64(),
                ..Default::default()
            }),
            error: Some(error),
        }
    }

    pub fn with_row_count(mut self, row_count: u64) -> Self {
        if let Some(metadata) = self.metadata.as_mut() {
            metadata.row_count = Some(row_count);
        }
        self
    }

    pub fn with_query_execution_time(mut self, elapsed: Duration) -> Self {
        if let Some(metadata) = self.metadata.as_mut() {
            metadata.query_execution_time = Some(elapsed.as_secs_f64());
        }
        self
    }

    /// Error code, if this is a failure.
    pub fn error_code(&self) -> Option<&str> {
        self.error.as_ref().map(|e| e.code.as_str())
    }
}
