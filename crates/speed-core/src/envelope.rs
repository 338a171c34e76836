use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{ActionError, ErrorKind};

/// Message carried by every successful response.
pub const SUCCESS_MESSAGE: &str = "Успешно";

/// Request parameters: string values, `null` allowed.
pub type Parameters = BTreeMap<String, Option<String>>;

/// An RPC request as it arrives in a queue message body.
///
/// Besides the canonical `{"operation": ..., "parameters": {...}}` shape the
/// decoder accepts `report_type` for `operation` and flat top-level string
/// parameters (`{"report_type": "date_range", "start_date": "..."}`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireRequest")]
pub struct Request {
    pub operation: String,
    pub parameters: Parameters,
}

#[derive(Deserialize)]
struct WireRequest {
    #[serde(alias = "report_type")]
    operation: String,
    #[serde(default)]
    parameters: Parameters,
    #[serde(flatten)]
    extra: Parameters,
}

impl From<WireRequest> for Request {
    fn from(wire: WireRequest) -> Self {
        let mut parameters = wire.parameters;
        for (key, value) in wire.extra {
            parameters.entry(key).or_insert(value);
        }
        Self {
            operation: wire.operation,
            parameters,
        }
    }
}

impl Request {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            parameters: Parameters::new(),
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), Some(value.into()));
        self
    }

    /// Decode a request from a UTF-8 JSON message body.
    pub fn from_slice(body: &[u8]) -> Result<Self, ActionError> {
        Ok(serde_json::from_slice(body)?)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }
}

/// Look up a non-null, non-empty parameter.
pub fn param<'a>(parameters: &'a Parameters, key: &str) -> Option<&'a str> {
    parameters
        .get(key)
        .and_then(|v| v.as_deref())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// The reply envelope. This is the only payload that crosses the queue
/// boundary in the reply direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub message: String,
    #[serde(default)]
    pub result: Vec<String>,
}

impl Response {
    pub fn ok(result: Vec<String>) -> Self {
        Self {
            status: Status::Ok,
            message: SUCCESS_MESSAGE.into(),
            result,
        }
    }

    /// Build an `ERROR` response. An empty message is replaced so that error
    /// responses always say something.
    pub fn error(message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.trim().is_empty() {
            message = ErrorKind::ActionExecution.message().into();
        }
        Self {
            status: Status::Error,
            message,
            result: Vec::new(),
        }
    }

    pub fn from_error(err: &ActionError) -> Self {
        Self::error(err.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.status == Status::Ok
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
