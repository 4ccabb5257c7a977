//! Error types for the publish probe.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Result type alias using ProbeError.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Primary error type for probe operations.
#[derive(Debug, Error)]
pub enum ProbeError {
    // === Setup Errors ===
    #[error("Channel setup failed: {0}")]
    Setup(String),

    // === Content Errors ===
    #[error("Failed to read message content from '{path}': {message}")]
    ContentResolution { path: String, message: String },

    // === Broker Errors ===
    #[error("Publish failed: {0}")]
    Publish(String),

    // === Configuration Errors ===
    #[error("Invalid value for '{key}': {message}")]
    Config { key: String, message: String },
}

impl ProbeError {
    /// Build a content resolution error for the given path.
    pub fn content(path: impl Into<String>, message: impl fmt::Display) -> Self {
        ProbeError::ContentResolution {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Get the response code reported for this error.
    pub fn response_code(&self) -> ResponseCode {
        match self {
            ProbeError::Setup(_) => ResponseCode::SetupFailure,
            _ => ResponseCode::PublishFailure,
        }
    }
}

/// Error text surfaced by a channel implementation.
///
/// Broker clients carry their own error types; the probe only keeps the
/// description so it can be attached to the sample result.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ChannelError(pub String);

impl ChannelError {
    pub fn new(message: impl fmt::Display) -> Self {
        ChannelError(message.to_string())
    }
}

impl From<ChannelError> for ProbeError {
    fn from(err: ChannelError) -> Self {
        ProbeError::Publish(err.0)
    }
}

/// Status code attached to every sample result.
///
/// Serialized as its numeric string, the same form reports and logs use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseCode {
    /// All publishes (and the commit, if any) succeeded.
    Ok,
    /// The channel could not be initialized.
    SetupFailure,
    /// Content resolution, a publish or the commit failed.
    PublishFailure,
}

impl ResponseCode {
    /// The code as it appears in result files.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseCode::Ok => "200",
            ResponseCode::SetupFailure => "500",
            ResponseCode::PublishFailure => "000",
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, ResponseCode::Ok)
    }

    /// Parse a code written by [`ResponseCode::as_str`].
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "200" => Some(ResponseCode::Ok),
            "500" => Some(ResponseCode::SetupFailure),
            "000" => Some(ResponseCode::PublishFailure),
            _ => None,
        }
    }
}

impl Serialize for ResponseCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResponseCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        ResponseCode::from_code(&code)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown response code '{}'", code)))
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
