//! Message properties attached to every publish.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Durability hint for a published message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    #[default]
    Transient,
    Durable,
}

impl DeliveryMode {
    /// Map the persistent flag onto a delivery mode.
    pub fn from_persistent(persistent: bool) -> Self {
        if persistent {
            DeliveryMode::Durable
        } else {
            DeliveryMode::Transient
        }
    }

    /// Wire value: 1 = transient, 2 = durable.
    pub fn as_u8(&self) -> u8 {
        match self {
            DeliveryMode::Transient => 1,
            DeliveryMode::Durable => 2,
        }
    }
}

/// Basic properties of an outgoing message.
///
/// Fields left as `None` are not sent. The session layer supplies a base set
/// (content type, headers and so on) which the probe overrides with its own
/// delivery mode and correlation metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageProperties {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    pub delivery_mode: Option<DeliveryMode>,
    pub priority: Option<u8>,
    pub correlation_id: Option<String>,
    pub reply_to: Option<String>,
    pub expiration: Option<String>,
    pub message_id: Option<String>,
    /// Seconds since the Unix epoch.
    pub timestamp: Option<u64>,
    pub message_type: Option<String>,
    pub user_id: Option<String>,
    pub app_id: Option<String>,
    pub cluster_id: Option<String>,
}

impl MessageProperties {
    pub fn with_delivery_mode(mut self, mode: DeliveryMode) -> Self {
        self.delivery_mode = Some(mode);
        self
    }

    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    pub fn with_reply_to(mut self, queue: impl Into<String>) -> Self {
        self.reply_to = Some(queue.into());
        self
    }

    pub fn with_message_type(mut self, kind: impl Into<String>) -> Self {
        self.message_type = Some(kind.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}
