//! Probe configuration and the flat property-set surface.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use probe_common::{DeliveryMode, ProbeError, ProbeResult};

// Persisted key names. Existing test plans store these, so they must not change.
pub const KEY_EXCHANGE: &str = "AMQPSampler.Exchange";
pub const KEY_ITERATIONS: &str = "AMQPSampler.Iterations";
pub const KEY_MESSAGE: &str = "AMQPPublisher.Message";
pub const KEY_ROUTING_KEY: &str = "AMQPPublisher.MessageRoutingKey";
pub const KEY_MESSAGE_TYPE: &str = "AMQPPublisher.MessageType";
pub const KEY_REPLY_TO_QUEUE: &str = "AMQPPublisher.ReplyToQueue";
pub const KEY_CORRELATION_ID: &str = "AMQPPublisher.CorrelationId";
pub const KEY_PERSISTENT: &str = "AMQPConsumer.Persistent";
pub const KEY_USE_TX: &str = "AMQPConsumer.UseTx";
pub const KEY_MESSAGE_SOURCE: &str = "AMQPConsumer.MessageSource";
pub const KEY_INPUT_FILE: &str = "AMQPConsumer.InputFile";
pub const KEY_RANDOM_PATH: &str = "AMQPConsumer.RandomPath";

/// Suffixes eligible for random file selection.
pub const RANDOM_FILE_SUFFIXES: &[&str] = &[".txt"];

/// Where the message body comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageSource {
    #[default]
    Text,
    File,
    RandomFileInDirectory,
}

impl MessageSource {
    /// Value stored in the property set.
    pub fn property_value(&self) -> &'static str {
        match self {
            MessageSource::Text => "jms_use_text",
            MessageSource::File => "jms_use_file",
            MessageSource::RandomFileInDirectory => "jms_use_random_file",
        }
    }

    /// Parse a stored value. Anything unrecognised is treated as inline text.
    pub fn from_property_value(value: &str) -> Self {
        match value {
            "jms_use_file" => MessageSource::File,
            "jms_use_random_file" => MessageSource::RandomFileInDirectory,
            _ => MessageSource::Text,
        }
    }
}

/// Settings for one probe. Immutable for the duration of an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    #[serde(default)]
    pub exchange: String,
    #[serde(default)]
    pub routing_key: String,
    #[serde(default)]
    pub message_type: String,
    #[serde(default)]
    pub correlation_id: String,
    #[serde(default)]
    pub reply_to_queue: String,
    #[serde(default)]
    pub persistent: bool,
    #[serde(default)]
    pub use_transaction: bool,
    #[serde(default)]
    pub message_source: MessageSource,
    #[serde(default)]
    pub inline_text: String,
    #[serde(default)]
    pub file_path: PathBuf,
    #[serde(default)]
    pub random_directory: PathBuf,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
}

fn default_iterations() -> u32 {
    1
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            exchange: String::new(),
            routing_key: String::new(),
            message_type: String::new(),
            correlation_id: String::new(),
            reply_to_queue: String::new(),
            persistent: false,
            use_transaction: false,
            message_source: MessageSource::Text,
            inline_text: String::new(),
            file_path: PathBuf::new(),
            random_directory: PathBuf::new(),
            iterations: default_iterations(),
        }
    }
}

impl ProbeConfig {
    /// Config publishing `text` to `exchange` with `routing_key`.
    pub fn text(exchange: impl Into<String>, routing_key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
            inline_text: text.into(),
            ..Self::default()
        }
    }

    pub fn delivery_mode(&self) -> DeliveryMode {
        DeliveryMode::from_persistent(self.persistent)
    }

    /// Load from a flat property set. Missing keys take their defaults.
    pub fn from_properties(props: &HashMap<String, String>) -> ProbeResult<Self> {
        let string = |key: &str| props.get(key).cloned().unwrap_or_default();

        Ok(Self {
            exchange: string(KEY_EXCHANGE),
            routing_key: string(KEY_ROUTING_KEY),
            message_type: string(KEY_MESSAGE_TYPE),
            correlation_id: string(KEY_CORRELATION_ID),
            reply_to_queue: string(KEY_REPLY_TO_QUEUE),
            persistent: parse_bool(props, KEY_PERSISTENT, false)?,
            use_transaction: parse_bool(props, KEY_USE_TX, false)?,
            message_source: props
                .get(KEY_MESSAGE_SOURCE)
                .map(|v| MessageSource::from_property_value(v))
                .unwrap_or_default(),
            inline_text: string(KEY_MESSAGE),
            file_path: PathBuf::from(string(KEY_INPUT_FILE)),
            random_directory: PathBuf::from(string(KEY_RANDOM_PATH)),
            iterations: parse_iterations(props)?,
        })
    }

    /// Store as a flat property set.
    pub fn to_properties(&self) -> HashMap<String, String> {
        let entries = [
            (KEY_EXCHANGE, self.exchange.clone()),
            (KEY_ROUTING_KEY, self.routing_key.clone()),
            (KEY_MESSAGE_TYPE, self.message_type.clone()),
            (KEY_CORRELATION_ID, self.correlation_id.clone()),
            (KEY_REPLY_TO_QUEUE, self.reply_to_queue.clone()),
            (KEY_PERSISTENT, self.persistent.to_string()),
            (KEY_USE_TX, self.use_transaction.to_string()),
            (KEY_MESSAGE_SOURCE, self.message_source.property_value().to_string()),
            (KEY_MESSAGE, self.inline_text.clone()),
            (KEY_INPUT_FILE, self.file_path.display().to_string()),
            (KEY_RANDOM_PATH, self.random_directory.display().to_string()),
            (KEY_ITERATIONS, self.iterations.to_string()),
        ];
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Check that the selected message source has what it needs.
    pub fn validate(&self) -> ProbeResult<()> {
        match self.message_source {
            MessageSource::File if self.file_path.as_os_str().is_empty() => Err(ProbeError::Config {
                key: KEY_INPUT_FILE.to_string(),
                message: "file message source requires a file path".to_string(),
            }),
            MessageSource::RandomFileInDirectory if self.random_directory.as_os_str().is_empty() => {
                Err(ProbeError::Config {
                    key: KEY_RANDOM_PATH.to_string(),
                    message: "random file message source requires a directory".to_string(),
                })
            }
            _ => Ok(()),
        }
    }
}

fn parse_bool(props: &HashMap<String, String>, key: &str, default: bool) -> ProbeResult<bool> {
    match props.get(key).map(|v| v.trim()) {
        None | Some("") => Ok(default),
        Some(v) if v.eq_ignore_ascii_case("true") => Ok(true),
        Some(v) if v.eq_ignore_ascii_case("false") => Ok(false),
        Some(v) => Err(ProbeError::Config {
            key: key.to_string(),
            message: format!("expected true or false, got '{}'", v),
        }),
    }
}

fn parse_iterations(props: &HashMap<String, String>) -> ProbeResult<u32> {
    match props.get(KEY_ITERATIONS).map(|v| v.trim()) {
        None | Some("") => Ok(default_iterations()),
        Some(v) => v.parse().map_err(|_| ProbeError::Config {
            key: KEY_ITERATIONS.to_string(),
            message: format!("expected a non-negative integer, got '{}'", v),
        }),
    }
}
