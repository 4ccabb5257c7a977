//! In-memory channel and session stubs.
//!
//! These record every call the probe makes and can be told to fail at a
//! specific point, which is all the publish tests need from a broker.

use probe_common::{
    Channel, ChannelError, ChannelSession, ChannelStatus, MessageProperties,
};

/// One recorded publish attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishCall {
    pub exchange: String,
    pub routing_key: String,
    pub properties: MessageProperties,
    pub body: Vec<u8>,
}

/// Channel that records calls instead of talking to a broker.
#[derive(Debug, Default)]
pub struct StubChannel {
    /// Every publish attempt, including one that was made to fail.
    pub publish_calls: Vec<PublishCall>,
    pub transaction_mode_calls: usize,
    pub commit_calls: usize,
    fail_publish_on: Option<(usize, String)>,
    fail_every_publish: Option<String>,
    fail_commit: Option<String>,
    fail_transaction_mode: Option<String>,
}

impl StubChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the `n`th publish call (1-based) with `message`.
    pub fn fail_on_publish(mut self, n: usize, message: impl Into<String>) -> Self {
        self.fail_publish_on = Some((n, message.into()));
        self
    }

    /// Fail every publish call with `message`.
    pub fn fail_every_publish(mut self, message: impl Into<String>) -> Self {
        self.fail_every_publish = Some(message.into());
        self
    }

    pub fn fail_commit(mut self, message: impl Into<String>) -> Self {
        self.fail_commit = Some(message.into());
        self
    }

    pub fn fail_transaction_mode(mut self, message: impl Into<String>) -> Self {
        self.fail_transaction_mode = Some(message.into());
        self
    }

    pub fn publish_count(&self) -> usize {
        self.publish_calls.len()
    }
}

impl Channel for StubChannel {
    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        properties: &MessageProperties,
        body: &[u8],
    ) -> Result<(), ChannelError> {
        self.publish_calls.push(PublishCall {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            properties: properties.clone(),
            body: body.to_vec(),
        });

        if let Some(message) = &self.fail_every_publish {
            return Err(ChannelError::new(message));
        }
        match &self.fail_publish_on {
            Some((n, message)) if *n == self.publish_calls.len() => {
                Err(ChannelError::new(message))
            }
            _ => Ok(()),
        }
    }

    fn begin_transaction_mode(&mut self) -> Result<(), ChannelError> {
        self.transaction_mode_calls += 1;
        match &self.fail_transaction_mode {
            Some(message) => Err(ChannelError::new(message)),
            None => Ok(()),
        }
    }

    fn commit_transaction(&mut self) -> Result<(), ChannelError> {
        self.commit_calls += 1;
        match &self.fail_commit {
            Some(message) => Err(ChannelError::new(message)),
            None => Ok(()),
        }
    }
}

/// Session wrapping a [`StubChannel`].
#[derive(Debug, Default)]
pub struct StubSession {
    pub channel: StubChannel,
    pub base: MessageProperties,
    pub init_calls: usize,
    pub cleanup_calls: usize,
    open: bool,
    fail_init: Option<String>,
}

impl StubSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(channel: StubChannel) -> Self {
        Self {
            channel,
            ..Self::default()
        }
    }

    /// Make every `init_channel` call fail with `message`.
    pub fn failing_init(mut self, message: impl Into<String>) -> Self {
        self.fail_init = Some(message.into());
        self
    }

    pub fn with_base_properties(mut self, base: MessageProperties) -> Self {
        self.base = base;
        self
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl ChannelSession for StubSession {
    type Channel = StubChannel;

    fn init_channel(&mut self) -> Result<(&mut StubChannel, ChannelStatus), ChannelError> {
        self.init_calls += 1;
        if let Some(message) = &self.fail_init {
            return Err(ChannelError::new(message));
        }

        let status = if self.open {
            ChannelStatus::Reused
        } else {
            self.open = true;
            ChannelStatus::Opened
        };
        Ok((&mut self.channel, status))
    }

    fn base_properties(&self) -> MessageProperties {
        self.base.clone()
    }

    fn cleanup(&mut self) {
        self.cleanup_calls += 1;
        self.open = false;
    }
}
