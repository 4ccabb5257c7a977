//! Channel collaborator traits.
//!
//! The probe never opens connections itself. A [`ChannelSession`] owns the
//! connection and channel lifecycle and lends the probe a [`Channel`] for the
//! duration of one invocation.

use crate::error::ChannelError;
use crate::properties::MessageProperties;

/// An open channel capable of publishing and, optionally, transactions.
///
/// All calls block until the broker client has completed the operation.
pub trait Channel {
    /// Publish one message.
    fn publish(
        &mut self,
        exchange: &str,
        routing_key: &str,
        properties: &MessageProperties,
        body: &[u8],
    ) -> Result<(), ChannelError>;

    /// Put the channel into transactional mode (tx.select).
    fn begin_transaction_mode(&mut self) -> Result<(), ChannelError>;

    /// Commit the current transaction (tx.commit).
    fn commit_transaction(&mut self) -> Result<(), ChannelError>;
}

/// Whether [`ChannelSession::init_channel`] opened a new channel or handed back
/// the one from a previous call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Opened,
    Reused,
}

/// Owner of the connection and channel lifecycle.
pub trait ChannelSession {
    type Channel: Channel;

    /// Open the channel if needed and return it.
    ///
    /// Calling this on an already initialized session returns the existing
    /// channel with [`ChannelStatus::Reused`].
    fn init_channel(&mut self) -> Result<(&mut Self::Channel, ChannelStatus), ChannelError>;

    /// Base properties inherited by every message published on this session.
    fn base_properties(&self) -> MessageProperties {
        MessageProperties::default()
    }

    /// Release the channel and connection. The next `init_channel` starts over.
    fn cleanup(&mut self);
}
