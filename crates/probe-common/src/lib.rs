//! Common types and collaborator traits shared by the publish probe crates.

pub mod channel;
pub mod error;
pub mod files;
pub mod properties;

pub use channel::{Channel, ChannelSession, ChannelStatus};
pub use error::{ChannelError, ProbeError, ProbeResult, ResponseCode};
pub use files::{FileServer, LocalFileServer};
pub use properties::{DeliveryMode, MessageProperties};
