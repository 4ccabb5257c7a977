//! Message publishing probe for AMQP load tests.
//!
//! A [`PublishProbe`] takes a [`ProbeConfig`] and a borrowed channel session,
//! publishes the configured message a fixed number of times, optionally
//! commits, and reports one [`SampleResult`] per invocation.
//!
//! ```ignore
//! use publish_probe::{AmqpSession, ProbeConfig, PublishProbe, SessionConfig};
//!
//! let mut session = AmqpSession::new(SessionConfig::new(uri), handle);
//! let mut probe = PublishProbe::new("orders");
//! let result = probe.run_invocation(&mut session, &ProbeConfig::text("ex1", "rk", "ping"));
//! assert!(result.success);
//! ```

pub mod amqp;
pub mod config;
pub mod content;
pub mod probe;
pub mod sample;

pub use amqp::{AmqpChannel, AmqpSession, ExchangeDeclaration, SessionConfig};
pub use config::{MessageSource, ProbeConfig};
pub use content::{CacheStats, ContentResolver, FileCache};
pub use probe::{publish_properties, InterruptHandle, Outcome, ProbeState, PublishProbe};
pub use sample::SampleResult;

pub use probe_common::{ProbeError, ProbeResult, ResponseCode};
