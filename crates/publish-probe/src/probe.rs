//! The publish probe: one measured publish cycle per invocation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use probe_common::{
    Channel, ChannelSession, ChannelStatus, FileServer, LocalFileServer, MessageProperties,
    ProbeError, ProbeResult,
};

use crate::config::ProbeConfig;
use crate::content::ContentResolver;
use crate::sample::SampleResult;

/// How the last invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
}

/// Lifecycle of a probe, reset on every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeState {
    Uninitialized,
    ChannelReady,
    Publishing,
    Completed(Outcome),
}

/// Thread-safe handle used to request teardown of a probe's channel.
///
/// Raising it never aborts a publish in flight. The probe checks it at the
/// start of its next invocation, releases the session and reinitializes.
#[derive(Debug, Clone, Default)]
pub struct InterruptHandle {
    raised: Arc<AtomicBool>,
}

impl InterruptHandle {
    pub fn interrupt(&self) {
        self.raised.store(true, Ordering::SeqCst);
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    fn take(&self) -> bool {
        self.raised.swap(false, Ordering::SeqCst)
    }
}

/// Build the properties for this probe's messages.
///
/// Everything comes from the session's base properties except the delivery
/// mode, correlation id, reply-to queue and message type, which the
/// configuration overrides.
pub fn publish_properties(base: &MessageProperties, config: &ProbeConfig) -> MessageProperties {
    base.clone()
        .with_delivery_mode(config.delivery_mode())
        .with_correlation_id(config.correlation_id.as_str())
        .with_reply_to(config.reply_to_queue.as_str())
        .with_message_type(config.message_type.as_str())
}

/// Publishes a configured message to an exchange and reports a sample result.
///
/// A probe is driven by a single worker; none of its state is shared. The
/// file cache lives as long as the probe and survives across invocations.
#[derive(Debug)]
pub struct PublishProbe<F = LocalFileServer> {
    label: String,
    content: ContentResolver<F>,
    interrupt: InterruptHandle,
    state: ProbeState,
}

impl PublishProbe<LocalFileServer> {
    pub fn new(label: impl Into<String>) -> Self {
        Self::with_file_server(label, LocalFileServer)
    }
}

impl<F: FileServer> PublishProbe<F> {
    pub fn with_file_server(label: impl Into<String>, files: F) -> Self {
        Self {
            label: label.into(),
            content: ContentResolver::new(files),
            interrupt: InterruptHandle::default(),
            state: ProbeState::Uninitialized,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn state(&self) -> ProbeState {
        self.state
    }

    pub fn content(&self) -> &ContentResolver<F> {
        &self.content
    }

    /// Resolve the message text for `config` without publishing.
    pub fn resolve_content(&mut self, config: &ProbeConfig) -> ProbeResult<String> {
        self.content.resolve(config)
    }

    pub fn interrupt_handle(&self) -> InterruptHandle {
        self.interrupt.clone()
    }

    /// Tear down the session right away. Always returns `true`.
    pub fn interrupt<S: ChannelSession>(&mut self, session: &mut S) -> bool {
        self.interrupt.take();
        session.cleanup();
        self.state = ProbeState::Uninitialized;
        true
    }

    /// Run one invocation: publish `config.iterations` identical messages and
    /// commit if transactions are enabled.
    ///
    /// Never panics and never returns an error; every failure is reported in
    /// the returned [`SampleResult`].
    pub fn run_invocation<S: ChannelSession>(
        &mut self,
        session: &mut S,
        config: &ProbeConfig,
    ) -> SampleResult {
        if self.interrupt.take() {
            debug!(label = %self.label, "Interrupt raised, releasing channel");
            session.cleanup();
            self.state = ProbeState::Uninitialized;
        }

        let mut result = SampleResult::new(self.label.as_str());
        let base = session.base_properties();

        let channel = match prepare_channel(session, config) {
            Ok(channel) => channel,
            Err(err) => {
                error!(label = %self.label, error = %err, "Failed to initialize channel");
                // Drop any half-open channel so the next invocation starts clean.
                session.cleanup();
                result.mark_failure(&err);
                self.state = ProbeState::Uninitialized;
                return result;
            }
        };
        self.state = ProbeState::ChannelReady;

        let body = match self.content.resolve(config) {
            Ok(body) => body,
            Err(err) => {
                result.sample_start();
                result.sample_end();
                return self.fail(result, &err);
            }
        };
        let properties = publish_properties(&base, config);

        self.state = ProbeState::Publishing;
        result.sample_start();
        let published = publish_all(channel, config, &properties, body.as_bytes(), &mut result);
        result.sample_end();

        match published {
            Ok(()) => {
                debug!(
                    label = %self.label,
                    messages = result.messages_published,
                    elapsed_us = result.elapsed_us.unwrap_or_default(),
                    "Invocation complete"
                );
                result.sampler_data = Some(body);
                result.mark_success();
                self.state = ProbeState::Completed(Outcome::Success);
                result
            }
            Err(err) => {
                if config.use_transaction {
                    // Uncommitted publishes must not leak into the next commit.
                    session.cleanup();
                }
                self.fail(result, &err)
            }
        }
    }

    fn fail(&mut self, mut result: SampleResult, err: &ProbeError) -> SampleResult {
        debug!(label = %self.label, error = %err, "Invocation failed");
        result.mark_failure(err);
        self.state = ProbeState::Completed(Outcome::Failure);
        result
    }
}

/// Initialize the session's channel, entering transaction mode when a new
/// channel was opened for a transactional probe.
fn prepare_channel<'a, S: ChannelSession>(
    session: &'a mut S,
    config: &ProbeConfig,
) -> ProbeResult<&'a mut S::Channel> {
    let (channel, status) = session
        .init_channel()
        .map_err(|e| ProbeError::Setup(e.to_string()))?;

    if config.use_transaction && status == ChannelStatus::Opened {
        channel.begin_transaction_mode().map_err(|e| {
            warn!(error = %e, "Failed to enter transaction mode");
            ProbeError::Setup(e.to_string())
        })?;
    }
    Ok(channel)
}

fn publish_all<C: Channel>(
    channel: &mut C,
    config: &ProbeConfig,
    properties: &MessageProperties,
    body: &[u8],
    result: &mut SampleResult,
) -> ProbeResult<()> {
    for _ in 0..config.iterations {
        channel.publish(&config.exchange, &config.routing_key, properties, body)?;
        result.messages_published += 1;
        result.bytes_published += body.len() as u64;
    }

    if config.use_transaction {
        channel.commit_transaction()?;
    }
    Ok(())
}
