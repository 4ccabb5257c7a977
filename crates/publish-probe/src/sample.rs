//! Per-invocation result record.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;

use probe_common::{ProbeError, ResponseCode};

/// Outcome of one probe invocation.
#[derive(Debug, Clone, Serialize)]
pub struct SampleResult {
    pub label: String,
    pub success: bool,
    pub response_code: ResponseCode,
    pub response_message: String,
    pub response_data: String,
    /// Payload text that was sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sampler_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_us: Option<u64>,
    pub messages_published: u32,
    pub bytes_published: u64,
    #[serde(skip)]
    start: Option<Instant>,
}

impl SampleResult {
    /// A result that counts as a setup failure until proven otherwise.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            success: false,
            response_code: ResponseCode::SetupFailure,
            response_message: String::new(),
            response_data: String::new(),
            sampler_data: None,
            started_at: None,
            elapsed_us: None,
            messages_published: 0,
            bytes_published: 0,
            start: None,
        }
    }

    /// Start timing.
    pub fn sample_start(&mut self) {
        self.start = Some(Instant::now());
        self.started_at = Some(Utc::now());
    }

    /// Stop timing. Does nothing if timing never started or already stopped.
    pub fn sample_end(&mut self) {
        if let Some(start) = self.start.take() {
            self.elapsed_us = Some(start.elapsed().as_micros() as u64);
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        self.elapsed_us.map(Duration::from_micros)
    }

    /// Whether timing was recorded for this result.
    pub fn is_timed(&self) -> bool {
        self.elapsed_us.is_some()
    }

    pub fn mark_success(&mut self) {
        self.success = true;
        self.response_code = ResponseCode::Ok;
        self.response_message = "OK".to_string();
        self.response_data = "OK".to_string();
    }

    pub fn mark_failure(&mut self, err: &ProbeError) {
        self.success = false;
        self.response_code = err.response_code();
        self.response_message = err.to_string();
    }
}
