//! Load testing framework for the AMQP publish probe.
//!
//! This crate provides tools to:
//! - Load publish scenarios from YAML
//! - Run many blocking probe workers concurrently against a broker
//! - Collect invocation latency and throughput metrics
//! - Output results in multiple formats (console, JSON, CSV)

pub mod config;
pub mod metrics;
pub mod report;
pub mod runner;

pub use config::{redact_uri, TestConfig};
pub use metrics::{MetricsCollector, TargetInfo, TestResults};
pub use report::ResultsReport;
pub use runner::{LoadRunner, StopSignal, WorkerSample};
