//! Shared test utilities for the publish probe workspace.
//!
//! This crate provides common testing infrastructure including:
//! - Stub channel and session that record calls and inject failures
//! - A file server wrapper that counts storage reads
//! - Temp-dir message file builders
//! - Common test fixtures
//!
//! # Usage
//!
//! Add to your crate's `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test-utils = { path = "../test-utils" }
//! ```

pub mod files;
pub mod fixtures;
pub mod generators;
pub mod stub;

// Re-export commonly used items at the crate root
pub use files::CountingFileServer;
pub use generators::*;
pub use stub::{PublishCall, StubChannel, StubSession};
