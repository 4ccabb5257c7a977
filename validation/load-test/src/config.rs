//! Scenario loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use probe_common::MessageProperties;
use publish_probe::{ExchangeDeclaration, ProbeConfig, SessionConfig};

/// Main test configuration loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Broker URI. Usually supplied through `AMQP_URI` or `--uri` instead.
    #[serde(default)]
    pub uri: String,
    pub duration_secs: u64,
    pub concurrency: u32,
    /// Total invocation rate across all workers.
    #[serde(default)]
    pub invocations_per_second: Option<f64>,
    #[serde(default)]
    pub warmup_secs: u64,
    #[serde(default)]
    pub declare_exchange: Option<ExchangeDeclaration>,
    #[serde(default)]
    pub base_properties: MessageProperties,
    pub probe: ProbeConfig,
    #[serde(default)]
    pub log_samples: bool, // Log every sample to a JSONL file
}

impl TestConfig {
    /// Load configuration from YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TestConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Smoke test config spreading `invocations` over at least five seconds
    /// at roughly ten per second.
    pub fn quick(uri: String, probe: ProbeConfig, invocations: u64) -> anyhow::Result<Self> {
        if invocations == 0 {
            anyhow::bail!("quick test needs at least one invocation");
        }
        let duration_secs = (invocations as f64 / 10.0).max(5.0) as u64;

        Ok(Self {
            name: "quick".to_string(),
            description: "Quick smoke test".to_string(),
            uri,
            duration_secs,
            concurrency: 5,
            invocations_per_second: Some(invocations as f64 / duration_secs as f64),
            warmup_secs: 0,
            declare_exchange: None,
            base_properties: MessageProperties::default(),
            probe,
            log_samples: false,
        })
    }

    /// Validate configuration.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.duration_secs == 0 {
            anyhow::bail!("duration_secs must be > 0");
        }
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be > 0");
        }
        if self.uri.trim().is_empty() {
            anyhow::bail!("broker uri must be set (scenario, AMQP_URI or --uri)");
        }
        if let Some(rate) = self.invocations_per_second {
            if !rate.is_finite() || rate <= 0.0 {
                anyhow::bail!("invocations_per_second must be > 0");
            }
        }
        self.probe.validate()?;
        Ok(())
    }

    /// Session settings each worker connects with.
    ///
    /// Publisher confirms are used unless the probe runs in transaction mode;
    /// a channel cannot be in both.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            uri: self.uri.clone(),
            declare_exchange: self.declare_exchange.clone(),
            base_properties: self.base_properties.clone(),
            publisher_confirms: !self.probe.use_transaction,
        }
    }
}

/// Hide the password part of a broker URI for display.
pub fn redact_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    match rest.split_once('@') {
        Some((userinfo, host)) => {
            let user = userinfo.split(':').next().unwrap_or_default();
            format!("{}://{}:***@{}", scheme, user, host)
        }
        None => uri.to_string(),
    }
}
