//! # Upstream Configuration
//!
//! Endpoints of the collaborators the relay talks to.
//! Loaded once from environment variables at startup.

use relay_core::{ProcessorKind, RelayError, RelayResult};
use std::env;

/// Where the processors and the ledger store live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    /// Base URL of the default processor
    pub default_url: String,

    /// Base URL of the fallback processor
    pub fallback_url: String,

    /// Redis connection URL for the ledger
    pub redis_url: String,
}

impl UpstreamConfig {
    /// Load configuration from environment variables.
    ///
    /// Required env vars:
    /// - `PROCESSOR_DEFAULT_URL`
    /// - `PROCESSOR_FALLBACK_URL`
    /// - `REDIS_URL`
    pub fn from_env() -> RelayResult<Self> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self::new(
            required("PROCESSOR_DEFAULT_URL")?,
            required("PROCESSOR_FALLBACK_URL")?,
            required("REDIS_URL")?,
        );
        config.validate()?;
        Ok(config)
    }

    /// Create config with explicit values (for testing)
    pub fn new(
        default_url: impl Into<String>,
        fallback_url: impl Into<String>,
        redis_url: impl Into<String>,
    ) -> Self {
        Self {
            default_url: trim_base(default_url.into()),
            fallback_url: trim_base(fallback_url.into()),
            redis_url: redis_url.into(),
        }
    }

    /// Check URL schemes
    pub fn validate(&self) -> RelayResult<()> {
        for (name, url) in [
            ("PROCESSOR_DEFAULT_URL", &self.default_url),
            ("PROCESSOR_FALLBACK_URL", &self.fallback_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(RelayError::Configuration(format!(
                    "{} must start with http:// or https://",
                    name
                )));
            }
        }

        if !self.redis_url.starts_with("redis://") && !self.redis_url.starts_with("rediss://") {
            return Err(RelayError::Configuration(
                "REDIS_URL must start with redis:// or rediss://".to_string(),
            ));
        }

        Ok(())
    }

    /// Base URL for a processor
    pub fn processor_url(&self, kind: ProcessorKind) -> &str {
        match kind {
            ProcessorKind::Default => &self.default_url,
            ProcessorKind::Fallback => &self.fallback_url,
        }
    }
}

fn required(name: &str) -> RelayResult<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| RelayError::Configuration(format!("{} not set", name)))
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}
