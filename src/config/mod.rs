pub mod prompt;

use clap::ValueEnum;
use std::time::Duration;

use crate::cli::Args;
use crate::error::RelayError;

pub const DEFAULT_MODELS: [&str; 9] = [
    "gemini-2.5-flash",
    "gemini-2.0-flash",
    "gemini-flash-latest",
    "gemini-2.0-flash-exp",
    "gemini-2.0-flash-lite",
    "gemini-flash-lite-latest",
    "gemini-pro-latest",
    "gemini-2.5-pro",
    "gemini-2.0-pro-exp",
];

/// How a chat request answers when the provider cannot produce a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DegradedPolicy {
    /// `200` with a friendly apology as the reply.
    #[value(name = "ok")]
    Lenient,
    /// `500` with an error envelope.
    #[value(name = "error")]
    Strict,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub models: Vec<String>,
    pub base_url: Option<String>,
    pub smoke_test_models: bool,
    pub provider_timeout: Duration,
    pub degraded_policy: DegradedPolicy,
}

impl RelayConfig {
    pub fn from_args(args: &Args) -> Result<Self, RelayError> {
        let api_key = args.api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                RelayError::Configuration("GEMINI_API_KEY environment variable is not set".into())
            })?
            .to_string();

        let models: Vec<String> = args.models
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .map(str::to_owned)
            .collect();
        let models = if models.is_empty() {
            DEFAULT_MODELS.iter().map(|m| m.to_string()).collect()
        } else {
            models
        };

        if args.provider_timeout_secs == 0 {
            return Err(RelayError::Configuration("provider timeout must be at least one second".into()));
        }

        Ok(Self {
            api_key,
            models,
            base_url: args.base_url.clone().filter(|u| !u.trim().is_empty()),
            smoke_test_models: args.smoke_test_models,
            provider_timeout: Duration::from_secs(args.provider_timeout_secs),
            degraded_policy: args.degraded_status,
        })
    }

    /// Key suitable for log lines.
    pub fn masked_api_key(&self) -> String {
        let prefix: String = self.api_key.chars().take(4).collect();
        format!("{}...", prefix)
    }
}
