use clap::Parser;

use crate::config::DegradedPolicy;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Provider Args ---
    /// API key for the Gemini provider. Required; the server refuses to start without it.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Ordered, comma separated list of candidate model identifiers tried during resolution.
    #[arg(long, env = "GEMINI_MODELS", value_delimiter = ',')]
    pub models: Vec<String>,

    /// Base URL for the Gemini API. No default, let the adapter decide if None.
    #[arg(long, env = "GEMINI_BASE_URL")]
    pub base_url: Option<String>,

    /// Send a short "Hi" to each candidate and only accept models that answer.
    #[arg(long, env = "MODEL_SMOKE_TEST", default_value = "false")]
    pub smoke_test_models: bool,

    /// Upper bound in seconds for a single provider call.
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value = "30")]
    pub provider_timeout_secs: u64,

    /// Response when no reply can be produced: `ok` answers 200 with an apology, `error` answers 500.
    #[arg(long, env = "DEGRADED_STATUS", value_enum, default_value = "ok")]
    pub degraded_status: DegradedPolicy,

    /// Path to a JSON file overriding the built-in persona and canned replies.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    // --- HTTP Server Args ---
    /// Comma separated list of allowed CORS origins, `*` allows any.
    #[arg(long, env = "ALLOWED_ORIGINS", value_delimiter = ',', default_value = "*")]
    pub allowed_origins: Vec<String>,

    /// Interface the HTTP server binds to.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port the HTTP server listens on.
    #[arg(long, env = "PORT", default_value = "5000")]
    pub port: u16,

    /// Deployment environment. Anything other than `production` logs at debug level.
    #[arg(long, env = "APP_ENV", default_value = "development")]
    pub environment: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

impl Args {
    pub fn is_production(&self) -> bool {
        self.environment.eq_ignore_ascii_case("production")
    }

    pub fn default_log_level(&self) -> &'static str {
        if self.is_production() { "info" } else { "debug" }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
