pub mod agent;
pub mod cli;
pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod server;

use agent::RelayAgent;
use cli::Args;
use config::RelayConfig;
use config::prompt::{ load_prompts, PromptConfig };
use log::info;
use server::Server;
use std::error::Error;
use std::sync::Arc;

pub async fn run(args: Args) -> Result<(), Box<dyn Error + Send + Sync>> {
    let config = RelayConfig::from_args(&args)?;
    let prompts = match &args.prompts_path {
        Some(path) =>
            load_prompts(path).map_err(|e| format!("Failed to load prompts file '{}': {}", path, e))?,
        None => Arc::new(PromptConfig::default()),
    };

    info!("--- Core Configuration ---");
    info!("Server Address: {}", args.server_addr());
    info!("Environment: {}", args.environment);
    info!("API Key: {}", config.masked_api_key());
    info!("Candidate Models: {}", config.models.join(", "));
    info!("Base URL: {}", config.base_url.as_deref().unwrap_or("adapter default"));
    info!("Model Smoke Test: {}", config.smoke_test_models);
    info!("Provider Timeout: {:?}", config.provider_timeout);
    info!("Degraded Status: {:?}", config.degraded_policy);
    info!("Allowed Origins: {}", args.allowed_origins.join(", "));
    info!("Prompts: {}", args.prompts_path.as_deref().unwrap_or("built-in"));
    info!("TLS Enabled: {}", args.enable_tls);
    info!("-------------------------");

    let agent = Arc::new(RelayAgent::new(config, prompts));
    agent.warm_up().await;

    let server = Server::new(agent, args);
    server.run().await?;

    Ok(())
}
