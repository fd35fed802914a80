use chat_relay::cli::Args;
use clap::Parser;
use dotenv::dotenv;
use log::error;
use std::error::Error;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenv().ok();
    let args = Args::parse();
    env_logger::Builder
        ::from_env(env_logger::Env::default().default_filter_or(args.default_log_level()))
        .init();

    if let Err(e) = chat_relay::run(args).await {
        error!("Fatal: {}", e);
        return Err(e);
    }

    Ok(())
}
