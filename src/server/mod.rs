pub mod api;
pub mod cors;

use crate::agent::RelayAgent;
use crate::cli::Args;
use std::error::Error;
use std::sync::Arc;

pub struct Server {
    agent: Arc<RelayAgent>,
    args: Args,
}

impl Server {
    pub fn new(agent: Arc<RelayAgent>, args: Args) -> Self {
        Self { agent, args }
    }

    pub async fn run(&self) -> Result<(), Box<dyn Error + Send + Sync>> {
        let state = api::AppState { agent: Arc::clone(&self.agent) };
        api::start_http_server(&self.args, state).await
    }
}
