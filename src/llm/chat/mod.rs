pub mod gemini;

use async_trait::async_trait;
use std::error::Error as StdError;
use std::sync::Arc;
use super::LlmConfig;
use self::gemini::GeminiChatClient;
use crate::models::chat::ProviderTurn;

#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Sends the whole conversation and returns the generated text.
    async fn generate(
        &self,
        turns: &[ProviderTurn]
    ) -> Result<String, Box<dyn StdError + Send + Sync>>;

    fn get_model(&self) -> String;
}

/// Builds a client bound to one model identifier. Swapped out in tests.
pub type ClientFactory = Arc<
    dyn Fn(&LlmConfig) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> + Send + Sync
>;

pub fn new_client(
    config: &LlmConfig
) -> Result<Arc<dyn ChatClient>, Box<dyn StdError + Send + Sync>> {
    let specific_client = GeminiChatClient::from_config(config)?;
    Ok(Arc::new(specific_client))
}

pub fn default_factory() -> ClientFactory {
    Arc::new(new_client)
}
