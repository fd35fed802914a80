use async_trait::async_trait;
use std::error::Error as StdError;
use log::debug;

use super::ChatClient;
use crate::llm::LlmConfig;
use crate::models::chat::{ ProviderTurn, TurnRole };
use rllm::chat::{ ChatMessage, ChatRole, MessageType };
use rllm::builder::{ LLMBackend, LLMBuilder };
use rllm::LLMProvider;

pub struct GeminiChatClient {
    llm: Box<dyn LLMProvider + Send + Sync>,
    model: String,
    base_url: Option<String>,
}

impl GeminiChatClient {
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>
    ) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let mut builder = LLMBuilder::new()
            .backend(LLMBackend::Google)
            .api_key(api_key)
            .model(&model)
            .stream(false);

        if let Some(url) = &base_url {
            builder = builder.base_url(url);
        }

        let llm_provider = builder.build()?;

        Ok(Self {
            llm: llm_provider,
            model,
            base_url,
        })
    }

    pub fn from_config(config: &LlmConfig) -> Result<Self, Box<dyn StdError + Send + Sync>> {
        let api_key = config.api_key
            .clone()
            .ok_or_else(|| "Gemini API key is required for GeminiChatClient".to_string())?;
        let model = config.completion_model
            .clone()
            .ok_or_else(|| "A model identifier is required for GeminiChatClient".to_string())?;

        Self::new(api_key, model, config.base_url.clone())
    }
}

fn to_rllm_message(turn: &ProviderTurn) -> ChatMessage {
    // Gemini names the assistant side "model"; rllm maps Assistant onto it.
    let role = match turn.role {
        TurnRole::User => ChatRole::User,
        TurnRole::Model => ChatRole::Assistant,
    };
    ChatMessage {
        role,
        content: turn.text.clone(),
        message_type: MessageType::Text,
    }
}

#[async_trait]
impl ChatClient for GeminiChatClient {
    async fn generate(
        &self,
        turns: &[ProviderTurn]
    ) -> Result<String, Box<dyn StdError + Send + Sync>> {
        let messages: Vec<ChatMessage> = turns.iter().map(to_rllm_message).collect();
        debug!(
            "GeminiChatClient::generate() → model={} base_url={:?} turns={}",
            self.model,
            self.base_url,
            messages.len()
        );
        let resp = self.llm.chat(&messages).await?;
        let text = resp
            .text()
            .map(|s| s.to_string())
            .unwrap_or_else(|| resp.to_string());
        Ok(text)
    }

    fn get_model(&self) -> String {
        self.model.clone()
    }
}
