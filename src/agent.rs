use chrono::Local;
use log::{ debug, info, warn };
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::timeout;

use crate::config::RelayConfig;
use crate::config::prompt::{ self, PromptConfig };
use crate::error::RelayError;
use crate::llm::{ is_model_unavailable, LlmConfig };
use crate::llm::chat::{ default_factory, ChatClient, ClientFactory };
use crate::models::chat::{ ChatRequest, ProviderTurn };

/// Invocations against the resolved model per request, the first call included.
pub const MAX_ATTEMPTS: usize = 2;

const SMOKE_TEST_PROMPT: &str = "Hi";
const RESOLVER_LOG_LIMIT: usize = 100;
const PROVIDER_LOG_LIMIT: usize = 200;

/// Relay context: credential, candidate models and the cached model handle.
///
/// The handle is shared by all requests and replaced whenever a re-resolution
/// succeeds. A request holding a stale handle simply fails into the retry path.
pub struct RelayAgent {
    config: RelayConfig,
    prompts: Arc<PromptConfig>,
    client_factory: ClientFactory,
    cached_client: RwLock<Option<Arc<dyn ChatClient>>>,
}

fn truncate(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

impl RelayAgent {
    pub fn new(config: RelayConfig, prompts: Arc<PromptConfig>) -> Self {
        Self::with_client_factory(config, prompts, default_factory())
    }

    pub fn with_client_factory(
        config: RelayConfig,
        prompts: Arc<PromptConfig>,
        client_factory: ClientFactory
    ) -> Self {
        Self {
            config,
            prompts,
            client_factory,
            cached_client: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn prompts(&self) -> &PromptConfig {
        &self.prompts
    }

    fn llm_config(&self, model: &str) -> LlmConfig {
        LlmConfig::for_model(&self.config.api_key, model, self.config.base_url.clone())
    }

    /// Resolves eagerly so the first request does not pay for it. Failure is not
    /// fatal; the next chat request resolves again.
    pub async fn warm_up(&self) {
        match self.resolve_model().await {
            Ok(client) => info!("Model ready: {}", client.get_model()),
            Err(e) => warn!("Model resolution failed at startup, will retry on first request: {}", e),
        }
    }

    /// Walks the candidate list and caches the first model that can be built
    /// (and, in smoke-test mode, answers a trivial prompt).
    pub async fn resolve_model(&self) -> Result<Arc<dyn ChatClient>, RelayError> {
        self.resolve_model_excluding(None).await
    }

    async fn resolve_model_excluding(
        &self,
        excluded: Option<&str>
    ) -> Result<Arc<dyn ChatClient>, RelayError> {
        let mut tried = 0;
        for model_name in &self.config.models {
            if excluded == Some(model_name.as_str()) {
                debug!("Skipping model {} which just failed", model_name);
                continue;
            }
            tried += 1;

            match self.try_candidate(model_name).await {
                Ok(client) => {
                    info!("Successfully initialized model: {}", model_name);
                    *self.cached_client.write().await = Some(Arc::clone(&client));
                    return Ok(client);
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model_name, truncate(&e, RESOLVER_LOG_LIMIT));
                }
            }
        }

        Err(RelayError::NoWorkingModel { tried })
    }

    async fn try_candidate(&self, model_name: &str) -> Result<Arc<dyn ChatClient>, String> {
        let client = (self.client_factory)(&self.llm_config(model_name)).map_err(|e| e.to_string())?;
        if self.config.smoke_test_models {
            self.invoke(&client, &[ProviderTurn::user(SMOKE_TEST_PROMPT)]).await.map_err(|e|
                e.to_string()
            )?;
        }
        Ok(client)
    }

    /// The cached handle, resolving one first if nothing is cached yet.
    pub async fn current_model(&self) -> Result<Arc<dyn ChatClient>, RelayError> {
        let cached = self.cached_client.read().await.clone();
        match cached {
            Some(client) => Ok(client),
            None => self.resolve_model().await,
        }
    }

    async fn invoke(
        &self,
        client: &Arc<dyn ChatClient>,
        turns: &[ProviderTurn]
    ) -> Result<String, RelayError> {
        match timeout(self.config.provider_timeout, client.generate(turns)).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(e)) => Err(RelayError::ProviderInvocation(e.to_string())),
            Err(_) =>
                Err(
                    RelayError::ProviderInvocation(
                        format!(
                            "call to {} timed out after {:?}",
                            client.get_model(),
                            self.config.provider_timeout
                        )
                    )
                ),
        }
    }

    /// Builds the conversation for this request and runs it through [`Self::dispatch`].
    pub async fn chat(&self, request: &ChatRequest) -> Result<String, RelayError> {
        let payload = prompt::build_conversation(&self.prompts, &request.messages, &Local::now());
        debug!(
            "Sending {} turns ({} from caller) to the provider",
            payload.turns.len(),
            request.messages.len()
        );
        self.dispatch(&payload.turns, request.model.as_deref()).await
    }

    /// Retry loop over the resolved model.
    ///
    /// A caller supplied model is tried once, uncached, before anything else. After
    /// that the cached handle gets up to [`MAX_ATTEMPTS`] invocations. A
    /// model-unavailable failure moves on to a freshly resolved model, any other
    /// failure retries the same one.
    pub async fn dispatch(
        &self,
        turns: &[ProviderTurn],
        model_override: Option<&str>
    ) -> Result<String, RelayError> {
        if let Some(model_name) = model_override {
            match self.invoke_override(model_name, turns).await {
                Ok(text) => {
                    return Ok(text);
                }
                Err(e) => {
                    warn!(
                        "Selected model {} failed: {}",
                        model_name,
                        truncate(&e.to_string(), RESOLVER_LOG_LIMIT)
                    );
                }
            }
        }

        let mut client = self.current_model().await?;
        let mut attempt = 0;

        loop {
            let err = match self.invoke(&client, turns).await {
                Ok(text) => {
                    return Ok(text);
                }
                Err(err) => err,
            };

            let message = err.to_string();
            warn!(
                "Error calling Gemini API (attempt {}/{}): {}",
                attempt + 1,
                MAX_ATTEMPTS,
                truncate(&message, PROVIDER_LOG_LIMIT)
            );

            if attempt + 1 >= MAX_ATTEMPTS {
                return Err(err);
            }

            if is_model_unavailable(&message) {
                info!("Attempting to re-resolve with a different model...");
                match self.resolve_model_excluding(Some(&client.get_model())).await {
                    Ok(next) => {
                        client = next;
                    }
                    Err(resolve_err) => {
                        warn!("Failed to re-resolve model: {}", resolve_err);
                        return Err(err);
                    }
                }
            } else {
                debug!("Retrying {} after a transient failure", client.get_model());
            }
            attempt += 1;
        }
    }

    async fn invoke_override(
        &self,
        model_name: &str,
        turns: &[ProviderTurn]
    ) -> Result<String, RelayError> {
        let client = (self.client_factory)(&self.llm_config(model_name)).map_err(|e|
            RelayError::ProviderInvocation(e.to_string())
        )?;
        self.invoke(&client, turns).await
    }
}
