pub mod chat;

#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub api_key: Option<String>,
    pub completion_model: Option<String>,
    pub base_url: Option<String>,
}

impl LlmConfig {
    pub fn for_model(api_key: &str, model: &str, base_url: Option<String>) -> Self {
        Self {
            api_key: Some(api_key.to_string()),
            completion_model: Some(model.to_string()),
            base_url,
        }
    }
}

/// Provider errors that mean the model identifier itself is unusable, as opposed
/// to a transient failure of one call.
pub fn is_model_unavailable(error_message: &str) -> bool {
    let lowered = error_message.to_lowercase();
    lowered.contains("not found") || lowered.contains("not supported")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_model_unavailable_errors() {
        assert!(is_model_unavailable("404 models/gemini-9 is NOT FOUND for API version v1beta"));
        assert!(is_model_unavailable("generateContent is not supported for this model"));
        assert!(!is_model_unavailable("429 Resource has been exhausted"));
        assert!(!is_model_unavailable("provider call timed out after 30s"));
    }
}
