use serde::{ Serialize, Deserialize };
use serde_json::Value;

use crate::error::RelayError;

/// One entry of the transcript sent by the chat widget.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: Option<String>,
    pub text: String,
}

impl ChatMessage {
    /// Lenient extraction: absent or non-string fields never fail.
    fn from_value(value: &Value) -> Self {
        let sender = value
            .get("sender")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let text = value.get("text").and_then(Value::as_str).unwrap_or_default().to_string();
        Self { sender, text }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Model,
}

impl TurnRole {
    pub const ALL: [TurnRole; 2] = [TurnRole::User, TurnRole::Model];

    pub fn from_sender(sender: Option<&str>) -> Self {
        match sender {
            Some("user") => TurnRole::User,
            _ => TurnRole::Model,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderTurn {
    pub role: TurnRole,
    pub text: String,
}

impl ProviderTurn {
    pub fn user(text: impl Into<String>) -> Self {
        Self { role: TurnRole::User, text: text.into() }
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self { role: TurnRole::Model, text: text.into() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConversationPayload {
    pub turns: Vec<ProviderTurn>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub model: Option<String>,
}

impl ChatRequest {
    /// Parses a POST body. Unparseable JSON is treated as an empty object, so it
    /// ends up on the same missing-messages path as `{}`.
    pub fn from_body(body: &[u8]) -> Result<Self, RelayError> {
        let data: Value = serde_json::from_slice(body).unwrap_or_else(|_| Value::Object(Default::default()));

        let messages = match data.get("messages") {
            Some(Value::Array(items)) if !items.is_empty() => items,
            _ => {
                return Err(RelayError::MalformedRequest);
            }
        };

        let model = data
            .get("model")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_owned);

        Ok(Self {
            messages: messages.iter().map(ChatMessage::from_value).collect(),
            model,
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatReply {
    pub reply: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self { error: error.into() }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusBody {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_missing_empty_or_non_list_messages() {
        for body in [
            r#"{}"#,
            r#"{"messages": []}"#,
            r#"{"messages": "hi"}"#,
            r#"{"messages": null}"#,
            r#"{"messages": {"sender": "user"}}"#,
        ] {
            assert!(
                matches!(ChatRequest::from_body(body.as_bytes()), Err(RelayError::MalformedRequest)),
                "body {} should be rejected",
                body
            );
        }
    }

    #[test]
    fn malformed_json_falls_through_to_missing_messages() {
        let result = ChatRequest::from_body(b"{not json");
        assert!(matches!(result, Err(RelayError::MalformedRequest)));
        assert!(matches!(ChatRequest::from_body(b""), Err(RelayError::MalformedRequest)));
    }

    #[test]
    fn missing_fields_coerce_instead_of_failing() {
        let body = r#"{"messages": [{"sender": "user"}, {"text": "hey"}, 42]}"#;
        let request = ChatRequest::from_body(body.as_bytes()).unwrap();

        assert_eq!(request.messages.len(), 3);
        assert_eq!(request.messages[0], ChatMessage { sender: Some("user".into()), text: String::new() });
        assert_eq!(request.messages[1], ChatMessage { sender: None, text: "hey".into() });
        assert_eq!(request.messages[2], ChatMessage::default());
        assert_eq!(request.model, None);
    }

    #[test]
    fn picks_up_model_override_and_ignores_blank_one() {
        let body = r#"{"messages": [{"sender": "user", "text": "hi"}], "model": "gemini-2.0-flash"}"#;
        let request = ChatRequest::from_body(body.as_bytes()).unwrap();
        assert_eq!(request.model.as_deref(), Some("gemini-2.0-flash"));

        let body = r#"{"messages": [{"sender": "user", "text": "hi"}], "model": "  "}"#;
        let request = ChatRequest::from_body(body.as_bytes()).unwrap();
        assert_eq!(request.model, None);
    }

    #[test]
    fn sender_normalizes_to_two_roles() {
        assert_eq!(TurnRole::from_sender(Some("user")), TurnRole::User);
        assert_eq!(TurnRole::from_sender(Some("bot")), TurnRole::Model);
        assert_eq!(TurnRole::from_sender(Some("system")), TurnRole::Model);
        assert_eq!(TurnRole::from_sender(Some("User")), TurnRole::Model);
        assert_eq!(TurnRole::from_sender(None), TurnRole::Model);
    }

    #[test]
    fn turn_roles_serialize_lowercase() {
        let turn = ProviderTurn::model("ok");
        assert_eq!(serde_json::to_string(&turn).unwrap(), r#"{"role":"model","text":"ok"}"#);
    }
}
