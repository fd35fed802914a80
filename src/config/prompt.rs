use chrono::{ DateTime, TimeZone };
use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::sync::Arc;
use log::{ info, warn };

use crate::models::chat::{ ChatMessage, ConversationPayload, ProviderTurn, TurnRole };

pub const TIMESTAMP_FORMAT: &str = "%A, %B %d, %Y at %I:%M %p";

const PERSONA_PLACEHOLDER: &str = "{persona}";
const DATETIME_PLACEHOLDER: &str = "{current_datetime}";

const DEFAULT_PERSONA: &str = "\
ABOUT THE CREATOR:
The creator of this assistant is a backend developer, machine learning engineer and full-stack developer.

PROFESSIONAL SUMMARY:
A versatile software developer with experience in backend systems, machine learning and full-stack \
development, delivering production applications for international clients.

TECHNICAL SKILLS:
Languages: Python, JavaScript/TypeScript, SQL, Dart, HTML/CSS
Frameworks: React, Next.js, Node.js, Express.js, Flutter, FastAPI, TailwindCSS
Databases: MongoDB, Firebase, PostgreSQL, MySQL
DevOps: Docker, Azure, Vercel, Netlify, Heroku

AVAILABILITY:
Open to full-time remote positions, contract work, or freelance projects.
";

const DEFAULT_CONTEXT_TEMPLATE: &str = "\
IMPORTANT CONTEXT - You have knowledge about your creator:

{persona}

CURRENT DATE & TIME: {current_datetime}

When asked about dates, time, current events, or \"today\", always use the current date/time provided above. \
When asked about your creator or questions related to their experience, projects, skills, or background, \
use this knowledge confidently. Speak about them with pride and in your signature dramatic style!
";

const DEFAULT_ACKNOWLEDGMENT: &str =
    "Yo! I got all the intel about my creator locked and loaded in my memory! Plus I know what time it is right now! Ask me anything!";

const DEFAULT_UNAVAILABLE_REPLY: &str =
    "Yo! I'm currently having some technical issues, but I'm still here! The AI service is temporarily unavailable. Try again in a few minutes!";

const DEFAULT_FALLBACK_REPLY: &str =
    "Yo! I'm having some connection issues with my AI brain right now. Try asking me again in a moment!";

#[derive(Debug)]
pub enum PromptError {
    IoError(std::io::Error),
    JsonError(serde_json::Error),
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::IoError(e) => write!(f, "Prompt file IO error: {}", e),
            PromptError::JsonError(e) => write!(f, "Prompt JSON parsing error: {}", e),
        }
    }
}

impl Error for PromptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PromptError::IoError(e) => Some(e),
            PromptError::JsonError(e) => Some(e),
        }
    }
}

impl From<std::io::Error> for PromptError {
    fn from(err: std::io::Error) -> Self {
        PromptError::IoError(err)
    }
}

impl From<serde_json::Error> for PromptError {
    fn from(err: serde_json::Error) -> Self {
        PromptError::JsonError(err)
    }
}

/// Static text injected around every conversation, plus the canned replies used
/// when the provider cannot answer.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PromptConfig {
    pub persona: String,
    pub context_template: String,
    pub acknowledgment: String,
    pub unavailable_reply: String,
    pub fallback_reply: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            persona: DEFAULT_PERSONA.to_string(),
            context_template: DEFAULT_CONTEXT_TEMPLATE.to_string(),
            acknowledgment: DEFAULT_ACKNOWLEDGMENT.to_string(),
            unavailable_reply: DEFAULT_UNAVAILABLE_REPLY.to_string(),
            fallback_reply: DEFAULT_FALLBACK_REPLY.to_string(),
        }
    }
}

impl PromptConfig {
    fn validate(&self) {
        for placeholder in [PERSONA_PLACEHOLDER, DATETIME_PLACEHOLDER] {
            if !self.context_template.contains(placeholder) {
                warn!("Context template has no '{}' placeholder; it will not be filled in", placeholder);
            }
        }
    }

    /// Renders the first synthetic turn: persona and timestamp substituted into
    /// the context template.
    pub fn context_prompt(&self, current_datetime: &str) -> String {
        self.context_template
            .replace(PERSONA_PLACEHOLDER, &self.persona)
            .replace(DATETIME_PLACEHOLDER, current_datetime)
    }
}

pub fn load_prompts(path: &str) -> Result<Arc<PromptConfig>, PromptError> {
    let file_content = fs::read_to_string(path)?;
    let config: PromptConfig = serde_json::from_str(&file_content)?;
    config.validate();
    info!("Loaded prompts from '{}' (persona: {} chars)", path, config.persona.len());
    Ok(Arc::new(config))
}

pub fn format_timestamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String where Tz::Offset: fmt::Display {
    now.format(TIMESTAMP_FORMAT).to_string()
}

/// Builds the provider payload: the context turn, the canned acknowledgment,
/// then one turn per caller message in order.
pub fn build_conversation<Tz: TimeZone>(
    config: &PromptConfig,
    messages: &[ChatMessage],
    now: &DateTime<Tz>
) -> ConversationPayload
    where Tz::Offset: fmt::Display
{
    let mut turns = Vec::with_capacity(messages.len() + 2);
    turns.push(ProviderTurn::user(config.context_prompt(&format_timestamp(now))));
    turns.push(ProviderTurn::model(config.acknowledgment.clone()));

    for msg in messages {
        let role = TurnRole::from_sender(msg.sender.as_deref());

        // Normalization already yields a member of the allow-list; the check stays
        // so a future third role is dropped rather than forwarded.
        if !TurnRole::ALL.contains(&role) {
            continue;
        }

        turns.push(ProviderTurn { role, text: msg.text.clone() });
    }

    ConversationPayload { turns }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn message(sender: Option<&str>, text: &str) -> ChatMessage {
        ChatMessage { sender: sender.map(str::to_owned), text: text.to_string() }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 6, 15, 4, 0).unwrap()
    }

    #[test]
    fn timestamp_is_human_readable() {
        assert_eq!(format_timestamp(&fixed_now()), "Monday, January 06, 2025 at 03:04 PM");
    }

    #[test]
    fn payload_starts_with_two_synthetic_turns() {
        let config = PromptConfig::default();
        let payload = build_conversation(&config, &[message(Some("user"), "hi")], &fixed_now());

        assert_eq!(payload.turns.len(), 3);
        assert_eq!(payload.turns[0].role, TurnRole::User);
        assert!(payload.turns[0].text.contains(&config.persona));
        assert!(payload.turns[0].text.contains("CURRENT DATE & TIME: Monday, January 06, 2025 at 03:04 PM"));
        assert!(!payload.turns[0].text.contains(PERSONA_PLACEHOLDER));
        assert_eq!(payload.turns[1], ProviderTurn::model(config.acknowledgment.clone()));
        assert_eq!(payload.turns[2], ProviderTurn::user("hi"));
    }

    #[test]
    fn caller_turns_keep_order_and_collapse_to_two_roles() {
        let messages = vec![
            message(Some("user"), "first"),
            message(Some("bot"), "second"),
            message(Some("system"), "third"),
            message(None, ""),
            message(Some("user"), "fifth")
        ];
        let payload = build_conversation(&PromptConfig::default(), &messages, &fixed_now());

        let tail: Vec<(TurnRole, &str)> = payload.turns[2..]
            .iter()
            .map(|t| (t.role, t.text.as_str()))
            .collect();
        assert_eq!(
            tail,
            vec![
                (TurnRole::User, "first"),
                (TurnRole::Model, "second"),
                (TurnRole::Model, "third"),
                (TurnRole::Model, ""),
                (TurnRole::User, "fifth")
            ]
        );
    }

    #[test]
    fn partial_prompt_file_keeps_defaults() {
        let config: PromptConfig = serde_json
            ::from_str(r#"{"persona": "A fictional engineer.", "acknowledgment": "Ready."}"#)
            .unwrap();

        assert_eq!(config.persona, "A fictional engineer.");
        assert_eq!(config.acknowledgment, "Ready.");
        assert_eq!(config.fallback_reply, DEFAULT_FALLBACK_REPLY);
        assert!(config.context_prompt("now").contains("A fictional engineer."));
    }

    #[test]
    fn missing_prompt_file_is_an_io_error() {
        let err = load_prompts("/nonexistent/prompts.json").unwrap_err();
        assert!(matches!(err, PromptError::IoError(_)));
    }
}
