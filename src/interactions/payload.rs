//! Interaction request and response bodies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const INTERACTION_PING: u8 = 1;
pub const INTERACTION_COMMAND: u8 = 2;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_MESSAGE: u8 = 4;
const RESPONSE_DEFERRED: u8 = 5;

/// Inbound interaction.
#[derive(Debug, Clone, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(default)]
    pub data: Option<CommandData>,
    #[serde(default)]
    pub application_id: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
}

impl Interaction {
    /// Webhook target for follow-up delivery, if the interaction carries one.
    pub fn callback_target(&self) -> Option<CallbackTarget> {
        match (&self.application_id, &self.token) {
            (Some(application_id), Some(token)) => Some(CallbackTarget {
                application_id: application_id.clone(),
                token: token.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandData {
    pub name: String,
    #[serde(default)]
    pub options: Vec<CommandOption>,
}

impl CommandData {
    /// Returns the trimmed value of an option, if present and non-blank.
    pub fn option(&self, name: &str) -> Option<String> {
        let option = self.options.iter().find(|o| o.name == name)?;
        let value = match &option.value {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!value.is_empty()).then_some(value)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommandOption {
    pub name: String,
    #[serde(default)]
    pub value: Value,
}

/// Where a deferred result gets delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTarget {
    pub application_id: String,
    pub token: String,
}

/// Outbound interaction response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionResponse {
    #[serde(rename = "type")]
    pub kind: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<MessageData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageData {
    pub content: String,
}

impl InteractionResponse {
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self {
            kind: RESPONSE_MESSAGE,
            data: Some(MessageData {
                content: content.into(),
            }),
        }
    }

    pub fn deferred() -> Self {
        Self {
            kind: RESPONSE_DEFERRED,
            data: None,
        }
    }
}
