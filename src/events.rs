use serde::{Deserialize, Serialize};

use crate::error::ChatError;

/// Originator of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn display_name(&self) -> &'static str {
        match self {
            Role::User => "You",
            Role::Assistant => "AI Assistant",
        }
    }
}

/// One message exchanged in the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Internal application events delivered to the UI loop
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// The outstanding completion call resolved
    CompletionFinished(Result<String, ChatError>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn turn_wire_format_uses_lowercase_roles() {
        let json = serde_json::to_string(&Turn::user("Hello")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"Hello"}"#);

        let turn: Turn = serde_json::from_str(r#"{"role":"assistant","content":"Hi"}"#).unwrap();
        assert_eq!(turn, Turn::assistant("Hi"));
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(serde_json::from_str::<Turn>(r#"{"role":"system","content":"x"}"#).is_err());
    }
}
