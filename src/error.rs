use thiserror::Error;

/// Message shown when the remote call fails without a usable description.
pub const REMOTE_FALLBACK_MESSAGE: &str =
    "Failed to get response from AI. Please check your API key and try again.";

/// Errors that end a single exchange. None of them are fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatError {
    /// No credential configured at submit time.
    #[error("Please configure your OpenAI API key (OPENAI_API_KEY or config.toml)")]
    Configuration,

    /// Transport, authentication, quota or response-shape failure.
    #[error("{0}")]
    Remote(String),

    /// The persisted history slot could not be decoded.
    #[error("failed to decode chat history: {0}")]
    Decode(String),
}

impl ChatError {
    /// Build a remote error, substituting the generic fallback for blank messages.
    pub fn remote(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.trim().is_empty() {
            ChatError::Remote(REMOTE_FALLBACK_MESSAGE.to_string())
        } else {
            ChatError::Remote(message)
        }
    }

    /// Text for the error banner.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            REMOTE_FALLBACK_MESSAGE.to_string()
        } else {
            message
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::remote(err.to_string())
    }
}
