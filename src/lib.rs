//! palaver: a terminal chat client for hosted LLM completion endpoints.
//!
//! Each user turn is sent, together with the whole conversation so far, to an
//! OpenAI-compatible `/chat/completions` endpoint. The conversation is mirrored
//! to a single JSON slot on disk so it survives restarts.

pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod session;
pub mod storage;
pub mod ui;

pub use config::Config;
pub use error::ChatError;
pub use events::{Role, Turn};
pub use llm::{CompletionClient, OpenAiClient};
pub use session::{ChatSession, Submission};
pub use storage::HistoryStore;
