//! Chat session state and the transitions that drive a single exchange.
//!
//! The session owns the conversation together with the busy and error flags.
//! Every transition that mutates the conversation also writes it to the
//! history slot, so the slot always reflects the last completed mutation.

use tracing::{info, warn};

use crate::error::ChatError;
use crate::events::Turn;
use crate::llm::CompletionClient;
use crate::storage::HistoryStore;

/// Outcome of a submit attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input, or a call is already outstanding. Nothing changed.
    Ignored,
    /// No credential configured. The error flag is set; nothing was sent.
    Rejected,
    /// The user turn was appended; send this history to the completion client.
    Accepted(Vec<Turn>),
}

pub struct ChatSession {
    turns: Vec<Turn>,
    busy: bool,
    last_error: Option<String>,
    credential_configured: bool,
    store: HistoryStore,
    revision: u64,
}

impl ChatSession {
    /// Start a session from whatever the history slot holds.
    pub fn load(store: HistoryStore, credential_configured: bool) -> Self {
        let turns = store.load();
        info!(turns = turns.len(), "chat session started");
        Self {
            turns,
            busy: false,
            last_error: None,
            credential_configured,
            store,
            revision: 0,
        }
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Bumped on every change the transcript view should react to
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// IDLE -> SENDING when `input` is non-blank and a credential is configured.
    pub fn submit(&mut self, input: &str) -> Submission {
        if self.busy || input.trim().is_empty() {
            return Submission::Ignored;
        }

        if !self.credential_configured {
            self.last_error = Some(ChatError::Configuration.user_message());
            self.revision += 1;
            return Submission::Rejected;
        }

        self.turns.push(Turn::user(input));
        self.busy = true;
        self.last_error = None;
        self.persist();

        Submission::Accepted(self.turns.clone())
    }

    /// SENDING -> IDLE. Busy is released whatever the outcome.
    pub fn finish(&mut self, outcome: Result<String, ChatError>) {
        match outcome {
            Ok(content) => {
                self.turns.push(Turn::assistant(content));
                self.persist();
            }
            Err(err) => {
                warn!(error = %err, "completion failed");
                self.last_error = Some(err.user_message());
                self.revision += 1;
            }
        }
        self.busy = false;
    }

    /// Submit and wait for the reply in one step.
    pub async fn exchange(&mut self, input: &str, client: &dyn CompletionClient) -> Submission {
        let submission = self.submit(input);
        if let Submission::Accepted(history) = &submission {
            let outcome = client.complete(history).await;
            self.finish(outcome);
        }
        submission
    }

    /// Empty the conversation and erase the slot. Callers confirm with the user first.
    pub fn clear(&mut self) {
        self.turns.clear();
        self.revision += 1;
        match self.store.clear() {
            Ok(()) => info!("chat history cleared"),
            Err(err) => warn!(error = %err, "failed to remove chat history"),
        }
    }

    fn persist(&mut self) {
        self.revision += 1;
        if let Err(err) = self.store.save(&self.turns) {
            warn!(error = %err, "failed to save chat history");
        }
    }
}
