use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::ChatError;
use crate::events::Turn;

/// Key of the slot holding the serialized conversation
pub const HISTORY_KEY: &str = "chatHistory";

/// Single persistent slot mirroring the conversation as a JSON array of turns
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    /// Slot stored as `<data_dir>/chatHistory.json`
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(format!("{HISTORY_KEY}.json")),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the persisted conversation. Missing, unreadable or malformed data
    /// yields an empty conversation.
    pub fn load(&self) -> Vec<Turn> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "failed to read chat history");
                return Vec::new();
            }
        };

        match Self::decode(&content) {
            Ok(turns) => {
                debug!(turns = turns.len(), "loaded chat history");
                turns
            }
            Err(err) => {
                warn!(path = %self.path.display(), error = %err, "discarding chat history");
                Vec::new()
            }
        }
    }

    pub fn decode(content: &str) -> Result<Vec<Turn>, ChatError> {
        serde_json::from_str(content).map_err(|err| ChatError::Decode(err.to_string()))
    }

    /// Write the conversation to the slot. Empty conversations are not written.
    pub fn save(&self, turns: &[Turn]) -> Result<()> {
        if turns.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create history directory")?;
        }

        let content = serde_json::to_string(turns).context("Failed to serialize chat history")?;
        fs::write(&self.path, content).context("Failed to write chat history")?;
        Ok(())
    }

    /// Remove the slot. A slot that was never written is not an error.
    pub fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err).context("Failed to remove chat history"),
        }
    }
}
