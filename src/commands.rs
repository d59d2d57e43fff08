use anyhow::{Context, Result, bail};
use std::io::{self, BufRead, Write};

use crate::config::Config;
use crate::llm::OpenAiClient;
use crate::session::{ChatSession, Submission};
use crate::storage::HistoryStore;

/// Print the persisted transcript
pub async fn show_history(config: &Config) -> Result<()> {
    let store = HistoryStore::new(&config.data_dir);
    let turns = store.load();

    if turns.is_empty() {
        println!("No chat history yet. Run 'palaver' to start a conversation!");
        return Ok(());
    }

    for turn in turns {
        println!("{}:", turn.role.display_name());
        for line in turn.content.lines() {
            println!("  {}", line);
        }
        println!();
    }

    Ok(())
}

/// Run a single exchange and print the reply
pub async fn ask(config: &Config, text: &str) -> Result<()> {
    let store = HistoryStore::new(&config.data_dir);
    let mut session = ChatSession::load(store, config.has_api_key());

    let submission = match OpenAiClient::from_config(config) {
        Ok(client) => session.exchange(text, &client).await,
        // Without a credential the session rejects before any client is needed
        Err(_) => session.submit(text),
    };

    match submission {
        Submission::Ignored => bail!("Nothing to send: the message is empty"),
        Submission::Rejected | Submission::Accepted(_) => {
            if let Some(error) = session.last_error() {
                bail!("{}", error);
            }
        }
    }

    let reply = session
        .turns()
        .last()
        .map(|turn| turn.content.as_str())
        .unwrap_or_default();
    println!("{}", reply);
    Ok(())
}

/// Clear the persisted transcript after confirmation
pub async fn clear_history(config: &Config, assume_yes: bool) -> Result<()> {
    let store = HistoryStore::new(&config.data_dir);
    if !store.path().exists() {
        println!("No chat history to clear.");
        return Ok(());
    }

    let stdin = io::stdin();
    let confirmed = assume_yes || confirm(&mut stdin.lock(), &mut io::stdout())?;
    if !confirmed {
        println!("Chat history kept.");
        return Ok(());
    }

    let mut session = ChatSession::load(store, config.has_api_key());
    session.clear();
    println!("Chat history cleared.");
    Ok(())
}

/// Ask the clear-history question; only an explicit yes confirms.
pub fn confirm(input: &mut impl BufRead, output: &mut impl Write) -> Result<bool> {
    write!(output, "Are you sure you want to clear all chat history? [y/N] ")?;
    output.flush()?;

    let mut answer = String::new();
    input
        .read_line(&mut answer)
        .context("Failed to read confirmation")?;

    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn answer(text: &str) -> bool {
        let mut output = Vec::new();
        confirm(&mut Cursor::new(text.as_bytes()), &mut output).unwrap()
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(answer("y\n"));
        assert!(answer("YES\n"));
        assert!(!answer("\n"));
        assert!(!answer("no\n"));
        assert!(!answer(""));
    }

    #[test]
    fn confirmation_prompt_is_written() {
        let mut output = Vec::new();
        confirm(&mut Cursor::new(b"n\n".as_slice()), &mut output).unwrap();
        assert!(String::from_utf8(output).unwrap().contains("clear all chat history"));
    }

    #[tokio::test]
    async fn ask_without_credential_fails_before_sending() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            api_key: None,
            base_url: "http://127.0.0.1:9".to_string(),
            data_dir: dir.path().to_path_buf(),
        };

        let err = ask(&config, "Hello").await.unwrap_err();
        assert!(err.to_string().contains("API key"));
        assert!(HistoryStore::new(dir.path()).load().is_empty());
    }

    #[tokio::test]
    async fn clear_with_yes_removes_slot() {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path());
        store.save(&[crate::events::Turn::user("Hello")]).unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            ..Config::default()
        };

        clear_history(&config, true).await.unwrap();
        assert!(!store.path().exists());
    }
}
