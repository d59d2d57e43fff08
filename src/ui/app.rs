use anyhow::{Context, Result};
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use std::io::{self, Stdout};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, error};

use crate::error::ChatError;
use crate::events::{AppEvent, Turn};
use crate::llm::CompletionClient;
use crate::session::{ChatSession, Submission};
use crate::ui::composer::{Composer, ComposerResult};
use crate::ui::history::Transcript;

const TICK: Duration = Duration::from_millis(50);
const PAGE: usize = 10;

/// What the event loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppAction {
    None,
    Exit,
}

/// Full-screen chat: drives the session from keyboard input and completion results.
pub struct App {
    session: ChatSession,
    client: Option<Arc<dyn CompletionClient>>,
    composer: Composer,
    confirm_clear: bool,
    scroll_back: usize,
    max_scroll_back: usize,
    seen_revision: u64,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl App {
    /// `client` is `None` when no credential is configured.
    pub fn new(session: ChatSession, client: Option<Arc<dyn CompletionClient>>) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let seen_revision = session.revision();
        Self {
            session,
            client,
            composer: Composer::new(),
            confirm_clear: false,
            scroll_back: 0,
            max_scroll_back: 0,
            seen_revision,
            event_tx,
            event_rx,
        }
    }

    pub fn session(&self) -> &ChatSession {
        &self.session
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn is_confirming_clear(&self) -> bool {
        self.confirm_clear
    }

    /// Lines the transcript is scrolled up from the newest one
    pub fn scroll_back(&self) -> usize {
        self.scroll_back
    }

    /// Run until the user quits. Restores the terminal on every exit path.
    pub async fn run(mut self) -> Result<()> {
        let mut guard = TerminalGuard::enter()?;

        loop {
            guard
                .terminal
                .draw(|frame| self.draw(frame))
                .context("Failed to draw frame")?;

            if event::poll(TICK).context("Failed to poll terminal events")? {
                match event::read().context("Failed to read terminal event")? {
                    Event::Key(key) => {
                        if self.handle_key(key) == AppAction::Exit {
                            break;
                        }
                    }
                    Event::Paste(text) => {
                        if !self.confirm_clear {
                            self.composer.insert_str(&text);
                        }
                    }
                    _ => {}
                }
            }

            self.process_events();
        }

        Ok(())
    }

    /// Apply completion results that have arrived since the last tick
    pub fn process_events(&mut self) {
        while let Ok(event) = self.event_rx.try_recv() {
            match event {
                AppEvent::CompletionFinished(outcome) => {
                    self.session.finish(outcome);
                    self.composer.set_disabled(self.session.is_busy());
                }
            }
        }
        self.follow_newest();
    }

    /// Wait for the next completion result and apply it
    pub async fn next_event(&mut self) {
        if let Some(AppEvent::CompletionFinished(outcome)) = self.event_rx.recv().await {
            self.session.finish(outcome);
            self.composer.set_disabled(self.session.is_busy());
            self.follow_newest();
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppAction {
        if key.kind != KeyEventKind::Press {
            return AppAction::None;
        }

        if self.confirm_clear {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    self.session.clear();
                    self.confirm_clear = false;
                    self.follow_newest();
                }
                _ => self.confirm_clear = false,
            }
            return AppAction::None;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('c') if ctrl => return AppAction::Exit,
            KeyCode::Esc => return AppAction::Exit,
            KeyCode::Char('l') if ctrl => {
                if !self.session.turns().is_empty() {
                    self.confirm_clear = true;
                }
                return AppAction::None;
            }
            KeyCode::PageUp => {
                self.scroll_back = (self.scroll_back + PAGE).min(self.max_scroll_back);
                return AppAction::None;
            }
            KeyCode::PageDown => {
                self.scroll_back = self.scroll_back.saturating_sub(PAGE);
                return AppAction::None;
            }
            _ => {}
        }

        if let ComposerResult::Submit(text) = self.composer.handle_key(key) {
            self.submit(&text);
        }
        AppAction::None
    }

    fn submit(&mut self, text: &str) {
        if let Submission::Accepted(history) = self.session.submit(text) {
            self.composer.clear();
            self.composer.set_disabled(true);
            self.spawn_completion(history);
        }
        self.follow_newest();
    }

    fn spawn_completion(&self, history: Vec<Turn>) {
        let tx = self.event_tx.clone();
        let Some(client) = self.client.clone() else {
            // Session accepted without a client; report instead of leaving busy set
            let _ = tx.send(AppEvent::CompletionFinished(Err(ChatError::Configuration)));
            return;
        };

        debug!(turns = history.len(), "spawning completion task");
        tokio::spawn(async move {
            let call = tokio::spawn(async move { client.complete(&history).await });
            let outcome = match call.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    error!(error = %err, "completion task aborted");
                    Err(ChatError::remote(err.to_string()))
                }
            };
            let _ = tx.send(AppEvent::CompletionFinished(outcome));
        });
    }

    /// Snap back to the newest turn whenever the transcript changed
    fn follow_newest(&mut self) {
        if self.session.revision() != self.seen_revision {
            self.seen_revision = self.session.revision();
            self.scroll_back = 0;
        }
    }

    fn draw(&mut self, frame: &mut Frame) {
        let error_height = if self.session.last_error().is_some() { 4 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2),
                Constraint::Min(5),
                Constraint::Length(error_height),
                Constraint::Length(6),
                Constraint::Length(1),
            ])
            .split(frame.size());

        let header = Paragraph::new(vec![
            Line::from(Span::styled(
                "palaver",
                Style::default()
                    .fg(Color::Magenta)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(
                "Ask me anything and get instant AI-powered responses",
                Style::default().fg(Color::DarkGray),
            )),
        ])
        .alignment(Alignment::Center);
        frame.render_widget(header, chunks[0]);

        let transcript = Transcript::new(self.session.turns(), self.session.is_busy());
        self.max_scroll_back = transcript.max_scroll_back(chunks[1]);
        self.scroll_back = self.scroll_back.min(self.max_scroll_back);
        frame.render_widget(transcript.scroll_back(self.scroll_back), chunks[1]);

        if let Some(message) = self.session.last_error() {
            let banner = Paragraph::new(message.to_string())
                .style(Style::default().fg(Color::Red))
                .wrap(Wrap { trim: true })
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title("Error")
                        .border_style(Style::default().fg(Color::Red)),
                );
            frame.render_widget(banner, chunks[2]);
        }

        frame.render_widget(&self.composer, chunks[3]);

        let mut hints = vec!["Ctrl+Enter send", "PgUp/PgDn scroll", "Esc quit"];
        if !self.session.turns().is_empty() {
            hints.insert(1, "Ctrl+L clear history");
        }
        let footer = Paragraph::new(hints.join("  ·  "))
            .style(Style::default().fg(Color::DarkGray))
            .alignment(Alignment::Center);
        frame.render_widget(footer, chunks[4]);

        if self.confirm_clear {
            let area = centered(frame.size(), 50, 5);
            let dialog = Paragraph::new(vec![
                Line::from("Are you sure you want to clear all chat history?"),
                Line::from(""),
                Line::from(Span::styled(
                    "y = clear, any other key = cancel",
                    Style::default().fg(Color::DarkGray),
                )),
            ])
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title("Clear History")
                    .border_style(Style::default().fg(Color::Red)),
            );
            frame.render_widget(Clear, area);
            frame.render_widget(dialog, area);
        }
    }
}

fn centered(area: Rect, percent_x: u16, height: u16) -> Rect {
    let width = (u32::from(area.width) * u32::from(percent_x.min(100)) / 100) as u16;
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}

/// Raw mode + alternate screen, undone on drop
struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    keyboard_enhanced: bool,
}

impl TerminalGuard {
    fn enter() -> Result<Self> {
        terminal::enable_raw_mode().context("Failed to enable raw mode")?;
        undo_on_error(Self::setup(), || {
            let _ = execute!(io::stdout(), DisableBracketedPaste, LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
        })
    }

    /// Everything after raw mode; `enter` rolls raw mode back if this fails
    fn setup() -> Result<Self> {
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)
            .context("Failed to enter alternate screen")?;

        // Needed for the terminal to report Ctrl+Enter distinctly from Enter
        let keyboard_enhanced = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if keyboard_enhanced {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES)
            )
            .context("Failed to enable keyboard enhancement")?;
        }

        let terminal =
            Terminal::new(CrosstermBackend::new(stdout)).context("Failed to create terminal")?;
        Ok(Self {
            terminal,
            keyboard_enhanced,
        })
    }
}

fn undo_on_error<T>(result: Result<T>, undo: impl FnOnce()) -> Result<T> {
    if result.is_err() {
        undo();
    }
    result
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        if self.keyboard_enhanced {
            let _ = execute!(self.terminal.backend_mut(), PopKeyboardEnhancementFlags);
        }
        let _ = execute!(
            self.terminal.backend_mut(),
            DisableBracketedPaste,
            LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();
        let _ = self.terminal.show_cursor();
    }
}
