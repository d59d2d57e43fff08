use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

const PLACEHOLDER: &str = "Type your message here... (Ctrl+Enter to send)";

/// Result returned when the user interacts with the composer
#[derive(Debug, PartialEq)]
pub enum ComposerResult {
    /// Ctrl+Enter pressed; carries the raw text
    Submit(String),
    None,
}

/// State for the text area within the composer
#[derive(Debug, Clone, Default)]
pub struct TextAreaState {
    pub content: String,
    /// Byte offset, always on a char boundary
    pub cursor_position: usize,
}

/// Multi-line message input
#[derive(Debug, Clone, Default)]
pub struct Composer {
    state: TextAreaState,
    disabled: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle key input. Disabled composers ignore everything.
    pub fn handle_key(&mut self, key: KeyEvent) -> ComposerResult {
        if self.disabled || key.kind != KeyEventKind::Press {
            return ComposerResult::None;
        }

        let submit_modifier = key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::SUPER);

        match key.code {
            KeyCode::Enter if submit_modifier => {
                return ComposerResult::Submit(self.state.content.clone());
            }
            // Terminals without keyboard enhancement deliver Ctrl+Enter as Ctrl+J
            KeyCode::Char('j') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return ComposerResult::Submit(self.state.content.clone());
            }
            KeyCode::Enter => self.insert_char('\n'),
            KeyCode::Char(c) => self.insert_char(c),
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => {
                let prev = self.prev_char();
                if let Some(c) = prev {
                    self.state.cursor_position -= c.len_utf8();
                }
            }
            KeyCode::Right => {
                let next = self.state.content[self.state.cursor_position..].chars().next();
                if let Some(c) = next {
                    self.state.cursor_position += c.len_utf8();
                }
            }
            KeyCode::Home => self.state.cursor_position = 0,
            KeyCode::End => self.state.cursor_position = self.state.content.len(),
            _ => {}
        }

        ComposerResult::None
    }

    /// Insert pasted text at the cursor
    pub fn insert_str(&mut self, text: &str) {
        if self.disabled {
            return;
        }
        let text = text.replace("\r\n", "\n").replace('\r', "\n");
        self.state.content.insert_str(self.state.cursor_position, &text);
        self.state.cursor_position += text.len();
    }

    fn insert_char(&mut self, c: char) {
        self.state.content.insert(self.state.cursor_position, c);
        self.state.cursor_position += c.len_utf8();
    }

    fn prev_char(&self) -> Option<char> {
        self.state.content[..self.state.cursor_position].chars().next_back()
    }

    /// Delete character before cursor
    fn backspace(&mut self) {
        if let Some(c) = self.prev_char() {
            self.state.cursor_position -= c.len_utf8();
            self.state.content.remove(self.state.cursor_position);
        }
    }

    /// Delete character at cursor
    fn delete(&mut self) {
        if self.state.cursor_position < self.state.content.len() {
            self.state.content.remove(self.state.cursor_position);
        }
    }

    pub fn set_disabled(&mut self, disabled: bool) {
        self.disabled = disabled;
    }

    pub fn content(&self) -> &str {
        &self.state.content
    }

    pub fn clear(&mut self) {
        self.state = TextAreaState::default();
    }
}

impl Widget for &Composer {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let state = &self.state;

        let (title, border_style) = if self.disabled {
            ("Waiting for reply...", Style::default().fg(Color::DarkGray))
        } else {
            ("Message", Style::default().fg(Color::Magenta))
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(border_style);

        let inner_area = block.inner(area);
        block.render(area, buf);

        if inner_area.height == 0 {
            return;
        }

        if state.content.is_empty() {
            let placeholder = Line::from(Span::styled(
                PLACEHOLDER,
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner_area.x, inner_area.y, &placeholder, inner_area.width);
            return;
        }

        let mut content = state.content.clone();
        if !self.disabled {
            content.insert(state.cursor_position.min(content.len()), '▌');
        }

        let text_style = if self.disabled {
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };

        // Keep the cursor line visible
        let lines: Vec<&str> = content.split('\n').collect();
        let cursor_line = state.content[..state.cursor_position].matches('\n').count();
        let height = inner_area.height as usize;
        let first = (cursor_line + 1).saturating_sub(height);

        for (i, line_text) in lines.iter().skip(first).take(height).enumerate() {
            let line = Line::from(Span::styled(*line_text, text_style));
            buf.set_line(inner_area.x, inner_area.y + i as u16, &line, inner_area.width);
        }
    }
}
