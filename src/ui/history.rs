//! Transcript display component

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Widget},
};

use crate::events::{Role, Turn};

/// Transcript view. `scroll_back` counts lines scrolled up from the newest turn.
pub struct Transcript<'a> {
    turns: &'a [Turn],
    busy: bool,
    scroll_back: usize,
}

impl<'a> Transcript<'a> {
    pub fn new(turns: &'a [Turn], busy: bool) -> Self {
        Self {
            turns,
            busy,
            scroll_back: 0,
        }
    }

    pub fn scroll_back(mut self, lines: usize) -> Self {
        self.scroll_back = lines;
        self
    }

    /// All transcript lines for the given inner width, oldest first
    pub fn lines(&self, width: u16) -> Vec<Line<'static>> {
        let mut all_lines = Vec::new();
        for turn in self.turns {
            all_lines.extend(render_turn(turn, width));
            all_lines.push(Line::from(""));
        }

        if self.busy {
            all_lines.push(Line::from(Span::styled(
                "AI Assistant",
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )));
            all_lines.push(Line::from(Span::styled(
                "  AI is thinking...",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        all_lines
    }

    /// Furthest the view can scroll back when rendered into `area`
    pub fn max_scroll_back(&self, area: Rect) -> usize {
        let inner_area = Block::default().borders(Borders::ALL).inner(area);
        let total = self.lines(inner_area.width).len();
        total.saturating_sub(inner_area.height as usize)
    }
}

impl Widget for Transcript<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let block = Block::default().borders(Borders::ALL).title("Conversation");
        let inner_area = block.inner(area);
        block.render(area, buf);

        if self.turns.is_empty() && !self.busy {
            let welcome_lines = [
                Line::from(Span::styled(
                    "Start a conversation with AI",
                    Style::default().fg(Color::Magenta),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "Type your message below and press Ctrl+Enter",
                    Style::default().fg(Color::DarkGray),
                )),
            ];
            for (i, line) in welcome_lines.iter().enumerate() {
                if i < inner_area.height as usize {
                    buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
                }
            }
            return;
        }

        let all_lines = self.lines(inner_area.width);
        let visible = visible_window(all_lines.len(), inner_area.height as usize, self.scroll_back);

        for (i, line) in all_lines[visible].iter().enumerate() {
            buf.set_line(inner_area.x, inner_area.y + i as u16, line, inner_area.width);
        }
    }
}

/// Range of lines shown in a viewport of `height` rows, anchored to the bottom
/// and shifted up by `scroll_back` (clamped to the first line).
pub fn visible_window(total: usize, height: usize, scroll_back: usize) -> std::ops::Range<usize> {
    let max_back = total.saturating_sub(height);
    let end = total - scroll_back.min(max_back);
    end.saturating_sub(height)..end
}

fn render_turn(turn: &Turn, width: u16) -> Vec<Line<'static>> {
    let (header_style, content_style) = match turn.role {
        Role::User => (
            Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            Style::default().fg(Color::Blue),
        ),
        Role::Assistant => (
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            Style::default(),
        ),
    };

    let mut lines = vec![Line::from(Span::styled(turn.role.display_name(), header_style))];
    for content_line in wrap_text(&turn.content, width.saturating_sub(2) as usize) {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(content_line, content_style),
        ]));
    }
    lines
}

/// Wrap text to fit within the given width. Explicit line breaks and runs of
/// whitespace are kept; words wider than the pane are broken across lines.
pub fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let text = text.replace('\t', "    ");
    if width == 0 {
        return text.split('\n').map(str::to_string).collect();
    }

    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let mut current_line = String::new();
        let mut current_width = 0;

        for token in tokens(paragraph) {
            let token_width = token.chars().count();
            if current_width + token_width <= width {
                current_line.push_str(token);
                current_width += token_width;
                continue;
            }

            if token.starts_with(char::is_whitespace) {
                // Whitespace at a wrap point is absorbed by the break
                if current_width > 0 {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                } else {
                    current_line.extend(token.chars().take(width));
                    current_width = width;
                }
                continue;
            }

            if current_width > 0 {
                let line = std::mem::take(&mut current_line);
                let trimmed = line.trim_end();
                lines.push(if trimmed.is_empty() { line } else { trimmed.to_string() });
                current_width = 0;
            }
            for c in token.chars() {
                if current_width == width {
                    lines.push(std::mem::take(&mut current_line));
                    current_width = 0;
                }
                current_line.push(c);
                current_width += 1;
            }
        }

        lines.push(current_line);
    }

    lines
}

/// Split into alternating runs of whitespace and non-whitespace
fn tokens(text: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut in_space = None;

    for (index, c) in text.char_indices() {
        let is_space = c.is_whitespace();
        if in_space.is_some_and(|previous| previous != is_space) {
            tokens.push(&text[start..index]);
            start = index;
        }
        in_space = Some(is_space);
    }
    if start < text.len() {
        tokens.push(&text[start..]);
    }

    tokens
}
