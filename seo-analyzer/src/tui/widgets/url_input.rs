// URL input field.

use ratatui::layout::{Position, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::focused_border_style;
use crate::tui::ViewState;

const PLACEHOLDER: &str = "Press / to enter a URL, e.g. https://example.com";

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let title = if state.editing {
        "URL (Enter to analyze, Esc to stop editing)"
    } else {
        "URL"
    };

    let line = if state.url_input.is_empty() && !state.editing {
        Line::from(Span::styled(PLACEHOLDER, Style::default().fg(Color::DarkGray)))
    } else {
        Line::from(state.url_input.as_str())
    };

    // Keep the end of a long URL visible.
    let inner_width = area.width.saturating_sub(2);
    let text_width = state.url_input.chars().count() as u16;
    let scroll_x = (text_width + 1).saturating_sub(inner_width);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(focused_border_style(state.editing, Style::default()));
    let paragraph = Paragraph::new(line).block(block).scroll((0, scroll_x));
    frame.render_widget(paragraph, area);

    if state.editing && area.width > 2 && area.height > 2 {
        let cursor_x = area.x + 1 + (text_width - scroll_x).min(inner_width.saturating_sub(1));
        frame.set_cursor_position(Position::new(cursor_x, area.y + 1));
    }
}
