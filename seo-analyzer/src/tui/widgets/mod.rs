// TUI widget modules for each dashboard panel.

pub mod help_bar;
pub mod narrative;
pub mod report_sections;
pub mod score_cards;
pub mod status_bar;
pub mod url_input;

use ratatui::style::{Color, Modifier, Style};

/// Border style for a panel, highlighted when it has keyboard focus.
pub fn focused_border_style(focused: bool, base: Style) -> Style {
    if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        base
    }
}
