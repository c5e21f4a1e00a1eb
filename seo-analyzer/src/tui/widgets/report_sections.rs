// Sections accordion: one collapsible entry per section present in the
// report, in display order.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

use super::focused_border_style;
use crate::tui::ViewState;

/// Render the accordion. The highlighted entry is kept on screen.
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, focused: bool) {
    let sections = state.sections();
    let title = if sections.is_empty() {
        "Sections".to_string()
    } else {
        format!("Sections ({}/{} open)", state.expanded.len(), sections.len())
    };

    let (lines, selected_line) = accordion_lines(state, focused);

    let inner_height = area.height.saturating_sub(2) as usize;
    let scroll = if inner_height > 0 && selected_line >= inner_height {
        (selected_line + 1 - inner_height) as u16
    } else {
        0
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(focused_border_style(focused, Style::default())),
        )
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

/// Build the accordion lines and the index of the highlighted header line.
pub fn accordion_lines(state: &ViewState, focused: bool) -> (Vec<Line<'static>>, usize) {
    let sections = state.sections();
    if sections.is_empty() {
        let hint = if state.report.is_some() {
            "The report has no detailed sections."
        } else {
            "Sections appear here after an analysis."
        };
        return (
            vec![Line::from(Span::styled(hint, Style::default().fg(Color::DarkGray)))],
            0,
        );
    }

    let mut lines = Vec::new();
    let mut selected_line = 0;
    for (i, section) in sections.iter().enumerate() {
        let open = state.expanded.contains(&section.kind);
        let marker = if open { "▾" } else { "▸" };
        let mut style = Style::default().add_modifier(Modifier::BOLD);
        if i == state.selected {
            selected_line = lines.len();
            if focused {
                style = style.add_modifier(Modifier::REVERSED);
            }
        }
        lines.push(Line::from(vec![
            Span::styled(format!("{marker} {}", section.title()), style),
            Span::styled(
                format!(" ({})", section.rows.len()),
                Style::default().fg(Color::DarkGray),
            ),
        ]));

        if open {
            for row in &section.rows {
                lines.push(Line::from(vec![
                    Span::styled(format!("    {}: ", row.label), Style::default().fg(Color::Gray)),
                    Span::raw(row.value.clone()),
                ]));
            }
        }
    }
    (lines, selected_line)
}
