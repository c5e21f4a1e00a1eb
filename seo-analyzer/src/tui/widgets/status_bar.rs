// Status bar widget: flow status, browser clients, latest notice.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::protocol::{FlowKind, LlmStatus};
use crate::tui::{Notice, ViewState};

/// Render the status bar into the given area.
///
/// Layout: [title] [flow status] | [browser clients] | [notice]
pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let mut spans = vec![Span::styled(
        " SEO Analyzer ",
        Style::default().fg(Color::Black).bg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];

    let (status_text, status_color) = status_indicator(state.status, state.running);
    spans.push(Span::styled(format!(" {status_text}"), Style::default().fg(status_color)));
    spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));

    let (dot, dot_color) = clients_indicator(state.browser_clients);
    spans.push(Span::styled(dot, Style::default().fg(dot_color)));
    spans.push(Span::styled(
        format!(" {}", clients_label(state.browser_clients)),
        Style::default().fg(Color::White),
    ));

    if let Some(notice) = &state.notice {
        spans.push(Span::styled(" | ", Style::default().fg(Color::Gray)));
        spans.push(Span::styled(notice.text().to_string(), notice_style(notice)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(paragraph, area);
}

/// Text and color for the flow status.
pub fn status_indicator(status: LlmStatus, running: Option<FlowKind>) -> (String, Color) {
    match (status, running) {
        (LlmStatus::Streaming, Some(kind)) => (format!("{}...", kind.label()), Color::Yellow),
        (LlmStatus::Streaming, None) => ("working...".to_string(), Color::Yellow),
        (LlmStatus::Idle, _) => ("idle".to_string(), Color::DarkGray),
        (LlmStatus::Complete, _) => ("done".to_string(), Color::Green),
        (LlmStatus::Error, _) => ("error".to_string(), Color::Red),
    }
}

pub fn clients_indicator(count: usize) -> (&'static str, Color) {
    if count > 0 {
        ("●", Color::Green)
    } else {
        ("●", Color::DarkGray)
    }
}

fn clients_label(count: usize) -> String {
    match count {
        1 => "1 browser client".to_string(),
        n => format!("{n} browser clients"),
    }
}

fn notice_style(notice: &Notice) -> Style {
    match notice {
        Notice::Info(_) => Style::default().fg(Color::White),
        Notice::Error(_) => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
