// Narrative panel: streamed model text while a flow runs, otherwise the SEO
// report, the performance report and the performance summary.
//
// Auto-scrolls to the bottom while streaming.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;

use super::focused_border_style;
use crate::protocol::LlmStatus;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState, focused: bool) {
    let streaming = state.status == LlmStatus::Streaming;
    let text = if streaming {
        streaming_text(state)
    } else {
        report_text(state)
    };

    let inner_height = area.height.saturating_sub(2) as usize;
    let line_count = text.lines.len();
    let scroll = if streaming && line_count > inner_height {
        (line_count - inner_height) as u16
    } else {
        state.narrative_scroll
    };

    let title = match &state.report {
        Some(report) if !streaming => format!("Report: {}", report.url),
        _ => "Report".to_string(),
    };
    let base = if streaming {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default()
    };

    let paragraph = Paragraph::new(text)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .border_style(focused_border_style(focused, base)),
        )
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

fn streaming_text(state: &ViewState) -> Text<'static> {
    let mut lines: Vec<Line<'static>> = state
        .tool_calls
        .iter()
        .map(|name| {
            Line::from(Span::styled(
                format!("-> called {name}"),
                Style::default().fg(Color::Magenta),
            ))
        })
        .collect();

    if state.stream_text.is_empty() {
        lines.push(Line::from(Span::styled(
            "Waiting for the model...",
            Style::default().fg(Color::DarkGray),
        )));
    } else {
        lines.extend(state.stream_text.lines().map(|l| Line::from(l.to_string())));
    }
    Text::from(lines)
}

/// The finished-report view, or a hint when there is nothing to show.
fn report_text(state: &ViewState) -> Text<'static> {
    let Some(report) = &state.report else {
        return Text::from(Line::from(Span::styled(
            "No report yet. Press / to enter a URL.",
            Style::default().fg(Color::DarkGray),
        )));
    };

    let mut lines = Vec::new();
    push_block(&mut lines, "SEO Report", &report.result.report);
    lines.push(Line::default());
    push_block(&mut lines, "Performance", &report.result.performance_report);
    if let Some(summary) = &state.performance_summary {
        lines.push(Line::default());
        push_block(&mut lines, "Performance Summary", summary);
    }
    Text::from(lines)
}

fn push_block(lines: &mut Vec<Line<'static>>, heading: &str, body: &str) {
    lines.push(Line::from(Span::styled(
        heading.to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )));
    lines.extend(body.lines().map(|l| Line::from(l.to_string())));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tui::test_support::{screen_text, state_with_report};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn plain(text: &Text) -> Vec<String> {
        text.lines.iter().map(|l| l.to_string()).collect()
    }

    #[test]
    fn placeholder_without_report() {
        let state = ViewState::default();
        assert_eq!(plain(&report_text(&state)), vec!["No report yet. Press / to enter a URL."]);
    }

    #[test]
    fn report_text_has_headings_and_summary() {
        let mut state = state_with_report();
        state.performance_summary = Some("Images are the main cost.".into());
        let lines = plain(&report_text(&state));
        assert_eq!(
            lines,
            vec![
                "SEO Report",
                "Titles are solid; meta descriptions missing.",
                "",
                "Performance",
                "LCP is 3.9s on mobile.",
                "",
                "Performance Summary",
                "Images are the main cost.",
            ]
        );
    }

    #[test]
    fn streaming_text_lists_tool_calls_first() {
        let mut state = ViewState::default();
        state.status = LlmStatus::Streaming;
        assert_eq!(plain(&streaming_text(&state)), vec!["Waiting for the model..."]);

        state.tool_calls.push("get_traffic_data".into());
        state.stream_text = "Looking at\nthe page".into();
        assert_eq!(
            plain(&streaming_text(&state)),
            vec!["-> called get_traffic_data", "Looking at", "the page"]
        );
    }

    #[test]
    fn render_streaming_long_text_does_not_panic() {
        let mut terminal = Terminal::new(TestBackend::new(60, 6)).unwrap();
        let mut state = ViewState::default();
        state.status = LlmStatus::Streaming;
        state.stream_text = (0..50).map(|i| format!("Line {i}")).collect::<Vec<_>>().join("\n");
        terminal.draw(|f| render(f, f.area(), &state, false)).unwrap();
        // Auto-scroll keeps the newest line visible.
        assert!(screen_text(&terminal).contains("Line 49"));
    }

    #[test]
    fn render_report_title_shows_url() {
        let mut terminal = Terminal::new(TestBackend::new(80, 12)).unwrap();
        let state = state_with_report();
        terminal.draw(|f| render(f, f.area(), &state, true)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("Report: https://shop.example/"));
        assert!(text.contains("LCP is 3.9s on mobile."));
    }
}
