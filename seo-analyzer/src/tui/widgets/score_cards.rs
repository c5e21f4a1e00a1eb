// Score cards: SEO and performance gauges, the recalculated score and a
// traffic summary.
//
// Gauges are colored by score band. The traffic card only appears when the
// report carries traffic data.

use ratatui::layout::Rect;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;

use crate::seo::report::{score_band, score_text, ScoreBand};
use crate::seo::traffic::TrafficData;
use crate::tui::layout::card_columns;
use crate::tui::ViewState;

pub fn render(frame: &mut Frame, area: Rect, state: &ViewState) {
    let traffic = state.report.as_ref().and_then(|r| r.result.traffic.as_ref());
    let count = if traffic.is_some() { 4 } else { 3 };
    let columns = card_columns(area, count);

    let (seo, perf) = match &state.report {
        Some(r) => (Some(r.result.score), Some(r.result.performance_score)),
        None => (None, None),
    };

    render_score_card(frame, columns[0], "SEO Score", seo);
    render_score_card(frame, columns[1], "Performance", perf);
    render_recalculated_card(frame, columns[2], state);
    if let Some(traffic) = traffic {
        render_traffic_card(frame, columns[3], traffic);
    }
}

pub fn band_color(band: ScoreBand) -> Color {
    match band {
        ScoreBand::Good => Color::Green,
        ScoreBand::NeedsWork => Color::Yellow,
        ScoreBand::Poor => Color::Red,
    }
}

/// Gauge label such as "74 / 100 Needs work".
pub fn score_label(score: f64) -> String {
    format!("{} / 100 {}", score_text(score), score_band(score).label())
}

fn render_score_card(frame: &mut Frame, area: Rect, title: &str, score: Option<f64>) {
    let block = Block::default().borders(Borders::ALL).title(title.to_string());
    match score {
        Some(score) => {
            let gauge = Gauge::default()
                .block(block)
                .gauge_style(Style::default().fg(band_color(score_band(score))))
                .ratio((score / 100.0).clamp(0.0, 1.0))
                .label(score_label(score));
            frame.render_widget(gauge, area);
        }
        None => {
            let paragraph = Paragraph::new(Span::styled("--", Style::default().fg(Color::DarkGray)))
                .block(block);
            frame.render_widget(paragraph, area);
        }
    }
}

fn render_recalculated_card(frame: &mut Frame, area: Rect, state: &ViewState) {
    let block = Block::default().borders(Borders::ALL).title("Recalculated");
    let line = match (state.recalculated_score, &state.report) {
        (Some(score), _) => Line::from(vec![
            Span::styled(
                score_text(score),
                Style::default()
                    .fg(band_color(score_band(score)))
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(" / 100 {}", score_band(score).label())),
        ]),
        (None, Some(_)) => Line::from(Span::styled(
            "press s to rescore",
            Style::default().fg(Color::DarkGray),
        )),
        (None, None) => Line::from(Span::styled("--", Style::default().fg(Color::DarkGray))),
    };
    frame.render_widget(Paragraph::new(line).block(block), area);
}

fn render_traffic_card(frame: &mut Frame, area: Rect, traffic: &TrafficData) {
    let block = Block::default().borders(Borders::ALL).title("Traffic");
    let lines = traffic_lines(traffic);
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

pub fn traffic_lines(traffic: &TrafficData) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(format!("{} visits/mo", group_thousands(traffic.monthly_visits))),
        Line::from(format!("bounce {:.1}%", traffic.bounce_rate)),
    ];
    if let Some(top) = traffic
        .top_sources
        .iter()
        .max_by(|a, b| a.share.total_cmp(&b.share))
    {
        lines.push(Line::from(format!("top: {} {:.0}%", top.source, top.share)));
    }
    lines
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
