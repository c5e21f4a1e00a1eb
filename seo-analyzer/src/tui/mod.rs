// TUI dashboard: layout, input handling, and widget rendering.
//
// The TUI owns a `ViewState` that mirrors what the app loop reports. The app
// pushes `UiUpdate` messages over an mpsc channel; the TUI applies them to
// `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;
pub mod widgets;

use std::collections::BTreeSet;
use std::time::Duration;

use crossterm::event::{Event, EventStream};
use futures_util::StreamExt;
use ratatui::Frame;
use tokio::sync::mpsc;
use tracing::debug;

use crate::protocol::{FlowKind, LlmStatus, UiUpdate, UserCommand};
use crate::seo::report::{score_text, RenderedSection, ReportResult, SectionKind};

use layout::build_layout;

/// Which panel receives arrow keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Focus {
    #[default]
    Narrative,
    Sections,
}

impl Focus {
    pub fn toggle(self) -> Self {
        match self {
            Focus::Narrative => Focus::Sections,
            Focus::Sections => Focus::Narrative,
        }
    }
}

/// Status bar message.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Info(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Info(s) | Notice::Error(s) => s,
        }
    }
}

/// The finished report currently on screen.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayedReport {
    pub url: String,
    pub result: ReportResult,
    /// Present sections in display order, computed once on arrival.
    pub sections: Vec<RenderedSection>,
}

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state read by `render_frame`.
#[derive(Debug, Default)]
pub struct ViewState {
    /// Text typed into the URL field.
    pub url_input: String,
    /// Whether keystrokes go to the URL field.
    pub editing: bool,
    pub focus: Focus,
    pub status: LlmStatus,
    /// Flow currently running, if any.
    pub running: Option<FlowKind>,
    pub notice: Option<Notice>,
    /// Model text streamed by the running flow.
    pub stream_text: String,
    /// Auxiliary tools the running flow has called.
    pub tool_calls: Vec<String>,
    pub report: Option<DisplayedReport>,
    pub recalculated_score: Option<f64>,
    pub performance_summary: Option<String>,
    /// Accordion entries currently open.
    pub expanded: BTreeSet<SectionKind>,
    /// Index of the highlighted accordion entry.
    pub selected: usize,
    pub narrative_scroll: u16,
    /// Number of connected WebSocket clients.
    pub browser_clients: usize,
}

impl ViewState {
    pub fn sections(&self) -> &[RenderedSection] {
        self.report.as_ref().map(|r| r.sections.as_slice()).unwrap_or(&[])
    }

    pub fn select_next(&mut self) {
        let count = self.sections().len();
        if count > 0 && self.selected + 1 < count {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Open or close the highlighted section.
    pub fn toggle_selected(&mut self) {
        let Some(kind) = self.sections().get(self.selected).map(|s| s.kind) else {
            return;
        };
        if !self.expanded.remove(&kind) {
            self.expanded.insert(kind);
        }
    }

    pub fn expand_all(&mut self) {
        let kinds: Vec<SectionKind> = self.sections().iter().map(|s| s.kind).collect();
        self.expanded.extend(kinds);
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    fn start_flow(&mut self, kind: FlowKind) {
        self.running = Some(kind);
        self.status = LlmStatus::Streaming;
        self.stream_text.clear();
        self.tool_calls.clear();
        self.narrative_scroll = 0;
    }

    fn finish_flow(&mut self, status: LlmStatus) {
        self.running = None;
        self.status = status;
        self.stream_text.clear();
        self.tool_calls.clear();
    }
}

// ---------------------------------------------------------------------------
// UiUpdate processing
// ---------------------------------------------------------------------------

/// Apply a single UiUpdate to the ViewState.
pub fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::AnalysisStarted { url } => {
            state.start_flow(FlowKind::GenerateReport);
            state.report = None;
            state.recalculated_score = None;
            state.performance_summary = None;
            state.expanded.clear();
            state.selected = 0;
            state.notice = Some(Notice::Info(format!("Analyzing {url}")));
            state.url_input = url;
        }
        UiUpdate::InvalidUrl(message) => {
            state.notice = Some(Notice::Error(message));
        }
        UiUpdate::Token(text) => {
            state.stream_text.push_str(&text);
        }
        UiUpdate::ToolCalled(name) => {
            state.notice = Some(Notice::Info(format!("Model called {name}")));
            state.tool_calls.push(name);
        }
        UiUpdate::ReportReady { url, result } => {
            state.finish_flow(LlmStatus::Complete);
            let sections = result.sections();
            state.notice = Some(Notice::Info(format!(
                "Report ready: {} sections for {url}",
                sections.len()
            )));
            state.selected = 0;
            state.report = Some(DisplayedReport {
                url,
                result: *result,
                sections,
            });
        }
        UiUpdate::ScoreStarted => {
            state.start_flow(FlowKind::CalculateScore);
            state.recalculated_score = None;
            state.notice = Some(Notice::Info("Recalculating score".into()));
        }
        UiUpdate::ScoreReady(score) => {
            state.finish_flow(LlmStatus::Complete);
            state.recalculated_score = Some(score);
            state.notice = Some(Notice::Info(format!(
                "Recalculated score: {}",
                score_text(score)
            )));
        }
        UiUpdate::SummaryStarted => {
            state.start_flow(FlowKind::SummarizePerformance);
            state.performance_summary = None;
            state.notice = Some(Notice::Info("Summarizing performance".into()));
        }
        UiUpdate::SummaryReady(summary) => {
            state.finish_flow(LlmStatus::Complete);
            state.performance_summary = Some(summary);
            state.notice = Some(Notice::Info("Performance summary ready".into()));
        }
        UiUpdate::FlowFailed { flow, message } => {
            state.finish_flow(LlmStatus::Error);
            state.notice = Some(Notice::Error(format!("{} failed: {message}", flow.label())));
        }
        UiUpdate::Cancelled => {
            state.finish_flow(LlmStatus::Idle);
            state.notice = Some(Notice::Info("Cancelled.".into()));
        }
        UiUpdate::Notice(message) => {
            state.notice = Some(Notice::Info(message));
        }
        UiUpdate::BrowserClients(count) => {
            state.browser_clients = count;
        }
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

/// Render the complete dashboard frame.
pub fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    widgets::status_bar::render(frame, layout.status_bar, state);
    widgets::url_input::render(frame, layout.url_input, state);
    widgets::score_cards::render(frame, layout.score_cards, state);
    widgets::narrative::render(
        frame,
        layout.narrative,
        state,
        !state.editing && state.focus == Focus::Narrative,
    );
    widgets::report_sections::render(
        frame,
        layout.sections,
        state,
        !state.editing && state.focus == Focus::Sections,
    );
    widgets::help_bar::render(frame, layout.help_bar, state);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop until the user quits or the app closes the
/// update channel. The terminal is restored on exit and on panic.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let result = loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => apply_ui_update(&mut view_state, ui_update),
                    None => break Ok(()),
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if let Some(cmd) = input::handle_key(key_event, &mut view_state) {
                            let quit = cmd == UserCommand::Quit;
                            debug!(?cmd, "key produced command");
                            if cmd_tx.send(cmd).await.is_err() || quit {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(anyhow::Error::new(e).context("terminal input failed")),
                    None => break Ok(()),
                }
            }

            _ = render_tick.tick() => {
                if let Err(e) = terminal.draw(|frame| render_frame(frame, &view_state)) {
                    break Err(anyhow::Error::new(e).context("failed to draw frame"));
                }
            }
        }
    };

    ratatui::restore();
    result
}


// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn report_ready(state: &mut ViewState) {
        apply_ui_update(
            state,
            UiUpdate::ReportReady {
                url: "https://shop.example/".into(),
                result: Box::new(sample_report()),
            },
        );
    }

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert!(state.url_input.is_empty());
        assert!(!state.editing);
        assert_eq!(state.focus, Focus::Narrative);
        assert_eq!(state.status, LlmStatus::Idle);
        assert!(state.running.is_none());
        assert!(state.report.is_none());
        assert!(state.sections().is_empty());
        assert_eq!(state.browser_clients, 0);
    }

    #[test]
    fn analysis_started_clears_previous_results() {
        let mut state = ViewState::default();
        report_ready(&mut state);
        state.recalculated_score = Some(50.0);
        state.performance_summary = Some("old".into());
        state.expanded.insert(SectionKind::OnPage);

        apply_ui_update(
            &mut state,
            UiUpdate::AnalysisStarted { url: "https://other.example/".into() },
        );

        assert!(state.report.is_none());
        assert!(state.recalculated_score.is_none());
        assert!(state.performance_summary.is_none());
        assert!(state.expanded.is_empty());
        assert_eq!(state.running, Some(FlowKind::GenerateReport));
        assert_eq!(state.status, LlmStatus::Streaming);
        assert_eq!(state.url_input, "https://other.example/");
    }

    #[test]
    fn tokens_accumulate_while_streaming() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::AnalysisStarted { url: "https://a.io/".into() });
        apply_ui_update(&mut state, UiUpdate::Token("Checking ".into()));
        apply_ui_update(&mut state, UiUpdate::Token("traffic.".into()));
        apply_ui_update(&mut state, UiUpdate::ToolCalled("get_traffic_data".into()));
        assert_eq!(state.stream_text, "Checking traffic.");
        assert_eq!(state.tool_calls, vec!["get_traffic_data".to_string()]);
    }

    #[test]
    fn report_ready_caches_sections_and_finishes() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::AnalysisStarted { url: "https://a.io/".into() });
        apply_ui_update(&mut state, UiUpdate::Token("partial".into()));
        report_ready(&mut state);

        assert!(state.running.is_none());
        assert_eq!(state.status, LlmStatus::Complete);
        assert!(state.stream_text.is_empty());
        let kinds: Vec<SectionKind> = state.sections().iter().map(|s| s.kind).collect();
        assert_eq!(kinds, vec![SectionKind::Recommendations, SectionKind::OnPage]);
    }

    #[test]
    fn score_and_summary_updates() {
        let mut state = ViewState::default();
        report_ready(&mut state);

        apply_ui_update(&mut state, UiUpdate::ScoreStarted);
        assert_eq!(state.running, Some(FlowKind::CalculateScore));
        apply_ui_update(&mut state, UiUpdate::ScoreReady(66.0));
        assert_eq!(state.recalculated_score, Some(66.0));

        apply_ui_update(&mut state, UiUpdate::SummaryStarted);
        assert_eq!(state.running, Some(FlowKind::SummarizePerformance));
        apply_ui_update(&mut state, UiUpdate::SummaryReady("Mobile is slow.".into()));
        assert_eq!(state.performance_summary.as_deref(), Some("Mobile is slow."));
        assert!(state.running.is_none());
        // The report itself is untouched by either flow.
        assert_eq!(state.report.as_ref().unwrap().result.score, 74.0);
    }

    #[test]
    fn failure_sets_error_notice() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::ScoreStarted);
        apply_ui_update(
            &mut state,
            UiUpdate::FlowFailed {
                flow: FlowKind::CalculateScore,
                message: "rate limited".into(),
            },
        );
        assert_eq!(state.status, LlmStatus::Error);
        assert!(state.running.is_none());
        assert_eq!(
            state.notice,
            Some(Notice::Error("Score calculation failed: rate limited".into()))
        );
    }

    #[test]
    fn invalid_url_and_cancel() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::InvalidUrl("bad scheme".into()));
        assert_eq!(state.notice, Some(Notice::Error("bad scheme".into())));

        apply_ui_update(&mut state, UiUpdate::AnalysisStarted { url: "https://a.io/".into() });
        apply_ui_update(&mut state, UiUpdate::Cancelled);
        assert_eq!(state.status, LlmStatus::Idle);
        assert!(state.running.is_none());
    }

    #[test]
    fn browser_clients_update() {
        let mut state = ViewState::default();
        apply_ui_update(&mut state, UiUpdate::BrowserClients(3));
        assert_eq!(state.browser_clients, 3);
    }

    #[test]
    fn accordion_selection_and_toggle() {
        let mut state = ViewState::default();
        // No report: toggling and moving are no-ops.
        state.toggle_selected();
        state.select_next();
        assert!(state.expanded.is_empty());
        assert_eq!(state.selected, 0);

        report_ready(&mut state);
        state.select_next();
        state.select_next();
        assert_eq!(state.selected, 1);
        state.toggle_selected();
        assert!(state.expanded.contains(&SectionKind::OnPage));
        state.toggle_selected();
        assert!(state.expanded.is_empty());

        state.expand_all();
        assert_eq!(state.expanded.len(), 2);
        state.collapse_all();
        assert!(state.expanded.is_empty());
    }

    #[test]
    fn render_frame_with_defaults() {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let state = ViewState::default();
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("SEO Score"));
        assert!(text.contains("Sections"));
    }

    #[test]
    fn render_frame_with_report() {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        let mut state = ViewState::default();
        report_ready(&mut state);
        state.expand_all();
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
        let text = screen_text(&terminal);
        assert!(text.contains("meta descriptions missing"));
        assert!(text.contains("Recommendations"));
    }

    #[test]
    fn render_frame_on_tiny_terminal() {
        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        let mut state = ViewState::default();
        report_ready(&mut state);
        terminal.draw(|frame| render_frame(frame, &state)).unwrap();
    }
}
