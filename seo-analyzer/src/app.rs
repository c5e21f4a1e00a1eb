// Application state and orchestration logic.
//
// The central event loop that coordinates user commands from the TUI, flow
// task events and WebSocket client activity. Owns the session's results and
// pushes UI updates to the TUI render loop.

use std::future::Future;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::flows::{FlowError, SeoFlows};
use crate::llm::client::Progress;
use crate::protocol::{FlowKind, FlowOutput, LlmEvent, LlmStatus, UiUpdate, UserCommand};
use crate::seo::report::ReportResult;
use crate::seo::request::{ReportRequest, RequestError};
use crate::ws_server::WsEvent;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// The complete application state.
pub struct AppState {
    pub flows: SeoFlows,
    pub current_task: Option<tokio::task::JoinHandle<()>>,
    /// Flow the current task is running, if any.
    pub running: Option<FlowKind>,
    /// Monotonically increasing counter identifying the current flow task.
    /// Incremented each time a task is spawned or cancelled. Events from
    /// stale generations are discarded in `handle_llm_event`.
    pub generation: u64,
    pub status: LlmStatus,
    /// Text streamed by the current task.
    pub stream_text: String,
    /// Last request submitted for analysis, for reruns.
    pub last_request: Option<ReportRequest>,
    /// URL and result of the last finished analysis.
    pub report: Option<(String, ReportResult)>,
    pub recalculated_score: Option<f64>,
    pub performance_summary: Option<String>,
    pub browser_clients: usize,
    /// Sender for flow events; spawned tasks use a clone of this sender.
    pub llm_tx: mpsc::Sender<LlmEvent>,
}

impl AppState {
    pub fn new(flows: SeoFlows, llm_tx: mpsc::Sender<LlmEvent>) -> Self {
        AppState {
            flows,
            current_task: None,
            running: None,
            generation: 0,
            status: LlmStatus::Idle,
            stream_text: String::new(),
            last_request: None,
            report: None,
            recalculated_score: None,
            performance_summary: None,
            browser_clients: 0,
            llm_tx,
        }
    }

    /// Abort the current flow task if one is running.
    pub fn cancel_task(&mut self) {
        if let Some(handle) = self.current_task.take() {
            handle.abort();
            info!(generation = self.generation, "Cancelled previous flow task");
        }
    }

    /// Cancel the running flow and make sure none of its events are applied.
    /// Returns `false` if nothing was running.
    pub fn cancel_running(&mut self) -> bool {
        if self.running.is_none() {
            return false;
        }
        self.cancel_task();
        self.generation += 1;
        self.running = None;
        self.status = LlmStatus::Idle;
        true
    }

    /// Validate `raw_url` and start report generation for it.
    ///
    /// Clears the previous result, recalculated score and summary. An invalid
    /// URL leaves the state untouched and never reaches the model.
    pub fn start_analysis(&mut self, raw_url: &str) -> Result<ReportRequest, RequestError> {
        let request = ReportRequest::new(raw_url)?;

        self.report = None;
        self.recalculated_score = None;
        self.performance_summary = None;
        self.last_request = Some(request.clone());

        let req = request.clone();
        self.spawn_flow(FlowKind::GenerateReport, move |flows, progress| async move {
            let result = flows.generate_report(&req, Some(&progress)).await?;
            Ok::<_, FlowError>(FlowOutput::Report {
                url: req.url,
                result: Box::new(result),
            })
        });

        info!(url = %request.url, generation = self.generation, "Started report generation");
        Ok(request)
    }

    /// Score the current report text. Returns `false` without a report.
    pub fn start_score_recalculation(&mut self) -> bool {
        let Some((_, result)) = &self.report else {
            return false;
        };
        let report = result.report.clone();
        self.spawn_flow(FlowKind::CalculateScore, move |flows, progress| async move {
            let score = flows.calculate_score(&report, Some(&progress)).await?;
            Ok::<_, FlowError>(FlowOutput::Score(score))
        });
        info!(generation = self.generation, "Started score recalculation");
        true
    }

    /// Summarize the current performance report. Returns `false` without a
    /// report.
    pub fn start_performance_summary(&mut self) -> bool {
        let Some((_, result)) = &self.report else {
            return false;
        };
        let performance_report = result.performance_report.clone();
        self.spawn_flow(FlowKind::SummarizePerformance, move |flows, progress| async move {
            let summary = flows
                .summarize_performance(&performance_report, Some(&progress))
                .await?;
            Ok::<_, FlowError>(FlowOutput::PerformanceSummary(summary))
        });
        info!(generation = self.generation, "Started performance summary");
        true
    }

    /// Cancel whatever is running, bump the generation and spawn `job`.
    ///
    /// The task reports its outcome as a single `Complete` or `Error` event
    /// tagged with the new generation.
    fn spawn_flow<F, Fut>(&mut self, kind: FlowKind, job: F)
    where
        F: FnOnce(SeoFlows, Progress) -> Fut,
        Fut: Future<Output = Result<FlowOutput, FlowError>> + Send + 'static,
    {
        self.cancel_task();

        self.generation += 1;
        let generation = self.generation;
        let tx = self.llm_tx.clone();
        let fut = job(self.flows.clone(), Progress::new(tx.clone(), generation));

        self.running = Some(kind);
        self.status = LlmStatus::Streaming;
        self.stream_text.clear();

        let handle = tokio::spawn(async move {
            let event = match fut.await {
                Ok(output) => LlmEvent::Complete { output, generation },
                Err(e) => {
                    warn!(flow = kind.name(), generation, "flow failed: {e}");
                    LlmEvent::Error {
                        flow: kind,
                        message: e.to_string(),
                        generation,
                    }
                }
            };
            let _ = tx.send(event).await;
        });

        self.current_task = Some(handle);
    }
}

// ---------------------------------------------------------------------------
// Event loop
// ---------------------------------------------------------------------------

/// Run the main application event loop.
///
/// Pushes UI updates through `ui_tx` for the TUI render loop. Exits on
/// `UserCommand::Quit` or when the command channel closes.
pub async fn run(
    mut ws_rx: mpsc::Receiver<WsEvent>,
    mut llm_rx: mpsc::Receiver<LlmEvent>,
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    info!("Application event loop started");

    // Closed channels are disabled so tokio::select! never spins on them.
    // The WebSocket channel closes immediately when the server is disabled.
    let mut ws_open = true;
    let mut llm_open = true;

    loop {
        tokio::select! {
            // --- WebSocket client activity ---
            ws_event = ws_rx.recv(), if ws_open => {
                match ws_event {
                    Some(event) => handle_ws_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("WebSocket channel closed");
                        ws_open = false;
                    }
                }
            }

            // --- Flow task events ---
            llm_event = llm_rx.recv(), if llm_open => {
                match llm_event {
                    Some(event) => handle_llm_event(&mut state, event, &ui_tx).await,
                    None => {
                        info!("LLM channel closed");
                        llm_open = false;
                    }
                }
            }

            // --- User commands ---
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(UserCommand::Quit) => {
                        info!("Quit command received, shutting down");
                        break;
                    }
                    Some(cmd) => handle_user_command(&mut state, cmd, &ui_tx).await,
                    None => {
                        info!("Command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup
    state.cancel_task();
    info!("Application event loop exiting");
    Ok(())
}

/// Track browser clients for the status bar.
async fn handle_ws_event(state: &mut AppState, event: WsEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    match event {
        WsEvent::Connected { addr } => {
            state.browser_clients += 1;
            info!(%addr, clients = state.browser_clients, "Browser client connected");
            let _ = ui_tx.send(UiUpdate::BrowserClients(state.browser_clients)).await;
        }
        WsEvent::Disconnected { addr } => {
            state.browser_clients = state.browser_clients.saturating_sub(1);
            info!(%addr, clients = state.browser_clients, "Browser client disconnected");
            let _ = ui_tx.send(UiUpdate::BrowserClients(state.browser_clients)).await;
        }
        WsEvent::Request { addr, flow } => {
            let _ = ui_tx
                .send(UiUpdate::Notice(format!("{} requested by {addr}", flow.label())))
                .await;
        }
    }
}

/// Handle an event from a spawned flow task.
///
/// Events whose generation does not match `state.generation` come from a
/// task that has since been cancelled or replaced and are dropped.
async fn handle_llm_event(state: &mut AppState, event: LlmEvent, ui_tx: &mpsc::Sender<UiUpdate>) {
    let event_generation = event.generation();
    if event_generation != state.generation {
        debug!(
            event_generation,
            current_generation = state.generation,
            "Discarding stale flow event"
        );
        return;
    }

    match event {
        LlmEvent::Token { text, .. } => {
            state.stream_text.push_str(&text);
            let _ = ui_tx.send(UiUpdate::Token(text)).await;
        }
        LlmEvent::ToolCall { name, .. } => {
            info!(tool = %name, "Model called tool");
            let _ = ui_tx.send(UiUpdate::ToolCalled(name)).await;
        }
        LlmEvent::Complete { output, .. } => {
            state.running = None;
            state.current_task = None;
            state.status = LlmStatus::Complete;
            match output {
                FlowOutput::Report { url, result } => {
                    info!(%url, score = result.score, performance_score = result.performance_score, "Report ready");
                    state.report = Some((url.clone(), (*result).clone()));
                    let _ = ui_tx.send(UiUpdate::ReportReady { url, result }).await;
                }
                FlowOutput::Score(score) => {
                    info!(score = score.score, "Recalculated score ready");
                    state.recalculated_score = Some(score.score);
                    let _ = ui_tx.send(UiUpdate::ScoreReady(score.score)).await;
                }
                FlowOutput::PerformanceSummary(summary) => {
                    info!("Performance summary ready");
                    state.performance_summary = Some(summary.summary.clone());
                    let _ = ui_tx.send(UiUpdate::SummaryReady(summary.summary)).await;
                }
            }
        }
        LlmEvent::Error { flow, message, .. } => {
            warn!(flow = flow.name(), "Flow error: {message}");
            state.running = None;
            state.current_task = None;
            state.status = LlmStatus::Error;
            let _ = ui_tx.send(UiUpdate::FlowFailed { flow, message }).await;
        }
    }
}

/// Handle a user command from the TUI.
async fn handle_user_command(
    state: &mut AppState,
    cmd: UserCommand,
    ui_tx: &mpsc::Sender<UiUpdate>,
) {
    match cmd {
        UserCommand::Analyze { url } => match state.start_analysis(&url) {
            Ok(request) => {
                let _ = ui_tx.send(UiUpdate::AnalysisStarted { url: request.url }).await;
            }
            Err(e) => {
                info!(input = %url, "Rejected URL: {e}");
                let _ = ui_tx.send(UiUpdate::InvalidUrl(e.to_string())).await;
            }
        },
        UserCommand::Rerun => match state.last_request.clone() {
            Some(request) => match state.start_analysis(&request.url) {
                Ok(request) => {
                    let _ = ui_tx.send(UiUpdate::AnalysisStarted { url: request.url }).await;
                }
                Err(e) => {
                    let _ = ui_tx.send(UiUpdate::InvalidUrl(e.to_string())).await;
                }
            },
            None => {
                let _ = ui_tx
                    .send(UiUpdate::Notice("Nothing to rerun yet. Enter a URL first.".into()))
                    .await;
            }
        },
        UserCommand::RecalculateScore => {
            if state.start_score_recalculation() {
                let _ = ui_tx.send(UiUpdate::ScoreStarted).await;
            } else {
                let _ = ui_tx
                    .send(UiUpdate::Notice("Run an analysis before recalculating the score.".into()))
                    .await;
            }
        }
        UserCommand::SummarizePerformance => {
            if state.start_performance_summary() {
                let _ = ui_tx.send(UiUpdate::SummaryStarted).await;
            } else {
                let _ = ui_tx
                    .send(UiUpdate::Notice("Run an analysis before summarizing performance.".into()))
                    .await;
            }
        }
        UserCommand::Cancel => {
            if state.cancel_running() {
                let _ = ui_tx.send(UiUpdate::Cancelled).await;
            } else {
                let _ = ui_tx.send(UiUpdate::Notice("Nothing to cancel.".into())).await;
            }
        }
        UserCommand::Quit => {
            // Handled in the main loop
        }
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
