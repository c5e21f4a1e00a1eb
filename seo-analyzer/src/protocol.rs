// Message types shared between the app orchestrator, the TUI, the LLM tasks
// and WebSocket clients.

use serde::{Deserialize, Serialize};

use crate::seo::report::{PerformanceSummary, ReportResult, SeoScore};

// ---------------------------------------------------------------------------
// Flows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKind {
    GenerateReport,
    CalculateScore,
    SummarizePerformance,
}

impl FlowKind {
    pub fn name(self) -> &'static str {
        match self {
            FlowKind::GenerateReport => "generate_seo_report",
            FlowKind::CalculateScore => "calculate_seo_score",
            FlowKind::SummarizePerformance => "summarize_performance_report",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FlowKind::GenerateReport => "Report generation",
            FlowKind::CalculateScore => "Score calculation",
            FlowKind::SummarizePerformance => "Performance summary",
        }
    }
}

/// The validated result of a finished flow.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowOutput {
    Report {
        url: String,
        result: Box<ReportResult>,
    },
    Score(SeoScore),
    PerformanceSummary(PerformanceSummary),
}

/// Events sent from spawned flow tasks back to the app loop.
///
/// Every event carries the generation of the task that produced it so the
/// app can drop events from tasks it has since replaced.
#[derive(Debug, Clone, PartialEq)]
pub enum LlmEvent {
    /// Streamed model text.
    Token { text: String, generation: u64 },
    /// The model called an auxiliary tool.
    ToolCall { name: String, generation: u64 },
    Complete { output: FlowOutput, generation: u64 },
    Error {
        flow: FlowKind,
        message: String,
        generation: u64,
    },
}

impl LlmEvent {
    pub fn generation(&self) -> u64 {
        match self {
            LlmEvent::Token { generation, .. }
            | LlmEvent::ToolCall { generation, .. }
            | LlmEvent::Complete { generation, .. }
            | LlmEvent::Error { generation, .. } => *generation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LlmStatus {
    #[default]
    Idle,
    Streaming,
    Complete,
    Error,
}

// ---------------------------------------------------------------------------
// TUI <-> app
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    /// Validate the URL and generate a report for it.
    Analyze { url: String },
    /// Generate a new report for the last analyzed URL.
    Rerun,
    /// Score the current report text with the score flow.
    RecalculateScore,
    /// Summarize the current performance report.
    SummarizePerformance,
    /// Abort whatever flow is running.
    Cancel,
    Quit,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UiUpdate {
    AnalysisStarted { url: String },
    InvalidUrl(String),
    Token(String),
    ToolCalled(String),
    ReportReady {
        url: String,
        result: Box<ReportResult>,
    },
    ScoreStarted,
    ScoreReady(f64),
    SummaryStarted,
    SummaryReady(String),
    FlowFailed { flow: FlowKind, message: String },
    Cancelled,
    /// Informational message for the status bar.
    Notice(String),
    /// Number of connected WebSocket clients.
    BrowserClients(usize),
}

// ---------------------------------------------------------------------------
// WebSocket wire format
// ---------------------------------------------------------------------------

/// Requests sent by browser clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    Analyze {
        url: String,
    },
    CalculateScore {
        report: String,
    },
    SummarizePerformance {
        #[serde(rename = "performanceReport")]
        performance_report: String,
    },
}

/// Responses sent to browser clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    Report { url: String, result: Box<ReportResult> },
    Score { score: f64 },
    Summary { summary: String },
    Error { message: String },
}
