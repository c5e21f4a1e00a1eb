// Prompt flows: schema-constrained model invocations.
//
// A flow pairs a prompt template with typed input and output. `run_flow`
// drives the model until it returns the output through the `respond` tool,
// executing any auxiliary tool calls along the way.

pub mod calculate_score;
pub mod generate_report;
pub mod summarize_performance;

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::llm::client::{
    ContentBlock, LlmError, Message, MessageRequest, ModelBackend, Progress,
};
use crate::llm::prompt::{system_prompt, RESPOND_TOOL_NAME};
use crate::llm::tools::{ToolChoice, ToolDefinition, ToolSet};
use crate::protocol::FlowKind;
use crate::seo::report::{
    PerformanceSummary, PerformanceSummaryInput, ReportResult, SeoScore, SeoScoreInput,
    ValidationError,
};
use crate::seo::request::{ReportRequest, RequestError};

pub use calculate_score::CalculateScore;
pub use generate_report::GenerateReport;
pub use summarize_performance::SummarizePerformance;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FlowError {
    #[error("invalid request: {0}")]
    Request(#[from] RequestError),

    #[error("{0}")]
    Llm(#[from] LlmError),

    #[error("model output failed validation: {0}")]
    Validation(#[from] ValidationError),

    #[error("model output did not match the schema: {0}")]
    Deserialize(String),

    #[error("`{0}` must not be empty")]
    EmptyInput(&'static str),

    #[error("model finished without producing output")]
    MissingOutput,

    #[error("model output was cut off by the token limit")]
    Truncated,

    #[error("model kept calling tools after {0} rounds")]
    ToolLoopExceeded(u32),
}

// ---------------------------------------------------------------------------
// Flow trait
// ---------------------------------------------------------------------------

/// A named prompt with a typed output contract.
pub trait Flow {
    type Input;
    type Output: DeserializeOwned + JsonSchema;

    fn kind(&self) -> FlowKind;

    fn prompt(&self, input: &Self::Input) -> String;

    /// Auxiliary tools the model may call before responding.
    fn tools(&self) -> ToolSet {
        ToolSet::new()
    }

    fn validate(&self, output: &Self::Output) -> Result<(), ValidationError>;

    /// Description of the `respond` tool for this flow.
    fn respond_description(&self) -> &'static str {
        "Return the final result."
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowSettings {
    pub max_tokens: u32,
    pub max_tool_rounds: u32,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Run `flow` to completion against `backend`.
pub async fn run_flow<F: Flow>(
    backend: &dyn ModelBackend,
    flow: &F,
    input: &F::Input,
    settings: FlowSettings,
    progress: Option<&Progress>,
) -> Result<F::Output, FlowError> {
    let tools = flow.tools();
    let mut definitions = tools.definitions();
    definitions.push(ToolDefinition::for_input::<F::Output>(
        RESPOND_TOOL_NAME,
        flow.respond_description(),
    ));

    let mut request = MessageRequest {
        system: system_prompt(),
        messages: vec![Message::user_text(flow.prompt(input))],
        tools: definitions,
        tool_choice: Some(ToolChoice::Any),
        max_tokens: settings.max_tokens,
    };
    let mut tool_rounds = 0u32;

    info!(flow = flow.kind().name(), "flow started");

    loop {
        let turn = backend.send_message(&request, progress).await?;
        debug!(
            flow = flow.kind().name(),
            input_tokens = turn.usage.input_tokens,
            output_tokens = turn.usage.output_tokens,
            stop_reason = ?turn.stop_reason,
            "model turn finished"
        );

        let tool_uses = turn.tool_uses();

        // A rejected `respond` goes back to the model as an error result
        // while tool rounds remain.
        let mut rejected = None;
        if let Some((_, _, value)) = tool_uses.iter().find(|(_, name, _)| *name == RESPOND_TOOL_NAME) {
            match accept_output(flow, (*value).clone()) {
                Ok(output) => {
                    info!(flow = flow.kind().name(), "flow complete");
                    return Ok(output);
                }
                Err(e) if tool_rounds >= settings.max_tool_rounds => {
                    warn!(flow = flow.kind().name(), error = %e, "output rejected, no rounds left");
                    return Err(e);
                }
                Err(e) => {
                    warn!(flow = flow.kind().name(), error = %e, "output rejected, asking for a correction");
                    rejected = Some(e);
                }
            }
        }

        if !tool_uses.is_empty() {
            if tool_rounds >= settings.max_tool_rounds {
                warn!(flow = flow.kind().name(), tool_rounds, "tool round limit reached");
                return Err(FlowError::ToolLoopExceeded(settings.max_tool_rounds));
            }
            tool_rounds += 1;

            let mut results = Vec::with_capacity(tool_uses.len());
            for (id, name, value) in &tool_uses {
                if *name == RESPOND_TOOL_NAME {
                    let reason = rejected
                        .as_ref()
                        .map(ToString::to_string)
                        .unwrap_or_else(|| "output rejected".to_string());
                    results.push(ContentBlock::ToolResult {
                        tool_use_id: id.to_string(),
                        content: format!(
                            "{reason}. Call `{RESPOND_TOOL_NAME}` again with the corrected result."
                        ),
                        is_error: true,
                    });
                    continue;
                }
                if let Some(progress) = progress {
                    if !progress.tool_call(name).await {
                        return Err(LlmError::Cancelled.into());
                    }
                }
                let (content, is_error) = match tools.call(name, (*value).clone()) {
                    Ok(output) => {
                        info!(flow = flow.kind().name(), tool = *name, "tool call succeeded");
                        (output.to_string(), false)
                    }
                    Err(e) => {
                        warn!(flow = flow.kind().name(), tool = *name, error = %e, "tool call failed");
                        (e.to_string(), true)
                    }
                };
                results.push(ContentBlock::ToolResult {
                    tool_use_id: id.to_string(),
                    content,
                    is_error,
                });
            }

            request.messages.push(Message::assistant(turn.content.clone()));
            request.messages.push(Message::tool_results(results));
            continue;
        }

        if turn.hit_max_tokens() {
            return Err(FlowError::Truncated);
        }

        // No tool call at all: accept a JSON object written as text.
        return match extract_json_object(&turn.text()) {
            Some(value) => {
                debug!(flow = flow.kind().name(), "using JSON from text response");
                accept_output(flow, value)
            }
            None => Err(FlowError::MissingOutput),
        };
    }
}

fn accept_output<F: Flow>(flow: &F, value: Value) -> Result<F::Output, FlowError> {
    let output: F::Output =
        serde_json::from_value(value).map_err(|e| FlowError::Deserialize(e.to_string()))?;
    flow.validate(&output)?;
    Ok(output)
}

/// Find a JSON object in model text: a fenced ```json block first, then the
/// outermost `{...}` span.
pub(crate) fn extract_json_object(text: &str) -> Option<Value> {
    if let Some(start) = text.find("```") {
        let after = &text[start + 3..];
        let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
        let body = &after[body_start..];
        if let Some(end) = body.find("```") {
            if let Ok(v @ Value::Object(_)) = serde_json::from_str(body[..end].trim()) {
                return Some(v);
            }
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    match serde_json::from_str(&text[start..=end]) {
        Ok(v @ Value::Object(_)) => Some(v),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// SeoFlows service
// ---------------------------------------------------------------------------

/// Token budgets per flow, from `[llm]` in analyzer.toml.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowBudgets {
    pub report_max_tokens: u32,
    pub score_max_tokens: u32,
    pub summary_max_tokens: u32,
    pub max_tool_rounds: u32,
}

impl FlowBudgets {
    pub fn from_config(llm: &LlmConfig) -> Self {
        Self {
            report_max_tokens: llm.report_max_tokens,
            score_max_tokens: llm.score_max_tokens,
            summary_max_tokens: llm.summary_max_tokens,
            max_tool_rounds: llm.max_tool_rounds,
        }
    }

    fn settings(&self, kind: FlowKind) -> FlowSettings {
        let max_tokens = match kind {
            FlowKind::GenerateReport => self.report_max_tokens,
            FlowKind::CalculateScore => self.score_max_tokens,
            FlowKind::SummarizePerformance => self.summary_max_tokens,
        };
        FlowSettings {
            max_tokens,
            max_tool_rounds: self.max_tool_rounds,
        }
    }
}

impl Default for FlowBudgets {
    fn default() -> Self {
        Self {
            report_max_tokens: 8192,
            score_max_tokens: 512,
            summary_max_tokens: 1024,
            max_tool_rounds: 4,
        }
    }
}

/// The three SEO flows bound to one model backend. Cheap to clone; shared by
/// the app loop, the WebSocket server and the CLI.
#[derive(Clone)]
pub struct SeoFlows {
    backend: Arc<dyn ModelBackend>,
    budgets: FlowBudgets,
}

impl SeoFlows {
    pub fn new(backend: Arc<dyn ModelBackend>, budgets: FlowBudgets) -> Self {
        Self { backend, budgets }
    }

    pub async fn generate_report(
        &self,
        request: &ReportRequest,
        progress: Option<&Progress>,
    ) -> Result<ReportResult, FlowError> {
        let flow = GenerateReport;
        run_flow(
            self.backend.as_ref(),
            &flow,
            request,
            self.budgets.settings(flow.kind()),
            progress,
        )
        .await
    }

    pub async fn calculate_score(
        &self,
        report: &str,
        progress: Option<&Progress>,
    ) -> Result<SeoScore, FlowError> {
        if report.trim().is_empty() {
            return Err(FlowError::EmptyInput("report"));
        }
        let flow = CalculateScore;
        let input = SeoScoreInput {
            report: report.to_string(),
        };
        run_flow(
            self.backend.as_ref(),
            &flow,
            &input,
            self.budgets.settings(flow.kind()),
            progress,
        )
        .await
    }

    pub async fn summarize_performance(
        &self,
        performance_report: &str,
        progress: Option<&Progress>,
    ) -> Result<PerformanceSummary, FlowError> {
        if performance_report.trim().is_empty() {
            return Err(FlowError::EmptyInput("performanceReport"));
        }
        let flow = SummarizePerformance;
        let input = PerformanceSummaryInput {
            performance_report: performance_report.to_string(),
        };
        run_flow(
            self.backend.as_ref(),
            &flow,
            &input,
            self.budgets.settings(flow.kind()),
            progress,
        )
        .await
    }
}

impl std::fmt::Debug for SeoFlows {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeoFlows")
            .field("budgets", &self.budgets)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------


// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
