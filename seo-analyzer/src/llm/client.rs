// Claude API streaming client using reqwest-eventsource.
//
// Sends a conversation to the Anthropic Messages API with `stream: true` and
// assembles the Server-Sent Events into a `ModelTurn`: text blocks, tool-use
// blocks with their parsed input, the stop reason and token usage. Text
// deltas are forwarded as `LlmEvent::Token` while the turn streams.

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest_eventsource::{Event, RequestBuilderExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::tools::{ToolChoice, ToolDefinition};
use crate::config::Config;
use crate::protocol::LlmEvent;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LlmError {
    #[error("LLM not configured: add anthropic_api_key to config/credentials.toml")]
    NotConfigured,

    #[error("API returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("stream ended before the response was complete")]
    Incomplete,

    #[error("request cancelled")]
    Cancelled,
}

// ---------------------------------------------------------------------------
// Conversation types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "std::ops::Not::not")]
        is_error: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: Vec<ContentBlock>,
}

impl Message {
    pub fn user_text(text: impl Into<String>) -> Self {
        Message {
            role: Role::User,
            content: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    pub fn assistant(content: Vec<ContentBlock>) -> Self {
        Message {
            role: Role::Assistant,
            content,
        }
    }

    /// A user message answering the tool calls of the previous turn.
    pub fn tool_results(results: Vec<ContentBlock>) -> Self {
        Message {
            role: Role::User,
            content: results,
        }
    }
}

/// Everything one model turn needs besides the model name.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageRequest {
    pub system: String,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
    pub max_tokens: u32,
}

#[derive(Serialize)]
struct ApiRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    stream: bool,
    system: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "no_tools")]
    tools: &'a [ToolDefinition],
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'a ToolChoice>,
}

fn no_tools(tools: &&[ToolDefinition]) -> bool {
    tools.is_empty()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// A fully streamed assistant turn.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModelTurn {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

impl ModelTurn {
    /// All text blocks concatenated.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `(id, name, input)` for each tool-use block, in order.
    pub fn tool_uses(&self) -> Vec<(&str, &str, &Value)> {
        self.content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, name, input } => {
                    Some((id.as_str(), name.as_str(), input))
                }
                _ => None,
            })
            .collect()
    }

    pub fn hit_max_tokens(&self) -> bool {
        self.stop_reason.as_deref() == Some("max_tokens")
    }
}

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Where streamed tokens and tool-call notices go while a flow runs.
#[derive(Debug, Clone)]
pub struct Progress {
    tx: mpsc::Sender<LlmEvent>,
    generation: u64,
}

impl Progress {
    pub fn new(tx: mpsc::Sender<LlmEvent>, generation: u64) -> Self {
        Self { tx, generation }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `false` once the receiver is gone.
    pub async fn token(&self, text: String) -> bool {
        self.tx
            .send(LlmEvent::Token {
                text,
                generation: self.generation,
            })
            .await
            .is_ok()
    }

    pub async fn tool_call(&self, name: &str) -> bool {
        self.tx
            .send(LlmEvent::ToolCall {
                name: name.to_string(),
                generation: self.generation,
            })
            .await
            .is_ok()
    }
}

// ---------------------------------------------------------------------------
// Turn assembly
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum PartialBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        json: String,
    },
    /// Tool-use block after its `content_block_stop`.
    Closed(ClosedBlock),
}

#[derive(Debug)]
enum ClosedBlock {
    Parsed(ContentBlock),
    /// Input was not valid JSON when the block closed.
    Malformed { name: String, error: String },
}

fn close_tool(id: String, name: String, json: &str) -> ClosedBlock {
    match parse_tool_input(json) {
        Ok(input) => ClosedBlock::Parsed(ContentBlock::ToolUse { id, name, input }),
        Err(e) => ClosedBlock::Malformed {
            name,
            error: e.to_string(),
        },
    }
}

fn parse_tool_input(json: &str) -> Result<Value, serde_json::Error> {
    if json.trim().is_empty() {
        Ok(Value::Object(Default::default()))
    } else {
        serde_json::from_str(json)
    }
}

/// Delta payloads of a `content_block_delta` event.
#[derive(Debug, PartialEq)]
pub(crate) enum Delta {
    Text(String),
    InputJson(String),
}

/// Accumulates SSE events of one response into a `ModelTurn`.
#[derive(Debug, Default)]
pub struct TurnAssembler {
    blocks: Vec<(usize, PartialBlock)>,
    stop_reason: Option<String>,
    usage: Usage,
    stopped: bool,
}

impl TurnAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Feed one SSE event. Returns streamed text to forward, if any.
    pub fn handle(&mut self, event_type: &str, data: &str) -> Result<Option<String>, LlmError> {
        match event_type {
            "message_start" => {
                match parse_input_tokens(data) {
                    Some(n) => self.usage.input_tokens = n,
                    None => warn!("failed to parse input_tokens from message_start"),
                }
                debug!(input_tokens = self.usage.input_tokens, "message_start");
            }
            "content_block_start" => match parse_block_start(data) {
                Some((index, block)) => self.blocks.push((index, block)),
                None => warn!("unrecognized content_block_start"),
            },
            "content_block_delta" => {
                let index = parse_index(data);
                match parse_delta(data) {
                    Some(Delta::Text(text)) => {
                        match self.block_mut(index) {
                            Some(PartialBlock::Text(buf)) => buf.push_str(&text),
                            _ => self.blocks.push((index.unwrap_or(0), PartialBlock::Text(text.clone()))),
                        }
                        return Ok(Some(text));
                    }
                    Some(Delta::InputJson(part)) => match self.block_mut(index) {
                        Some(PartialBlock::ToolUse { json, .. }) => json.push_str(&part),
                        _ => warn!("input_json_delta without an open tool_use block"),
                    },
                    None => debug!("ignoring content_block_delta"),
                }
            }
            "content_block_stop" => {
                if let Some(slot) = self.block_mut(parse_index(data)) {
                    if let PartialBlock::ToolUse { id, name, json } = slot {
                        let closed = close_tool(std::mem::take(id), std::mem::take(name), json);
                        if let ClosedBlock::Malformed { name, error } = &closed {
                            debug!(tool = %name, %error, "tool input did not parse at block stop");
                        }
                        *slot = PartialBlock::Closed(closed);
                    }
                }
            }
            "message_delta" => {
                if let Some(reason) = parse_stop_reason(data) {
                    self.stop_reason = Some(reason);
                }
                match parse_output_tokens(data) {
                    Some(n) => self.usage.output_tokens = n,
                    None => warn!("failed to parse output_tokens from message_delta"),
                }
                debug!(output_tokens = self.usage.output_tokens, "message_delta");
            }
            "message_stop" => {
                debug!("message_stop");
                self.stopped = true;
            }
            "error" => return Err(LlmError::Api(parse_stream_error(data))),
            // ping
            _ => debug!(event_type, "ignoring SSE event"),
        }
        Ok(None)
    }

    fn block_mut(&mut self, index: Option<usize>) -> Option<&mut PartialBlock> {
        match index {
            Some(i) => self
                .blocks
                .iter_mut()
                .find(|(idx, _)| *idx == i)
                .map(|(_, b)| b),
            None => self.blocks.last_mut().map(|(_, b)| b),
        }
    }

    /// Build the turn. Tool blocks still open are closed first. Tool input
    /// that is not valid JSON is an API error, unless the turn hit
    /// `max_tokens`, in which case the cut-off block is dropped.
    pub fn finish(mut self) -> Result<ModelTurn, LlmError> {
        self.blocks.sort_by_key(|(idx, _)| *idx);
        let truncated = self.stop_reason.as_deref() == Some("max_tokens");
        let mut content = Vec::with_capacity(self.blocks.len());
        for (_, block) in self.blocks {
            let closed = match block {
                PartialBlock::Text(text) => ClosedBlock::Parsed(ContentBlock::Text { text }),
                PartialBlock::ToolUse { id, name, json } => close_tool(id, name, &json),
                PartialBlock::Closed(closed) => closed,
            };
            match closed {
                ClosedBlock::Parsed(block) => content.push(block),
                ClosedBlock::Malformed { name, error } if truncated => {
                    warn!(tool = %name, %error, "dropping truncated tool input");
                }
                ClosedBlock::Malformed { name, error } => {
                    return Err(LlmError::Api(format!(
                        "invalid input JSON for tool `{name}`: {error}"
                    )))
                }
            }
        }
        Ok(ModelTurn {
            content,
            stop_reason: self.stop_reason,
            usage: self.usage,
        })
    }
}

// ---------------------------------------------------------------------------
// ClaudeClient
// ---------------------------------------------------------------------------

/// Low-level Claude API streaming client.
pub struct ClaudeClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    api_url: String,
}

impl ClaudeClient {
    /// Create a new client with the given API key and model identifier.
    pub fn new(api_key: String, model: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key,
            model,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Stream one assistant turn.
    ///
    /// Text deltas go to `progress` as they arrive. If the progress receiver
    /// is dropped the stream is closed and `LlmError::Cancelled` returned.
    pub async fn send_message(
        &self,
        request: &MessageRequest,
        progress: Option<&Progress>,
    ) -> Result<ModelTurn, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured);
        }

        let body = ApiRequest {
            model: &self.model,
            max_tokens: request.max_tokens,
            stream: true,
            system: &request.system,
            messages: &request.messages,
            tools: &request.tools,
            tool_choice: request.tool_choice.as_ref(),
        };

        let builder = self
            .http
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let mut es = builder
            .eventsource()
            .map_err(|e| LlmError::Transport(format!("failed to create event source: {e}")))?;

        let mut assembler = TurnAssembler::new();

        while let Some(event) = es.next().await {
            match event {
                Ok(Event::Open) => debug!("SSE connection opened"),
                Ok(Event::Message(msg)) => {
                    let delta = match assembler.handle(&msg.event, &msg.data) {
                        Ok(delta) => delta,
                        Err(e) => {
                            es.close();
                            return Err(e);
                        }
                    };
                    if let (Some(text), Some(progress)) = (delta, progress) {
                        if !progress.token(text).await {
                            es.close();
                            return Err(LlmError::Cancelled);
                        }
                    }
                    if assembler.is_stopped() {
                        es.close();
                        return assembler.finish();
                    }
                }
                Err(err) => {
                    warn!(?err, "SSE stream error");
                    es.close();
                    return Err(into_llm_error(err).await);
                }
            }
        }

        Err(LlmError::Incomplete)
    }
}

// ---------------------------------------------------------------------------
// LlmClient wrapper
// ---------------------------------------------------------------------------

/// High-level wrapper that can be either an active Claude client or disabled.
pub enum LlmClient {
    /// Claude API is configured and ready.
    Active(ClaudeClient),
    /// LLM functionality is disabled (no API key configured).
    Disabled,
}

impl LlmClient {
    /// `Active` if an API key is present in credentials, otherwise `Disabled`.
    pub fn from_config(config: &Config) -> Self {
        match &config.credentials.anthropic_api_key {
            Some(key) if !key.trim().is_empty() => LlmClient::Active(
                ClaudeClient::new(key.trim().to_string(), config.llm.model.clone())
                    .with_api_url(config.llm.api_url.clone()),
            ),
            _ => LlmClient::Disabled,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, LlmClient::Active(_))
    }
}

/// The seam between flows and the model. Tests script it.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn send_message(
        &self,
        request: &MessageRequest,
        progress: Option<&Progress>,
    ) -> Result<ModelTurn, LlmError>;
}

#[async_trait]
impl ModelBackend for LlmClient {
    async fn send_message(
        &self,
        request: &MessageRequest,
        progress: Option<&Progress>,
    ) -> Result<ModelTurn, LlmError> {
        match self {
            LlmClient::Active(client) => client.send_message(request, progress).await,
            LlmClient::Disabled => Err(LlmError::NotConfigured),
        }
    }
}

// ---------------------------------------------------------------------------
// SSE JSON parsing helpers
// ---------------------------------------------------------------------------

/// Extract `input_tokens` from a `message_start` event's JSON.
///
/// Expected shape: `{ "type": "message_start", "message": { "usage": { "input_tokens": N } } }`
pub(crate) fn parse_input_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("message")?
        .get("usage")?
        .get("input_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

fn parse_index(data: &str) -> Option<usize> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("index")?.as_u64().map(|n| n as usize)
}

/// Parse a `content_block_start` into its index and an empty block.
fn parse_block_start(data: &str) -> Option<(usize, PartialBlock)> {
    let v: Value = serde_json::from_str(data).ok()?;
    let index = v.get("index").and_then(Value::as_u64).unwrap_or(0) as usize;
    let block = v.get("content_block")?;
    match block.get("type")?.as_str()? {
        "text" => {
            let text = block.get("text").and_then(Value::as_str).unwrap_or("");
            Some((index, PartialBlock::Text(text.to_string())))
        }
        "tool_use" => Some((
            index,
            PartialBlock::ToolUse {
                id: block.get("id")?.as_str()?.to_string(),
                name: block.get("name")?.as_str()?.to_string(),
                json: String::new(),
            },
        )),
        _ => None,
    }
}

/// Extract the delta of a `content_block_delta` event.
///
/// `{ "delta": { "type": "text_delta", "text": "..." } }` or
/// `{ "delta": { "type": "input_json_delta", "partial_json": "..." } }`
pub(crate) fn parse_delta(data: &str) -> Option<Delta> {
    let v: Value = serde_json::from_str(data).ok()?;
    let delta = v.get("delta")?;
    match delta.get("type").and_then(Value::as_str) {
        Some("input_json_delta") => delta
            .get("partial_json")?
            .as_str()
            .map(|s| Delta::InputJson(s.to_string())),
        _ => delta.get("text")?.as_str().map(|s| Delta::Text(s.to_string())),
    }
}

/// Extract `delta.stop_reason` from a `message_delta` event's JSON.
pub(crate) fn parse_stop_reason(data: &str) -> Option<String> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("delta")?
        .get("stop_reason")?
        .as_str()
        .map(|s| s.to_string())
}

/// Extract `output_tokens` from a `message_delta` event's JSON.
///
/// Expected shape: `{ "type": "message_delta", "usage": { "output_tokens": N } }`
pub(crate) fn parse_output_tokens(data: &str) -> Option<u32> {
    let v: Value = serde_json::from_str(data).ok()?;
    v.get("usage")?
        .get("output_tokens")?
        .as_u64()
        .map(|n| n as u32)
}

/// Message of an API error body, either a stream `error` event or an HTTP
/// error response: `{ "error": { "type": "...", "message": "..." } }`.
pub(crate) fn parse_stream_error(data: &str) -> String {
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|v| {
            v.get("error")?
                .get("message")?
                .as_str()
                .map(|s| s.to_string())
        })
        .unwrap_or_else(|| data.trim().to_string())
}

async fn into_llm_error(err: reqwest_eventsource::Error) -> LlmError {
    match err {
        reqwest_eventsource::Error::InvalidStatusCode(status, response) => {
            let body = response.text().await.unwrap_or_default();
            let message = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                parse_stream_error(&body)
            };
            LlmError::Status {
                status: status.as_u16(),
                message,
            }
        }
        reqwest_eventsource::Error::Transport(e) => LlmError::Transport(e.to_string()),
        reqwest_eventsource::Error::StreamEnded => LlmError::Incomplete,
        other => LlmError::Stream(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
