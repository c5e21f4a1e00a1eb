// Integration tests for the SEO analyzer.
//
// These exercise the major subsystems together through the library crate's
// public API: flows over a scripted model backend, the app event loop, the
// WebSocket server, the TUI view state, configuration, and Markdown export.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use seo_analyzer::app::{self, AppState};
use seo_analyzer::config::{ensure_config_files, load_config_from};
use seo_analyzer::flows::{FlowBudgets, FlowError, SeoFlows};
use seo_analyzer::llm::client::{
    ContentBlock, LlmClient, LlmError, MessageRequest, ModelBackend, ModelTurn, Progress, Usage,
};
use seo_analyzer::protocol::*;
use seo_analyzer::seo::markdown::{render_markdown, MarkdownExtras};
use seo_analyzer::seo::report::SectionKind;
use seo_analyzer::seo::request::ReportRequest;
use seo_analyzer::seo::traffic::get_traffic_data;
use seo_analyzer::tui::{apply_ui_update, render_frame, ViewState};
use seo_analyzer::ws_server;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Model backend that replays canned turns and records requests.
#[derive(Default)]
struct ScriptedModel {
    turns: Mutex<VecDeque<ModelTurn>>,
    requests: Mutex<Vec<MessageRequest>>,
}

impl ScriptedModel {
    fn new(turns: Vec<ModelTurn>) -> Arc<Self> {
        Arc::new(Self {
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<MessageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelBackend for ScriptedModel {
    async fn send_message(
        &self,
        request: &MessageRequest,
        progress: Option<&Progress>,
    ) -> Result<ModelTurn, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        let turn = self.turns.lock().unwrap().pop_front().ok_or(LlmError::Incomplete)?;
        if let Some(progress) = progress {
            let text = turn.text();
            if !text.is_empty() {
                progress.token(text).await;
            }
        }
        Ok(turn)
    }
}

fn tool_turn(name: &str, input: Value) -> ModelTurn {
    ModelTurn {
        content: vec![ContentBlock::ToolUse {
            id: format!("toolu_{name}"),
            name: name.to_string(),
            input,
        }],
        stop_reason: Some("tool_use".into()),
        usage: Usage::default(),
    }
}

fn respond(input: Value) -> ModelTurn {
    tool_turn("respond", input)
}

fn report_with_sections(url: &str) -> Value {
    let traffic = get_traffic_data(&ReportRequest::new(url).unwrap());
    json!({
        "report": "Good titles. Meta descriptions are missing on 4 of 5 pages.",
        "score": 68,
        "performanceReport": "Hero image is 1.8 MB; LCP 4.2s on mobile.",
        "performanceScore": 45,
        "onPage": { "title": "Acme Shop", "titleLength": 9 },
        "security": { "https": true, "hsts": false },
        "traffic": traffic,
        "recommendations": [
            { "priority": "low", "text": "Add alt text to decorative images" },
            { "priority": "high", "category": "On-page", "text": "Write meta descriptions" }
        ]
    })
}

fn flows_with(model: Arc<ScriptedModel>) -> SeoFlows {
    SeoFlows::new(model, FlowBudgets::default())
}

fn project_root() -> std::path::PathBuf {
    let cwd = std::env::current_dir().unwrap();
    if cwd.join("defaults").exists() {
        cwd
    } else {
        cwd.join("seo-analyzer")
    }
}

// ===========================================================================
// Test: Report flow with the traffic tool
// ===========================================================================

#[tokio::test]
async fn report_flow_calls_traffic_tool_then_responds() {
    let url = "https://acme.example/shop";
    let model = ScriptedModel::new(vec![
        tool_turn("get_traffic_data", json!({ "url": url })),
        respond(report_with_sections(url)),
    ]);
    let flows = flows_with(model.clone());

    let request = ReportRequest::new(url).unwrap();
    let result = flows.generate_report(&request, None).await.unwrap();

    assert_eq!(result.score, 68.0);
    assert_eq!(result.performance_score, 45.0);
    assert_eq!(result.traffic, Some(get_traffic_data(&request)));

    // Second request carries the tool result for the traffic call.
    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert!(requests[0].tools.iter().any(|t| t.name == "get_traffic_data"));
    let last = requests[1].messages.last().unwrap();
    match &last.content[0] {
        ContentBlock::ToolResult { tool_use_id, content, is_error } => {
            assert_eq!(tool_use_id, "toolu_get_traffic_data");
            assert!(!is_error);
            let data: Value = serde_json::from_str(content).unwrap();
            assert_eq!(
                data["monthlyVisits"].as_u64(),
                Some(get_traffic_data(&request).monthly_visits)
            );
        }
        other => panic!("expected tool result, got {other:?}"),
    }

    let kinds: Vec<SectionKind> = result.sections().iter().map(|s| s.kind).collect();
    assert_eq!(
        kinds,
        vec![
            SectionKind::Recommendations,
            SectionKind::OnPage,
            SectionKind::Security,
            SectionKind::Traffic,
        ]
    );
}

#[tokio::test]
async fn out_of_range_score_is_rejected_not_clamped() {
    // One initial answer plus one correction per tool round, all out of range.
    let turns = (0..5).map(|_| respond(json!({ "score": 140 }))).collect();
    let model = ScriptedModel::new(turns);
    let flows = flows_with(model.clone());
    let err = flows.calculate_score("Some report", None).await.unwrap_err();
    assert!(matches!(err, FlowError::Validation(_)), "got {err:?}");
    assert_eq!(model.requests().len(), 5);
}

#[tokio::test]
async fn malformed_section_gets_a_second_chance() {
    let mut first = report_with_sections("https://shop.example");
    first["traffic"] = json!({ "monthlyVisits": 12000 });
    let model = ScriptedModel::new(vec![
        respond(first),
        respond(report_with_sections("https://shop.example")),
    ]);
    let flows = flows_with(model.clone());
    let request = ReportRequest::new("https://shop.example").unwrap();

    let result = flows.generate_report(&request, None).await.unwrap();
    assert_eq!(result.score, 68.0);
    assert!(result.traffic.is_some());

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    match &requests[1].messages[2].content[0] {
        ContentBlock::ToolResult { is_error, content, .. } => {
            assert!(*is_error);
            assert!(content.contains("bounceRate"), "{content}");
        }
        other => panic!("expected tool result, got {other:?}"),
    }
}

#[tokio::test]
async fn empty_inputs_never_reach_the_model() {
    let model = ScriptedModel::new(vec![]);
    let flows = flows_with(model.clone());
    assert!(matches!(
        flows.calculate_score("   ", None).await,
        Err(FlowError::EmptyInput(_))
    ));
    assert!(matches!(
        flows.summarize_performance("", None).await,
        Err(FlowError::EmptyInput(_))
    ));
    assert!(model.requests().is_empty());
}

// ===========================================================================
// Test: Markdown export
// ===========================================================================

#[tokio::test]
async fn markdown_export_contains_scores_sections_and_extras() {
    let url = "https://acme.example/";
    let model = ScriptedModel::new(vec![respond(report_with_sections(url))]);
    let flows = flows_with(model);
    let request = ReportRequest::new(url).unwrap();
    let result = flows.generate_report(&request, None).await.unwrap();

    let md = render_markdown(
        &request.url,
        &result,
        &MarkdownExtras {
            recalculated_score: Some(71.0),
            performance_summary: Some("Compress the hero image.".into()),
            generated_at: None,
        },
    );

    assert!(md.starts_with("# SEO Report: https://acme.example/"));
    assert!(md.contains("Recalculated SEO score"));
    assert!(md.contains("Compress the hero image."));
    assert!(md.contains("Traffic"));
    let high = md.find("Write meta descriptions").unwrap();
    let low = md.find("Add alt text").unwrap();
    assert!(high < low, "high priority recommendations come first");
}

// ===========================================================================
// Test: Event loop integration (async)
// ===========================================================================

#[tokio::test]
async fn event_loop_runs_all_three_flows() {
    let url = "https://acme.example/";
    let model = ScriptedModel::new(vec![
        tool_turn("get_traffic_data", json!({ "url": url })),
        respond(report_with_sections(url)),
        respond(json!({ "score": 72 })),
        respond(json!({ "summary": "Images are too large." })),
    ]);
    let (llm_tx, llm_rx) = mpsc::channel(64);
    let state = AppState::new(flows_with(model.clone()), llm_tx);

    let (_ws_tx, ws_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, mut ui_rx) = mpsc::channel(64);
    let handle = tokio::spawn(app::run(ws_rx, llm_rx, cmd_rx, ui_tx, state));

    cmd_tx.send(UserCommand::Analyze { url: url.into() }).await.unwrap();
    assert_eq!(
        ui_rx.recv().await.unwrap(),
        UiUpdate::AnalysisStarted { url: url.into() }
    );
    assert_eq!(
        ui_rx.recv().await.unwrap(),
        UiUpdate::ToolCalled("get_traffic_data".into())
    );
    match ui_rx.recv().await.unwrap() {
        UiUpdate::ReportReady { url: got, result } => {
            assert_eq!(got, url);
            assert_eq!(result.score, 68.0);
        }
        other => panic!("expected ReportReady, got {other:?}"),
    }

    cmd_tx.send(UserCommand::RecalculateScore).await.unwrap();
    assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::ScoreStarted);
    assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::ScoreReady(72.0));

    cmd_tx.send(UserCommand::SummarizePerformance).await.unwrap();
    assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::SummaryStarted);
    assert_eq!(
        ui_rx.recv().await.unwrap(),
        UiUpdate::SummaryReady("Images are too large.".into())
    );

    // The score flow saw the report text, the summary flow the performance text.
    let requests = model.requests();
    let prompt_of = |r: &MessageRequest| match &r.messages[0].content[0] {
        ContentBlock::Text { text } => text.clone(),
        other => panic!("expected text prompt, got {other:?}"),
    };
    assert!(prompt_of(&requests[2]).contains("Meta descriptions are missing"));
    assert!(prompt_of(&requests[3]).contains("Hero image is 1.8 MB"));

    cmd_tx.send(UserCommand::Quit).await.unwrap();
    assert!(handle.await.unwrap().is_ok());
}

#[tokio::test]
async fn disabled_client_surfaces_flow_failure() {
    let (llm_tx, llm_rx) = mpsc::channel(16);
    let flows = SeoFlows::new(Arc::new(LlmClient::Disabled), FlowBudgets::default());
    let state = AppState::new(flows, llm_tx);

    let (_ws_tx, ws_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, mut ui_rx) = mpsc::channel(16);
    let handle = tokio::spawn(app::run(ws_rx, llm_rx, cmd_rx, ui_tx, state));

    cmd_tx
        .send(UserCommand::Analyze { url: "https://acme.example".into() })
        .await
        .unwrap();
    assert!(matches!(ui_rx.recv().await.unwrap(), UiUpdate::AnalysisStarted { .. }));
    match ui_rx.recv().await.unwrap() {
        UiUpdate::FlowFailed { flow, message } => {
            assert_eq!(flow, FlowKind::GenerateReport);
            assert!(message.contains("anthropic_api_key"));
        }
        other => panic!("expected FlowFailed, got {other:?}"),
    }

    cmd_tx.send(UserCommand::Quit).await.unwrap();
    let _ = handle.await;
}

// ===========================================================================
// Test: App updates drive the TUI view
// ===========================================================================

#[tokio::test]
async fn ui_updates_render_into_dashboard() {
    let url = "https://acme.example/";
    let model = ScriptedModel::new(vec![respond(report_with_sections(url))]);
    let (llm_tx, llm_rx) = mpsc::channel(16);
    let state = AppState::new(flows_with(model), llm_tx);

    let (_ws_tx, ws_rx) = mpsc::channel(16);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, mut ui_rx) = mpsc::channel(16);
    let handle = tokio::spawn(app::run(ws_rx, llm_rx, cmd_rx, ui_tx, state));

    cmd_tx.send(UserCommand::Analyze { url: url.into() }).await.unwrap();
    let mut view = ViewState::default();
    apply_ui_update(&mut view, ui_rx.recv().await.unwrap());
    apply_ui_update(&mut view, ui_rx.recv().await.unwrap());
    assert!(view.report.is_some());
    view.expand_all();

    let backend = ratatui::backend::TestBackend::new(140, 45);
    let mut terminal = ratatui::Terminal::new(backend).unwrap();
    terminal.draw(|frame| render_frame(frame, &view)).unwrap();
    let screen: String = terminal
        .backend()
        .buffer()
        .content()
        .iter()
        .map(|c| c.symbol())
        .collect();
    assert!(screen.contains("68 / 100 Needs work"));
    assert!(screen.contains("45 / 100 Poor"));
    assert!(screen.contains("Traffic"));
    assert!(screen.contains("Write meta descriptions"));

    cmd_tx.send(UserCommand::Quit).await.unwrap();
    let _ = handle.await;
}

// ===========================================================================
// Test: WebSocket server feeding the app loop
// ===========================================================================

#[tokio::test]
async fn websocket_client_gets_report_and_app_tracks_it() {
    let url = "https://acme.example/";
    let model = ScriptedModel::new(vec![respond(report_with_sections(url))]);
    let flows = flows_with(model);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (ws_tx, ws_rx) = mpsc::channel(16);
    let server = tokio::spawn(ws_server::run(listener, flows.clone(), ws_tx));

    let (llm_tx, llm_rx) = mpsc::channel(16);
    let state = AppState::new(flows, llm_tx);
    let (cmd_tx, cmd_rx) = mpsc::channel(16);
    let (ui_tx, mut ui_rx) = mpsc::channel(16);
    let handle = tokio::spawn(app::run(ws_rx, llm_rx, cmd_rx, ui_tx, state));

    let (mut client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
        .await
        .unwrap();
    assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::BrowserClients(1));

    let request = serde_json::to_string(&ClientMessage::Analyze { url: url.into() }).unwrap();
    client.send(WsMessage::Text(request.into())).await.unwrap();

    let reply = match client.next().await.unwrap().unwrap() {
        WsMessage::Text(text) => serde_json::from_str::<ServerMessage>(&text).unwrap(),
        other => panic!("expected text reply, got {other:?}"),
    };
    match reply {
        ServerMessage::Report { url: got, result } => {
            assert_eq!(got, url);
            assert_eq!(result.performance_score, 45.0);
        }
        other => panic!("expected report, got {other:?}"),
    }

    match ui_rx.recv().await.unwrap() {
        UiUpdate::Notice(text) => assert!(text.starts_with("Report generation requested by")),
        other => panic!("expected Notice, got {other:?}"),
    }

    client.close(None).await.unwrap();
    assert_eq!(ui_rx.recv().await.unwrap(), UiUpdate::BrowserClients(0));

    cmd_tx.send(UserCommand::Quit).await.unwrap();
    let _ = handle.await;
    server.abort();
}

// ===========================================================================
// Test: Configuration from shipped defaults
// ===========================================================================

#[test]
fn shipped_defaults_load_without_credentials() {
    let tmp = std::env::temp_dir().join("seo_analyzer_integration_defaults");
    let _ = std::fs::remove_dir_all(&tmp);
    std::fs::create_dir_all(tmp.join("defaults")).unwrap();
    for name in ["analyzer.toml", "credentials.toml.example"] {
        std::fs::copy(
            project_root().join("defaults").join(name),
            tmp.join("defaults").join(name),
        )
        .unwrap();
    }

    let copied = ensure_config_files(&tmp).unwrap();
    assert_eq!(copied.len(), 1);
    assert!(!tmp.join("config/credentials.toml").exists());

    let config = load_config_from(&tmp).unwrap();
    assert!(config.websocket.enabled);
    assert_eq!(config.websocket.port, 9002);
    assert!(config.credentials.anthropic_api_key.is_none());
    assert!(!LlmClient::from_config(&config).is_active());

    let budgets = FlowBudgets::from_config(&config.llm);
    assert_eq!(budgets, FlowBudgets::default());

    let _ = std::fs::remove_dir_all(&tmp);
}
