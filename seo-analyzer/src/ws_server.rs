// WebSocket server for browser clients.
//
// Each client sends `ClientMessage` JSON and gets one `ServerMessage` back per
// request. Connections are served concurrently; connect, disconnect and
// request events are forwarded to the app for the status bar.

use std::collections::VecDeque;

use futures_util::stream::Stream;
use futures_util::{Sink, SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tracing::{debug, info, warn};

use crate::flows::SeoFlows;
use crate::protocol::{ClientMessage, FlowKind, ServerMessage};
use crate::seo::request::ReportRequest;

/// Events emitted by the WebSocket server to the application layer.
#[derive(Debug, Clone, PartialEq)]
pub enum WsEvent {
    /// A browser client has connected.
    Connected { addr: String },
    /// A browser client has disconnected.
    Disconnected { addr: String },
    /// A client asked for a flow to run.
    Request { addr: String, flow: FlowKind },
}

/// Bind the server socket on `127.0.0.1:{port}`.
pub async fn bind(port: u16) -> std::io::Result<TcpListener> {
    TcpListener::bind(format!("127.0.0.1:{port}")).await
}

/// Accept connections on `listener` forever, serving each on its own task.
pub async fn run(
    listener: TcpListener,
    flows: SeoFlows,
    tx: mpsc::Sender<WsEvent>,
) -> anyhow::Result<()> {
    let local_addr = listener.local_addr()?;
    info!("WebSocket server listening on {local_addr}");

    loop {
        let (stream, addr) = listener.accept().await?;
        let addr_str = addr.to_string();
        info!("Accepted TCP connection from {addr_str}");

        let flows = flows.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            let ws_stream = match tokio_tungstenite::accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    warn!("WebSocket handshake failed for {addr_str}: {e}");
                    return;
                }
            };

            let _ = tx
                .send(WsEvent::Connected {
                    addr: addr_str.clone(),
                })
                .await;

            let (write, read) = ws_stream.split();
            if let Err(e) = serve_connection(read, write, &flows, &tx, &addr_str).await {
                warn!("WebSocket connection {addr_str} ended with error: {e}");
            }

            let _ = tx.send(WsEvent::Disconnected { addr: addr_str }).await;
        });
    }
}

/// Serve one connection: answer each text message until the client closes.
///
/// The socket is still read while a flow runs. Text that arrives meanwhile
/// is queued; a close frame, a read error or the end of the stream drops the
/// running flow and ends the connection.
///
/// Generic over the stream and sink so it can be tested with in-memory
/// channels without opening TCP ports.
pub async fn serve_connection<St, Si>(
    mut read: St,
    mut write: Si,
    flows: &SeoFlows,
    tx: &mpsc::Sender<WsEvent>,
    addr: &str,
) -> Result<(), WsError>
where
    St: Stream<Item = Result<Message, WsError>> + Unpin,
    Si: Sink<Message, Error = WsError> + Unpin,
{
    let mut queued: VecDeque<Message> = VecDeque::new();

    loop {
        let msg_result = match queued.pop_front() {
            Some(msg) => Ok(msg),
            None => match read.next().await {
                Some(msg_result) => msg_result,
                None => break,
            },
        };
        match msg_result {
            Ok(Message::Text(text)) => {
                if let Some(flow) = requested_flow(&text) {
                    let _ = tx
                        .send(WsEvent::Request {
                            addr: addr.to_string(),
                            flow,
                        })
                        .await;
                }

                let running = handle_client_message(flows, &text);
                tokio::pin!(running);
                let reply = loop {
                    tokio::select! {
                        biased;
                        reply = &mut running => break Some(reply),
                        next = read.next() => match next {
                            Some(Ok(msg @ Message::Text(_))) => queued.push_back(msg),
                            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break None,
                            // Ping, Pong, Binary, Frame
                            Some(Ok(_)) => {}
                        },
                    }
                };
                let Some(reply) = reply else {
                    info!("Client {addr} went away during a request; dropping it");
                    break;
                };

                let json = serde_json::to_string(&reply).map_err(|e| {
                    WsError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
                })?;
                write.send(Message::Text(json.into())).await?;
            }
            Ok(Message::Close(_)) => {
                info!("Client {addr} sent close frame");
                break;
            }
            Err(e) => {
                warn!("WebSocket error from {addr}: {e}");
                break;
            }
            _ => {
                // Ignore Binary, Ping, Pong, Frame variants.
            }
        }
    }
    Ok(())
}

fn requested_flow(text: &str) -> Option<FlowKind> {
    match serde_json::from_str::<ClientMessage>(text).ok()? {
        ClientMessage::Analyze { .. } => Some(FlowKind::GenerateReport),
        ClientMessage::CalculateScore { .. } => Some(FlowKind::CalculateScore),
        ClientMessage::SummarizePerformance { .. } => Some(FlowKind::SummarizePerformance),
    }
}

/// Run the flow a raw client message asks for and build the reply.
///
/// Malformed messages, invalid URLs and flow failures all become
/// `ServerMessage::Error`.
pub async fn handle_client_message(flows: &SeoFlows, text: &str) -> ServerMessage {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            debug!("Unparseable client message: {e}");
            return ServerMessage::Error {
                message: format!("invalid message: {e}"),
            };
        }
    };

    let outcome = match msg {
        ClientMessage::Analyze { url } => match ReportRequest::new(&url) {
            Ok(request) => flows
                .generate_report(&request, None)
                .await
                .map(|result| ServerMessage::Report {
                    url: request.url,
                    result: Box::new(result),
                }),
            Err(e) => Err(e.into()),
        },
        ClientMessage::CalculateScore { report } => flows
            .calculate_score(&report, None)
            .await
            .map(|s| ServerMessage::Score { score: s.score }),
        ClientMessage::SummarizePerformance { performance_report } => flows
            .summarize_performance(&performance_report, None)
            .await
            .map(|s| ServerMessage::Summary { summary: s.summary }),
    };

    outcome.unwrap_or_else(|e| {
        warn!("Client request failed: {e}");
        ServerMessage::Error {
            message: e.to_string(),
        }
    })
}
