//! Newline-delimited JSON-RPC server.
//!
//! Reads one message per line from the input stream. Every `tools/call` runs
//! on its own task so that long statements do not block `ping` or
//! cancellation. A single writer task owns the output stream; everything
//! else sends it encoded lines over a channel.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::protocol::{
    request_key, CallToolParams, CancelledParams, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, ProgressParams, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND,
    PARSE_ERROR, PROTOCOL_VERSION,
};
use crate::error::{McpError, Result};
use crate::statement::{ChannelProgressSink, ProgressEvent, ProgressSink};
use crate::tools::{tool_definitions, Dispatcher, ToolResponse};

const OUTBOUND_CAPACITY: usize = 64;
const PROGRESS_CAPACITY: usize = 16;

type InFlight = Arc<Mutex<HashMap<String, CancellationToken>>>;

/// MCP server speaking JSON-RPC over a byte stream pair.
pub struct McpServer {
    dispatcher: Dispatcher,
    in_flight: InFlight,
}

impl McpServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Serves on the process's stdin and stdout.
    pub async fn run_stdio(self) -> Result<()> {
        self.run(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serves until the input reaches end of stream, then waits for
    /// in-flight tool calls to finish.
    pub async fn run<R, W>(self, reader: R, writer: W) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (out_tx, out_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let writer_task = tokio::spawn(write_lines(writer, out_rx));
        let mut calls = JoinSet::new();

        let mut lines = BufReader::new(reader).lines();
        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    warn!("Failed to read request: {e}");
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            self.handle_line(&line, &out_tx, &mut calls).await;
        }

        info!(pending = calls.len(), "Input closed, draining in-flight calls");
        while calls.join_next().await.is_some() {}
        drop(out_tx);

        writer_task
            .await
            .map_err(|e| McpError::internal(format!("writer task failed: {e}")))?
    }

    async fn handle_line(
        &self,
        line: &str,
        out: &mpsc::Sender<String>,
        calls: &mut JoinSet<()>,
    ) {
        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(request) => request,
            Err(e) => {
                debug!("Unparseable message: {e}");
                let response =
                    JsonRpcResponse::error(Value::Null, PARSE_ERROR, format!("parse error: {e}"));
                send(out, &response).await;
                return;
            }
        };

        if request.jsonrpc != "2.0" {
            if let Some(id) = request.id {
                let response =
                    JsonRpcResponse::error(id, INVALID_REQUEST, "jsonrpc must be \"2.0\"");
                send(out, &response).await;
            }
            return;
        }

        debug!(method = %request.method, "Received message");
        match request.method.as_str() {
            "notifications/initialized" => {}
            "notifications/cancelled" => self.cancel_call(request.params),
            "tools/call" => self.spawn_call(request, out, calls).await,
            method => {
                let Some(id) = request.id else {
                    debug!(method, "Ignoring notification");
                    return;
                };
                let response = match method {
                    "initialize" => JsonRpcResponse::success(id, initialize_result()),
                    "ping" => JsonRpcResponse::success(id, json!({})),
                    "tools/list" => {
                        JsonRpcResponse::success(id, json!({ "tools": tool_definitions() }))
                    }
                    _ => JsonRpcResponse::error(
                        id,
                        METHOD_NOT_FOUND,
                        format!("method not found: {method}"),
                    ),
                };
                send(out, &response).await;
            }
        }
    }

    fn cancel_call(&self, params: Option<Value>) {
        let Some(params) = params.and_then(|p| serde_json::from_value::<CancelledParams>(p).ok())
        else {
            debug!("Ignoring malformed cancellation");
            return;
        };

        let key = request_key(&params.request_id);
        let token = lock(&self.in_flight).get(&key).cloned();
        match token {
            Some(token) => {
                info!(request_id = %key, reason = ?params.reason, "Cancelling tool call");
                token.cancel();
            }
            None => debug!(request_id = %key, "Cancellation for unknown request"),
        }
    }

    async fn spawn_call(
        &self,
        request: JsonRpcRequest,
        out: &mpsc::Sender<String>,
        calls: &mut JoinSet<()>,
    ) {
        let Some(id) = request.id else {
            debug!("Ignoring tools/call sent as a notification");
            return;
        };
        let params = match request
            .params
            .map(serde_json::from_value::<CallToolParams>)
            .transpose()
        {
            Ok(Some(params)) => params,
            Ok(None) => {
                let response = JsonRpcResponse::error(id, INVALID_PARAMS, "missing params");
                send(out, &response).await;
                return;
            }
            Err(e) => {
                let response =
                    JsonRpcResponse::error(id, INVALID_PARAMS, format!("invalid params: {e}"));
                send(out, &response).await;
                return;
            }
        };

        let key = request_key(&id);
        let cancel = CancellationToken::new();
        let registered = match lock(&self.in_flight).entry(key.clone()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(cancel.clone());
                true
            }
        };
        if !registered {
            warn!(request_id = %key, "Rejecting tools/call with an id already in flight");
            let response = JsonRpcResponse::error(
                id,
                INVALID_REQUEST,
                format!("request id {key} is already in flight"),
            );
            send(out, &response).await;
            return;
        }

        let dispatcher = self.dispatcher.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let out = out.clone();
        let CallToolParams {
            name,
            arguments,
            meta,
        } = params;
        let progress_token = meta.and_then(|m| m.progress_token);

        calls.spawn(async move {
            let (sink, forwarder) = match progress_token {
                Some(token) => {
                    let (tx, rx) = mpsc::channel(PROGRESS_CAPACITY);
                    let forwarder = tokio::spawn(forward_progress(token, rx, out.clone()));
                    (Some(ChannelProgressSink::new(tx)), Some(forwarder))
                }
                None => (None, None),
            };

            let result = dispatcher
                .call(
                    &name,
                    arguments,
                    sink.as_ref().map(|s| s as &dyn ProgressSink),
                    &cancel,
                )
                .await;

            // Flush remaining progress before the response goes out.
            drop(sink);
            if let Some(forwarder) = forwarder {
                let _ = forwarder.await;
            }
            lock(&in_flight).remove(&key);

            match &result {
                Ok(_) => info!(tool = %name, "Tool call succeeded"),
                Err(e) => warn!(tool = %name, "Tool call failed: {}: {e}", e.category()),
            }

            // A cancelled request gets no response.
            if cancel.is_cancelled() {
                return;
            }
            let body = ToolResponse::from_result(&result);
            match serde_json::to_value(&body) {
                Ok(body) => send(&out, &JsonRpcResponse::success(id, body)).await,
                Err(e) => warn!("Failed to encode tool response: {e}"),
            }
        });
    }
}

fn initialize_result() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": { "tools": { "listChanged": false } },
        "serverInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

fn lock(in_flight: &InFlight) -> std::sync::MutexGuard<'_, HashMap<String, CancellationToken>> {
    in_flight.lock().unwrap_or_else(|e| e.into_inner())
}

/// Relays progress events as `notifications/progress`. Stops when the
/// output is closed, which drops the receiver and fails the sink.
async fn forward_progress(
    progress_token: Value,
    mut rx: mpsc::Receiver<ProgressEvent>,
    out: mpsc::Sender<String>,
) {
    while let Some(event) = rx.recv().await {
        let note = JsonRpcNotification::new(
            "notifications/progress",
            ProgressParams {
                progress_token: progress_token.clone(),
                progress: event.progress,
                total: event.total,
                message: event.message,
            },
        );
        let Some(line) = encode(&note) else { continue };
        if out.send(line).await.is_err() {
            break;
        }
    }
}

fn encode<T: Serialize>(message: &T) -> Option<String> {
    match serde_json::to_string(message) {
        Ok(line) => Some(line),
        Err(e) => {
            warn!("Failed to encode message: {e}");
            None
        }
    }
}

async fn send<T: Serialize>(out: &mpsc::Sender<String>, message: &T) {
    if let Some(line) = encode(message) {
        if out.send(line).await.is_err() {
            debug!("Output closed, dropping message");
        }
    }
}

async fn write_lines<W>(mut writer: W, mut rx: mpsc::Receiver<String>) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = rx.recv().await {
        let written = async {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await
        }
        .await;
        if let Err(e) = written {
            return Err(McpError::Disconnected(format!("failed to write output: {e}")));
        }
    }
    Ok(())
}
