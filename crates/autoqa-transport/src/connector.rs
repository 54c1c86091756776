use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{broadcast, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::error::ConnectorError;

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;
type PendingTable = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, ConnectorError>>>>>;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Bidirectional JSON message channel to a browser debug endpoint.
///
/// Maintains a pending-command table keyed by integer id so concurrent
/// `send` calls do not corrupt each other's results; a background task
/// demultiplexes incoming frames by the presence of an `id` field,
/// completing the matching pending command or broadcasting the frame to
/// event subscribers.
pub struct DebugConnector {
    write: Arc<Mutex<futures_util::stream::SplitSink<WsStream, WsMessage>>>,
    pending: PendingTable,
    next_id: AtomicU64,
    events: broadcast::Sender<Value>,
    closed: Arc<AtomicBool>,
    reader_task: tokio::task::JoinHandle<()>,
}

impl DebugConnector {
    /// Establishes the channel with bounded retries spaced by a fixed delay.
    pub async fn connect(
        ws_url: &str,
        max_attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self, ConnectorError> {
        let attempts = max_attempts.max(1);
        let mut last_error = None;
        for attempt in 1..=attempts {
            match connect_async(ws_url).await {
                Ok((stream, _response)) => return Ok(Self::from_stream(stream)),
                Err(error) => {
                    tracing::warn!(attempt, ws_url, %error, "debug connector connect attempt failed");
                    last_error = Some(error);
                    if attempt < attempts {
                        tokio::time::sleep(retry_delay).await;
                    }
                }
            }
        }
        tracing::error!(ws_url, "debug connector exhausted connect retries");
        Err(ConnectorError::Transport(format!(
            "failed to connect to {ws_url} after {attempts} attempts: {}",
            last_error
                .map(|error| error.to_string())
                .unwrap_or_default()
        )))
    }

    fn from_stream(stream: WsStream) -> Self {
        let (write, mut read) = stream.split();
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let (events_tx, _events_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let closed = Arc::new(AtomicBool::new(false));

        let reader_pending = Arc::clone(&pending);
        let reader_events = events_tx.clone();
        let reader_closed = Arc::clone(&closed);
        let reader_task = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Ok(message) => message,
                    Err(error) => {
                        tracing::warn!(%error, "debug connector read error, closing");
                        break;
                    }
                };
                let WsMessage::Text(text) = message else {
                    continue;
                };
                let parsed: Value = match serde_json::from_str(&text) {
                    Ok(value) => value,
                    Err(error) => {
                        tracing::warn!(%error, "debug connector received malformed frame");
                        continue;
                    }
                };
                if let Some(id) = parsed.get("id").and_then(Value::as_u64) {
                    let mut table = reader_pending.lock().await;
                    if let Some(sender) = table.remove(&id) {
                        let result = if let Some(error) = parsed.get("error") {
                            Err(ConnectorError::ProtocolError {
                                method: String::new(),
                                details: error.to_string(),
                            })
                        } else {
                            Ok(parsed.get("result").cloned().unwrap_or(Value::Null))
                        };
                        let _ = sender.send(result);
                    }
                } else {
                    // Fan out; a slow or absent listener must not block correlation above.
                    let _ = reader_events.send(parsed);
                }
            }
            reader_closed.store(true, Ordering::SeqCst);
            let mut table = reader_pending.lock().await;
            for (_, sender) in table.drain() {
                let _ = sender.send(Err(ConnectorError::Closed));
            }
        });

        Self {
            write: Arc::new(Mutex::new(write)),
            pending,
            next_id: AtomicU64::new(1),
            events: events_tx,
            closed,
            reader_task,
        }
    }

    /// Sends `{id, method, params}` and waits for the matching response (or
    /// the per-command deadline) before returning the `result` subtree.
    pub async fn send(
        &self,
        method: &str,
        params: Value,
        deadline: Duration,
    ) -> Result<Value, ConnectorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ConnectorError::Closed);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params });
        let sent = {
            let mut write = self.write.lock().await;
            write.send(WsMessage::Text(frame.to_string())).await
        };
        if let Err(error) = sent {
            self.pending.lock().await.remove(&id);
            return Err(ConnectorError::Transport(error.to_string()));
        }

        match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result.map_err(|error| match error {
                ConnectorError::ProtocolError { details, .. } => ConnectorError::ProtocolError {
                    method: method.to_string(),
                    details,
                },
                other => other,
            }),
            Ok(Err(_canceled)) => Err(ConnectorError::Closed),
            Err(_elapsed) => {
                self.pending.lock().await.remove(&id);
                Err(ConnectorError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    /// Convenience: `send("{domain}.enable", {})`.
    pub async fn enable(&self, domain: &str, deadline: Duration) -> Result<Value, ConnectorError> {
        self.send(&format!("{domain}.enable"), json!({}), deadline)
            .await
    }

    /// Subscribes to every incoming message lacking an `id` field.
    pub fn subscribe_events(&self) -> broadcast::Receiver<Value> {
        self.events.subscribe()
    }

    /// Cancels all pending command futures with a `Closed` error and
    /// releases the channel.
    pub async fn close(self) {
        self.closed.store(true, Ordering::SeqCst);
        self.reader_task.abort();
        let mut table = self.pending.lock().await;
        for (_, sender) in table.drain() {
            let _ = sender.send(Err(ConnectorError::Closed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unit_connect_fails_after_exhausting_retries() {
        let error = DebugConnector::connect(
            "ws://127.0.0.1:1/does-not-exist",
            3,
            Duration::from_millis(1),
        )
        .await
        .expect_err("connect to unreachable port should fail");
        assert!(matches!(error, ConnectorError::Transport(_)));
        assert!(error.to_string().contains("after 3 attempts"));
    }
}
