//! Low-level Chrome DevTools Protocol client over WebSocket.
//!
//! One client per tab. Commands are matched to responses by id; a reader task
//! dispatches them and reports transport loss on the registry's disconnect
//! channel.

use figbridge_core::{Error, Result};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, error, warn};

use async_trait::async_trait;

use super::discovery::TabDescriptor;

/// Fixed per-command response budget.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport seam the session registry and gateway talk through. Production
/// is [`CdpClient`]; tests substitute fakes.
#[async_trait]
pub trait TabTransport: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value>;
}

/// Connector seam used by the session registry to establish connections.
#[async_trait]
pub trait TabConnector: Send + Sync {
    async fn connect(
        &self,
        tab: &TabDescriptor,
        closed_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Arc<dyn TabTransport>>;
}

/// A CDP WebSocket client bound to one tab.
pub struct CdpClient {
    /// Sender to write messages to the WebSocket.
    ws_tx: mpsc::Sender<String>,
    /// Pending command responses, keyed by request ID.
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>,
    /// Auto-incrementing command ID.
    next_id: AtomicU64,
    _reader_handle: tokio::task::JoinHandle<()>,
    _writer_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a tab's debugging WebSocket and enable the domains needed
    /// for remote evaluation and page lifecycle visibility. `closed_tx`
    /// receives the tab id once, when the transport goes away.
    pub async fn connect(
        tab: &TabDescriptor,
        closed_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Self> {
        use futures::{SinkExt, StreamExt};
        use tokio_tungstenite::connect_async;
        use tokio_tungstenite::tungstenite::Message;

        let (ws_stream, _) = connect_async(&tab.ws_url).await.map_err(|e| {
            Error::Session(format!(
                "Failed to connect to debugger endpoint {}: {}",
                tab.ws_url, e
            ))
        })?;

        let (mut ws_sink, mut ws_source) = ws_stream.split();

        let (ws_tx, mut ws_rx) = mpsc::channel::<String>(256);

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let pending_clone = pending.clone();

        // Writer task: owns the sink, forwards messages from the channel.
        let writer_handle = tokio::spawn(async move {
            while let Some(msg) = ws_rx.recv().await {
                if let Err(e) = ws_sink.send(Message::Text(msg)).await {
                    error!("CDP WebSocket write error: {}", e);
                    break;
                }
            }
        });

        // Reader task: dispatches responses by id, reports transport loss.
        let tab_id = tab.id.clone();
        let reader_handle = tokio::spawn(async move {
            while let Some(msg_result) = ws_source.next().await {
                match msg_result {
                    Ok(Message::Text(text)) => {
                        if let Ok(val) = serde_json::from_str::<Value>(&text) {
                            if let Some(id) = val.get("id").and_then(|v| v.as_u64()) {
                                let mut pending = pending_clone.lock().await;
                                if let Some(tx) = pending.remove(&id) {
                                    let _ = tx.send(val);
                                }
                            }
                            // Events other than transport close are ignored;
                            // the bridge consumes none.
                        }
                    }
                    Ok(Message::Close(_)) => {
                        debug!(tab = %tab_id, "CDP WebSocket closed by peer");
                        break;
                    }
                    Err(e) => {
                        warn!(tab = %tab_id, "CDP WebSocket read error: {}", e);
                        break;
                    }
                    _ => {}
                }
            }
            let _ = closed_tx.send(tab_id);
        });

        let client = Self {
            ws_tx,
            pending,
            next_id: AtomicU64::new(1),
            _reader_handle: reader_handle,
            _writer_handle: writer_handle,
        };

        client.send_command("Runtime.enable", json!({})).await?;
        client.send_command("Page.enable", json!({})).await?;

        Ok(client)
    }

    /// Send a CDP command and wait for the response.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let msg = json!({
            "id": id,
            "method": method,
            "params": params,
        });

        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        self.ws_tx
            .send(msg.to_string())
            .await
            .map_err(|e| Error::Session(format!("Failed to send CDP command: {}", e)))?;

        match tokio::time::timeout(COMMAND_TIMEOUT, rx).await {
            Ok(Ok(response)) => {
                if let Some(err) = response.get("error") {
                    Err(Error::Session(format!("CDP error: {}", err)))
                } else {
                    Ok(response.get("result").cloned().unwrap_or(Value::Null))
                }
            }
            Ok(Err(_)) => Err(Error::Session(
                "Connection closed before the response arrived".to_string(),
            )),
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                Err(Error::Timeout(format!(
                    "CDP command '{}' timed out after {}s",
                    method,
                    COMMAND_TIMEOUT.as_secs()
                )))
            }
        }
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self._reader_handle.abort();
        self._writer_handle.abort();
    }
}

#[async_trait]
impl TabTransport for CdpClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        self.send_command(method, params).await
    }
}

/// Production connector.
pub struct CdpConnector;

#[async_trait]
impl TabConnector for CdpConnector {
    async fn connect(
        &self,
        tab: &TabDescriptor,
        closed_tx: mpsc::UnboundedSender<String>,
    ) -> Result<Arc<dyn TabTransport>> {
        let client = CdpClient::connect(tab, closed_tx).await?;
        Ok(Arc::new(client))
    }
}
