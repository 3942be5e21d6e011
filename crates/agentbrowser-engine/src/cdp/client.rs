//! DevTools WebSocket connection.
//!
//! One socket carries every attached page. Replies are matched to callers
//! by request id, events are fanned out by `sessionId`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, trace, warn};

use super::error::CdpError;
use super::protocol::{BrowserVersion, CdpMessage, CdpRequest, TargetInfo};
use super::session::PageSession;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type Reply = Result<Value, CdpError>;

/// Longest wait for any single reply.
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// State shared between callers and the receive task.
#[derive(Default)]
struct Routes {
    waiters: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    listeners: RwLock<HashMap<String, mpsc::UnboundedSender<CdpMessage>>>,
    closed: AtomicBool,
}

impl Routes {
    async fn deliver(&self, message: CdpMessage) {
        if message.is_event() {
            let key = message.session_id.as_deref().unwrap_or_default();
            if let Some(listener) = self.listeners.read().await.get(key) {
                let _ = listener.send(message);
            }
            return;
        }
        let Some(id) = message.id else {
            return;
        };
        let Some(waiter) = self.waiters.lock().remove(&id) else {
            trace!("Reply {} has no waiter", id);
            return;
        };
        let reply = match message.error {
            Some(fault) => Err(CdpError::Protocol {
                code: fault.code,
                message: fault.message,
            }),
            None => Ok(message.result.unwrap_or(Value::Null)),
        };
        let _ = waiter.send(reply);
    }

    /// Mark the socket dead. Dropping the waiters fails their calls.
    fn shut(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.waiters.lock().clear();
    }
}

/// Write half of the socket, shared by the client and every page session.
pub(crate) struct Transport {
    sink: tokio::sync::Mutex<SplitSink<Socket, Message>>,
    next_id: AtomicU64,
    routes: Arc<Routes>,
}

impl Transport {
    /// Send one command, optionally scoped to a page session, and wait for
    /// the reply.
    pub(crate) async fn call(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: Option<&str>,
    ) -> Reply {
        if self.routes.closed.load(Ordering::SeqCst) {
            return Err(CdpError::SessionClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let frame = serde_json::to_string(&CdpRequest {
            id,
            method,
            params,
            session_id,
        })?;
        trace!("-> {}", frame);

        let (tx, rx) = oneshot::channel();
        self.routes.waiters.lock().insert(id, tx);

        let sent = self.sink.lock().await.send(Message::Text(frame.into())).await;
        if let Err(e) = sent {
            self.routes.waiters.lock().remove(&id);
            return Err(e.into());
        }

        match tokio::time::timeout(REPLY_TIMEOUT, rx).await {
            Ok(reply) => reply.unwrap_or(Err(CdpError::SessionClosed)),
            Err(_) => {
                self.routes.waiters.lock().remove(&id);
                Err(CdpError::Timeout(method.to_string()))
            }
        }
    }
}

async fn pump(mut source: SplitStream<Socket>, routes: Arc<Routes>) {
    while let Some(frame) = source.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                trace!("<- {}", text);
                match serde_json::from_str::<CdpMessage>(&text) {
                    Ok(message) => routes.deliver(message).await,
                    Err(e) => warn!("Unparseable DevTools message: {}", e),
                }
            }
            Ok(Message::Close(frame)) => {
                debug!("DevTools socket closed: {:?}", frame);
                break;
            }
            Ok(_) => {}
            Err(e) => {
                warn!("DevTools socket failed: {}", e);
                break;
            }
        }
    }
    routes.shut();
}

/// Browser-level connection; pages are reached through [`PageSession`]s
/// created by [`CdpClient::attach_page`].
pub struct CdpClient {
    ws_url: String,
    transport: Arc<Transport>,
    routes: Arc<Routes>,
    reader: JoinHandle<()>,
}

impl CdpClient {
    /// Discover the browser socket from an HTTP endpoint such as
    /// `http://127.0.0.1:9222`, then connect to it.
    pub async fn connect(endpoint: &str) -> Result<Self, CdpError> {
        let unavailable =
            |e: reqwest::Error| CdpError::BrowserNotAvailable(format!("{}: {}", endpoint, e));
        let version_url = format!("{}/json/version", endpoint.trim_end_matches('/'));
        debug!("Discovering browser via {}", version_url);

        let version: BrowserVersion = reqwest::get(&version_url)
            .await
            .map_err(unavailable)?
            .json()
            .await
            .map_err(unavailable)?;

        debug!("Endpoint reports {}", version.browser);
        Self::connect_ws(&version.web_socket_debugger_url).await
    }

    /// Connect to a `ws://.../devtools/browser/...` URL.
    pub async fn connect_ws(ws_url: &str) -> Result<Self, CdpError> {
        url::Url::parse(ws_url)?;

        let (socket, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| CdpError::ConnectionFailed(format!("{}: {}", ws_url, e)))?;
        let (sink, source) = socket.split();

        let routes = Arc::new(Routes::default());
        let reader = tokio::spawn(pump(source, routes.clone()));
        debug!("Connected to {}", ws_url);

        Ok(Self {
            ws_url: ws_url.to_string(),
            transport: Arc::new(Transport {
                sink: tokio::sync::Mutex::new(sink),
                next_id: AtomicU64::new(1),
                routes: routes.clone(),
            }),
            routes,
            reader,
        })
    }

    /// Command addressed to the browser rather than a page.
    pub async fn call(&self, method: &str, params: Option<Value>) -> Reply {
        self.transport.call(method, params, None).await
    }

    pub fn browser_ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn is_connected(&self) -> bool {
        !self.routes.closed.load(Ordering::SeqCst)
    }

    pub async fn get_targets(&self) -> Result<Vec<TargetInfo>, CdpError> {
        let mut reply = self.call("Target.getTargets", None).await?;
        Ok(serde_json::from_value(reply["targetInfos"].take())?)
    }

    /// Open a tab at `url`; returns its target id.
    pub async fn create_target(&self, url: &str) -> Result<String, CdpError> {
        let reply = self
            .call("Target.createTarget", Some(json!({ "url": url })))
            .await?;
        string_field(&reply, "targetId")
    }

    /// Attach with a flat session and start receiving the page's events.
    pub async fn attach_page(&self, target_id: &str) -> Result<PageSession, CdpError> {
        let reply = self
            .call(
                "Target.attachToTarget",
                Some(json!({ "targetId": target_id, "flatten": true })),
            )
            .await?;
        let session_id = string_field(&reply, "sessionId")?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.routes
            .listeners
            .write()
            .await
            .insert(session_id.clone(), events_tx);

        let page = PageSession::new(
            target_id.to_string(),
            session_id,
            self.transport.clone(),
            events_rx,
        );
        page.enable_domains().await?;
        Ok(page)
    }

    pub async fn close_target(&self, target_id: &str, session_id: &str) -> Result<(), CdpError> {
        self.routes.listeners.write().await.remove(session_id);
        self.call("Target.closeTarget", Some(json!({ "targetId": target_id })))
            .await
            .map(drop)
    }
}

impl Drop for CdpClient {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

fn string_field(reply: &Value, key: &str) -> Result<String, CdpError> {
    reply[key]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CdpError::InvalidResponse(format!("no {} in reply", key)))
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
