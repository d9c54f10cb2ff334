// src/server/livereload.rs

//! LiveReload channel: a WebSocket endpoint speaking the LiveReload
//! protocol (official-7), fed by a broadcast channel.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub const DEFAULT_LIVERELOAD_PORT: u16 = 35729;
pub const PROTOCOL_OFFICIAL_7: &str = "http://livereload.com/protocols/official-7";

const CLIENT_SCRIPT: &str = include_str!("livereload.js");

/// `livereload = true` (default port) or `livereload = 35729`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LiveReloadSetting {
    Enabled(bool),
    Port(u16),
}

impl Default for LiveReloadSetting {
    fn default() -> Self {
        LiveReloadSetting::Enabled(false)
    }
}

impl LiveReloadSetting {
    pub fn port(&self) -> Option<u16> {
        match self {
            LiveReloadSetting::Enabled(true) => Some(DEFAULT_LIVERELOAD_PORT),
            LiveReloadSetting::Enabled(false) => None,
            LiveReloadSetting::Port(port) => Some(*port),
        }
    }
}

/// How connected browsers should apply a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadKind {
    /// Swap stylesheets in place.
    Css,
    /// Reload the page.
    Full,
}

impl ReloadKind {
    /// `Css` only when every changed path is a stylesheet.
    pub fn for_paths<S: AsRef<str>>(paths: &[S]) -> ReloadKind {
        let all_css = !paths.is_empty()
            && paths
                .iter()
                .all(|p| p.as_ref().to_ascii_lowercase().ends_with(".css"));
        if all_css {
            ReloadKind::Css
        } else {
            ReloadKind::Full
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadEvent {
    pub path: String,
    pub kind: ReloadKind,
}

/// Fan-out point between the watch loop and connected browsers.
///
/// Clones share the same channel and server.
#[derive(Debug, Clone)]
pub struct LiveReloadHub {
    tx: broadcast::Sender<ReloadEvent>,
    listening: Arc<Mutex<Option<SocketAddr>>>,
}

impl Default for LiveReloadHub {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveReloadHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self {
            tx,
            listening: Arc::new(Mutex::new(None)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReloadEvent> {
        self.tx.subscribe()
    }

    /// Publish a change; returns how many sessions will receive it.
    pub fn publish(&self, event: ReloadEvent) -> usize {
        debug!(path = %event.path, kind = ?event.kind, "publishing reload");
        self.tx.send(event).unwrap_or(0)
    }

    /// Publish the reload(s) for a set of changed paths: one in-place patch
    /// per stylesheet, or a single full reload.
    pub fn reload_paths<S: AsRef<str>>(&self, paths: &[S]) -> ReloadKind {
        let kind = ReloadKind::for_paths(paths);
        match kind {
            ReloadKind::Css => {
                for path in paths {
                    self.publish(ReloadEvent {
                        path: path.as_ref().to_string(),
                        kind,
                    });
                }
            }
            ReloadKind::Full => {
                let path = paths
                    .iter()
                    .map(|p| p.as_ref())
                    .find(|p| !p.to_ascii_lowercase().ends_with(".css"))
                    .unwrap_or("index.html")
                    .to_string();
                self.publish(ReloadEvent { path, kind });
            }
        }
        kind
    }

    /// Address the server is bound to, if started.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        *self.listening.lock().await
    }

    /// Start the LiveReload server on `addr` unless it is already running,
    /// in which case the existing address is returned.
    pub async fn listen(&self, addr: &str) -> std::io::Result<SocketAddr> {
        let mut listening = self.listening.lock().await;
        if let Some(existing) = *listening {
            debug!(%existing, "live-reload server already running");
            return Ok(existing);
        }

        let listener = TcpListener::bind(addr).await?;
        let local = listener.local_addr()?;
        let app = router(self.clone());

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                warn!(error = %e, "live-reload server stopped");
            }
        });

        info!(addr = %local, "live-reload server listening");
        *listening = Some(local);
        Ok(local)
    }
}

/// Routes: `GET /livereload` (WebSocket) and `GET /livereload.js`.
pub fn router(hub: LiveReloadHub) -> Router {
    Router::new()
        .route("/livereload", get(ws_handler))
        .route("/livereload.js", get(client_script))
        .with_state(hub)
}

async fn client_script() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript; charset=utf-8")],
        CLIENT_SCRIPT,
    )
}

async fn ws_handler(ws: WebSocketUpgrade, State(hub): State<LiveReloadHub>) -> Response {
    ws.on_upgrade(move |socket| session(socket, hub))
}

#[derive(Debug, Deserialize)]
struct ClientCommand {
    command: String,
}

pub fn hello_message() -> String {
    serde_json::json!({
        "command": "hello",
        "protocols": [PROTOCOL_OFFICIAL_7],
        "serverName": "assetpipe",
    })
    .to_string()
}

pub fn reload_message(event: &ReloadEvent) -> String {
    serde_json::json!({
        "command": "reload",
        "path": event.path,
        "liveCSS": true,
    })
    .to_string()
}

async fn session(mut socket: WebSocket, hub: LiveReloadHub) {
    let mut rx = hub.subscribe();
    debug!("live-reload client connected");

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let is_hello = serde_json::from_str::<ClientCommand>(text.as_str())
                        .map(|c| c.command == "hello")
                        .unwrap_or(false);
                    if is_hello && socket.send(Message::Text(hello_message().into())).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                Some(Ok(_)) => {}
            },
            event = rx.recv() => match event {
                Ok(event) => {
                    if socket.send(Message::Text(reload_message(&event).into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live-reload client lagged behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    debug!("live-reload client disconnected");
}
