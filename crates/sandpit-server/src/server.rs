//! Development server implementation.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use sandpit_sandbox::{
    DocumentBuilder, RuntimeAssets, SandboxPipeline, SourceDirectory, SourceError,
    TransformStrategy,
};
use tokio::sync::{broadcast, RwLock};
use tower_http::cors::CorsLayer;
use uuid::Uuid;

use crate::boundary::HostBoundary;
use crate::controller::{ControllerEvent, PreviewController, ReleasePolicy};
use crate::handles::{HandleLookup, HandleStore};
use crate::runner::{controller_channel, spawn_controller, ControllerHandle, TokioReleaseTimer};
use crate::watcher::{FileWatcher, WatchEvent};
use crate::websocket::{host_client_script, HostEvent, HostMessage, StatusHub};

const BRIDGE_PATH: &str = "/__bridge";

/// Configuration for the development server.
#[derive(Debug, Clone)]
pub struct DevServerConfig {
    /// Directory holding the component sources
    pub source_dir: PathBuf,

    /// Port to listen on
    pub port: u16,

    /// Host to bind to
    pub host: String,

    /// Open browser on start
    pub open: bool,

    /// How sources are transformed before execution
    pub transform: TransformStrategy,

    /// When sandbox documents are released
    pub release_policy: ReleasePolicy,

    /// Runtime scripts loaded by sandbox documents
    pub assets: RuntimeAssets,

    /// Minify sandbox styles
    pub minify: bool,
}

impl Default for DevServerConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("generated"),
            port: 7777,
            host: "127.0.0.1".to_string(),
            open: true,
            transform: TransformStrategy::default(),
            release_policy: ReleasePolicy::default(),
            assets: RuntimeAssets::default(),
            minify: false,
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(SocketAddr, String),

    #[error("File watch error: {0}")]
    WatchError(String),
}

/// Shared server state.
struct ServerState {
    sources: SourceDirectory,
    store: HandleStore,
    hub: StatusHub,
    controller: ControllerHandle,
    /// Relative path of the selected file
    selected: Option<String>,
}

type SharedState = Arc<RwLock<ServerState>>;

/// Development server.
pub struct DevServer {
    config: DevServerConfig,
}

impl DevServer {
    /// Create a new development server.
    pub fn new(config: DevServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DevServerConfig {
        &self.config
    }

    /// Start the development server and run until interrupted.
    pub async fn start(self) -> Result<(), ServerError> {
        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })?;

        // Watcher events carry absolute paths
        let root = std::fs::canonicalize(&self.config.source_dir)
            .unwrap_or_else(|_| self.config.source_dir.clone());
        if !root.is_dir() {
            tracing::warn!("Source directory {} does not exist yet", root.display());
        }

        let store = HandleStore::new();
        let hub = StatusHub::new();
        let (controller_handle, events) = controller_channel(64);

        let pipeline = SandboxPipeline::new(
            self.config.transform,
            DocumentBuilder::new(self.config.assets.clone()).with_minify(self.config.minify),
        );
        tracing::debug!("Using {} transformer", pipeline.transformer_name());

        let controller = PreviewController::new(
            pipeline,
            store.clone(),
            Box::new(HostBoundary::new(hub.clone())),
        )
        .with_release_policy(
            self.config.release_policy,
            Box::new(TokioReleaseTimer::new(controller_handle.clone())),
        );
        let runner = spawn_controller(controller, events, hub.clone());

        let state = Arc::new(RwLock::new(ServerState {
            sources: SourceDirectory::new(&root),
            store,
            hub,
            controller: controller_handle.clone(),
            selected: None,
        }));

        let (watcher, mut rx) =
            FileWatcher::new(&[root.clone()]).map_err(|e| ServerError::WatchError(e.to_string()))?;

        let state_clone = Arc::clone(&state);
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                handle_watch_event(&state_clone, event).await;
            }
            // Keep watcher alive
            drop(watcher);
        });

        let app = router(state);

        tracing::info!("Starting dev server at http://{}", addr);
        tracing::info!("Previewing components from {}", root.display());

        if self.config.open {
            let url = format!("http://{}", addr);
            if let Err(e) = open::that(&url) {
                tracing::warn!("Failed to open browser: {}", e);
            }
        }

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::BindError(addr, e.to_string()))?;

        controller_handle.send(ControllerEvent::Shutdown).await;
        let _ = runner.await;

        Ok(())
    }
}

/// Resolves on Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutting down, releasing sandbox documents");
}

fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/__host.js", get(host_script_handler))
        .route(BRIDGE_PATH, get(ws_handler))
        .route("/api/files", get(list_files))
        .route("/api/files/{*path}", get(file_content))
        .route("/api/handles", get(handle_stats))
        .route("/sandbox/{id}", get(sandbox_document))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Handle file watch events.
async fn handle_watch_event(state: &SharedState, event: WatchEvent) {
    let state = state.read().await;

    if matches!(event, WatchEvent::Created(_) | WatchEvent::Deleted(_)) {
        state.hub.send(HostMessage::FilesChanged);
    }

    let Some(relative) = state.sources.relative(event.path()) else {
        return;
    };
    if state.selected.as_deref() != Some(relative.as_str()) {
        return;
    }

    let artifact = match event {
        WatchEvent::Deleted(_) => {
            tracing::info!("Selected file removed: {}", relative);
            None
        }
        WatchEvent::Modified(_) | WatchEvent::Created(_) => {
            tracing::info!("Selected file changed: {}", relative);
            match state.sources.read(&relative) {
                Ok(artifact) => Some(artifact),
                Err(e) => {
                    tracing::warn!("Failed to re-read {}: {}", relative, e);
                    return;
                }
            }
        }
    };

    state.controller.send(ControllerEvent::Select(artifact)).await;
}

/// Apply one message from a host page.
async fn handle_host_event(state: &SharedState, event: HostEvent) {
    match event {
        HostEvent::Select { path } => {
            let mut state = state.write().await;

            let artifact = match path.as_deref() {
                Some(path) => match state.sources.read(path) {
                    Ok(artifact) => Some(artifact),
                    Err(e) => {
                        tracing::warn!("Failed to read {}: {}", path, e);
                        None
                    }
                },
                None => None,
            };

            state.selected = artifact.as_ref().map(|a| a.filename.clone());
            state.controller.send(ControllerEvent::Select(artifact)).await;
        }
        HostEvent::Refresh => {
            let state = state.read().await;
            state.controller.send(ControllerEvent::Refresh).await;
        }
        HostEvent::Bridge { message } => {
            let state = state.read().await;
            state.controller.send(ControllerEvent::Bridge(message)).await;
        }
    }
}

/// Handler for the host page.
async fn index_handler() -> impl IntoResponse {
    Html(HOST_PAGE)
}

/// Handler for the host client script.
async fn host_script_handler() -> impl IntoResponse {
    let script = host_client_script(BRIDGE_PATH);
    ([(header::CONTENT_TYPE, "application/javascript")], script)
}

async fn list_files(State(state): State<SharedState>) -> Response {
    let state = state.read().await;

    match state.sources.list() {
        Ok(entries) => Json(entries).into_response(),
        Err(e) => source_error_response(e),
    }
}

async fn file_content(State(state): State<SharedState>, Path(path): Path<String>) -> Response {
    let state = state.read().await;

    match state.sources.read(&path) {
        Ok(artifact) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            artifact.text,
        )
            .into_response(),
        Err(e) => source_error_response(e),
    }
}

async fn handle_stats(State(state): State<SharedState>) -> impl IntoResponse {
    let state = state.read().await;
    Json(state.store.stats())
}

async fn sandbox_document(State(state): State<SharedState>, Path(id): Path<String>) -> Response {
    let store = state.read().await.store.clone();
    document_response(&store, &id)
}

/// Serve a handle's document, `410` once released, `404` if never issued.
fn document_response(store: &HandleStore, id: &str) -> Response {
    let Ok(id) = Uuid::parse_str(id) else {
        return (StatusCode::NOT_FOUND, "Unknown sandbox document").into_response();
    };

    match store.lookup(&id) {
        HandleLookup::Live(html) => (
            [
                (header::CONTENT_TYPE, "text/html; charset=utf-8"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            html.to_string(),
        )
            .into_response(),
        HandleLookup::Released => {
            tracing::debug!("Load of released handle {}", id);
            (StatusCode::GONE, "Sandbox document was released").into_response()
        }
        HandleLookup::Unknown => (StatusCode::NOT_FOUND, "Unknown sandbox document").into_response(),
    }
}

fn source_error_response(error: SourceError) -> Response {
    let status = match error {
        SourceError::InvalidPath(_) => StatusCode::BAD_REQUEST,
        SourceError::DirectoryNotFound(_) | SourceError::Read { .. } => StatusCode::NOT_FOUND,
    };
    (status, error.to_string()).into_response()
}

/// Handler for the bridge WebSocket endpoint.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<SharedState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

/// Handle a WebSocket connection.
async fn handle_ws(mut socket: WebSocket, state: SharedState) {
    let (mut rx, snapshot) = {
        let state = state.read().await;
        (state.hub.subscribe(), state.hub.snapshot())
    };

    for msg in std::iter::once(HostMessage::Connected).chain(snapshot) {
        if !send_host_message(&mut socket, &msg).await {
            return;
        }
    }

    loop {
        tokio::select! {
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => match serde_json::from_str::<HostEvent>(text.as_str()) {
                    Ok(event) => handle_host_event(&state, event).await,
                    Err(e) => tracing::debug!("Ignoring malformed host message: {}", e),
                },
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            outgoing = rx.recv() => match outgoing {
                Ok(msg) => {
                    if !send_host_message(&mut socket, &msg).await {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Host connection lagged by {} messages", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }
}

/// Send one message; `false` once the socket is gone.
async fn send_host_message(socket: &mut WebSocket, msg: &HostMessage) -> bool {
    let json = match serde_json::to_string(msg) {
        Ok(json) => json,
        Err(e) => {
            tracing::warn!("Failed to encode host message: {}", e);
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

const HOST_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Sandpit</title>
  <style>
    body { font-family: system-ui, sans-serif; margin: 0; display: flex; height: 100vh; color: #111827; }
    aside { width: 280px; border-right: 1px solid #e5e7eb; overflow-y: auto; padding: 1rem; }
    aside ul { list-style: none; margin: 0; padding: 0; }
    aside button { width: 100%; text-align: left; background: none; border: 0; padding: 0.35rem 0.5rem; border-radius: 0.25rem; cursor: pointer; font: inherit; }
    aside button:hover { background: #f3f4f6; }
    aside button.selected { background: #e0e7ff; }
    main { flex: 1; display: flex; flex-direction: column; padding: 1rem; gap: 0.75rem; }
    header { display: flex; align-items: flex-start; justify-content: space-between; gap: 1rem; }
    #sandpit-status { font-size: 0.9rem; }
    #sandpit-status .filename { font-weight: 600; margin-bottom: 0.25rem; }
    #sandpit-status .muted { color: #6b7280; }
    #sandpit-status .warn { color: #b45309; }
    #sandpit-status .ok { color: #047857; }
    #sandpit-status .busy::before { content: ""; display: inline-block; width: 0.7rem; height: 0.7rem; margin-right: 0.4rem; border: 2px solid #93c5fd; border-top-color: transparent; border-radius: 50%; animation: spin 0.8s linear infinite; }
    #sandpit-status .error-title { color: #dc2626; font-weight: 600; }
    #sandpit-status .error { color: #dc2626; font-family: monospace; white-space: pre-wrap; }
    #sandpit-frame { flex: 1; display: flex; }
    .sandpit-frame { flex: 1; border: 1px solid #e5e7eb; border-radius: 0.5rem; background: white; }
    @keyframes spin { to { transform: rotate(360deg); } }
  </style>
</head>
<body>
  <aside>
    <h2>Components</h2>
    <ul id="sandpit-files"></ul>
  </aside>
  <main>
    <header>
      <div id="sandpit-status" role="status" aria-live="polite"></div>
      <button id="sandpit-refresh" type="button" disabled>Refresh</button>
    </header>
    <div id="sandpit-frame"></div>
  </main>
  <script src="/__host.js"></script>
</body>
</html>"#;
