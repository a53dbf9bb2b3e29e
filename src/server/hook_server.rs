//! Local HTTP listener for hook events
//!
//! Listens on 127.0.0.1 only. Requests are parsed on the listener thread and handed to
//! the controller through a bounded channel; the listener never touches session state.
//!
//! Routes:
//! - `POST /hook`, `POST /pin`, `POST /unpin`: forward the body, reply `{"status":"ok"}`
//! - `GET /health`: `{"status":"running"}`
//! - `GET /status`: the last snapshot published by the controller

use crate::controller::AppMessage;
use crate::error::{NotchError, Result};
use crate::server::payload::{HookMessage, HookPayload, PinPayload};
use parking_lot::RwLock;
use serde_json::{Value, json};
use std::io::Read;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread::JoinHandle;
use std::time::Duration;
use tiny_http::{Header, Method, Request, Response, Server};

/// How often the listener checks for shutdown while idle
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Status snapshot shared between the controller (writer) and the listener (reader)
pub type StatusHandle = Arc<RwLock<Value>>;

/// Status served before the controller publishes its first snapshot
pub fn initial_status() -> Value {
    json!({"status": "running", "is_idle": true, "session_count": 0, "sessions": []})
}

/// Create a status handle holding [`initial_status`]
pub fn new_status_handle() -> StatusHandle {
    Arc::new(RwLock::new(initial_status()))
}

/// Running hook listener; stops on [`HookServer::shutdown`] or drop
pub struct HookServer {
    server: Arc<Server>,
    port: u16,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl HookServer {
    /// Bind `127.0.0.1:port` and serve on a background thread
    ///
    /// Port 0 binds an ephemeral port, see [`HookServer::port`].
    pub fn start(
        port: u16,
        sender: mpsc::SyncSender<AppMessage>,
        status: StatusHandle,
    ) -> Result<Self> {
        use tracing::{info, warn};

        let server = Server::http(("127.0.0.1", port)).map_err(|e| {
            let in_use = e
                .downcast_ref::<std::io::Error>()
                .is_some_and(|io| io.kind() == std::io::ErrorKind::AddrInUse);
            if in_use {
                warn!("Port {} is already in use", port);
                NotchError::PortInUse(port)
            } else {
                NotchError::ServerError(e)
            }
        })?;

        let port = server
            .server_addr()
            .to_ip()
            .map_or(port, |addr| addr.port());
        let server = Arc::new(server);
        let running = Arc::new(AtomicBool::new(true));

        let thread = {
            let server = Arc::clone(&server);
            let running = Arc::clone(&running);
            std::thread::Builder::new()
                .name("hook-server".to_string())
                .spawn(move || serve(&server, &running, &sender, &status))?
        };

        info!("Hook server listening on http://127.0.0.1:{}", port);
        Ok(Self {
            server,
            port,
            running,
            thread: Some(thread),
        })
    }

    /// Port actually bound
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether the listener thread is still serving
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop accepting requests and join the listener thread
    pub fn shutdown(&mut self) {
        use tracing::{info, warn};

        let Some(thread) = self.thread.take() else {
            return;
        };
        self.running.store(false, Ordering::SeqCst);
        self.server.unblock();
        if thread.join().is_err() {
            warn!("Hook server thread panicked");
        }
        info!("Hook server stopped");
    }
}

impl Drop for HookServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn serve(
    server: &Server,
    running: &AtomicBool,
    sender: &mpsc::SyncSender<AppMessage>,
    status: &StatusHandle,
) {
    use tracing::{debug, error};

    while running.load(Ordering::SeqCst) {
        match server.recv_timeout(POLL_INTERVAL) {
            Ok(Some(request)) => handle_request(request, sender, status),
            Ok(None) => {}
            Err(e) => {
                error!("Hook server error: {}", e);
                break;
            }
        }
    }

    running.store(false, Ordering::SeqCst);
    debug!("Hook server loop exited");
}

fn handle_request(mut request: Request, sender: &mpsc::SyncSender<AppMessage>, status: &StatusHandle) {
    use tracing::{debug, warn};

    let method = request.method().clone();
    let path = request
        .url()
        .split('?')
        .next()
        .unwrap_or_default()
        .to_string();

    let body = if method == Method::Post {
        // Read/Write tool output can run to several MiB; the whole body is needed
        let mut body = String::with_capacity(request.body_length().unwrap_or_default());
        match request.as_reader().read_to_string(&mut body) {
            Ok(_) => Some(body),
            Err(e) => {
                debug!("Unreadable request body: {}", e);
                None
            }
        }
    } else {
        Some(String::new())
    };

    let (code, reply) = match body {
        Some(body) => dispatch(&method, &path, &body, sender, status),
        None => (400, json!({"error": "Invalid JSON"})),
    };
    debug!("{} {} -> {}", method, path, code);

    let mut response = Response::from_string(reply.to_string()).with_status_code(code);
    if let Ok(header) = Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..]) {
        response = response.with_header(header);
    }
    if let Err(e) = request.respond(response) {
        warn!("Failed to send response: {}", e);
    }
}

/// Route one request and produce the status code and JSON reply
pub fn dispatch(
    method: &Method,
    path: &str,
    body: &str,
    sender: &mpsc::SyncSender<AppMessage>,
    status: &StatusHandle,
) -> (u16, Value) {
    use tracing::warn;

    let readable = matches!(method, Method::Get | Method::Post);
    match path {
        "/hook" | "/pin" | "/unpin" if *method == Method::Post => {
            let text = if body.trim().is_empty() { "{}" } else { body };
            let value: Value = match serde_json::from_str(text) {
                Ok(value) => value,
                Err(e) => {
                    let preview: String = body.chars().take(200).collect();
                    warn!("Invalid JSON received ({}): {}", e, preview);
                    return (400, json!({"error": "Invalid JSON"}));
                }
            };

            let message = match parse_message(path, value) {
                Ok(message) => message,
                Err(e) => {
                    warn!("Rejected {} body: {}", path, e);
                    return (400, json!({"error": "Invalid payload"}));
                }
            };

            match sender.try_send(AppMessage::Hook(message)) {
                Ok(()) => (200, json!({"status": "ok"})),
                Err(mpsc::TrySendError::Full(_)) => {
                    warn!("Controller queue full, dropping {} request", path);
                    (503, json!({"error": "Busy"}))
                }
                Err(mpsc::TrySendError::Disconnected(_)) => {
                    (503, json!({"error": "Shutting down"}))
                }
            }
        }
        "/health" if readable => (200, json!({"status": "running"})),
        "/status" if readable => (200, status.read().clone()),
        "/hook" | "/pin" | "/unpin" | "/health" | "/status" => {
            (405, json!({"error": "Method not allowed"}))
        }
        _ => (404, json!({"error": "Not found"})),
    }
}

fn parse_message(path: &str, value: Value) -> serde_json::Result<HookMessage> {
    Ok(match path {
        "/pin" => HookMessage::Pin(serde_json::from_value::<PinPayload>(value)?),
        "/unpin" => HookMessage::Unpin(serde_json::from_value::<PinPayload>(value)?),
        _ => HookMessage::Hook(serde_json::from_value::<HookPayload>(value)?),
    })
}
