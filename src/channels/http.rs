//! HTTP channel: ask questions with a POST and download exports with a GET.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tokio::sync::{RwLock, mpsc, oneshot};
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::config::HttpConfig;
use crate::error::ChannelError;
use crate::present::{ExportArtifact, InlineTable, Presentation};

/// HTTP chat channel.
pub struct HttpChannel {
    config: HttpConfig,
    state: Arc<HttpChannelState>,
}

struct HttpChannelState {
    /// Sender for incoming messages.
    tx: RwLock<Option<mpsc::Sender<IncomingMessage>>>,
    /// Pending responses keyed by message ID.
    pending_responses: RwLock<HashMap<Uuid, oneshot::Sender<OutgoingResponse>>>,
    /// Exports available for download, oldest first.
    exports: RwLock<ExportStore>,
    /// Expected secret for authentication (if configured).
    webhook_secret: Option<String>,
    /// Fixed user ID for this HTTP channel.
    user_id: String,
}

#[derive(Default)]
struct ExportStore {
    order: VecDeque<Uuid>,
    artifacts: HashMap<Uuid, ExportArtifact>,
}

impl ExportStore {
    fn insert(&mut self, artifact: ExportArtifact) -> Uuid {
        let id = artifact.id;
        self.order.push_back(id);
        self.artifacts.insert(id, artifact);
        while self.order.len() > MAX_STORED_EXPORTS {
            if let Some(old) = self.order.pop_front() {
                self.artifacts.remove(&old);
            }
        }
        id
    }
}

/// Maximum JSON body size for chat requests (64 KB).
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Maximum number of pending wait-for-response requests.
const MAX_PENDING_RESPONSES: usize = 100;

/// Maximum content length for a single question.
const MAX_CONTENT_BYTES: usize = 32 * 1024;

/// Exports kept in memory for download.
const MAX_STORED_EXPORTS: usize = 32;

impl HttpChannel {
    /// Create a new HTTP channel.
    pub fn new(config: HttpConfig) -> Self {
        let webhook_secret = config
            .webhook_secret
            .as_ref()
            .map(|s| s.expose_secret().to_string());
        let user_id = config.user_id.clone();

        Self {
            config,
            state: Arc::new(HttpChannelState {
                tx: RwLock::new(None),
                pending_responses: RwLock::new(HashMap::new()),
                exports: RwLock::new(ExportStore::default()),
                webhook_secret,
                user_id,
            }),
        }
    }

    /// Return the channel's axum routes with state applied.
    ///
    /// Before `start()` is called the chat handler returns 503.
    pub fn routes(&self) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .route("/chat", post(chat_handler))
            .route("/exports/{id}", get(export_handler))
            .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
            .with_state(self.state.clone())
    }
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    /// The question.
    content: String,
    /// Secret for authentication.
    secret: Option<String>,
}

#[derive(Debug, Default, Serialize)]
struct ChatResponse {
    message_id: Uuid,
    status: String,
    response: Option<String>,
    sql: Option<String>,
    table: Option<InlineTable>,
    download_url: Option<String>,
    notices: Vec<String>,
}

impl ChatResponse {
    fn error(message_id: Uuid, message: &str) -> Self {
        Self {
            message_id,
            status: "error".to_string(),
            response: Some(message.to_string()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    channel: String,
}

async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        channel: "http".to_string(),
    })
}

async fn chat_handler(
    State(state): State<Arc<HttpChannelState>>,
    Json(req): Json<ChatRequest>,
) -> (StatusCode, Json<ChatResponse>) {
    if let Some(ref expected_secret) = state.webhook_secret {
        match &req.secret {
            Some(provided) if secret_matches(expected_secret, provided) => {}
            Some(_) => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(ChatResponse::error(Uuid::nil(), "Invalid secret")),
                );
            }
            None => {
                return (
                    StatusCode::UNAUTHORIZED,
                    Json(ChatResponse::error(Uuid::nil(), "Secret required")),
                );
            }
        }
    }

    if req.content.len() > MAX_CONTENT_BYTES {
        return (
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ChatResponse::error(Uuid::nil(), "Content too large")),
        );
    }

    if req.content.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ChatResponse::error(Uuid::nil(), "Content is empty")),
        );
    }

    let msg = IncomingMessage::new("http", &state.user_id, &req.content);
    process_message(state, msg).await
}

/// Compare secrets in constant time.
fn secret_matches(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

async fn process_message(
    state: Arc<HttpChannelState>,
    msg: IncomingMessage,
) -> (StatusCode, Json<ChatResponse>) {
    let msg_id = msg.id;

    if state.pending_responses.read().await.len() >= MAX_PENDING_RESPONSES {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(ChatResponse::error(msg_id, "Too many pending requests")),
        );
    }

    let (tx, rx) = oneshot::channel();
    state.pending_responses.write().await.insert(msg_id, tx);

    let tx_guard = state.tx.read().await;
    let send_error = match tx_guard.as_ref() {
        Some(tx) => tx
            .send(msg)
            .await
            .err()
            .map(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Channel closed")),
        None => Some((StatusCode::SERVICE_UNAVAILABLE, "Channel not started")),
    };
    drop(tx_guard);

    if let Some((status, message)) = send_error {
        state.pending_responses.write().await.remove(&msg_id);
        return (status, Json(ChatResponse::error(msg_id, message)));
    }

    // Turns are never cancelled, so this waits as long as the pipeline takes.
    let response = match rx.await {
        Ok(response) => response,
        Err(_) => {
            state.pending_responses.write().await.remove(&msg_id);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ChatResponse::error(msg_id, "Response cancelled")),
            );
        }
    };

    let mut body = ChatResponse {
        message_id: msg_id,
        status: "ok".to_string(),
        response: Some(response.content),
        sql: response.sql,
        notices: response.notices,
        ..Default::default()
    };

    match response.presentation {
        Some(Presentation::Inline(table)) => body.table = Some(table),
        Some(Presentation::Export(artifact)) => {
            let id = state.exports.write().await.insert(artifact);
            body.download_url = Some(format!("/exports/{}", id));
        }
        None => {}
    }

    (StatusCode::OK, Json(body))
}

async fn export_handler(
    State(state): State<Arc<HttpChannelState>>,
    Path(id): Path<Uuid>,
) -> Response {
    let exports = state.exports.read().await;
    match exports.artifacts.get(&id) {
        Some(artifact) => (
            [
                (header::CONTENT_TYPE, artifact.mime_type.to_string()),
                (
                    header::CONTENT_DISPOSITION,
                    format!("attachment; filename=\"{}\"", artifact.file_name),
                ),
            ],
            artifact.bytes.clone(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "Export not found").into_response(),
    }
}

#[async_trait]
impl Channel for HttpChannel {
    fn name(&self) -> &str {
        "http"
    }

    async fn start(&self) -> Result<MessageStream, ChannelError> {
        if self.state.webhook_secret.is_none() {
            return Err(ChannelError::StartupFailed {
                name: "http".to_string(),
                reason: "HTTP secret is required (set HTTP_WEBHOOK_SECRET)".to_string(),
            });
        }

        let (tx, rx) = mpsc::channel(64);
        *self.state.tx.write().await = Some(tx);

        tracing::info!(
            "HTTP channel ready ({}:{})",
            self.config.host,
            self.config.port
        );

        Ok(Box::pin(ReceiverStream::new(rx)))
    }

    async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        if let Some(tx) = self.state.pending_responses.write().await.remove(&msg.id) {
            let _ = tx.send(response);
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ChannelError> {
        if self.state.tx.read().await.is_some() {
            Ok(())
        } else {
            Err(ChannelError::HealthCheckFailed {
                name: "http".to_string(),
            })
        }
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        *self.state.tx.write().await = None;
        Ok(())
    }
}
