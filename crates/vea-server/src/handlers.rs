//! HTTP Handlers

use std::collections::BTreeMap;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use vea_core::{AgentError, ImagePayload, Message, ThreadId};

use crate::state::AppState;

pub const DEFAULT_THREAD_ID: &str = "1";

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ollama_connected: bool,
    pub tool_model: String,
    pub vision_model: String,
    pub reconfiguring: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub query: String,
    #[serde(default)]
    pub image_data: Option<String>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub message: String,
    pub thread_id: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelsResponse {
    pub tool: Vec<String>,
    pub vision: Vec<String>,
    pub curr_tool_model: String,
    pub curr_vision_model: String,
    pub tools_config: BTreeMap<String, bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateModelConfigRequest {
    pub tool_model: String,
    pub image_model: String,
    #[serde(default)]
    pub tools_config: Option<BTreeMap<String, bool>>,
}

#[derive(Debug, Serialize)]
pub struct UpdateModelConfigResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadMessagesResponse {
    pub thread_id: String,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct ThreadsResponse {
    pub threads: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

// ============================================================================
// Errors
// ============================================================================

/// Error rendered as `{error, code}` with a matching status
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    body: ErrorResponse,
}

impl ApiError {
    fn new(status: StatusCode, error: impl Into<String>, code: &str) -> Self {
        Self {
            status,
            body: ErrorResponse {
                error: error.into(),
                code: code.into(),
            },
        }
    }

    fn invalid_image(err: &AgentError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, format!("Invalid image data: {err}"), "INVALID_IMAGE")
    }

    pub const fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<AgentError> for ApiError {
    fn from(err: AgentError) -> Self {
        let status = match &err {
            AgentError::Reconfiguring => StatusCode::SERVICE_UNAVAILABLE,
            AgentError::ModelUnavailable(_) | AgentError::UnknownTool(_) | AgentError::Provider(_) => {
                StatusCode::BAD_GATEWAY
            }
            AgentError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            AgentError::Config(_) | AgentError::InvalidToolArguments { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self::new(status, err.user_message(), err.code())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let ollama_connected = state.agent.health_check().await.unwrap_or(false);
    let config = state.agent.config().await;

    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        ollama_connected,
        tool_model: config.tool_model.to_string(),
        vision_model: config.vision_model.to_string(),
        reconfiguring: state.agent.is_reconfiguring(),
    })
}

/// Run one chat turn
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let thread_id = payload
        .thread_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_THREAD_ID.into());

    let image = payload
        .image_data
        .as_deref()
        .filter(|data| !data.trim().is_empty())
        .map(ImagePayload::from_base64)
        .transpose()
        .map_err(|e| ApiError::invalid_image(&e))?;

    tracing::info!(thread_id = %thread_id, has_image = image.is_some(), "Chat request");

    let thread = ThreadId::from_string(thread_id);
    let reply = state.agent.submit(&thread, &payload.query, image).await?;

    Ok(Json(ChatResponse {
        message: reply.message,
        thread_id: thread.as_str().to_string(),
        model: reply.model,
    }))
}

/// Installed models and the active selection
pub async fn show_models(State(state): State<AppState>) -> Json<ModelsResponse> {
    let config = state.agent.config().await;

    let (catalog, error) = match state.inventory.list_models().await {
        Ok(catalog) => (catalog, None),
        Err(e) => {
            tracing::warn!(error = %e, "Listing models failed");
            (vea_core::ModelCatalog::default(), Some(e.to_string()))
        }
    };

    Json(ModelsResponse {
        tool: catalog.tool_capable,
        vision: catalog.vision_capable,
        curr_tool_model: config.tool_model.name().to_string(),
        curr_vision_model: config.vision_model.name().to_string(),
        tools_config: config.tools,
        error,
    })
}

/// Rebuild the agent with new models, persist, then swap it in.
///
/// A failed build leaves both the running agent and the file untouched;
/// a failed save leaves the running agent untouched.
pub async fn update_model_config(
    State(state): State<AppState>,
    Json(payload): Json<UpdateModelConfigRequest>,
) -> Result<Json<UpdateModelConfigResponse>, ApiError> {
    let _guard = state.update_lock.lock().await;

    let current = state.agent.config().await;
    let next = current.updated(&payload.tool_model, &payload.image_model, payload.tools_config.as_ref())?;

    state
        .agent
        .reconfigure(state.factory.as_ref(), &next, state.config_store.save(&next))
        .await?;

    tracing::info!(tool_model = %next.tool_model, vision_model = %next.vision_model, "Model configuration updated");

    Ok(Json(UpdateModelConfigResponse {
        message: "Model configuration updated and saved.",
    }))
}

/// Ids of every thread with a checkpoint
pub async fn list_threads(State(state): State<AppState>) -> Json<ThreadsResponse> {
    let threads = state
        .agent
        .checkpointer()
        .thread_ids()
        .into_iter()
        .map(|id| id.as_str().to_string())
        .collect();
    Json(ThreadsResponse { threads })
}

/// Transcript of one thread
pub async fn thread_messages(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<ThreadMessagesResponse>, ApiError> {
    let thread = ThreadId::from_string(thread_id);
    let snapshot = state.agent.checkpointer().snapshot(&thread).await.ok_or_else(|| {
        ApiError::new(
            StatusCode::NOT_FOUND,
            format!("No conversation for thread '{thread}'"),
            "THREAD_NOT_FOUND",
        )
    })?;

    Ok(Json(ThreadMessagesResponse {
        thread_id: thread.as_str().to_string(),
        messages: snapshot.messages().to_vec(),
    }))
}
