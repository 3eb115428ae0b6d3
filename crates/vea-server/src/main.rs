//! Vea HTTP Server
//!
//! Axum server exposing the chat, model selection and thread history
//! endpoints on top of the Ollama-backed agent.

mod configuration;
mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vea_core::{AgentFactory, AgentHandle};
use vea_runtime::{OllamaAgentFactory, OllamaConfig};
use vea_tools::ToolSettings;

use crate::configuration::{ConfigStore, ServerSettings};
use crate::handlers::{
    chat_handler, health_check, list_threads, show_models, thread_messages, update_model_config,
};
use crate::state::AppState;

fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/chat", post(chat_handler))
        .route("/chat/", post(chat_handler))
        .route("/show-ollama-models", get(show_models))
        .route("/show-ollama-models/", get(show_models))
        .route("/update-model-config", post(update_model_config))
        .route("/update-model-config/", post(update_model_config))
        .route("/threads", get(list_threads))
        .route("/threads/{thread_id}/messages", get(thread_messages))
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();
    let settings = ServerSettings::from_env();

    // Persisted model selection
    let config_store = ConfigStore::new(settings.config_path.clone());
    let agent_config = config_store.load().await?;

    // Tools
    let tools = vea_tools::catalog(&ToolSettings::from_env())?;
    tracing::info!("Registered {} tools:", tools.len());
    for name in tools.names() {
        tracing::info!("  • {}", name);
    }

    // Agent
    let factory = OllamaAgentFactory::new(tools, OllamaConfig::from_env())
        .with_loop_config(settings.loop_config());
    let inventory = factory.inventory()?;
    let agent = Arc::new(AgentHandle::new(factory.build(&agent_config)?));

    match agent.health_check().await {
        Ok(true) => tracing::info!("✓ Connected to Ollama"),
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ Ollama not available - chat requests will fail");
            tracing::warn!("  Make sure Ollama is running: ollama serve");
        }
    }

    let state = AppState::new(agent, Arc::new(factory), Arc::new(inventory), config_store);

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(cors_layer(&settings.cors_origins)),
    );

    // Start server
    let listener = tokio::net::TcpListener::bind(&settings.bind_addr).await?;

    tracing::info!("Vea server running on http://{}", settings.bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                       - Health check");
    tracing::info!("  POST /chat                         - Send message");
    tracing::info!("  GET  /show-ollama-models           - Installed models");
    tracing::info!("  POST /update-model-config          - Change models and tools");
    tracing::info!("  GET  /threads                      - Known threads");
    tracing::info!("  GET  /threads/{{thread_id}}/messages - Thread history");

    axum::serve(listener, app).await?;

    Ok(())
}
