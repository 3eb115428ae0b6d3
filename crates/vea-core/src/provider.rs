//! Model Gateway
//!
//! Common interface to the tool-calling text model and the vision model,
//! so the agent loop works with any backend without code changes.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vea_core::provider::{ModelGateway, ModelResponse};
//!
//! match gateway.generate(&messages, &registry.schemas()).await? {
//!     ModelResponse::FinalAnswer(text) => println!("{text}"),
//!     ModelResponse::ToolCallRequested { calls, .. } => run(calls).await,
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::session::ImagePayload;
use crate::tool::{ToolCall, ToolSchema};

/// Sampling options for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for sampling (0.0 = deterministic, 1.0 = creative)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Top-p nucleus sampling
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

const fn default_temperature() -> f32 { 0.7 }
const fn default_max_tokens() -> u32 { 2048 }
const fn default_top_p() -> f32 { 0.9 }

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            top_p: default_top_p(),
        }
    }
}

/// What the model produced for one generation
#[derive(Clone, Debug, PartialEq)]
pub enum ModelResponse {
    /// Plain text answer; ends the loop
    FinalAnswer(String),

    /// The model wants one or more tools run before it answers
    ToolCallRequested {
        /// Any text the model emitted alongside the calls
        content: String,
        calls: Vec<ToolCall>,
    },
}

impl ModelResponse {
    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Self::ToolCallRequested {
            content: String::new(),
            calls,
        }
    }
}

/// Installed models grouped by capability
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelCatalog {
    pub tool_capable: Vec<String>,
    pub vision_capable: Vec<String>,
}

/// Gateway to the text and vision models
///
/// Implement this trait to add support for new LLM backends.
/// The agent loop talks to models exclusively through this interface.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Ask the tool-capable model for the next step.
    ///
    /// Never retries; an unreachable backend is `ModelUnavailable`.
    async fn generate(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ModelResponse>;

    /// One-shot vision query. No tools, no transcript beyond `query`.
    async fn generate_vision(
        &self,
        query: &str,
        image: &ImagePayload,
        vision_model: &str,
    ) -> Result<String>;

    /// Identifier of the text model this gateway is bound to
    fn model(&self) -> &str;

    /// Check if the backend is available
    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

/// Probe for installed models and their capabilities
#[async_trait]
pub trait ModelInventory: Send + Sync {
    async fn list_models(&self) -> Result<ModelCatalog>;
}
