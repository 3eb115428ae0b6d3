//! # vea-core
//!
//! Core of the Vea assistant: a tool-calling agent loop over a
//! provider-agnostic model gateway, with per-thread conversation memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        AgentHandle                           │
//! │  ┌──────────────┐  ┌─────────────┐  ┌─────────────────────┐  │
//! │  │  AgentLoop   │  │    Tool     │  │    ModelGateway     │  │
//! │  │ (reasoning)  │──│  Registry   │──│  (text + vision)    │  │
//! │  └──────────────┘  └─────────────┘  └─────────────────────┘  │
//! │          │                                                   │
//! │  ┌──────────────┐                                            │
//! │  │ Checkpointer │  one ConversationState per thread id       │
//! │  └──────────────┘                                            │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `ModelGateway` trait keeps the loop independent of the model backend;
//! the runtime crate provides the Ollama implementation.

pub mod config;
pub mod error;
pub mod message;
pub mod provider;
pub mod reasoning;
pub mod service;
pub mod session;
pub mod tool;

#[cfg(test)]
mod test_helpers;

pub use config::{AgentConfig, ModelId};
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use provider::{GenerationOptions, ModelCatalog, ModelGateway, ModelInventory, ModelResponse};
pub use reasoning::{AgentLoop, AgentLoopBuilder, LoopConfig};
pub use service::{AgentFactory, AgentHandle, Reply};
pub use session::{Checkpointer, ConversationState, ImagePayload, ThreadId};
pub use tool::{Tool, ToolCall, ToolRegistry, ToolResult, ToolSchema};
