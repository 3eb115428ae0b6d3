//! # vea-runtime
//!
//! Model backends for the Vea agent.
//!
//! ## Providers
//!
//! - **Ollama** (default): local inference, native tool calling and vision
//!
//! ## Usage
//!
//! ```rust,ignore
//! use vea_runtime::{OllamaAgentFactory, OllamaConfig};
//!
//! let factory = OllamaAgentFactory::new(catalog, OllamaConfig::from_env());
//! let agent = factory.build(&AgentConfig::default())?;
//! let handle = AgentHandle::new(agent);
//! ```

#[cfg(feature = "ollama")]
pub mod factory;
#[cfg(feature = "ollama")]
pub mod ollama;

#[cfg(feature = "ollama")]
pub use factory::OllamaAgentFactory;
#[cfg(feature = "ollama")]
pub use ollama::{OllamaConfig, OllamaGateway, OllamaInventory};

// Re-export core types for convenience
pub use vea_core::{
    AgentConfig, AgentError, AgentFactory, AgentHandle, AgentLoop, Message, ModelGateway, ModelInventory,
    Result, Role, Tool, ToolRegistry,
};
