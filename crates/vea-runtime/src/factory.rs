//! Agent construction for the Ollama backend.

use std::sync::Arc;

use vea_core::{
    AgentConfig, AgentError, AgentFactory, AgentLoop, LoopConfig, ModelId, Result, ToolRegistry,
};

use crate::ollama::{OllamaConfig, OllamaGateway, OllamaInventory};

/// Builds agents backed by Ollama from the full tool catalog
#[derive(Clone, Debug)]
pub struct OllamaAgentFactory {
    catalog: Arc<ToolRegistry>,
    ollama: OllamaConfig,
    loop_config: LoopConfig,
}

impl OllamaAgentFactory {
    pub const PROVIDER: &'static str = "ollama";

    pub fn new(catalog: impl Into<Arc<ToolRegistry>>, ollama: OllamaConfig) -> Self {
        Self {
            catalog: catalog.into(),
            ollama,
            loop_config: LoopConfig::default(),
        }
    }

    #[must_use]
    pub fn with_loop_config(mut self, config: LoopConfig) -> Self {
        self.loop_config = config;
        self
    }

    /// Model inventory for the same Ollama instance
    pub fn inventory(&self) -> Result<OllamaInventory> {
        OllamaInventory::new(&self.ollama)
    }

    fn check_provider(id: &ModelId) -> Result<()> {
        if id.provider() == Self::PROVIDER {
            Ok(())
        } else {
            Err(AgentError::Config(format!(
                "unsupported model provider '{}' in '{id}', only '{}' is available",
                id.provider(),
                Self::PROVIDER
            )))
        }
    }
}

impl AgentFactory for OllamaAgentFactory {
    fn build(&self, config: &AgentConfig) -> Result<AgentLoop> {
        Self::check_provider(&config.tool_model)?;
        Self::check_provider(&config.vision_model)?;

        let enabled = config.enabled_tools(&self.catalog);
        let tools = self.catalog.build(&enabled)?;

        let gateway = OllamaGateway::new(&self.ollama, config.tool_model.name())?;

        tracing::info!(
            tool_model = %config.tool_model,
            vision_model = %config.vision_model,
            tools = ?enabled,
            "Built agent"
        );

        AgentLoop::builder()
            .gateway(Arc::new(gateway))
            .tools(tools)
            .agent_config(config.clone())
            .loop_config(self.loop_config.clone())
            .build()
    }
}
