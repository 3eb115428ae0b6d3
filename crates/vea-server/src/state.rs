//! Application State

use std::sync::Arc;

use tokio::sync::Mutex;
use vea_core::{AgentFactory, AgentHandle, ModelInventory};

use crate::configuration::ConfigStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Current agent and conversation checkpoints
    pub agent: Arc<AgentHandle>,

    /// Builds replacement agents on reconfiguration
    pub factory: Arc<dyn AgentFactory>,

    /// Installed model listing
    pub inventory: Arc<dyn ModelInventory>,

    /// Persisted agent configuration
    pub config_store: Arc<ConfigStore>,

    /// Serializes configuration updates
    pub update_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(
        agent: Arc<AgentHandle>,
        factory: Arc<dyn AgentFactory>,
        inventory: Arc<dyn ModelInventory>,
        config_store: ConfigStore,
    ) -> Self {
        Self {
            agent,
            factory,
            inventory,
            config_store: Arc::new(config_store),
            update_lock: Arc::new(Mutex::new(())),
        }
    }
}
