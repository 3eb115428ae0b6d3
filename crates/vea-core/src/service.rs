//! Agent Handle
//!
//! The request boundary the server talks to. Holds the current [`AgentLoop`]
//! and the shared [`Checkpointer`], serializes requests per thread, and swaps
//! in a freshly built agent when the configuration changes.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::reasoning::AgentLoop;
use crate::session::{Checkpointer, ImagePayload, ThreadId};

/// Builds an agent from configuration.
///
/// Implemented by the runtime, which knows how to reach real model backends.
pub trait AgentFactory: Send + Sync {
    fn build(&self, config: &AgentConfig) -> Result<AgentLoop>;
}

/// Answer to one chat turn
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub message: String,

    /// Tool model of the agent that produced the answer
    pub model: String,
}

/// Swap-capable entry point for chat requests
pub struct AgentHandle {
    agent: RwLock<AgentLoop>,
    checkpointer: Arc<Checkpointer>,
    reconfiguring: AtomicBool,
}

impl AgentHandle {
    pub fn new(agent: AgentLoop) -> Self {
        Self::with_checkpointer(agent, Arc::new(Checkpointer::new()))
    }

    pub fn with_checkpointer(agent: AgentLoop, checkpointer: Arc<Checkpointer>) -> Self {
        Self {
            agent: RwLock::new(agent),
            checkpointer,
            reconfiguring: AtomicBool::new(false),
        }
    }

    /// Run one user turn on a thread.
    ///
    /// Same-thread requests queue behind each other; a request arriving
    /// mid-swap is turned away with [`AgentError::Reconfiguring`].
    pub async fn submit(
        &self,
        thread_id: &ThreadId,
        text: &str,
        image: Option<ImagePayload>,
    ) -> Result<Reply> {
        if self.is_reconfiguring() {
            return Err(AgentError::Reconfiguring);
        }

        let agent = self.agent.read().await;
        let mut state = self.checkpointer.lock(thread_id).await;

        state.apply_image(image);
        match agent.respond(&mut state, text).await {
            Ok(message) => Ok(Reply {
                message,
                model: agent.config().tool_model.to_string(),
            }),
            Err(e) => {
                tracing::warn!(thread_id = %thread_id, code = e.code(), error = %e, "Request failed");
                Err(e)
            }
        }
    }

    /// Install a new agent once in-flight requests have finished
    pub async fn swap(&self, next: AgentLoop) {
        self.reconfiguring.store(true, Ordering::SeqCst);
        {
            let mut agent = self.agent.write().await;
            tracing::info!(
                tool_model = %next.config().tool_model,
                vision_model = %next.config().vision_model,
                "Swapping agent"
            );
            *agent = next;
        }
        self.reconfiguring.store(false, Ordering::SeqCst);
    }

    /// Build from `config`, run `persist`, then swap.
    ///
    /// `persist` is only polled once the build succeeded; if either step
    /// fails the current agent stays in place.
    pub async fn reconfigure(
        &self,
        factory: &dyn AgentFactory,
        config: &AgentConfig,
        persist: impl Future<Output = Result<()>>,
    ) -> Result<()> {
        let next = factory.build(config).map_err(|e| {
            tracing::error!(error = %e, "Agent rebuild failed, keeping previous instance");
            e
        })?;
        persist.await.map_err(|e| {
            tracing::error!(error = %e, "Saving configuration failed, keeping previous instance");
            e
        })?;
        self.swap(next).await;
        Ok(())
    }

    /// Configuration of the active agent
    pub async fn config(&self) -> AgentConfig {
        self.agent.read().await.config().clone()
    }

    pub async fn tool_names(&self) -> Vec<String> {
        self.agent.read().await.tool_names()
    }

    /// Tool model identifier of the active agent
    pub async fn model(&self) -> String {
        self.agent.read().await.config().tool_model.to_string()
    }

    /// Ask the active agent's backend whether it is up
    pub async fn health_check(&self) -> Result<bool> {
        let agent = self.agent.read().await;
        agent.gateway().health_check().await
    }

    pub fn is_reconfiguring(&self) -> bool {
        self.reconfiguring.load(Ordering::SeqCst)
    }

    pub const fn checkpointer(&self) -> &Arc<Checkpointer> {
        &self.checkpointer
    }
}

impl std::fmt::Debug for AgentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentHandle")
            .field("threads", &self.checkpointer.len())
            .field("reconfiguring", &self.is_reconfiguring())
            .finish_non_exhaustive()
    }
}
