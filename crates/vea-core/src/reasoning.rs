//! Reasoning Loop
//!
//! Tool-calling agent loop. Each request moves through a small state machine:
//!
//! ```text
//!   pending image? ──yes──> VisionShortCircuit ──────────────┐
//!        │ no                                                 v
//!   AwaitModel ──FinalAnswer──────────────────────────────> Done
//!        │ ToolCallRequested                                  ^
//!        v                                                    │
//!   ExecuteTools ──results appended──> AwaitModel ────────────┘
//! ```
//!
//! Messages produced while answering are staged and committed to the
//! conversation only once the loop reaches `Done`.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use futures::future::join_all;

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::message::{Message, last_user_text, verify_tool_pairing};
use crate::provider::{ModelGateway, ModelResponse};
use crate::session::{ConversationState, ImagePayload};
use crate::tool::{ToolCall, ToolDescriptor, ToolRegistry, ToolResult};

/// Agent loop settings
#[derive(Clone, Debug)]
pub struct LoopConfig {
    /// Persona placed at the top of every system prompt
    pub persona_prompt: String,

    /// Tool rounds allowed per request
    pub max_tool_rounds: usize,

    /// Deadline for one model call
    pub model_timeout: Duration,

    /// Deadline for one tool call
    pub tool_timeout: Duration,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            persona_prompt: DEFAULT_PERSONA.into(),
            max_tool_rounds: 10,
            model_timeout: Duration::from_secs(120),
            tool_timeout: Duration::from_secs(30),
        }
    }
}

pub const DEFAULT_PERSONA: &str = "You are Vea, a friendly and knowledgeable AI assistant. \
Respond in a warm, approachable, and helpful manner. Always provide clear, accurate, and \
thoughtfully presented answers. Use markdown formatting when it improves clarity, structure, \
or readability. Whenever the user asks about current events, recent scientific developments, \
or other time-sensitive topics (e.g., stock prices or market trends), use the web search tool \
to retrieve the most up-to-date information before replying.";

enum Step {
    AwaitModel,
    ExecuteTools(Vec<ToolCall>),
    VisionShortCircuit(ImagePayload),
    Done(String),
}

/// The agent: one gateway, one enabled tool set, one configuration
pub struct AgentLoop {
    gateway: Arc<dyn ModelGateway>,
    tools: Arc<ToolRegistry>,
    agent_config: AgentConfig,
    config: LoopConfig,
}

impl AgentLoop {
    pub fn new(
        gateway: Arc<dyn ModelGateway>,
        tools: Arc<ToolRegistry>,
        agent_config: AgentConfig,
        config: LoopConfig,
    ) -> Self {
        Self {
            gateway,
            tools,
            agent_config,
            config,
        }
    }

    pub fn builder() -> AgentLoopBuilder {
        AgentLoopBuilder::new()
    }

    /// Persona plus the current local date and time; rebuilt every turn
    fn system_prompt(&self) -> Message {
        let now = Local::now().format("%Y-%m-%d %H:%M:%S");
        Message::system(format!("{}\nToday's date is {now}", self.config.persona_prompt))
    }

    /// Answer one user turn on `state`.
    ///
    /// On error nothing is appended to the stored transcript.
    pub async fn respond(&self, state: &mut ConversationState, user_text: &str) -> Result<String> {
        let thread_id = state.thread_id.clone();
        let mut staged = vec![Message::user(user_text)];
        let mut rounds = 0usize;

        let mut step = match state.take_pending_image() {
            Some(image) => Step::VisionShortCircuit(image),
            None => Step::AwaitModel,
        };

        loop {
            step = match step {
                Step::VisionShortCircuit(image) => {
                    let query = match last_user_text(&staged).or_else(|| state.conversation().last_user_text()) {
                        Some(text) => text.to_string(),
                        None => {
                            tracing::warn!(thread_id = %thread_id, "No user message for vision query, sending empty query");
                            String::new()
                        }
                    };
                    let vision_model = self.agent_config.vision_model.name();
                    tracing::info!(thread_id = %thread_id, model = %vision_model, "Routing to vision model");

                    let answer = tokio::time::timeout(
                        self.config.model_timeout,
                        self.gateway.generate_vision(&query, &image, vision_model),
                    )
                    .await
                    .map_err(|_| AgentError::timeout("vision model call", self.config.model_timeout))??;

                    staged.push(Message::assistant(answer.clone()).with_model(vision_model));
                    Step::Done(answer)
                }

                Step::AwaitModel => {
                    let mut transcript = Vec::with_capacity(state.message_count() + staged.len() + 1);
                    transcript.push(self.system_prompt());
                    transcript.extend(state.messages().iter().cloned());
                    transcript.extend(staged.iter().cloned());
                    verify_tool_pairing(&transcript)?;

                    let response = tokio::time::timeout(
                        self.config.model_timeout,
                        self.gateway.generate(&transcript, &self.tools.schemas()),
                    )
                    .await
                    .map_err(|_| AgentError::timeout("model call", self.config.model_timeout))??;

                    match response {
                        ModelResponse::ToolCallRequested { content, calls } if calls.is_empty() => {
                            staged.push(Message::assistant(content.clone()).with_model(self.gateway.model()));
                            Step::Done(content)
                        }
                        ModelResponse::FinalAnswer(text) => {
                            staged.push(Message::assistant(text.clone()).with_model(self.gateway.model()));
                            Step::Done(text)
                        }
                        ModelResponse::ToolCallRequested { content, calls } => {
                            if rounds >= self.config.max_tool_rounds {
                                tracing::warn!(thread_id = %thread_id, rounds, "Tool round cap reached");
                                return Err(AgentError::ToolLoopExceeded(self.config.max_tool_rounds));
                            }
                            rounds += 1;
                            tracing::debug!(thread_id = %thread_id, round = rounds, calls = calls.len(), "Model requested tools");
                            staged.push(
                                Message::assistant_with_tool_calls(content, calls.clone())
                                    .with_model(self.gateway.model()),
                            );
                            Step::ExecuteTools(calls)
                        }
                    }
                }

                Step::ExecuteTools(calls) => {
                    let results = self.execute_tools(&calls).await?;
                    staged.extend(results.iter().map(Message::tool));
                    Step::AwaitModel
                }

                Step::Done(text) => {
                    state.commit(staged);
                    tracing::info!(thread_id = %thread_id, rounds, "Request complete");
                    return Ok(text);
                }
            };
        }
    }

    /// Resolve every call, then run them concurrently. Results keep request order.
    async fn execute_tools(&self, calls: &[ToolCall]) -> Result<Vec<ToolResult>> {
        let resolved = calls
            .iter()
            .map(|call| self.tools.resolve(&call.name).map(|descriptor| (descriptor, call)))
            .collect::<Result<Vec<_>>>()?;

        join_all(resolved.into_iter().map(|(descriptor, call)| self.run_tool(descriptor, call)))
            .await
            .into_iter()
            .collect()
    }

    async fn run_tool(&self, descriptor: &ToolDescriptor, call: &ToolCall) -> Result<ToolResult> {
        tracing::debug!(tool = %call.name, call_id = %call.id, "Executing tool");

        let outcome = tokio::time::timeout(self.config.tool_timeout, descriptor.invoke(call))
            .await
            .map_err(|_| AgentError::timeout(format!("tool '{}'", call.name), self.config.tool_timeout))?;

        match outcome {
            Ok(result) => Ok(result),
            Err(e @ AgentError::InvalidToolArguments { .. }) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "Rejected tool arguments");
                Ok(ToolResult::failure(&call.name, e.to_string()).with_id(call.id.clone()))
            }
            Err(e) => Err(e),
        }
    }

    /// Models and tool groups this loop was built from
    pub const fn config(&self) -> &AgentConfig {
        &self.agent_config
    }

    pub const fn loop_config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Names of the enabled tools
    pub fn tool_names(&self) -> Vec<String> {
        self.tools.names().into_iter().map(String::from).collect()
    }

    pub fn gateway(&self) -> &Arc<dyn ModelGateway> {
        &self.gateway
    }
}

impl std::fmt::Debug for AgentLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentLoop")
            .field("model", &self.gateway.model())
            .field("tools", &self.tools.names())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`AgentLoop`]
pub struct AgentLoopBuilder {
    gateway: Option<Arc<dyn ModelGateway>>,
    tools: Arc<ToolRegistry>,
    agent_config: AgentConfig,
    config: LoopConfig,
}

impl Default for AgentLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentLoopBuilder {
    pub fn new() -> Self {
        Self {
            gateway: None,
            tools: Arc::new(ToolRegistry::new()),
            agent_config: AgentConfig::default(),
            config: LoopConfig::default(),
        }
    }

    #[must_use]
    pub fn gateway(mut self, gateway: Arc<dyn ModelGateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    #[must_use]
    pub fn tools(mut self, tools: impl Into<Arc<ToolRegistry>>) -> Self {
        self.tools = tools.into();
        self
    }

    #[must_use]
    pub fn agent_config(mut self, config: AgentConfig) -> Self {
        self.agent_config = config;
        self
    }

    #[must_use]
    pub fn loop_config(mut self, config: LoopConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn persona_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.persona_prompt = prompt.into();
        self
    }

    #[must_use]
    pub const fn max_tool_rounds(mut self, max: usize) -> Self {
        self.config.max_tool_rounds = max;
        self
    }

    #[must_use]
    pub const fn model_timeout(mut self, timeout: Duration) -> Self {
        self.config.model_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.config.tool_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<AgentLoop> {
        let gateway = self
            .gateway
            .ok_or_else(|| AgentError::Config("Model gateway is required".into()))?;

        Ok(AgentLoop::new(gateway, self.tools, self.agent_config, self.config))
    }
}
