//! Mock tools and a scripted model gateway shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Notify;

use crate::error::{AgentError, Result};
use crate::message::Message;
use crate::provider::{ModelGateway, ModelResponse};
use crate::session::ImagePayload;
use crate::tool::{ParamType, ParameterSchema, Tool, ToolArguments, ToolCall, ToolResult, ToolSchema};

pub fn args(pairs: &[(&str, Value)]) -> ToolArguments {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// Returns its `text` argument
pub struct EchoTool {
    name: String,
    category: Option<String>,
}

impl EchoTool {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.into(),
            category: None,
        }
    }

    pub fn in_group(name: &str, category: &str) -> Self {
        Self {
            name: name.into(),
            category: Some(category.into()),
        }
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: "Echo the text back".into(),
            parameters: vec![ParameterSchema::required("text", ParamType::String, "Text to echo")],
            category: self.category.clone(),
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        Ok(ToolResult::success(&self.name, call.str_arg("text").unwrap_or_default()))
    }
}

pub struct FailingTool;

#[async_trait]
impl Tool for FailingTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "always_fails".into(),
            description: "Fails every time".into(),
            parameters: vec![],
            category: None,
        }
    }

    async fn execute(&self, _call: &ToolCall) -> Result<ToolResult> {
        Err(AgentError::Other("boom".into()))
    }
}

/// Weather stand-in whose latency depends on the city
#[derive(Default)]
pub struct DelayedWeatherTool {
    delays: HashMap<String, Duration>,
    pub executions: AtomicUsize,
}

impl DelayedWeatherTool {
    pub fn with_delay(mut self, city: &str, delay: Duration) -> Self {
        self.delays.insert(city.into(), delay);
        self
    }
}

#[async_trait]
impl Tool for DelayedWeatherTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "fetch_weather_data".into(),
            description: "Weather for a city".into(),
            parameters: vec![ParameterSchema::required("city", ParamType::String, "City")],
            category: Some("weather".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        let city = call.str_arg("city").unwrap_or_default().to_string();
        if let Some(delay) = self.delays.get(&city) {
            tokio::time::sleep(*delay).await;
        }
        self.executions.fetch_add(1, Ordering::SeqCst);
        Ok(ToolResult::success("fetch_weather_data", format!("{city}: sunny")))
    }
}

pub fn weather_call(id: &str, city: &str) -> ToolCall {
    ToolCall::new("fetch_weather_data", args(&[("city", city.into())])).with_id(id)
}

/// Gateway that replays queued responses and records what it was sent.
///
/// Once the script runs dry it answers with `repeat` (fresh call ids each
/// time) or a plain "done".
#[derive(Default)]
pub struct ScriptedGateway {
    script: Mutex<VecDeque<Result<ModelResponse>>>,
    repeat: Option<ModelResponse>,
    delay: Option<Duration>,
    gate: Option<Arc<Notify>>,
    vision_answer: String,
    pub generate_calls: AtomicUsize,
    pub vision_calls: AtomicUsize,
    pub seen: Mutex<Vec<Vec<Message>>>,
    pub vision_queries: Mutex<Vec<String>>,
}

impl ScriptedGateway {
    pub fn new(script: impl IntoIterator<Item = Result<ModelResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            vision_answer: "I see a cat.".into(),
            ..Self::default()
        }
    }

    pub fn answering(text: &str) -> Self {
        Self::new([Ok(ModelResponse::FinalAnswer(text.into()))])
    }

    /// Requests the same tool call forever
    pub fn looping(call: ToolCall) -> Self {
        Self {
            repeat: Some(ModelResponse::tool_calls(vec![call])),
            ..Self::new(Vec::<Result<ModelResponse>>::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Block every generate call until the notify fires
    pub fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub fn calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Vec<Message> {
        self.seen.lock().unwrap().last().cloned().unwrap_or_default()
    }

    fn next_response(&self) -> Result<ModelResponse> {
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        match &self.repeat {
            Some(ModelResponse::ToolCallRequested { content, calls }) => Ok(ModelResponse::ToolCallRequested {
                content: content.clone(),
                calls: calls
                    .iter()
                    .map(|c| ToolCall::new(c.name.clone(), c.arguments.clone()))
                    .collect(),
            }),
            Some(other) => Ok(other.clone()),
            None => Ok(ModelResponse::FinalAnswer("done".into())),
        }
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    async fn generate(&self, messages: &[Message], _tools: &[crate::tool::ToolSchema]) -> Result<ModelResponse> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(messages.to_vec());

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.next_response()
    }

    async fn generate_vision(&self, query: &str, _image: &ImagePayload, _vision_model: &str) -> Result<String> {
        self.vision_calls.fetch_add(1, Ordering::SeqCst);
        self.vision_queries.lock().unwrap().push(query.to_string());
        Ok(self.vision_answer.clone())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
