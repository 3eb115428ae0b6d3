//! Ollama Model Gateway
//!
//! Implementation of `ModelGateway` and `ModelInventory` for local Ollama
//! inference. Chat goes straight to `/api/chat` so native tool calls and
//! images can be sent; model listing uses the `ollama-rs` client.

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use ollama_rs::Ollama;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vea_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{GenerationOptions, ModelCatalog, ModelGateway, ModelInventory, ModelResponse},
    session::ImagePayload,
    tool::{ToolArguments, ToolCall, ToolSchema},
};

const VISION_SYSTEM_PROMPT: &str = "You are a helpful and knowledgeable Vision LLM assistant. \
Analyze the provided image and use both visual and textual reasoning to accurately and concisely \
respond to the user's query. If the question is unclear or requires more context, ask clarifying questions.";

/// Ollama connection settings
#[derive(Clone, Debug)]
pub struct OllamaConfig {
    /// Ollama host URL
    pub host: String,

    /// Ollama port
    pub port: u16,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost".into(),
            port: 11434,
            timeout_secs: 120,
        }
    }
}

impl OllamaConfig {
    pub fn from_env() -> Self {
        let host = std::env::var("OLLAMA_HOST").unwrap_or_else(|_| "http://localhost".into());
        let port = std::env::var("OLLAMA_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(11434);

        Self {
            host,
            port,
            ..Default::default()
        }
    }

    /// `host:port` with any trailing slash removed
    pub fn base_url(&self) -> String {
        format!("{}:{}", self.host.trim_end_matches('/'), self.port)
    }

    fn validate(&self) -> Result<()> {
        Url::parse(&self.base_url())
            .map(|_| ())
            .map_err(|e| AgentError::Config(format!("invalid Ollama host '{}': {e}", self.host)))
    }

    fn http_client(&self) -> Result<Client> {
        self.validate()?;
        Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))
    }

    fn native_client(&self) -> Ollama {
        Ollama::new(self.host.trim_end_matches('/'), self.port)
    }
}

// ---- /api/chat wire format ----

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<WireTool>,
    stream: bool,
    options: WireOptions,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(default)]
    content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    images: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    tool_calls: Vec<WireToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    function: WireFunction,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    kind: &'static str,
    function: WireToolSpec,
}

#[derive(Debug, Serialize)]
struct WireToolSpec {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize)]
struct WireOptions {
    temperature: f32,
    top_p: f32,
    num_predict: u32,
}

impl From<&GenerationOptions> for WireOptions {
    fn from(opts: &GenerationOptions) -> Self {
        Self {
            temperature: opts.temperature,
            top_p: opts.top_p,
            num_predict: opts.max_tokens,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: WireMessage,
    #[serde(default)]
    prompt_eval_count: Option<u64>,
    #[serde(default)]
    eval_count: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ShowRequest<'a> {
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct ShowResponse {
    #[serde(default)]
    capabilities: Vec<String>,
}

/// Shared request plumbing for the gateway and the inventory
#[derive(Clone, Debug)]
struct OllamaHttp {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl OllamaHttp {
    fn new(config: &OllamaConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            base_url: config.base_url(),
            timeout: Duration::from_secs(config.timeout_secs),
        })
    }

    async fn post<B: Serialize + Sync, T: DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let url = format!("{}{path}", self.base_url);

        let response = self.client.post(&url).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::timeout(format!("Ollama {path}"), self.timeout)
            } else {
                AgentError::ModelUnavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_server_error() || status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ModelUnavailable(format!("Ollama returned {status}: {body}")));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Provider(format!("Ollama rejected request ({status}): {body}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| AgentError::Provider(format!("malformed Ollama response: {e}")))
    }
}

/// Ollama model gateway, bound to one tool-calling model
pub struct OllamaGateway {
    http: OllamaHttp,
    native: Ollama,
    model: String,
    options: GenerationOptions,
}

impl OllamaGateway {
    pub fn new(config: &OllamaConfig, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            http: OllamaHttp::new(config)?,
            native: config.native_client(),
            model: model.into(),
            options: GenerationOptions::default(),
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Convert agent messages to Ollama chat messages
    fn convert_messages(messages: &[Message]) -> Vec<WireMessage> {
        messages
            .iter()
            .map(|m| WireMessage {
                role: m.role.to_string(),
                content: m.content.clone(),
                tool_calls: m
                    .tool_calls
                    .iter()
                    .map(|call| WireToolCall {
                        function: WireFunction {
                            name: call.name.clone(),
                            arguments: Value::Object(call.arguments.clone()),
                        },
                    })
                    .collect(),
                tool_name: match m.role {
                    Role::Tool => m.name.clone(),
                    _ => None,
                },
                ..WireMessage::default()
            })
            .collect()
    }

    fn convert_tools(tools: &[ToolSchema]) -> Vec<WireTool> {
        tools
            .iter()
            .map(|schema| WireTool {
                kind: "function",
                function: WireToolSpec {
                    name: schema.name.clone(),
                    description: schema.description.clone(),
                    parameters: schema.to_json_schema(),
                },
            })
            .collect()
    }

    /// Arguments arrive as an object, or as a JSON-encoded string from some models
    fn parse_arguments(tool: &str, raw: Value) -> Result<ToolArguments> {
        match raw {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(ToolArguments::new()),
            Value::String(text) if text.trim().is_empty() => Ok(ToolArguments::new()),
            Value::String(text) => serde_json::from_str(&text).map_err(|e| {
                AgentError::Provider(format!("arguments for '{tool}' are not a JSON object: {e}"))
            }),
            other => Err(AgentError::Provider(format!(
                "arguments for '{tool}' are not a JSON object: {other}"
            ))),
        }
    }

    fn convert_response(response: ChatResponse) -> Result<ModelResponse> {
        let message = response.message;
        if message.tool_calls.is_empty() {
            return Ok(ModelResponse::FinalAnswer(message.content));
        }

        let calls = message
            .tool_calls
            .into_iter()
            .map(|tc| {
                let arguments = Self::parse_arguments(&tc.function.name, tc.function.arguments)?;
                Ok(ToolCall::new(tc.function.name, arguments))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ModelResponse::ToolCallRequested {
            content: message.content,
            calls,
        })
    }
}

#[async_trait]
impl ModelGateway for OllamaGateway {
    async fn generate(&self, messages: &[Message], tools: &[ToolSchema]) -> Result<ModelResponse> {
        let request = ChatRequest {
            model: &self.model,
            messages: Self::convert_messages(messages),
            tools: Self::convert_tools(tools),
            stream: false,
            options: WireOptions::from(&self.options),
        };

        let response: ChatResponse = self.http.post("/api/chat", &request).await?;
        tracing::debug!(
            model = %self.model,
            prompt_tokens = response.prompt_eval_count.unwrap_or(0),
            completion_tokens = response.eval_count.unwrap_or(0),
            tool_calls = response.message.tool_calls.len(),
            "Ollama chat complete"
        );

        Self::convert_response(response)
    }

    async fn generate_vision(&self, query: &str, image: &ImagePayload, vision_model: &str) -> Result<String> {
        let request = ChatRequest {
            model: vision_model,
            messages: vec![
                WireMessage {
                    role: Role::System.to_string(),
                    content: VISION_SYSTEM_PROMPT.into(),
                    ..WireMessage::default()
                },
                WireMessage {
                    role: Role::User.to_string(),
                    content: query.into(),
                    images: vec![image.to_base64()],
                    ..WireMessage::default()
                },
            ],
            tools: Vec::new(),
            stream: false,
            options: WireOptions::from(&self.options),
        };

        let response: ChatResponse = self.http.post("/api/chat", &request).await?;
        tracing::debug!(model = %vision_model, "Ollama vision complete");
        Ok(response.message.content)
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<bool> {
        match self.native.list_local_models().await {
            Ok(_) => Ok(true),
            Err(e) => {
                tracing::warn!("Ollama health check failed: {}", e);
                Ok(false)
            }
        }
    }
}

/// Lists installed Ollama models and sorts them by capability
pub struct OllamaInventory {
    http: OllamaHttp,
    native: Ollama,
}

impl OllamaInventory {
    pub fn new(config: &OllamaConfig) -> Result<Self> {
        Ok(Self {
            http: OllamaHttp::new(config)?,
            native: config.native_client(),
        })
    }

    async fn capabilities(&self, model: &str) -> Result<Vec<String>> {
        let info: ShowResponse = self.http.post("/api/show", &ShowRequest { model }).await?;
        Ok(info.capabilities)
    }
}

#[async_trait]
impl ModelInventory for OllamaInventory {
    async fn list_models(&self) -> Result<ModelCatalog> {
        let models = self
            .native
            .list_local_models()
            .await
            .map_err(|e| AgentError::ModelUnavailable(e.to_string()))?;

        let names: Vec<String> = models.into_iter().map(|m| m.name).collect();
        let probes = join_all(names.iter().map(|name| self.capabilities(name))).await;

        let mut catalog = ModelCatalog::default();
        for (name, caps) in names.into_iter().zip(probes) {
            let caps = caps?;
            if caps.iter().any(|c| c == "tools") {
                catalog.tool_capable.push(name.clone());
            }
            if caps.iter().any(|c| c == "vision") {
                catalog.vision_capable.push(name);
            }
        }

        tracing::debug!(
            tool = catalog.tool_capable.len(),
            vision = catalog.vision_capable.len(),
            "Listed Ollama models"
        );
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use vea_core::tool::{ParamType, ParameterSchema, ToolResult};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> OllamaConfig {
        let addr = server.address();
        OllamaConfig {
            host: format!("http://{}", addr.ip()),
            port: addr.port(),
            timeout_secs: 5,
        }
    }

    async fn mock_chat(response_body: Value) -> (MockServer, OllamaGateway) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config_for(&server), "cogito:8b").unwrap();
        (server, gateway)
    }

    fn weather_schema() -> ToolSchema {
        ToolSchema {
            name: "fetch_weather_data".into(),
            description: "Current weather".into(),
            parameters: vec![ParameterSchema::required("city", ParamType::String, "City")],
            category: Some("weather".into()),
        }
    }

    #[test]
    fn test_config_defaults() {
        let config = OllamaConfig::default();
        assert_eq!(config.host, "http://localhost");
        assert_eq!(config.port, 11434);
        assert_eq!(config.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_invalid_host_is_config_error() {
        let config = OllamaConfig {
            host: "not a url".into(),
            ..OllamaConfig::default()
        };
        assert!(matches!(OllamaGateway::new(&config, "m"), Err(AgentError::Config(_))));
    }

    #[test]
    fn test_message_conversion_keeps_tool_exchange() {
        let call = ToolCall::new("fetch_weather_data", serde_json::Map::new()).with_id("c1");
        let messages = vec![
            Message::system("You are Vea."),
            Message::user("Weather?"),
            Message::assistant_with_tool_calls("", vec![call]),
            Message::tool(&ToolResult::success("fetch_weather_data", "sunny").with_id("c1")),
        ];

        let wire = serde_json::to_value(OllamaGateway::convert_messages(&messages)).unwrap();
        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[2]["tool_calls"][0]["function"]["name"], "fetch_weather_data");
        assert_eq!(wire[3]["role"], "tool");
        assert_eq!(wire[3]["tool_name"], "fetch_weather_data");
        assert!(wire[1].get("tool_calls").is_none());
    }

    #[tokio::test]
    async fn test_generate_final_answer() {
        let (_server, gateway) = mock_chat(json!({
            "model": "cogito:8b",
            "message": {"role": "assistant", "content": "Hello! How can I help?"},
            "done": true,
            "prompt_eval_count": 12,
            "eval_count": 7
        }))
        .await;

        let response = gateway.generate(&[Message::user("Hi")], &[]).await.unwrap();
        assert_eq!(response, ModelResponse::FinalAnswer("Hello! How can I help?".into()));
    }

    #[tokio::test]
    async fn test_generate_tool_calls_with_string_arguments() {
        let (_server, gateway) = mock_chat(json!({
            "model": "cogito:8b",
            "message": {
                "role": "assistant",
                "content": "",
                "tool_calls": [
                    {"function": {"name": "fetch_weather_data", "arguments": {"city": "Paris"}}},
                    {"function": {"name": "fetch_weather_data", "arguments": "{\"city\": \"Tokyo\"}"}}
                ]
            },
            "done": true
        }))
        .await;

        let response = gateway
            .generate(&[Message::user("Paris and Tokyo?")], &[weather_schema()])
            .await
            .unwrap();

        let ModelResponse::ToolCallRequested { calls, .. } = response else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].str_arg("city"), Some("Paris"));
        assert_eq!(calls[1].str_arg("city"), Some("Tokyo"));
        assert_ne!(calls[0].id, calls[1].id);
    }

    #[tokio::test]
    async fn test_generate_sends_tools_and_options() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "cogito:8b",
                "stream": false,
                "tools": [{"type": "function", "function": {"name": "fetch_weather_data"}}],
                "options": {"temperature": 0.0, "num_predict": 512}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "ok"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let options = GenerationOptions {
            temperature: 0.0,
            max_tokens: 512,
            ..GenerationOptions::default()
        };
        let gateway = OllamaGateway::new(&config_for(&server), "cogito:8b")
            .unwrap()
            .with_options(options);
        gateway
            .generate(&[Message::user("hi")], &[weather_schema()])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_vision_request_carries_image() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "gemma3:4b",
                "messages": [
                    {"role": "system"},
                    {"role": "user", "content": "What does this say?", "images": ["aGVsbG8="]}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "message": {"role": "assistant", "content": "It says hello."}
            })))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config_for(&server), "cogito:8b").unwrap();
        let image = ImagePayload::new(b"hello".to_vec(), "image/png");
        let answer = gateway
            .generate_vision("What does this say?", &image, "gemma3:4b")
            .await
            .unwrap();
        assert_eq!(answer, "It says hello.");
    }

    #[tokio::test]
    async fn test_server_error_is_model_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let gateway = OllamaGateway::new(&config_for(&server), "cogito:8b").unwrap();
        let err = gateway.generate(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::ModelUnavailable(_)));
    }

    #[tokio::test]
    async fn test_bad_request_and_garbage_are_provider_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(400).set_body_string("bad model"))
            .mount(&server)
            .await;
        let gateway = OllamaGateway::new(&config_for(&server), "cogito:8b").unwrap();
        assert!(matches!(
            gateway.generate(&[Message::user("hi")], &[]).await,
            Err(AgentError::Provider(_))
        ));

        let (_server, gateway) = mock_chat(json!({"unexpected": true})).await;
        assert!(matches!(
            gateway.generate(&[Message::user("hi")], &[]).await,
            Err(AgentError::Provider(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_model_unavailable() {
        let config = OllamaConfig {
            host: "http://127.0.0.1".into(),
            port: 1,
            timeout_secs: 2,
        };
        let gateway = OllamaGateway::new(&config, "cogito:8b").unwrap();
        let err = gateway.generate(&[Message::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, AgentError::ModelUnavailable(_)));
        assert!(!gateway.health_check().await.unwrap());
    }

    fn local_model(name: &str) -> Value {
        json!({
            "name": name,
            "model": name,
            "modified_at": "2025-05-01T10:00:00.000000000+00:00",
            "size": 4_920_753_328_u64,
            "digest": "0a8c26691023",
            "details": {
                "parent_model": "",
                "format": "gguf",
                "family": "llama",
                "families": ["llama"],
                "parameter_size": "8.0B",
                "quantization_level": "Q4_K_M"
            }
        })
    }

    #[tokio::test]
    async fn test_inventory_groups_models_by_capability() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "models": [local_model("cogito:8b"), local_model("gemma3:4b"), local_model("llava:7b")]
            })))
            .mount(&server)
            .await;

        for (model, caps) in [
            ("cogito:8b", json!(["completion", "tools"])),
            ("gemma3:4b", json!(["completion", "tools", "vision"])),
            ("llava:7b", json!(["completion", "vision"])),
        ] {
            Mock::given(method("POST"))
                .and(path("/api/show"))
                .and(body_partial_json(json!({"model": model})))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({"capabilities": caps})))
                .mount(&server)
                .await;
        }

        let inventory = OllamaInventory::new(&config_for(&server)).unwrap();
        let catalog = inventory.list_models().await.unwrap();

        assert_eq!(catalog.tool_capable, vec!["cogito:8b", "gemma3:4b"]);
        assert_eq!(catalog.vision_capable, vec!["gemma3:4b", "llava:7b"]);
    }
}
