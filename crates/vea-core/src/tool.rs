//! Tool System
//!
//! Extensible tool framework for agent capabilities.
//! Tools are registered once at startup, narrowed to the configured subset,
//! and invoked by the agent loop when the model asks for them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// Arguments of a tool call, keyed by parameter name
pub type ToolArguments = serde_json::Map<String, Value>;

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, unique within a conversation
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as key-value pairs
    #[serde(default)]
    pub arguments: ToolArguments,
}

impl ToolCall {
    /// Create a call with a freshly generated id
    pub fn new(name: impl Into<String>, arguments: ToolArguments) -> Self {
        Self {
            id: format!("call_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Look up an argument, treating an explicit `null` as absent
    pub fn arg(&self, name: &str) -> Option<&Value> {
        self.arguments.get(name).filter(|v| !v.is_null())
    }

    pub fn str_arg(&self, name: &str) -> Option<&str> {
        self.arg(name).and_then(Value::as_str)
    }

    pub fn f64_arg(&self, name: &str) -> Option<f64> {
        self.arg(name).and_then(Value::as_f64)
    }
}

/// Result from tool execution
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool that was called
    pub name: String,

    /// Call id this result answers
    pub id: String,

    /// Whether execution succeeded
    pub success: bool,

    /// Output (success message or error)
    pub output: String,

    /// Structured data (if applicable)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ToolResult {
    pub fn success(name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: true,
            output: output.into(),
            data: None,
        }
    }

    pub fn failure(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: String::new(),
            success: false,
            output: error.into(),
            data: None,
        }
    }

    /// Successful result whose output is the JSON rendering of `data`
    pub fn json(name: impl Into<String>, data: Value) -> Self {
        Self::success(name, data.to_string()).with_data(data)
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Text placed in the tool message shown to the model
    pub fn to_message_content(&self) -> String {
        if self.success {
            self.output.clone()
        } else {
            format!("Error: {}", self.output)
        }
    }
}

/// JSON Schema type of a tool parameter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Number,
    Integer,
    Boolean,
    Object,
    Array,
}

impl ParamType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Boolean => value.is_boolean(),
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type
    #[serde(rename = "type")]
    pub param_type: ParamType,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,

    /// Default value if not provided
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// Enum of allowed values
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
}

impl ParameterSchema {
    pub fn required(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
            enum_values: None,
        }
    }

    pub fn optional(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, param_type, description)
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = Some(values.into_iter().map(|v| Value::String(v.into())).collect());
        self
    }

    /// Check one argument value against this parameter
    fn check(&self, tool: &str, value: &Value) -> Result<()> {
        if !self.param_type.matches(value) {
            return Err(AgentError::InvalidToolArguments {
                tool: tool.to_string(),
                field: self.name.clone(),
                reason: format!(
                    "expected {}, got {}",
                    self.param_type.as_str(),
                    json_type_name(value)
                ),
            });
        }

        if let Some(allowed) = &self.enum_values {
            if !allowed.contains(value) {
                return Err(AgentError::InvalidToolArguments {
                    tool: tool.to_string(),
                    field: self.name.clone(),
                    reason: format!("must be one of {}", Value::Array(allowed.clone())),
                });
            }
        }

        Ok(())
    }
}

/// Tool definition schema (for LLM function calling)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,

    /// Configuration group this tool is toggled by (e.g. "math")
    #[serde(default)]
    pub category: Option<String>,
}

impl ToolSchema {
    /// Render the parameters as a JSON Schema object
    pub fn to_json_schema(&self) -> Value {
        let mut properties = serde_json::Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let mut prop = serde_json::Map::new();
            prop.insert("type".into(), Value::String(param.param_type.as_str().into()));
            prop.insert("description".into(), Value::String(param.description.clone()));
            if let Some(values) = &param.enum_values {
                prop.insert("enum".into(), Value::Array(values.clone()));
            }
            if let Some(default) = &param.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(param.name.clone(), Value::Object(prop));

            if param.required {
                required.push(Value::String(param.name.clone()));
            }
        }

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Validate call arguments against this schema.
    ///
    /// `null` counts as absent; arguments the schema does not declare are ignored.
    pub fn validate(&self, call: &ToolCall) -> Result<()> {
        for param in &self.parameters {
            match call.arg(&param.name) {
                Some(value) => param.check(&self.name, value)?,
                None if param.required => {
                    return Err(AgentError::InvalidToolArguments {
                        tool: self.name.clone(),
                        field: param.name.clone(),
                        reason: "is required".into(),
                    });
                }
                None => {}
            }
        }
        Ok(())
    }
}

/// Tool trait - implement to add new capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool with validated arguments.
    ///
    /// An `Err` here is a tool-local failure; the registry turns it into a
    /// failed [`ToolResult`] so the model can see it.
    async fn execute(&self, call: &ToolCall) -> Result<ToolResult>;
}

/// A registered tool: its schema, captured once, and the implementation
#[derive(Clone)]
pub struct ToolDescriptor {
    schema: ToolSchema,
    tool: Arc<dyn Tool>,
}

impl ToolDescriptor {
    pub fn new(tool: Arc<dyn Tool>) -> Self {
        Self {
            schema: tool.schema(),
            tool,
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub const fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    /// Validate, then execute. Schema violations are returned as errors;
    /// failures inside the tool come back as a failed result.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult> {
        self.schema.validate(call)?;

        let result = match self.tool.execute(call).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(tool = %call.name, call_id = %call.id, error = %e, "Tool failed");
                ToolResult::failure(&call.name, e.to_string())
            }
        };

        Ok(result.with_id(call.id.clone()))
    }
}

impl std::fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.schema.name)
            .finish_non_exhaustive()
    }
}

/// Registry for available tools, in declaration order
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let descriptor = ToolDescriptor::new(tool);
        let name = descriptor.name().to_string();
        if self.index.contains_key(&name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.index.insert(name, self.tools.len());
        self.tools.push(descriptor);
        Ok(())
    }

    /// Get a tool by name
    pub fn resolve(&self, name: &str) -> Result<&ToolDescriptor> {
        self.index
            .get(name)
            .map(|&i| &self.tools[i])
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    /// Registry holding only the enabled tools, kept in declaration order
    pub fn build<S: AsRef<str>>(&self, enabled: &[S]) -> Result<Self> {
        for name in enabled {
            self.resolve(name.as_ref())?;
        }

        let mut subset = Self::new();
        for descriptor in &self.tools {
            if enabled.iter().any(|n| n.as_ref() == descriptor.name()) {
                subset.index.insert(descriptor.name().to_string(), subset.tools.len());
                subset.tools.push(descriptor.clone());
            }
        }
        Ok(subset)
    }

    /// Execute a tool call
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult> {
        self.resolve(&call.name)?.invoke(call).await
    }

    /// Get all tool schemas, in declaration order
    pub fn schemas(&self) -> Vec<ToolSchema> {
        self.tools.iter().map(|t| t.schema().clone()).collect()
    }

    /// Get tool names
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(ToolDescriptor::name).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}
