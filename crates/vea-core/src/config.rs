//! Agent Configuration
//!
//! Which models the agent talks to and which tool groups it may use.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::ToolRegistry;

/// Model identifier in `provider:name` form.
///
/// Only the first `:` separates the provider, so `ollama:gemma3:4b` is the
/// `gemma3:4b` model served by `ollama`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModelId {
    provider: String,
    name: String,
}

impl ModelId {
    pub fn new(provider: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let provider = provider.into();
        let name = name.into();
        if provider.trim().is_empty() || name.trim().is_empty() {
            return Err(AgentError::Config(format!(
                "model id needs both provider and name, got '{provider}:{name}'"
            )));
        }
        Ok(Self { provider, name })
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Same provider, different model name
    pub fn with_name(&self, name: impl Into<String>) -> Result<Self> {
        Self::new(self.provider.clone(), name)
    }
}

impl FromStr for ModelId {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        let (provider, name) = s
            .split_once(':')
            .ok_or_else(|| AgentError::Config(format!("model id '{s}' is not in provider:name form")))?;
        Self::new(provider, name)
    }
}

impl TryFrom<String> for ModelId {
    type Error = AgentError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<ModelId> for String {
    fn from(id: ModelId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.name)
    }
}

/// Models and tool groups for one agent instance.
///
/// Immutable once an agent is built from it; changing it means building a
/// new agent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub tool_model: ModelId,
    pub vision_model: ModelId,

    /// Tool group flags keyed by tool category; a missing flag means enabled
    #[serde(default)]
    pub tools: BTreeMap<String, bool>,
}

/// Tool groups known to the default catalog
pub const TOOL_GROUPS: [&str; 4] = ["web_search", "weather", "math", "time"];

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tool_model: ModelId {
                provider: "ollama".into(),
                name: "cogito:8b".into(),
            },
            vision_model: ModelId {
                provider: "ollama".into(),
                name: "gemma3:4b".into(),
            },
            tools: TOOL_GROUPS.iter().map(|g| ((*g).to_string(), true)).collect(),
        }
    }
}

impl AgentConfig {
    pub fn new(tool_model: &str, vision_model: &str) -> Result<Self> {
        Ok(Self {
            tool_model: tool_model.parse()?,
            vision_model: vision_model.parse()?,
            tools: BTreeMap::new(),
        })
    }

    #[must_use]
    pub fn with_tool_flag(mut self, group: impl Into<String>, enabled: bool) -> Self {
        self.tools.insert(group.into(), enabled);
        self
    }

    pub fn is_group_enabled(&self, group: &str) -> bool {
        self.tools.get(group).copied().unwrap_or(true)
    }

    /// Names of catalog tools whose group is enabled, in catalog order.
    /// Tools without a category are always enabled.
    pub fn enabled_tools(&self, catalog: &ToolRegistry) -> Vec<String> {
        catalog
            .schemas()
            .into_iter()
            .filter(|schema| {
                schema
                    .category
                    .as_deref()
                    .is_none_or(|group| self.is_group_enabled(group))
            })
            .map(|schema| schema.name)
            .collect()
    }

    /// New config with replaced model names (providers kept) and merged tool flags
    pub fn updated(
        &self,
        tool_model_name: &str,
        vision_model_name: &str,
        tool_flags: Option<&BTreeMap<String, bool>>,
    ) -> Result<Self> {
        let mut tools = self.tools.clone();
        if let Some(flags) = tool_flags {
            tools.extend(flags.iter().map(|(k, v)| (k.clone(), *v)));
        }
        Ok(Self {
            tool_model: self.tool_model.with_name(tool_model_name)?,
            vision_model: self.vision_model.with_name(vision_model_name)?,
            tools,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::EchoTool;

    #[test]
    fn test_model_id_splits_on_first_colon() {
        let id: ModelId = "ollama:gemma3:4b".parse().unwrap();
        assert_eq!(id.provider(), "ollama");
        assert_eq!(id.name(), "gemma3:4b");
        assert_eq!(id.to_string(), "ollama:gemma3:4b");
    }

    #[test]
    fn test_model_id_rejects_bare_name() {
        assert!(matches!("llama3".parse::<ModelId>(), Err(AgentError::Config(_))));
        assert!("ollama:".parse::<ModelId>().is_err());
    }

    #[test]
    fn test_model_id_serde_as_string() {
        let id: ModelId = serde_json::from_str(r#""ollama:cogito:8b""#).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""ollama:cogito:8b""#);
    }

    #[test]
    fn test_enabled_tools_follow_group_flags() {
        let mut catalog = ToolRegistry::new();
        catalog.register(EchoTool::in_group("tavily_search", "web_search")).unwrap();
        catalog.register(EchoTool::in_group("basic_calculator", "math")).unwrap();
        catalog.register(EchoTool::in_group("trig_functions", "math")).unwrap();
        catalog.register(EchoTool::named("uncategorized")).unwrap();

        let config = AgentConfig::default().with_tool_flag("math", false);
        assert_eq!(
            config.enabled_tools(&catalog),
            vec!["tavily_search", "uncategorized"]
        );
    }

    #[test]
    fn test_updated_keeps_providers() {
        let config = AgentConfig::default();
        let flags = BTreeMap::from([("weather".to_string(), false)]);
        let next = config.updated("qwen3:8b", "llava:7b", Some(&flags)).unwrap();

        assert_eq!(next.tool_model.to_string(), "ollama:qwen3:8b");
        assert_eq!(next.vision_model.to_string(), "ollama:llava:7b");
        assert!(!next.is_group_enabled("weather"));
        assert!(next.is_group_enabled("math"));
    }
}
