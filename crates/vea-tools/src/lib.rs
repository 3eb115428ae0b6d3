//! # vea-tools
//!
//! Built-in tools for the Vea assistant, grouped by the configuration flag
//! that enables them:
//!
//! ```text
//! web_search  tavily_search
//! math        basic_calculator, trig_functions
//! weather     fetch_weather_data
//! time        get_current_time
//! ```
//!
//! [`catalog`] registers every tool once; agents are then built from the
//! subset their configuration enables.

pub mod error;
pub mod svckit;

use std::time::Duration;

use reqwest::Client;
use vea_core::{AgentError, Result as CoreResult, ToolRegistry};

pub use error::{Result, ToolFailure};

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{
        BasicCalculatorTool, CurrentTimeTool, TavilySearchTool, TrigFunctionsTool, WeatherTool,
    };
}

use tools::{BasicCalculatorTool, CurrentTimeTool, TavilySearchTool, TrigFunctionsTool, WeatherTool};

/// API keys and endpoints for the tools that call external services
#[derive(Clone, Debug)]
pub struct ToolSettings {
    pub tavily_api_key: Option<String>,
    pub openweather_api_key: Option<String>,
    pub tavily_base_url: String,
    pub openweather_base_url: String,
    pub http_timeout: Duration,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tavily_api_key: None,
            openweather_api_key: None,
            tavily_base_url: svckit::TAVILY_BASE_URL.into(),
            openweather_base_url: svckit::OPENWEATHER_BASE_URL.into(),
            http_timeout: Duration::from_secs(20),
        }
    }
}

impl ToolSettings {
    /// Keys from `TAVILY_API_KEY` and `OPENWEATHER_API_KEY`
    pub fn from_env() -> Self {
        let key = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            tavily_api_key: key("TAVILY_API_KEY"),
            openweather_api_key: key("OPENWEATHER_API_KEY"),
            ..Self::default()
        }
    }
}

/// Every built-in tool, in declaration order
pub fn catalog(settings: &ToolSettings) -> CoreResult<ToolRegistry> {
    let client = Client::builder()
        .timeout(settings.http_timeout)
        .build()
        .map_err(|e| AgentError::Config(format!("failed to build HTTP client: {e}")))?;

    if settings.tavily_api_key.is_none() {
        tracing::warn!("TAVILY_API_KEY not set, web search will fail");
    }
    if settings.openweather_api_key.is_none() {
        tracing::warn!("OPENWEATHER_API_KEY not set, weather lookups will fail");
    }

    let mut registry = ToolRegistry::new();
    registry.register(
        TavilySearchTool::new(client.clone(), settings.tavily_api_key.clone())
            .with_base_url(&settings.tavily_base_url),
    )?;
    registry.register(BasicCalculatorTool)?;
    registry.register(TrigFunctionsTool)?;
    registry.register(
        WeatherTool::new(client, settings.openweather_api_key.clone())
            .with_base_url(&settings.openweather_base_url),
    )?;
    registry.register(CurrentTimeTool)?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vea_core::AgentConfig;

    #[test]
    fn test_catalog_order_and_groups() {
        let registry = catalog(&ToolSettings::default()).unwrap();
        assert_eq!(
            registry.names(),
            vec![
                "tavily_search",
                "basic_calculator",
                "trig_functions",
                "fetch_weather_data",
                "get_current_time"
            ]
        );

        let categories: Vec<_> = registry
            .schemas()
            .into_iter()
            .map(|s| s.category.unwrap_or_default())
            .collect();
        assert_eq!(categories, vec!["web_search", "math", "math", "weather", "time"]);
    }

    #[test]
    fn test_disabling_math_drops_both_math_tools() {
        let registry = catalog(&ToolSettings::default()).unwrap();
        let config = AgentConfig::default().with_tool_flag("math", false);
        let enabled = config.enabled_tools(&registry);
        let subset = registry.build(&enabled).unwrap();
        assert_eq!(subset.names(), vec!["tavily_search", "fetch_weather_data", "get_current_time"]);
    }

    #[tokio::test]
    async fn test_registry_rejects_bad_operation_before_running() {
        let registry = catalog(&ToolSettings::default()).unwrap();
        let args = serde_json::json!({"x": 1, "y": 2, "operation": "power"});
        let call = vea_core::ToolCall::new("basic_calculator", args.as_object().cloned().unwrap_or_default());
        assert!(matches!(
            registry.invoke(&call).await,
            Err(AgentError::InvalidToolArguments { field, .. }) if field == "operation"
        ));
    }
}
