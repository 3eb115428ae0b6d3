//! Service Kit - Agent Tools
//!
//! Tools that implement `vea_core::Tool`, one per module.

mod calculator;
mod clock;
mod trig;
mod weather;
mod web_search;

pub use calculator::{BasicCalculatorTool, Operation};
pub use clock::CurrentTimeTool;
pub use trig::{AngleMode, TrigFunctionsTool, TrigOperation};
pub use weather::{OPENWEATHER_BASE_URL, Units, WeatherTool};
pub use web_search::{TAVILY_BASE_URL, TavilySearchTool};

use serde::de::DeserializeOwned;
use vea_core::{AgentError, Result as CoreResult, ToolCall};

/// Numeric argument the schema marks as required
fn number_arg(call: &ToolCall, name: &str) -> CoreResult<f64> {
    call.f64_arg(name).ok_or_else(|| AgentError::InvalidToolArguments {
        tool: call.name.clone(),
        field: name.into(),
        reason: "expected number".into(),
    })
}

/// Enum-valued argument, falling back to `default` when absent
fn choice_arg<T: DeserializeOwned>(call: &ToolCall, name: &str, default: Option<T>) -> CoreResult<T> {
    match call.arg(name) {
        Some(value) => serde_json::from_value(value.clone()).map_err(|e| AgentError::InvalidToolArguments {
            tool: call.name.clone(),
            field: name.into(),
            reason: e.to_string(),
        }),
        None => default.ok_or_else(|| AgentError::InvalidToolArguments {
            tool: call.name.clone(),
            field: name.into(),
            reason: "is required".into(),
        }),
    }
}
