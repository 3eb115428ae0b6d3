//! Current Time Tool

use async_trait::async_trait;
use chrono::Local;

use vea_core::{Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema};

pub struct CurrentTimeTool;

impl CurrentTimeTool {
    pub const NAME: &'static str = "get_current_time";
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";
}

#[async_trait]
impl Tool for CurrentTimeTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Get the current date and time in a standard format. Useful for answering time-related questions.".into(),
            parameters: vec![],
            category: Some("time".into()),
        }
    }

    async fn execute(&self, _call: &ToolCall) -> CoreResult<ToolResult> {
        Ok(ToolResult::success(
            Self::NAME,
            Local::now().format(Self::FORMAT).to_string(),
        ))
    }
}
