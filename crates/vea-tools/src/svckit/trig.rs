//! Trigonometric Functions Tool

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use vea_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::{ParamType, ParameterSchema},
};

use super::{choice_arg, number_arg};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrigOperation {
    Sin,
    Cos,
    Tan,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AngleMode {
    Radians,
    #[default]
    Degrees,
}

impl TrigOperation {
    pub fn apply(self, x: f64, mode: AngleMode) -> f64 {
        let radians = match mode {
            AngleMode::Degrees => x.to_radians(),
            AngleMode::Radians => x,
        };
        match self {
            Self::Sin => radians.sin(),
            Self::Cos => radians.cos(),
            Self::Tan => radians.tan(),
        }
    }
}

pub struct TrigFunctionsTool;

impl TrigFunctionsTool {
    pub const NAME: &'static str = "trig_functions";
}

#[async_trait]
impl Tool for TrigFunctionsTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Perform trigonometric functions: sine, cosine, and tangent.".into(),
            parameters: vec![
                ParameterSchema::required("x", ParamType::Number, "Angle"),
                ParameterSchema::required("operation", ParamType::String, "Function to apply")
                    .with_enum(["sin", "cos", "tan"]),
                ParameterSchema::optional("mode", ParamType::String, "Unit of x")
                    .with_enum(["radians", "degrees"])
                    .with_default(json!("degrees")),
            ],
            category: Some("math".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let x = number_arg(call, "x")?;
        let operation: TrigOperation = choice_arg(call, "operation", None)?;
        let mode = choice_arg(call, "mode", Some(AngleMode::default()))?;

        Ok(ToolResult::json(Self::NAME, Value::from(operation.apply(x, mode))))
    }
}
