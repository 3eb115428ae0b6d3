//! Basic Calculator Tool
//!
//! Two-operand float arithmetic.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use vea_core::{
    Result as CoreResult, Tool, ToolCall, ToolResult, ToolSchema,
    tool::{ParamType, ParameterSchema},
};

use super::{choice_arg, number_arg};
use crate::error::{Result, ToolFailure};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl Operation {
    pub const NAMES: [&'static str; 5] = ["add", "subtract", "multiply", "divide", "modulo"];

    /// Apply to `x` and `y`. Modulo takes the sign of the divisor.
    pub fn apply(self, x: f64, y: f64) -> Result<f64> {
        match self {
            Self::Add => Ok(x + y),
            Self::Subtract => Ok(x - y),
            Self::Multiply => Ok(x * y),
            Self::Divide if y == 0.0 => Err(ToolFailure::DivideByZero),
            Self::Divide => Ok(x / y),
            Self::Modulo if y == 0.0 => Err(ToolFailure::ModuloByZero),
            Self::Modulo => {
                let r = x % y;
                if r != 0.0 && (r < 0.0) != (y < 0.0) {
                    Ok(r + y)
                } else {
                    Ok(r)
                }
            }
        }
    }
}

/// Tool for basic arithmetic
pub struct BasicCalculatorTool;

impl BasicCalculatorTool {
    pub const NAME: &'static str = "basic_calculator";
}

#[async_trait]
impl Tool for BasicCalculatorTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: Self::NAME.into(),
            description: "Perform basic arithmetic operations, including addition, subtraction, multiplication, division, and modulo.".into(),
            parameters: vec![
                ParameterSchema::required("x", ParamType::Number, "First operand"),
                ParameterSchema::required("y", ParamType::Number, "Second operand"),
                ParameterSchema::required("operation", ParamType::String, "Operation to apply to x and y")
                    .with_enum(Operation::NAMES),
            ],
            category: Some("math".into()),
        }
    }

    async fn execute(&self, call: &ToolCall) -> CoreResult<ToolResult> {
        let x = number_arg(call, "x")?;
        let y = number_arg(call, "y")?;
        let operation: Operation = choice_arg(call, "operation", None)?;

        Ok(match operation.apply(x, y) {
            Ok(value) => ToolResult::json(Self::NAME, Value::from(value)),
            Err(failure) => ToolResult::failure(Self::NAME, failure.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(x: f64, y: f64, op: &str) -> ToolCall {
        let args = json!({"x": x, "y": y, "operation": op});
        ToolCall::new(BasicCalculatorTool::NAME, args.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(Operation::Add.apply(2.0, 2.0).unwrap(), 4.0);
        assert_eq!(Operation::Subtract.apply(2.0, 5.0).unwrap(), -3.0);
        assert_eq!(Operation::Multiply.apply(1.5, 4.0).unwrap(), 6.0);
        assert_eq!(Operation::Divide.apply(7.0, 2.0).unwrap(), 3.5);
    }

    #[test]
    fn test_modulo_follows_divisor_sign() {
        assert_eq!(Operation::Modulo.apply(7.0, 3.0).unwrap(), 1.0);
        assert_eq!(Operation::Modulo.apply(-7.0, 3.0).unwrap(), 2.0);
        assert_eq!(Operation::Modulo.apply(7.0, -3.0).unwrap(), -2.0);
        assert_eq!(Operation::Modulo.apply(6.0, 3.0).unwrap(), 0.0);
    }

    #[test]
    fn test_zero_divisor() {
        assert!(matches!(Operation::Divide.apply(1.0, 0.0), Err(ToolFailure::DivideByZero)));
        assert!(matches!(Operation::Modulo.apply(1.0, 0.0), Err(ToolFailure::ModuloByZero)));
    }

    #[tokio::test]
    async fn test_execute_reports_result() {
        let result = BasicCalculatorTool.execute(&call(2.0, 2.0, "add")).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "4.0");
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_failed_result() {
        let result = BasicCalculatorTool.execute(&call(1.0, 0.0, "divide")).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.output, "Cannot divide by zero.");

        let result = BasicCalculatorTool.execute(&call(1.0, 0.0, "modulo")).await.unwrap();
        assert_eq!(result.output, "Cannot perform modulo by zero.");
    }
}
