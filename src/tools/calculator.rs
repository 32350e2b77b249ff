//! Arithmetic tools: calculate_sum, calculate_subtract, calculate_multiply, calculate_divide

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{object_schema, Arguments, ToolDescriptor, ToolHandler};
use crate::error::McpError;
use crate::mcp::types::ContentBlock;

/// Text returned instead of a fault when the divisor is zero
pub const DIVISION_BY_ZERO: &str = "Error: Division by zero";

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Operation {
    Sum,
    Subtract,
    Multiply,
    Divide,
}

impl Operation {
    pub const ALL: [Operation; 4] = [
        Operation::Sum,
        Operation::Subtract,
        Operation::Multiply,
        Operation::Divide,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Sum => "sum",
            Operation::Subtract => "subtract",
            Operation::Multiply => "multiply",
            Operation::Divide => "divide",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Operation::Sum => "Calculate the sum of two numbers",
            Operation::Subtract => "Subtract second number from first",
            Operation::Multiply => "Multiply two numbers",
            Operation::Divide => "Divide first number by second",
        }
    }

    pub fn tool_name(&self) -> String {
        format!("calculate_{}", self.as_str())
    }
}

impl FromStr for Operation {
    type Err = McpError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operation::ALL
            .into_iter()
            .find(|op| op.as_str() == s)
            .ok_or_else(|| McpError::invalid_argument(format!("Unknown operation: {}", s)))
    }
}

/// A JSON number, keeping integers exact
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// `None` for anything that is not a JSON number (booleans included)
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(Number::Int)
                .or_else(|| n.as_f64().map(Number::Float)),
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) => f.write_str(&format_float(*x)),
        }
    }
}

/// Integral floats keep one decimal (`5.0`), others use the shortest round-trip form
pub fn format_float(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value == f64::INFINITY {
        "inf".to_string()
    } else if value == f64::NEG_INFINITY {
        "-inf".to_string()
    } else if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}

#[derive(Debug, Copy, Clone)]
pub struct CalculatorTool {
    operation: Operation,
}

impl CalculatorTool {
    pub fn new(operation: Operation) -> Self {
        Self { operation }
    }

    pub fn input_schema() -> Value {
        object_schema(
            json!({
                "a": {"type": "number", "description": "First number"},
                "b": {"type": "number", "description": "Second number"}
            }),
            &["a", "b"],
        )
    }

    pub fn descriptor(self) -> ToolDescriptor {
        ToolDescriptor::new(
            self.operation.tool_name(),
            self.operation.description(),
            Self::input_schema(),
            Arc::new(self),
        )
    }

    /// `None` only for division by zero
    pub fn compute(&self, a: Number, b: Number) -> Option<Number> {
        let int_op = |x: i64, y: i64| match self.operation {
            Operation::Sum => x.checked_add(y),
            Operation::Subtract => x.checked_sub(y),
            Operation::Multiply => x.checked_mul(y),
            Operation::Divide => None,
        };

        if let (Number::Int(x), Number::Int(y)) = (a, b) {
            if let Some(result) = int_op(x, y) {
                return Some(Number::Int(result));
            }
        }

        let (x, y) = (a.as_f64(), b.as_f64());
        let result = match self.operation {
            Operation::Sum => x + y,
            Operation::Subtract => x - y,
            Operation::Multiply => x * y,
            Operation::Divide => {
                if y == 0.0 {
                    return None;
                }
                x / y
            }
        };
        Some(Number::Float(result))
    }
}

#[async_trait]
impl ToolHandler for CalculatorTool {
    async fn execute(&self, arguments: &Arguments) -> Result<Vec<ContentBlock>, McpError> {
        let a = arguments.get("a").and_then(Number::from_value);
        let b = arguments.get("b").and_then(Number::from_value);
        let (a, b) = match (a, b) {
            (Some(a), Some(b)) => (a, b),
            _ => return Err(McpError::invalid_argument("Arguments must be numbers")),
        };

        let text = match self.compute(a, b) {
            Some(result) => result.to_string(),
            None => DIVISION_BY_ZERO.to_string(),
        };
        Ok(vec![ContentBlock::text(text)])
    }
}
