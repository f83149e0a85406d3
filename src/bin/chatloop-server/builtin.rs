use chrono::Utc;
use serde::Deserialize;

use chatloop::tools::{typed_handler, FunctionBuilder, ParamBuilder, ToolDefinition, ToolError};

/// Demo tools registered by the server.
pub fn builtin_tools() -> Vec<ToolDefinition> {
    vec![echo_tool(), time_tool(), calculator_tool()]
}

#[derive(Deserialize)]
struct EchoArgs {
    text: String,
}

fn echo_tool() -> ToolDefinition {
    FunctionBuilder::new("echo")
        .description("Echo back the provided text.")
        .param(ParamBuilder::new("text").description("Text to echo back."))
        .required(vec!["text".to_string()])
        .handler(typed_handler(|args: EchoArgs| async move {
            Ok::<_, ToolError>(args.text)
        }))
}

#[derive(Deserialize)]
struct NoArgs {}

fn time_tool() -> ToolDefinition {
    FunctionBuilder::new("time_now")
        .description("Return the current UTC time in RFC3339 format.")
        .handler(typed_handler(|_: NoArgs| async {
            Ok::<_, ToolError>(Utc::now().to_rfc3339())
        }))
}

#[derive(Deserialize)]
struct CalculatorArgs {
    a: f64,
    b: f64,
    op: String,
}

fn calculator_tool() -> ToolDefinition {
    FunctionBuilder::new("calculator")
        .description("Apply a basic arithmetic operation to two numbers.")
        .param(ParamBuilder::new("a").type_of("number").description("Left operand."))
        .param(ParamBuilder::new("b").type_of("number").description("Right operand."))
        .param(
            ParamBuilder::new("op")
                .description("Operation to apply.")
                .enum_values(vec![
                    "add".to_string(),
                    "sub".to_string(),
                    "mul".to_string(),
                    "div".to_string(),
                ]),
        )
        .required(vec!["a".to_string(), "b".to_string(), "op".to_string()])
        .handler(typed_handler(|args: CalculatorArgs| async move {
            calculate(args.a, args.b, &args.op).map(|value| value.to_string())
        }))
}

fn calculate(a: f64, b: f64, op: &str) -> Result<f64, ToolError> {
    match op {
        "add" => Ok(a + b),
        "sub" => Ok(a - b),
        "mul" => Ok(a * b),
        "div" if b == 0.0 => Err(ToolError::Execution("division by zero".to_string())),
        "div" => Ok(a / b),
        other => Err(ToolError::InvalidArgs(format!("unknown operation: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculator_handles_division_by_zero() {
        assert_eq!(calculate(6.0, 3.0, "div"), Ok(2.0));
        assert!(matches!(
            calculate(1.0, 0.0, "div"),
            Err(ToolError::Execution(_))
        ));
        assert!(matches!(
            calculate(1.0, 1.0, "pow"),
            Err(ToolError::InvalidArgs(_))
        ));
    }
}
