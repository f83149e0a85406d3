use std::future::Future;
use std::time::Duration;

use serde_json::Value;

use crate::chat::{Tool, ToolCall};

use super::definition::{FnHandler, ToolDefinition};
use super::error::ToolError;

/// Registered tools, kept in registration order.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDefinition>,
    timeout: Option<Duration>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limits how long a single handler may run.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn register(&mut self, definition: ToolDefinition) -> Result<(), ToolError> {
        if self.has_tool(&definition.name) {
            return Err(ToolError::AlreadyRegistered(definition.name));
        }
        log::debug!("registered tool {}", definition.name);
        self.tools.push(definition);
        Ok(())
    }

    /// Registers an async closure over the raw JSON argument object.
    pub fn register_fn<F, Fut>(
        &mut self,
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        f: F,
    ) -> Result<(), ToolError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
    {
        self.register(ToolDefinition::new(
            name,
            description,
            parameters,
            FnHandler::new(f),
        ))
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Every registered tool in the provider's `tools` wire format.
    pub fn tools(&self) -> Vec<Tool> {
        self.tools.iter().map(ToolDefinition::to_tool).collect()
    }

    /// Runs the call, rendering any failure as an `Error: ...` string for the model.
    pub async fn invoke(&self, call: &ToolCall) -> String {
        match self.try_invoke(call).await {
            Ok(output) => output,
            Err(err) => {
                log::warn!("tool {} ({}) failed: {err}", call.function.name, call.id);
                format!("Error: {err}")
            }
        }
    }

    pub async fn try_invoke(&self, call: &ToolCall) -> Result<String, ToolError> {
        let name = call.function.name.as_str();
        let tool = self
            .tools
            .iter()
            .find(|tool| tool.name == name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        let args = parse_args(&call.function.arguments)?;
        log::debug!("invoking tool {name} ({})", call.id);

        let Some(timeout) = self.timeout else {
            return tool.handler.call(args).await;
        };
        match tokio::time::timeout(timeout, tool.handler.call(args)).await {
            Ok(result) => result,
            Err(_) => Err(ToolError::Timeout(timeout.as_millis() as u64)),
        }
    }
}

fn parse_args(raw: &str) -> Result<Value, ToolError> {
    if raw.trim().is_empty() {
        return Ok(Value::Object(serde_json::Map::new()));
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|err| ToolError::InvalidArgs(err.to_string()))?;
    if !value.is_object() {
        return Err(ToolError::InvalidArgs(format!(
            "expected a JSON object, got {value}"
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::FunctionCall;
    use crate::tools::{typed_handler, FunctionBuilder, ParamBuilder};
    use rstest::rstest;
    use serde::Deserialize;
    use serde_json::json;

    fn call(name: &str, arguments: &str) -> ToolCall {
        ToolCall {
            id: "call_1".to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    #[derive(Deserialize)]
    struct EchoArgs {
        text: String,
    }

    fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry
            .register(
                FunctionBuilder::new("echo")
                    .description("Echoes text")
                    .param(ParamBuilder::new("text"))
                    .required(vec!["text".to_string()])
                    .handler(typed_handler(|args: EchoArgs| async move {
                        Ok::<_, ToolError>(args.text)
                    })),
            )
            .unwrap();
        registry
            .register_fn("fail", "Always fails", json!({"type": "object"}), |_| async {
                Err::<String, _>(ToolError::Execution("disk on fire".to_string()))
            })
            .unwrap();
        registry
    }

    #[tokio::test]
    async fn invokes_registered_tool() {
        let out = registry().invoke(&call("echo", r#"{"text":"hi"}"#)).await;
        assert_eq!(out, "hi");
    }

    #[rstest]
    #[case::unknown_tool("missing", "{}", "Error: tool not found: missing")]
    #[case::handler_failure("fail", "{}", "Error: tool execution failed: disk on fire")]
    #[tokio::test]
    async fn failures_become_error_strings(
        #[case] name: &str,
        #[case] args: &str,
        #[case] expected: &str,
    ) {
        assert_eq!(registry().invoke(&call(name, args)).await, expected);
    }

    #[rstest]
    #[case::not_json("{\"text\":")]
    #[case::not_an_object("[1,2]")]
    #[case::wrong_shape("{\"text\":5}")]
    #[tokio::test]
    async fn bad_arguments_are_invalid_args(#[case] args: &str) {
        let err = registry().try_invoke(&call("echo", args)).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArgs(_)), "{err:?}");
    }

    #[tokio::test]
    async fn empty_arguments_mean_empty_object() {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("count", "Counts keys", json!({"type": "object"}), |args: Value| async move {
                Ok::<_, ToolError>(args.as_object().map_or(0, |o| o.len()).to_string())
            })
            .unwrap();
        assert_eq!(registry.invoke(&call("count", "")).await, "0");
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut registry = registry();
        let err = registry
            .register_fn("echo", "again", json!({}), |_| async { Ok::<_, ToolError>(String::new()) })
            .unwrap_err();
        assert_eq!(err, ToolError::AlreadyRegistered("echo".to_string()));
        assert_eq!(registry.tool_names(), vec!["echo", "fail"]);
    }

    #[test]
    fn tools_are_described_in_registration_order() {
        let names: Vec<_> = registry()
            .tools()
            .into_iter()
            .map(|tool| tool.function.name)
            .collect();
        assert_eq!(names, vec!["echo", "fail"]);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_handler_times_out() {
        let mut registry = ToolRegistry::new().with_timeout(Some(Duration::from_millis(50)));
        registry
            .register_fn("slow", "sleeps", json!({}), |_| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, ToolError>(String::new())
            })
            .unwrap();
        assert_eq!(
            registry.try_invoke(&call("slow", "{}")).await,
            Err(ToolError::Timeout(50))
        );
    }
}
