use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::chat::{FunctionTool, Tool};

use super::error::ToolError;

/// Executes one tool with a decoded JSON argument object.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, args: Value) -> Result<String, ToolError>;
}

/// A named tool: its description for the model plus the handler that runs it.
#[derive(Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema of the argument object
    pub parameters: Value,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolDefinition {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: Value,
        handler: impl ToolHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
            handler: Arc::new(handler),
        }
    }

    /// The provider wire description of this tool.
    pub fn to_tool(&self) -> Tool {
        Tool {
            tool_type: "function".to_string(),
            function: FunctionTool {
                name: self.name.clone(),
                description: self.description.clone(),
                parameters: self.parameters.clone(),
            },
        }
    }
}

impl fmt::Debug for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Adapts an async closure over the raw argument object.
pub(crate) struct FnHandler<F> {
    f: F,
}

impl<F> FnHandler<F> {
    pub(crate) fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<String, ToolError> {
        (self.f)(args).await
    }
}

pub struct TypedHandler<Args, F> {
    f: F,
    _args: PhantomData<fn() -> Args>,
}

/// Wraps a closure taking a deserializable argument struct.
///
/// Arguments that do not decode into `Args` fail with [`ToolError::InvalidArgs`]
/// before the closure runs.
pub fn typed_handler<Args, F, Fut>(f: F) -> TypedHandler<Args, F>
where
    Args: DeserializeOwned + Send + 'static,
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    TypedHandler {
        f,
        _args: PhantomData,
    }
}

#[async_trait]
impl<Args, F, Fut> ToolHandler for TypedHandler<Args, F>
where
    Args: DeserializeOwned + Send + 'static,
    F: Fn(Args) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, ToolError>> + Send + 'static,
{
    async fn call(&self, args: Value) -> Result<String, ToolError> {
        let args: Args =
            serde_json::from_value(args).map_err(|err| ToolError::InvalidArgs(err.to_string()))?;
        (self.f)(args).await
    }
}
