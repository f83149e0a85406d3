//! Locally registered tools the model can call.
//!
//! Tools are registered explicitly at startup as [`ToolDefinition`]s and invoked
//! by name with the JSON arguments the model produced.

mod batch;
mod builder;
mod definition;
mod error;
mod registry;

pub use batch::{execute_tool_calls, ToolExecutionResult};
pub use builder::{FunctionBuilder, ParamBuilder};
pub use definition::{typed_handler, ToolDefinition, ToolHandler};
pub use error::ToolError;
pub use registry::ToolRegistry;
