use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio_util::sync::CancellationToken;

use crate::chat::ToolCall;
use crate::config::ToolExecutionMode;

use super::registry::ToolRegistry;

/// Output of one tool call, ready to become a tool-role message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolExecutionResult {
    pub id: String,
    pub name: String,
    pub output: String,
    pub is_error: bool,
}

/// Executes every call of one assistant turn.
///
/// Results come back in the order the calls were received, whichever mode runs them.
/// Once `cancel` fires no further call is started; a call already running is left
/// to finish, so the result list may be shorter than `calls`.
pub async fn execute_tool_calls(
    registry: &Arc<ToolRegistry>,
    calls: &[ToolCall],
    mode: ToolExecutionMode,
    cancel: &CancellationToken,
) -> Vec<ToolExecutionResult> {
    if cancel.is_cancelled() {
        return Vec::new();
    }
    match mode {
        ToolExecutionMode::Sequential => {
            let mut results = Vec::with_capacity(calls.len());
            for call in calls {
                if cancel.is_cancelled() {
                    log::debug!(
                        "cancelled, {} tool call(s) not started",
                        calls.len() - results.len()
                    );
                    break;
                }
                results.push(execute_single(registry, call).await);
            }
            results
        }
        ToolExecutionMode::Parallel => execute_parallel(registry, calls).await,
    }
}

async fn execute_parallel(
    registry: &Arc<ToolRegistry>,
    calls: &[ToolCall],
) -> Vec<ToolExecutionResult> {
    let handles: Vec<_> = calls
        .iter()
        .cloned()
        .map(|call| {
            let registry = Arc::clone(registry);
            tokio::spawn(async move { execute_single(&registry, &call).await })
        })
        .collect();

    let mut results = Vec::with_capacity(handles.len());
    for (call, handle) in calls.iter().zip(handles) {
        match handle.await {
            Ok(result) => results.push(result),
            Err(err) => {
                log::error!("tool task for {} failed: {err}", call.id);
                results.push(error_result(call, format!("Error: tool task failed: {err}")));
            }
        }
    }
    results
}

async fn execute_single(registry: &ToolRegistry, call: &ToolCall) -> ToolExecutionResult {
    let invocation = AssertUnwindSafe(registry.try_invoke(call)).catch_unwind();
    match invocation.await {
        Ok(Ok(output)) => ToolExecutionResult {
            id: call.id.clone(),
            name: call.function.name.clone(),
            output,
            is_error: false,
        },
        Ok(Err(err)) => {
            log::warn!("tool {} ({}) failed: {err}", call.function.name, call.id);
            error_result(call, format!("Error: {err}"))
        }
        Err(panic) => {
            let reason = panic_message(panic.as_ref());
            log::error!("tool {} ({}) panicked: {reason}", call.function.name, call.id);
            error_result(call, format!("Error: tool panicked: {reason}"))
        }
    }
}

fn error_result(call: &ToolCall, output: String) -> ToolExecutionResult {
    ToolExecutionResult {
        id: call.id.clone(),
        name: call.function.name.clone(),
        output,
        is_error: true,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::FunctionCall;
    use crate::tools::ToolError;
    use rstest::rstest;
    use serde_json::{json, Value};
    use std::sync::Mutex;
    use std::time::Duration;

    fn call(id: &str, delay_ms: u64) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: "sleep".to_string(),
                arguments: json!({ "ms": delay_ms }).to_string(),
            },
        }
    }

    fn registry(finished: Arc<Mutex<Vec<u64>>>) -> Arc<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("sleep", "sleeps", json!({}), move |args: Value| {
                let finished = Arc::clone(&finished);
                async move {
                    let ms = args["ms"].as_u64().unwrap_or_default();
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    finished.lock().unwrap().push(ms);
                    Ok::<_, ToolError>(format!("slept {ms}"))
                }
            })
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test(start_paused = true)]
    async fn parallel_results_keep_arrival_order() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(Arc::clone(&finished));
        let calls = vec![call("a", 300), call("b", 10), call("c", 100)];

        let results = execute_tool_calls(
            &registry,
            &calls,
            ToolExecutionMode::Parallel,
            &CancellationToken::new(),
        )
        .await;

        let ids: Vec<_> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(results[0].output, "slept 300");
        // completion order differs from arrival order
        assert_eq!(*finished.lock().unwrap(), vec![10, 100, 300]);
    }

    #[tokio::test(start_paused = true)]
    async fn sequential_runs_one_at_a_time() {
        let finished = Arc::new(Mutex::new(Vec::new()));
        let registry = registry(Arc::clone(&finished));
        let calls = vec![call("a", 300), call("b", 10)];

        let results = execute_tool_calls(
            &registry,
            &calls,
            ToolExecutionMode::Sequential,
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(results.len(), 2);
        assert_eq!(*finished.lock().unwrap(), vec![300, 10]);
    }

    #[tokio::test]
    async fn unknown_tool_is_an_error_result() {
        let registry = Arc::new(ToolRegistry::new());
        let mut bad = call("x", 0);
        bad.function.name = "nope".to_string();

        let results = execute_tool_calls(
            &registry,
            &[bad],
            ToolExecutionMode::Parallel,
            &CancellationToken::new(),
        )
        .await;

        assert!(results[0].is_error);
        assert_eq!(results[0].output, "Error: tool not found: nope");
    }

    #[tokio::test]
    async fn sequential_stops_starting_calls_once_cancelled() {
        let cancel = CancellationToken::new();
        let started = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ToolRegistry::new();
        let trigger = cancel.clone();
        registry
            .register_fn("stop", "cancels the batch", json!({}), move |_: Value| {
                let trigger = trigger.clone();
                async move {
                    trigger.cancel();
                    Ok::<_, ToolError>("stopped".to_string())
                }
            })
            .unwrap();
        let seen = Arc::clone(&started);
        registry
            .register_fn("record", "records", json!({}), move |_: Value| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push("record");
                    Ok::<_, ToolError>("recorded".to_string())
                }
            })
            .unwrap();
        let mut calls = vec![call("a", 0), call("b", 0), call("c", 0)];
        calls[0].function.name = "stop".to_string();
        calls[1].function.name = "record".to_string();
        calls[2].function.name = "record".to_string();

        let results = execute_tool_calls(
            &Arc::new(registry),
            &calls,
            ToolExecutionMode::Sequential,
            &cancel,
        )
        .await;

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].output, "stopped");
        assert!(started.lock().unwrap().is_empty());
    }

    #[rstest]
    #[case::sequential(ToolExecutionMode::Sequential)]
    #[case::parallel(ToolExecutionMode::Parallel)]
    #[tokio::test]
    async fn panicking_handler_becomes_an_error_result(#[case] mode: ToolExecutionMode) {
        let mut registry = ToolRegistry::new();
        registry
            .register_fn("boom", "panics", json!({}), |_: Value| async move {
                if true {
                    panic!("handler bug");
                }
                Ok::<_, ToolError>(String::new())
            })
            .unwrap();
        let mut boom = call("x", 0);
        boom.function.name = "boom".to_string();

        let results =
            execute_tool_calls(&Arc::new(registry), &[boom], mode, &CancellationToken::new()).await;

        assert!(results[0].is_error);
        assert_eq!(results[0].output, "Error: tool panicked: handler bug");
    }
}
