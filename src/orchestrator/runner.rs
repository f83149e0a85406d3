use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;

use crate::chat::{
    ChatMessage, ChatProvider, ChatRequest, ChatRole, ChunkStream, StreamChunk, Tool, ToolCall,
    Usage,
};
use crate::config::OrchestratorConfig;
use crate::error::LLMError;
use crate::tools::{execute_tool_calls, ToolRegistry};

use super::events::StreamEvent;
use super::outcome::{Outcome, OutcomeStatus};
use super::sink::{event_channel, EventSink};
use super::state::{OrchestratorState, StateTracker};
use super::stream::EventStream;

const BUDGET_EXHAUSTED_MESSAGE: &str =
    "I stopped before finishing because the tool call limit for this request was reached.";

/// Per-call knobs of one orchestration loop.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Maximum number of tool-execution rounds
    pub max_tool_calls: usize,
    /// Overrides the provider's default model
    pub model: Option<String>,
}

impl RunOptions {
    pub fn new(max_tool_calls: usize) -> Self {
        Self {
            max_tool_calls,
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

/// Drives the request, stream, tool-execute loop for one user message.
#[derive(Clone)]
pub struct Orchestrator {
    provider: Arc<dyn ChatProvider>,
    tools: Arc<ToolRegistry>,
    config: OrchestratorConfig,
}

/// A finished assistant turn.
struct Turn {
    message: ChatMessage,
    usage: Option<Usage>,
}

impl Turn {
    /// A tool-requesting turn whose stream broke after the calls were announced.
    fn from_announced(partial_text: String, calls: Vec<ToolCall>) -> Self {
        let message = ChatMessage {
            role: ChatRole::Assistant,
            content: (!partial_text.is_empty()).then_some(partial_text),
            tool_calls: calls,
            tool_call_id: None,
        };
        Self {
            message,
            usage: None,
        }
    }
}

/// A turn that broke before completing.
struct TurnFailure {
    error: LLMError,
    partial_text: String,
}

impl Orchestrator {
    /// Creates an orchestrator. A registry without its own timeout gets the
    /// configured `tool_timeout_ms`.
    pub fn new(
        provider: Arc<dyn ChatProvider>,
        tools: Arc<ToolRegistry>,
        config: OrchestratorConfig,
    ) -> Self {
        let tools = match (tools.timeout(), config.tool_timeout()) {
            (None, Some(timeout)) => {
                Arc::new(ToolRegistry::clone(&tools).with_timeout(Some(timeout)))
            }
            _ => tools,
        };
        Self {
            provider,
            tools,
            config,
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Options built from the configured round budget.
    pub fn default_options(&self) -> RunOptions {
        RunOptions::new(self.config.max_tool_calls)
    }

    /// Runs the loop in its own task and returns its events as a stream.
    pub fn process_message(
        &self,
        messages: Vec<ChatMessage>,
        options: RunOptions,
        cancel: CancellationToken,
    ) -> EventStream {
        let (sink, events) = event_channel(self.config.event_buffer);
        let this = self.clone();
        let task = tokio::spawn(async move { Ok(this.run(messages, options, &sink, &cancel).await) });
        EventStream::new(events, task)
    }

    /// Runs the loop to completion, reporting progress to `sink`.
    ///
    /// Always ends with exactly one terminal `Error` or `Complete` event.
    pub async fn run(
        &self,
        messages: Vec<ChatMessage>,
        options: RunOptions,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Outcome {
        let outcome = self.run_loop(messages, options, sink, cancel).await;
        let dropped = sink.dropped_deltas();
        if dropped > 0 {
            log::debug!("event buffer was full, {dropped} text delta(s) dropped");
        }
        if sink.is_closed() {
            log::debug!("event consumer left before the loop finished");
        }
        outcome
    }

    async fn run_loop(
        &self,
        mut messages: Vec<ChatMessage>,
        options: RunOptions,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Outcome {
        self.apply_system_prompt(&mut messages);
        let mut state = StateTracker::new(sink);
        let tools = self.tools.tools();
        let mut rounds = 0;

        loop {
            state.transition(OrchestratorState::Streaming).await;
            let turn = match self
                .stream_turn(&messages, &tools, &options, sink, cancel)
                .await
            {
                Ok(turn) => turn,
                Err(failure) => {
                    return fail(messages, rounds, failure, &mut state, sink).await;
                }
            };

            let assistant = turn.message;
            if !assistant.has_tool_calls() {
                messages.push(assistant.clone());
                state.transition(OrchestratorState::Complete).await;
                sink.send(StreamEvent::Complete {
                    message: assistant,
                    rounds,
                    budget_exhausted: false,
                    usage: turn.usage,
                })
                .await;
                return Outcome {
                    messages,
                    status: OutcomeStatus::Completed,
                    rounds,
                };
            }

            if rounds >= options.max_tool_calls {
                log::warn!(
                    "tool call budget of {} rounds exhausted, {} call(s) left unanswered",
                    options.max_tool_calls,
                    assistant.tool_calls.len()
                );
                let note = self.exhaust_budget(&mut messages, assistant, sink).await;
                state.transition(OrchestratorState::Complete).await;
                sink.send(StreamEvent::Complete {
                    message: note,
                    rounds,
                    budget_exhausted: true,
                    usage: turn.usage,
                })
                .await;
                return Outcome {
                    messages,
                    status: OutcomeStatus::BudgetExhausted,
                    rounds,
                };
            }

            state.transition(OrchestratorState::ToolExecuting).await;
            let results = execute_tool_calls(
                &self.tools,
                &assistant.tool_calls,
                self.config.tool_execution,
                cancel,
            )
            .await;
            if cancel.is_cancelled() {
                // the round is incomplete, so neither the request nor its results are kept
                let failure = TurnFailure {
                    error: LLMError::Cancelled,
                    partial_text: String::new(),
                };
                return fail(messages, rounds, failure, &mut state, sink).await;
            }

            messages.push(assistant);
            for result in results {
                messages.push(
                    ChatMessage::tool(result.id.clone())
                        .content(result.output.clone())
                        .build(),
                );
                sink.send(StreamEvent::ToolResult {
                    tool_call_id: result.id,
                    name: result.name,
                    content: result.output,
                    is_error: result.is_error,
                })
                .await;
            }
            rounds += 1;
            log::debug!("tool round {rounds} of {} done", options.max_tool_calls);
        }
    }

    fn apply_system_prompt(&self, messages: &mut Vec<ChatMessage>) {
        let Some(prompt) = self.config.system_prompt.as_deref() else {
            return;
        };
        if messages.first().map(|m| m.role) != Some(ChatRole::System) {
            messages.insert(0, ChatMessage::system().content(prompt).build());
        }
    }

    async fn stream_turn(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
        options: &RunOptions,
        sink: &EventSink,
        cancel: &CancellationToken,
    ) -> Result<Turn, TurnFailure> {
        let request = ChatRequest::new(messages.to_vec())
            .with_tools(tools.to_vec())
            .with_model(options.model.clone());

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LLMError::Cancelled),
            opened = self.provider.chat_stream(request) => opened,
        };
        let mut stream = opened.map_err(|error| TurnFailure {
            error,
            partial_text: String::new(),
        })?;

        let mut partial_text = String::new();
        let mut announced = None;
        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LLMError::Cancelled),
                next = next_chunk(&mut stream, self.config.idle_timeout()) => next,
            };
            let chunk = match next {
                Ok(Some(Ok(chunk))) => chunk,
                Ok(Some(Err(error))) | Err(error) => {
                    return settle(error, partial_text, announced);
                }
                Ok(None) => return settle(LLMError::StreamTruncated, partial_text, announced),
            };
            match chunk {
                StreamChunk::Text(delta) => {
                    partial_text.push_str(&delta);
                    sink.send(StreamEvent::TextDelta { delta }).await;
                }
                StreamChunk::ToolCallDelta {
                    index,
                    id,
                    name,
                    arguments,
                } => {
                    sink.send(StreamEvent::ToolCallDelta {
                        index,
                        id,
                        name,
                        arguments,
                    })
                    .await;
                }
                StreamChunk::ToolCalls(calls) => {
                    log::debug!("model requested {} tool call(s)", calls.len());
                    announced = Some(calls);
                }
                StreamChunk::Complete { message, usage, .. } => {
                    return Ok(Turn { message, usage });
                }
            }
        }
    }

    /// Answers every pending call so each tool request keeps its results, then
    /// closes the conversation with an explanatory assistant message.
    async fn exhaust_budget(
        &self,
        messages: &mut Vec<ChatMessage>,
        assistant: ChatMessage,
        sink: &EventSink,
    ) -> ChatMessage {
        let calls = assistant.tool_calls.clone();
        messages.push(assistant);
        for call in calls {
            let content = format!(
                "Error: tool {} was not executed because the tool call limit was reached",
                call.function.name
            );
            messages.push(ChatMessage::tool(call.id.clone()).content(content.clone()).build());
            sink.send(StreamEvent::ToolResult {
                tool_call_id: call.id,
                name: call.function.name,
                content,
                is_error: true,
            })
            .await;
        }
        let note = ChatMessage::assistant()
            .content(BUDGET_EXHAUSTED_MESSAGE)
            .build();
        messages.push(note.clone());
        note
    }
}

/// Ends a turn whose stream stopped early.
///
/// Announced tool calls are final, so a turn that got that far is kept unless
/// the loop was cancelled.
fn settle(
    error: LLMError,
    partial_text: String,
    announced: Option<Vec<ToolCall>>,
) -> Result<Turn, TurnFailure> {
    match announced {
        Some(calls) if !matches!(error, LLMError::Cancelled) => {
            log::warn!(
                "stream ended early ({error}) after {} tool call(s) were announced, running them",
                calls.len()
            );
            Ok(Turn::from_announced(partial_text, calls))
        }
        _ => Err(TurnFailure {
            error,
            partial_text,
        }),
    }
}

async fn next_chunk(
    stream: &mut ChunkStream,
    idle_timeout: Option<Duration>,
) -> Result<Option<Result<StreamChunk, LLMError>>, LLMError> {
    let Some(limit) = idle_timeout else {
        return Ok(stream.next().await);
    };
    tokio::time::timeout(limit, stream.next())
        .await
        .map_err(|_| LLMError::IdleTimeout(limit.as_secs()))
}

async fn fail(
    messages: Vec<ChatMessage>,
    rounds: usize,
    failure: TurnFailure,
    state: &mut StateTracker<'_>,
    sink: &EventSink,
) -> Outcome {
    let TurnFailure {
        error,
        partial_text,
    } = failure;
    let partial_text = (!partial_text.is_empty()).then_some(partial_text);
    let message = error.to_string();

    let (terminal, status) = if matches!(error, LLMError::Cancelled) {
        log::debug!("orchestration cancelled after {rounds} round(s)");
        (OrchestratorState::Cancelled, OutcomeStatus::Cancelled)
    } else {
        log::error!("orchestration failed after {rounds} round(s): {message}");
        let status = OutcomeStatus::Failed {
            error,
            partial_text: partial_text.clone(),
        };
        (OrchestratorState::Error, status)
    };
    state.transition(terminal).await;
    sink.send(StreamEvent::Error {
        message,
        partial_text,
    })
    .await;

    Outcome {
        messages,
        status,
        rounds,
    }
}
