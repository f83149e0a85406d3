use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream, StreamExt};
use serde_json::Value;

use crate::chat::{
    ChatMessage, ChatRole, ChunkStream, FinishReason, StreamChunk, StreamResponse, ToolCall, Usage,
};
use crate::error::LLMError;

use super::accumulator::ToolCallAccumulator;
use super::sse::{SseLineBuffer, SsePayload};

/// Turns a provider byte stream into typed deltas for one assistant turn.
///
/// `skipped` is incremented for every payload that could not be parsed.
pub(crate) fn create_chunk_stream<S, E>(bytes: S, skipped: Arc<AtomicU64>) -> ChunkStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: fmt::Display + Send + 'static,
{
    // a trailing `None` marks end of body so the parser can tell EOF from silence
    let stream = bytes
        .map(Some)
        .chain(stream::once(async { None }))
        .scan(ChunkParser::new(skipped), |parser, chunk| {
            if parser.finished {
                return futures::future::ready(None);
            }
            futures::future::ready(Some(parser.handle(chunk)))
        })
        .flat_map(stream::iter);
    Box::pin(stream)
}

struct ChunkParser {
    lines: SseLineBuffer,
    results: Vec<Result<StreamChunk, LLMError>>,
    text: String,
    tool_calls: ToolCallAccumulator,
    finalized_calls: Option<Vec<ToolCall>>,
    finish_reason: Option<FinishReason>,
    usage: Option<Usage>,
    finished: bool,
    skipped: Arc<AtomicU64>,
}

impl ChunkParser {
    fn new(skipped: Arc<AtomicU64>) -> Self {
        Self {
            lines: SseLineBuffer::default(),
            results: Vec::new(),
            text: String::new(),
            tool_calls: ToolCallAccumulator::default(),
            finalized_calls: None,
            finish_reason: None,
            usage: None,
            finished: false,
            skipped,
        }
    }

    fn handle<E: fmt::Display>(
        &mut self,
        chunk: Option<Result<Bytes, E>>,
    ) -> Vec<Result<StreamChunk, LLMError>> {
        match chunk {
            Some(Ok(bytes)) => {
                self.lines.push_bytes(&bytes);
                for payload in self.lines.drain_payloads() {
                    self.handle_payload(payload);
                }
            }
            // a finish reason already settled the turn, only trailing usage is lost
            Some(Err(err)) if self.finish_reason.is_some() => {
                log::warn!("provider stream failed after the turn finished: {err}");
                self.complete();
            }
            Some(Err(err)) => {
                log::error!("provider stream failed: {err}");
                self.fail(LLMError::HttpError(err.to_string()));
            }
            None => self.handle_eof(),
        }
        self.results.drain(..).collect()
    }

    fn handle_payload(&mut self, payload: SsePayload) {
        if self.finished {
            return;
        }
        match payload {
            SsePayload::Done => self.complete(),
            SsePayload::Data(data) => self.handle_data(&data),
        }
    }

    fn handle_data(&mut self, data: &str) {
        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(err) => return self.skip(data, &err.to_string()),
        };
        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return self.fail(LLMError::ProviderError(message));
        }
        match serde_json::from_value::<StreamResponse>(value) {
            Ok(response) => self.handle_response(response),
            Err(err) => self.skip(data, &err.to_string()),
        }
    }

    fn handle_response(&mut self, response: StreamResponse) {
        if response.usage.is_some() {
            self.usage = response.usage;
        }
        // only the first choice is requested, extra choices are ignored
        let Some(choice) = response.choices.into_iter().find(|c| c.index == 0) else {
            return;
        };
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            self.text.push_str(&content);
            self.results.push(Ok(StreamChunk::Text(content)));
        }
        for fragment in choice.delta.tool_calls.unwrap_or_default() {
            self.tool_calls.push(&fragment);
            let (name, arguments) = match fragment.function {
                Some(function) => (function.name, function.arguments.unwrap_or_default()),
                None => (None, String::new()),
            };
            self.results.push(Ok(StreamChunk::ToolCallDelta {
                index: fragment.index,
                id: fragment.id,
                name,
                arguments,
            }));
        }
        if let Some(reason) = choice.finish_reason {
            log::debug!("provider finished turn: {reason}");
            if reason == FinishReason::ToolCalls {
                self.announce_tool_calls();
            }
            self.finish_reason = Some(reason);
        }
    }

    fn announce_tool_calls(&mut self) {
        if self.finalized_calls.is_some() || self.tool_calls.is_empty() {
            return;
        }
        let calls = self.tool_calls.finalize();
        self.results.push(Ok(StreamChunk::ToolCalls(calls.clone())));
        self.finalized_calls = Some(calls);
    }

    fn complete(&mut self) {
        self.announce_tool_calls();
        let tool_calls = self.finalized_calls.take().unwrap_or_default();
        let finish_reason = self.finish_reason.take().unwrap_or(if tool_calls.is_empty() {
            FinishReason::Stop
        } else {
            FinishReason::ToolCalls
        });
        let text = std::mem::take(&mut self.text);
        let content = if text.is_empty() && !tool_calls.is_empty() {
            None
        } else {
            Some(text)
        };
        let message = ChatMessage {
            role: ChatRole::Assistant,
            content,
            tool_calls,
            tool_call_id: None,
        };
        self.results.push(Ok(StreamChunk::Complete {
            message,
            finish_reason,
            usage: self.usage.take(),
        }));
        self.finished = true;
    }

    fn handle_eof(&mut self) {
        if self.finished {
            return;
        }
        for payload in self.lines.finish() {
            self.handle_payload(payload);
        }
        if self.finished {
            return;
        }
        if self.finish_reason.is_some() {
            self.complete();
        } else {
            log::error!("provider closed the stream without finishing the turn");
            self.fail(LLMError::StreamTruncated);
        }
    }

    fn fail(&mut self, err: LLMError) {
        self.results.push(Err(err));
        self.finished = true;
    }

    fn skip(&mut self, data: &str, reason: &str) {
        let total = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
        log::warn!("skipping malformed stream chunk ({reason}, {total} skipped so far): {data}");
    }
}
