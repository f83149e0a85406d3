//! Scripted provider and SSE body builders shared by unit tests.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use tokio::sync::Notify;

use crate::chat::{ChatProvider, ChatRequest, ChunkStream, StreamChunk};
use crate::client::create_chunk_stream;
use crate::error::LLMError;

pub(crate) const DONE: &str = "data: [DONE]\n\n";

fn data(value: serde_json::Value) -> String {
    format!("data: {value}\n\n")
}

pub(crate) fn text_chunk(text: &str) -> String {
    data(serde_json::json!({"choices":[{"index":0,"delta":{"content":text}}]}))
}

pub(crate) fn finish_chunk(reason: &str) -> String {
    data(serde_json::json!({"choices":[{"index":0,"delta":{},"finish_reason":reason}]}))
}

/// A complete text-only turn.
pub(crate) fn text_turn(parts: &[&str]) -> String {
    let mut body: String = parts.iter().map(|part| text_chunk(part)).collect();
    body.push_str(&finish_chunk("stop"));
    body.push_str(DONE);
    body
}

/// A complete turn requesting `(id, name, arguments)` calls, with each
/// argument string split over two fragments.
pub(crate) fn tool_turn(calls: &[(&str, &str, &str)]) -> String {
    let mut body = String::new();
    for (index, (id, name, arguments)) in calls.iter().enumerate() {
        let (head, tail) = arguments.split_at(arguments.len() / 2);
        body.push_str(&data(serde_json::json!({"choices":[{"index":0,"delta":{"tool_calls":[
            {"index":index,"id":id,"type":"function","function":{"name":name,"arguments":head}}
        ]}}]})));
        body.push_str(&data(serde_json::json!({"choices":[{"index":0,"delta":{"tool_calls":[
            {"index":index,"function":{"arguments":tail}}
        ]}}]})));
    }
    body.push_str(&finish_chunk("tool_calls"));
    body.push_str(DONE);
    body
}

pub(crate) enum Script {
    /// A whole response body delivered in one read
    Body(String),
    /// Reads delivered one by one, transport errors included
    Parts(Vec<Result<Bytes, io::Error>>),
    /// Reads delivered one by one, then silence without closing
    Stall(Vec<Result<Bytes, io::Error>>),
    /// A whole body, opened only once the gate is notified
    Gated(Arc<Notify>, String),
    /// A response that never sends anything
    Hang,
}

/// Answers each request with the next script, then with `fallback` if set.
pub(crate) struct ScriptedProvider {
    scripts: Mutex<VecDeque<Script>>,
    fallback: Option<String>,
    requests: Mutex<Vec<ChatRequest>>,
    skipped: Arc<AtomicU64>,
}

impl ScriptedProvider {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            fallback: None,
            requests: Mutex::default(),
            skipped: Arc::default(),
        }
    }

    pub(crate) fn bodies(bodies: Vec<String>) -> Self {
        Self::new(bodies.into_iter().map(Script::Body).collect())
    }

    pub(crate) fn repeating(body: String) -> Self {
        Self {
            fallback: Some(body),
            ..Self::new(Vec::new())
        }
    }

    pub(crate) fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    async fn chat_stream(&self, request: ChatRequest) -> Result<ChunkStream, LLMError> {
        self.requests.lock().unwrap().push(request);
        let script = self.scripts.lock().unwrap().pop_front();
        let script = match (script, &self.fallback) {
            (Some(script), _) => script,
            (None, Some(body)) => Script::Body(body.clone()),
            (None, None) => return Err(LLMError::Generic("no scripted response left".into())),
        };
        let skipped = Arc::clone(&self.skipped);
        let parts = match script {
            Script::Body(body) => vec![Ok(Bytes::from(body))],
            Script::Parts(parts) => parts,
            Script::Stall(parts) => {
                let silent = stream::pending::<Result<Bytes, io::Error>>();
                return Ok(create_chunk_stream(
                    stream::iter(parts).chain(silent),
                    skipped,
                ));
            }
            Script::Gated(gate, body) => {
                gate.notified().await;
                vec![Ok(Bytes::from(body))]
            }
            Script::Hang => {
                let pending = stream::pending::<Result<StreamChunk, LLMError>>();
                return Ok(Box::pin(pending));
            }
        };
        Ok(create_chunk_stream(stream::iter(parts), skipped))
    }

    fn default_model(&self) -> &str {
        "scripted"
    }
}
