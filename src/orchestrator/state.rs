use serde::Serialize;

use super::events::StreamEvent;
use super::sink::EventSink;

/// Phase of an orchestration loop.
///
/// `Idle -> Streaming -> (ToolExecuting -> Streaming)* -> Complete | Error | Cancelled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrchestratorState {
    Idle,
    Streaming,
    ToolExecuting,
    Complete,
    Error,
    Cancelled,
}

impl OrchestratorState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrchestratorState::Complete | OrchestratorState::Error | OrchestratorState::Cancelled
        )
    }
}

/// Tracks the current phase and reports every transition to the sink.
pub(crate) struct StateTracker<'a> {
    current: OrchestratorState,
    sink: &'a EventSink,
}

impl<'a> StateTracker<'a> {
    pub(crate) fn new(sink: &'a EventSink) -> Self {
        Self {
            current: OrchestratorState::Idle,
            sink,
        }
    }

    pub(crate) async fn transition(&mut self, to: OrchestratorState) {
        if self.current == to || self.current.is_terminal() {
            return;
        }
        let from = std::mem::replace(&mut self.current, to);
        log::debug!("orchestrator {from:?} -> {to:?}");
        self.sink.send(StreamEvent::StateChange { from, to }).await;
    }
}
