//! The request, stream, tool-execute loop.
//!
//! [`Orchestrator`] streams one completion at a time from a [`ChatProvider`],
//! forwards deltas as [`StreamEvent`]s, runs requested tools through the
//! [`ToolRegistry`] and feeds their results back until the model answers or the
//! round budget runs out. [`ChatService`] wraps it with a conversation store.
//!
//! [`ChatProvider`]: crate::chat::ChatProvider
//! [`ToolRegistry`]: crate::tools::ToolRegistry

mod events;
mod outcome;
mod runner;
mod service;
mod sink;
mod state;
mod stream;

pub use events::StreamEvent;
pub use outcome::{Outcome, OutcomeStatus};
pub use runner::{Orchestrator, RunOptions};
pub use service::ChatService;
pub use sink::{event_channel, EventReceiver, EventSink};
pub use state::OrchestratorState;
pub use stream::EventStream;
