use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::task::JoinHandle;

use crate::error::LLMError;

use super::events::StreamEvent;
use super::outcome::Outcome;
use super::sink::EventReceiver;

const TASK_LOST_MESSAGE: &str = "orchestration stopped without a result";

/// Events of a loop running in its own task, consumed once.
///
/// The stream ends when the loop finishes; [`EventStream::outcome`] then yields
/// the final message list. If the task dies before sending a terminal event, a
/// final `Error` event is synthesized so consumers always see why it ended.
pub struct EventStream {
    events: EventReceiver,
    task: JoinHandle<Result<Outcome, LLMError>>,
    terminal_seen: bool,
    finished: bool,
}

impl EventStream {
    pub(crate) fn new(events: EventReceiver, task: JoinHandle<Result<Outcome, LLMError>>) -> Self {
        Self {
            events,
            task,
            terminal_seen: false,
            finished: false,
        }
    }

    /// Waits for the loop to finish. Events not yet read are discarded.
    pub async fn outcome(self) -> Result<Outcome, LLMError> {
        let EventStream { events, task, .. } = self;
        drop(events);
        task.await
            .map_err(|err| LLMError::Generic(format!("orchestration task failed: {err}")))?
    }
}

impl Stream for EventStream {
    type Item = StreamEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }
        match self.events.poll_next_unpin(cx) {
            Poll::Ready(Some(event)) => {
                if event.is_terminal() {
                    self.terminal_seen = true;
                }
                Poll::Ready(Some(event))
            }
            Poll::Ready(None) => {
                self.finished = true;
                if self.terminal_seen {
                    return Poll::Ready(None);
                }
                log::error!("orchestration task ended without a terminal event");
                Poll::Ready(Some(StreamEvent::Error {
                    message: TASK_LOST_MESSAGE.to_string(),
                    partial_text: None,
                }))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestrator::{event_channel, OutcomeStatus};

    fn crash() -> Result<Outcome, LLMError> {
        panic!("loop bug")
    }

    #[tokio::test]
    async fn dead_task_still_ends_with_an_error_event() {
        let (sink, events) = event_channel(None);
        let task = tokio::spawn(async move {
            sink.send(StreamEvent::TextDelta {
                delta: "Hel".to_string(),
            })
            .await;
            crash()
        });
        let mut stream = EventStream::new(events, task);

        let received: Vec<_> = (&mut stream).collect().await;
        assert_eq!(received.len(), 2);
        assert!(matches!(
            received.last(),
            Some(StreamEvent::Error { message, .. }) if message == TASK_LOST_MESSAGE
        ));
        assert!(matches!(stream.outcome().await, Err(LLMError::Generic(_))));
    }

    #[tokio::test]
    async fn finished_task_adds_nothing() {
        let (sink, events) = event_channel(None);
        let task = tokio::spawn(async move {
            sink.send(StreamEvent::Error {
                message: "boom".to_string(),
                partial_text: None,
            })
            .await;
            Ok(Outcome {
                messages: Vec::new(),
                status: OutcomeStatus::Cancelled,
                rounds: 0,
            })
        });
        let mut stream = EventStream::new(events, task);

        let received: Vec<_> = (&mut stream).collect().await;
        assert_eq!(received.len(), 1);
        assert!(stream.outcome().await.is_ok());
    }
}
