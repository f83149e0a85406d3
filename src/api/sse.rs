use std::convert::Infallible;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::orchestrator::{EventStream, StreamEvent};

const DONE_EVENT: &str = "done";

/// Wraps the loop's events for an SSE response.
///
/// Dropping the response body (client disconnect) cancels `cancel`, which stops
/// the loop from reading further provider output.
pub(super) fn into_sse(
    events: EventStream,
    cancel: CancellationToken,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(SseEvents {
        events,
        cancel,
        done_sent: false,
    })
    .keep_alive(KeepAlive::default())
}

struct SseEvents {
    events: EventStream,
    cancel: CancellationToken,
    done_sent: bool,
}

impl Stream for SseEvents {
    type Item = Result<Event, Infallible>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done_sent {
            return Poll::Ready(None);
        }
        match self.events.poll_next_unpin(cx) {
            Poll::Ready(Some(event)) => Poll::Ready(Some(Ok(to_sse_event(&event)))),
            Poll::Ready(None) => {
                self.done_sent = true;
                Poll::Ready(Some(Ok(Event::default().event(DONE_EVENT).data("[DONE]"))))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for SseEvents {
    fn drop(&mut self) {
        if !self.done_sent {
            log::debug!("SSE client went away, cancelling orchestration");
        }
        self.cancel.cancel();
    }
}

fn to_sse_event(event: &StreamEvent) -> Event {
    let name = event.event_name();
    match Event::default().event(name).json_data(event) {
        Ok(sse_event) => sse_event,
        Err(err) => {
            log::warn!("failed to encode {name} event: {err}");
            Event::default()
                .event(name)
                .data(format!("{{\"type\":\"{name}\"}}"))
        }
    }
}
