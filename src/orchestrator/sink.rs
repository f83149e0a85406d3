use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use super::events::StreamEvent;

/// Producer half of an event channel.
///
/// Unbounded by default. A bounded sink never blocks on `TextDelta`: when the
/// buffer is full the delta is dropped, since `Complete` carries the full text.
/// Every other event waits for capacity.
#[derive(Clone)]
pub enum EventSink {
    Unbounded(mpsc::UnboundedSender<StreamEvent>),
    Bounded {
        sender: mpsc::Sender<StreamEvent>,
        dropped: Arc<AtomicU64>,
    },
}

/// Consumer half of an event channel.
pub enum EventReceiver {
    Unbounded(mpsc::UnboundedReceiver<StreamEvent>),
    Bounded(mpsc::Receiver<StreamEvent>),
}

/// Creates a channel, bounded to `buffer` events when given.
pub fn event_channel(buffer: Option<usize>) -> (EventSink, EventReceiver) {
    match buffer {
        Some(size) => {
            let (sender, receiver) = mpsc::channel(size.max(1));
            (
                EventSink::Bounded {
                    sender,
                    dropped: Arc::default(),
                },
                EventReceiver::Bounded(receiver),
            )
        }
        None => {
            let (sender, receiver) = mpsc::unbounded_channel();
            (
                EventSink::Unbounded(sender),
                EventReceiver::Unbounded(receiver),
            )
        }
    }
}

impl EventSink {
    /// Delivers an event. A consumer that went away is not an error.
    pub async fn send(&self, event: StreamEvent) {
        let delivered = match self {
            EventSink::Unbounded(sender) => sender.send(event).is_ok(),
            EventSink::Bounded { sender, dropped } => match event {
                StreamEvent::TextDelta { .. } => match sender.try_send(event) {
                    Ok(()) => true,
                    Err(TrySendError::Full(_)) => {
                        let total = dropped.fetch_add(1, Ordering::Relaxed) + 1;
                        log::trace!("event buffer full, dropped text delta ({total} so far)");
                        true
                    }
                    Err(TrySendError::Closed(_)) => false,
                },
                event => sender.send(event).await.is_ok(),
            },
        };
        if !delivered {
            log::debug!("event consumer gone, discarding event");
        }
    }

    /// Text deltas discarded because a bounded buffer was full.
    pub fn dropped_deltas(&self) -> u64 {
        match self {
            EventSink::Unbounded(_) => 0,
            EventSink::Bounded { dropped, .. } => dropped.load(Ordering::Relaxed),
        }
    }

    pub fn is_closed(&self) -> bool {
        match self {
            EventSink::Unbounded(sender) => sender.is_closed(),
            EventSink::Bounded { sender, .. } => sender.is_closed(),
        }
    }
}

impl Stream for EventReceiver {
    type Item = StreamEvent;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StreamEvent>> {
        match self.get_mut() {
            EventReceiver::Unbounded(receiver) => receiver.poll_recv(cx),
            EventReceiver::Bounded(receiver) => receiver.poll_recv(cx),
        }
    }
}
