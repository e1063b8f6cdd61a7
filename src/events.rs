//! Hand-off queue between the connection worker and the consumer.
//!
//! The queue is unbounded: chat volume on a single channel is low and the
//! consumer drains it every few hundred milliseconds, so the worker never has to
//! wait for or drop events.

use crate::message::ChatEvent;
use tokio::sync::mpsc;

/// Create a connected sender/receiver pair.
pub fn event_channel() -> (EventSender, EventReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (EventSender { tx }, EventReceiver { rx })
}

/// Producer half, owned by the worker.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::UnboundedSender<ChatEvent>,
}

impl EventSender {
    /// Queue `event`. Never blocks. If the consumer is gone the event is discarded.
    pub fn push(&self, event: ChatEvent) {
        if let Err(mpsc::error::SendError(event)) = self.tx.send(event) {
            tracing::trace!("Event receiver dropped, discarding {:?}", event);
        }
    }

    /// Whether the receiving half has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, polled by the display on its own schedule.
#[derive(Debug)]
pub struct EventReceiver {
    rx: mpsc::UnboundedReceiver<ChatEvent>,
}

impl EventReceiver {
    /// All events queued right now, oldest first. Never blocks; returns an empty
    /// `Vec` if nothing is queued.
    pub fn drain(&mut self) -> Vec<ChatEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// The oldest queued event, if any, without blocking.
    pub fn try_next(&mut self) -> Option<ChatEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for the next event. Returns `None` once the worker is gone and
    /// everything has been received.
    pub async fn recv(&mut self) -> Option<ChatEvent> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::NoticeKind;

    fn message(n: usize) -> ChatEvent {
        ChatEvent::Message {
            author: "bob".to_owned(),
            body: n.to_string(),
        }
    }

    #[test]
    fn test_drain_is_fifo_and_empties_queue() {
        let (tx, mut rx) = event_channel();
        assert!(rx.drain().is_empty());

        for n in 0..5 {
            tx.push(message(n));
        }
        assert_eq!(rx.drain(), (0..5).map(message).collect::<Vec<_>>());
        assert!(rx.drain().is_empty());

        tx.push(message(5));
        assert_eq!(rx.try_next(), Some(message(5)));
        assert_eq!(rx.try_next(), None);
    }

    #[test]
    fn test_unbounded() {
        let (tx, mut rx) = event_channel();
        for n in 0..100_000 {
            tx.push(message(n));
        }
        let drained = rx.drain();
        assert_eq!(drained.len(), 100_000);
        assert_eq!(drained.last(), Some(&message(99_999)));
    }

    #[test]
    fn test_push_after_receiver_dropped() {
        let (tx, rx) = event_channel();
        drop(rx);
        assert!(tx.is_closed());
        tx.push(ChatEvent::notice(NoticeKind::Closed, "bye"));
    }

    #[tokio::test]
    async fn test_recv_ends_after_sender_dropped() {
        let (tx, mut rx) = event_channel();
        tx.push(message(1));
        drop(tx);
        assert_eq!(rx.recv().await, Some(message(1)));
        assert_eq!(rx.recv().await, None);
    }
}
