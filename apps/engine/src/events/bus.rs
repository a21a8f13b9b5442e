//! Ordered, bounded event stream for one session.
//!
//! Publishing happens while the caller holds the session's mutation lock, so
//! sequence numbers and delivery order match commit order. How a slow
//! subscriber is treated depends on the [`OverflowPolicy`].

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::stream::{BoxStream, StreamExt};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::{BroadcastStream, ReceiverStream};
use tracing::debug;

use crate::domain::events::{PendingEvent, SessionEvent};
use crate::domain::ids::SessionId;

/// What happens when a subscriber's buffer is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// The subscriber loses its oldest unread events and is told how many.
    #[default]
    DropOldest,
    /// The publisher waits for room, holding up the session's writers.
    Block,
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop_oldest" => Ok(OverflowPolicy::DropOldest),
            "block" => Ok(OverflowPolicy::Block),
            other => Err(format!("unknown overflow policy '{other}'")),
        }
    }
}

/// A drop-oldest subscriber fell behind and missed this many events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("subscriber lagged behind by {0} events")]
pub struct Lagged(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RecvError {
    #[error(transparent)]
    Lagged(#[from] Lagged),
    /// The session ended and every buffered event has been read.
    #[error("event stream closed")]
    Closed,
}

enum Fanout {
    Ring(Option<broadcast::Sender<SessionEvent>>),
    Queues {
        senders: Vec<mpsc::Sender<SessionEvent>>,
        closed: bool,
    },
}

pub struct EventBus {
    session_id: SessionId,
    capacity: usize,
    policy: OverflowPolicy,
    next_seq: AtomicU64,
    fanout: Mutex<Fanout>,
}

impl EventBus {
    pub fn new(session_id: SessionId, capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        let fanout = match policy {
            OverflowPolicy::DropOldest => {
                let (tx, _) = broadcast::channel(capacity);
                Fanout::Ring(Some(tx))
            }
            OverflowPolicy::Block => Fanout::Queues {
                senders: Vec::new(),
                closed: false,
            },
        };
        Self {
            session_id,
            capacity,
            policy,
            next_seq: AtomicU64::new(1),
            fanout: Mutex::new(fanout),
        }
    }

    pub fn policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Sequence number of the last published event, 0 before the first.
    pub fn last_seq(&self) -> u64 {
        self.next_seq.load(Ordering::Acquire) - 1
    }

    pub fn is_closed(&self) -> bool {
        match &*self.fanout.lock() {
            Fanout::Ring(tx) => tx.is_none(),
            Fanout::Queues { closed, .. } => *closed,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        match &*self.fanout.lock() {
            Fanout::Ring(tx) => tx.as_ref().map_or(0, |tx| tx.receiver_count()),
            Fanout::Queues { senders, .. } => senders.iter().filter(|s| !s.is_closed()).count(),
        }
    }

    /// New subscriber; sees events published from now on. Subscribing to a
    /// closed bus yields a stream that ends immediately.
    pub fn subscribe(&self) -> Subscription {
        let mut fanout = self.fanout.lock();
        match &mut *fanout {
            Fanout::Ring(Some(tx)) => Subscription::ring(tx.subscribe()),
            Fanout::Ring(None) => {
                let (_, rx) = broadcast::channel(1);
                Subscription::ring(rx)
            }
            Fanout::Queues { senders, closed } => {
                let (tx, rx) = mpsc::channel(self.capacity);
                if !*closed {
                    senders.push(tx);
                }
                Subscription::queue(rx)
            }
        }
    }

    /// Stamp and deliver events in order. Returns the last sequence number
    /// used. Publishing to a closed bus drops the events.
    pub async fn publish(&self, events: Vec<PendingEvent>) -> u64 {
        for pending in events {
            let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);
            let event = SessionEvent {
                seq,
                session_id: self.session_id,
                player_id: pending.player_id,
                at: pending.at,
                kind: pending.kind,
            };
            self.deliver(event).await;
        }
        self.last_seq()
    }

    async fn deliver(&self, event: SessionEvent) {
        let senders = {
            let fanout = self.fanout.lock();
            match &*fanout {
                Fanout::Ring(Some(tx)) => {
                    // No receivers is not an error: nobody is listening.
                    let _ = tx.send(event);
                    return;
                }
                Fanout::Ring(None) => return,
                Fanout::Queues { closed: true, .. } => return,
                Fanout::Queues { senders, .. } => senders.clone(),
            }
        };

        let mut gone = Vec::new();
        for tx in &senders {
            if tx.send(event.clone()).await.is_err() {
                gone.push(tx.clone());
            }
        }
        if !gone.is_empty() {
            debug!(session_id = %self.session_id, pruned = gone.len(), "Pruning dropped subscribers");
            if let Fanout::Queues { senders, .. } = &mut *self.fanout.lock() {
                senders.retain(|s| !gone.iter().any(|g| g.same_channel(s)));
            }
        }
    }

    /// End the stream. Subscribers drain what is buffered, then see
    /// [`RecvError::Closed`].
    pub fn close(&self) {
        let mut fanout = self.fanout.lock();
        match &mut *fanout {
            Fanout::Ring(tx) => {
                tx.take();
            }
            Fanout::Queues { senders, closed } => {
                senders.clear();
                *closed = true;
            }
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("session_id", &self.session_id)
            .field("capacity", &self.capacity)
            .field("policy", &self.policy)
            .field("last_seq", &self.last_seq())
            .finish()
    }
}

enum Source {
    Ring(broadcast::Receiver<SessionEvent>),
    Queue(mpsc::Receiver<SessionEvent>),
}

/// One subscriber's view of a session's events.
pub struct Subscription {
    source: Source,
}

impl Subscription {
    fn ring(rx: broadcast::Receiver<SessionEvent>) -> Self {
        Self {
            source: Source::Ring(rx),
        }
    }

    fn queue(rx: mpsc::Receiver<SessionEvent>) -> Self {
        Self {
            source: Source::Queue(rx),
        }
    }

    pub async fn recv(&mut self) -> Result<SessionEvent, RecvError> {
        match &mut self.source {
            Source::Ring(rx) => rx.recv().await.map_err(|err| match err {
                broadcast::error::RecvError::Lagged(n) => RecvError::Lagged(Lagged(n)),
                broadcast::error::RecvError::Closed => RecvError::Closed,
            }),
            Source::Queue(rx) => rx.recv().await.ok_or(RecvError::Closed),
        }
    }

    /// Non-blocking read; `None` when nothing is buffered right now.
    pub fn try_recv(&mut self) -> Option<Result<SessionEvent, RecvError>> {
        match &mut self.source {
            Source::Ring(rx) => match rx.try_recv() {
                Ok(event) => Some(Ok(event)),
                Err(broadcast::error::TryRecvError::Empty) => None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    Some(Err(RecvError::Lagged(Lagged(n))))
                }
                Err(broadcast::error::TryRecvError::Closed) => Some(Err(RecvError::Closed)),
            },
            Source::Queue(rx) => match rx.try_recv() {
                Ok(event) => Some(Ok(event)),
                Err(mpsc::error::TryRecvError::Empty) => None,
                Err(mpsc::error::TryRecvError::Disconnected) => Some(Err(RecvError::Closed)),
            },
        }
    }

    /// The subscription as a stream that ends when the bus closes. Lag
    /// notices are yielded in-line.
    pub fn into_stream(self) -> BoxStream<'static, Result<SessionEvent, Lagged>> {
        match self.source {
            Source::Ring(rx) => BroadcastStream::new(rx)
                .map(|item| {
                    item.map_err(|err| match err {
                        BroadcastStreamRecvError::Lagged(n) => Lagged(n),
                    })
                })
                .boxed(),
            Source::Queue(rx) => ReceiverStream::new(rx).map(Ok).boxed(),
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.source {
            Source::Ring(_) => "ring",
            Source::Queue(_) => "queue",
        };
        f.debug_struct("Subscription").field("source", &kind).finish()
    }
}
