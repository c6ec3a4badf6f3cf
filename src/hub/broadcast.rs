//! Subscriber registry and non-blocking fan-out.
//!
//! The hub owns the latest smoothed sample and the set of live subscriber
//! queues, both behind one mutex. Each subscriber queue is a bounded tokio
//! channel: the producer only ever `try_send`s into it, so a slow consumer
//! can never stall the broadcast path. When a queue is full the incoming
//! event is dropped for that subscriber alone (drop-newest), which keeps the
//! earliest queued events intact.

use crate::hub::events::{Event, Sample};
use crate::stats::SharedStats;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};

/// Default per-subscriber queue capacity.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 64;

/// Identity of one registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Receiving half of one subscription.
///
/// Yields events in the order the producer broadcast them. Once the hub
/// removes the subscription the queue is closed: already queued events can
/// still be drained, after which `recv` returns `None`.
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    receiver: mpsc::Receiver<Event>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Wait for the next event. `None` once the queue is closed and drained.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Take the next event without waiting.
    pub fn try_recv(&mut self) -> Result<Event, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn poll_recv(&mut self, cx: &mut Context<'_>) -> Poll<Option<Event>> {
        self.receiver.poll_recv(cx)
    }
}

/// Result of one broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fanout {
    /// Subscribers whose queue accepted the event
    pub delivered: usize,
    /// Subscribers whose queue was full
    pub dropped: usize,
}

struct HubState {
    latest: Sample,
    subscribers: HashMap<SubscriberId, mpsc::Sender<Event>>,
    closed: bool,
}

/// Shared fan-out point between the producer and every stream endpoint.
pub struct BroadcastHub {
    state: Mutex<HubState>,
    next_id: AtomicU64,
    capacity: usize,
    stats: SharedStats,
}

impl BroadcastHub {
    /// Create a hub whose subscriber queues hold `capacity` events each.
    pub fn new(capacity: usize, stats: SharedStats) -> Self {
        Self {
            state: Mutex::new(HubState {
                latest: Sample::default(),
                subscribers: HashMap::new(),
                closed: false,
            }),
            next_id: AtomicU64::new(1),
            capacity: capacity.max(1),
            stats,
        }
    }

    // A panic while holding the lock cannot leave HubState half-updated
    // (every mutation is a single insert/remove/assign), so poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new bounded queue and return its receiving half.
    ///
    /// After [`BroadcastHub::close_all`] the returned queue is already closed
    /// and nothing is registered.
    pub fn subscribe(&self) -> Subscriber {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = mpsc::channel(self.capacity);

        let count = {
            let mut state = self.lock();
            if state.closed {
                None
            } else {
                state.subscribers.insert(id, sender);
                Some(state.subscribers.len())
            }
        };

        let Some(count) = count else {
            tracing::debug!(subscriber = %id, "hub closed, subscription refused");
            return Subscriber { id, receiver };
        };

        self.stats.record_subscribe();
        tracing::debug!(subscriber = %id, active = count, "subscriber registered");

        Subscriber { id, receiver }
    }

    /// Remove a subscriber and close its queue.
    ///
    /// Returns `false` if it was already removed; repeated calls are no-ops.
    pub fn unsubscribe(&self, subscriber: &Subscriber) -> bool {
        self.unsubscribe_id(subscriber.id)
    }

    /// Remove a subscriber by id. See [`BroadcastHub::unsubscribe`].
    pub fn unsubscribe_id(&self, id: SubscriberId) -> bool {
        let (removed, count) = {
            let mut state = self.lock();
            // Dropping the sender under the lock closes the queue in the same
            // critical section that removes it from the fan-out set.
            let removed = state.subscribers.remove(&id).is_some();
            (removed, state.subscribers.len())
        };

        if removed {
            self.stats.record_unsubscribe();
            tracing::debug!(subscriber = %id, active = count, "subscriber removed");
        }
        removed
    }

    /// Publish an event to every registered subscriber without blocking.
    ///
    /// Data events also replace the latest sample before fan-out.
    pub fn broadcast(&self, event: Event) -> Fanout {
        let mut fanout = Fanout::default();
        {
            let mut state = self.lock();
            if let Event::Data(sample) = event {
                state.latest = sample;
            }

            for (id, sender) in state.subscribers.iter() {
                match sender.try_send(event) {
                    Ok(()) => fanout.delivered += 1,
                    Err(TrySendError::Full(_)) => fanout.dropped += 1,
                    Err(TrySendError::Closed(_)) => {
                        // Receiver is gone but its endpoint has not unsubscribed yet.
                        tracing::trace!(subscriber = %id, "skipping closed subscriber");
                    }
                }
            }
        }

        self.stats.record_fanout(fanout.delivered, fanout.dropped);
        fanout
    }

    /// The most recently broadcast data sample.
    pub fn snapshot(&self) -> Sample {
        self.lock().latest
    }

    /// Number of currently registered subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    /// Per-subscriber queue capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether [`BroadcastHub::close_all`] has run.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Remove and close every subscriber and refuse new ones (used on shutdown).
    ///
    /// Returns how many were closed.
    pub fn close_all(&self) -> usize {
        let closed: Vec<SubscriberId> = {
            let mut state = self.lock();
            state.closed = true;
            state.subscribers.drain().map(|(id, _)| id).collect()
        };

        for _ in &closed {
            self.stats.record_unsubscribe();
        }
        if !closed.is_empty() {
            tracing::info!(count = closed.len(), "closed all subscribers");
        }
        closed.len()
    }
}

impl fmt::Debug for BroadcastHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BroadcastHub")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}
