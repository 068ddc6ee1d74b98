//! Shared, replaying subscription to a lazily started source feed.
//!
//! A [`ReplayCell`] keeps the last value produced by its source. Subscribers
//! get that value immediately and every later one, each through its own
//! queue so a burst of values is never collapsed. The source is started when
//! the first subscriber arrives and aborted when the last one leaves; once the
//! source has run to completion it is never started again.

use std::{
    collections::HashMap,
    pin::Pin,
    sync::{Arc, Mutex, MutexGuard, PoisonError, Weak},
    task::{Context, Poll},
};

use futures::{stream::BoxStream, Stream, StreamExt};
use tokio::{runtime::Handle, sync::mpsc, task::JoinHandle};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;

type FeedFactory<T> = dyn Fn() -> BoxStream<'static, T> + Send + Sync;

pub struct ReplayCell<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for ReplayCell<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

struct Shared<T> {
    label: String,
    runtime: Handle,
    factory: Box<FeedFactory<T>>,
    state: Mutex<State<T>>,
}

/// Everything a subscriber or the forwarding task touches, behind one lock so
/// a new subscriber is seeded with `latest` and then sees every later value
/// exactly once.
struct State<T> {
    latest: Option<T>,
    subscribers: HashMap<u64, mpsc::UnboundedSender<T>>,
    next_subscriber: u64,
    task: Option<JoinHandle<()>>,
    generation: u64,
    completed: bool,
}

impl<T> Default for State<T> {
    fn default() -> Self {
        Self {
            latest: None,
            subscribers: HashMap::new(),
            next_subscriber: 0,
            task: None,
            generation: 0,
            completed: false,
        }
    }
}

impl<T> ReplayCell<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// `factory` must return a lazy stream; it is invoked once per connection
    /// and polled on `runtime`.
    pub fn new<F>(label: impl Into<String>, runtime: Handle, factory: F) -> Self
    where
        F: Fn() -> BoxStream<'static, T> + Send + Sync + 'static,
    {
        Self {
            shared: Arc::new(Shared {
                label: label.into(),
                runtime,
                factory: Box::new(factory),
                state: Mutex::new(State::default()),
            }),
        }
    }

    pub fn subscribe(&self) -> Replay<T> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let id = Shared::acquire(&self.shared, sender);
        Replay {
            values: UnboundedReceiverStream::new(receiver),
            lease: Lease {
                shared: Arc::clone(&self.shared),
                id,
            },
        }
    }

    pub fn latest(&self) -> Option<T> {
        self.shared.lock().latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// How many times the source has been started.
    pub fn connections(&self) -> u64 {
        self.shared.lock().generation
    }

    pub fn is_completed(&self) -> bool {
        self.shared.lock().completed
    }
}

impl<T> Shared<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(this: &Arc<Self>, sender: mpsc::UnboundedSender<T>) -> u64 {
        let mut state = this.lock();
        if let Some(latest) = &state.latest {
            // the receiver is still held by the caller
            let _ = sender.send(latest.clone());
        }
        let id = state.next_subscriber;
        state.next_subscriber += 1;
        state.subscribers.insert(id, sender);

        if state.task.is_none() && !state.completed {
            state.generation += 1;
            let generation = state.generation;
            let feed = (this.factory)();
            let weak = Arc::downgrade(this);
            debug!(
                cell = %this.label,
                generation,
                "replay: connecting source"
            );
            state.task = Some(this.runtime.spawn(forward(feed, weak, generation)));
        }
        id
    }

    fn publish(&self, value: T) {
        let mut state = self.lock();
        for subscriber in state.subscribers.values() {
            // a closed queue belongs to a lease that is being released
            let _ = subscriber.send(value.clone());
        }
        state.latest = Some(value);
    }

    fn release(&self, id: u64) {
        let mut state = self.lock();
        state.subscribers.remove(&id);
        if !state.subscribers.is_empty() {
            return;
        }
        if let Some(task) = state.task.take() {
            task.abort();
            debug!(
                cell = %self.label,
                generation = state.generation,
                "replay: released source after last subscriber left"
            );
        }
    }

    fn finish(&self, generation: u64) {
        let mut state = self.lock();
        if state.generation != generation {
            return;
        }
        state.task = None;
        state.completed = true;
        debug!(cell = %self.label, generation, "replay: source completed");
    }
}

async fn forward<T>(mut feed: BoxStream<'static, T>, shared: Weak<Shared<T>>, generation: u64)
where
    T: Clone + Send + Sync + 'static,
{
    while let Some(value) = feed.next().await {
        let Some(shared) = shared.upgrade() else {
            return;
        };
        shared.publish(value);
    }
    if let Some(shared) = shared.upgrade() {
        shared.finish(generation);
    }
}

struct Lease<T>
where
    T: Clone + Send + Sync + 'static,
{
    shared: Arc<Shared<T>>,
    id: u64,
}

impl<T> Drop for Lease<T>
where
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.shared.release(self.id);
    }
}

/// One subscription to a [`ReplayCell`]: the latest value at subscription
/// time, then every value the source produces, in order. Dropping it gives
/// up the lease on the source.
pub struct Replay<T>
where
    T: Clone + Send + Sync + 'static,
{
    values: UnboundedReceiverStream<T>,
    lease: Lease<T>,
}

impl<T> Replay<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn cell_label(&self) -> &str {
        &self.lease.shared.label
    }
}

impl<T> Stream for Replay<T>
where
    T: Clone + Send + Sync + 'static,
{
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.get_mut().values.poll_next_unpin(cx)
    }
}

#[cfg(test)]
#[path = "tests/replay_tests.rs"]
mod tests;
