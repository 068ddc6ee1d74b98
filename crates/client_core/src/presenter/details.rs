//! View state of the post details screen.

use std::{sync::Arc, time::Duration};

use futures::{future, stream, StreamExt};
use shared::domain::{PostId, PostWithBody};
use tokio::{
    runtime::Handle,
    time::{sleep_until, Instant},
};
use tracing::debug;

use crate::{
    dao::RecordSource,
    outcome::{first_failure, FetchError, Outcome},
    replay::ReplayCell,
    signal::{
        combine_latest, distinct_until_changed, failures, only_success, start_with, Signal,
    },
};

/// Longest time a details screen waits for content before it is shown anyway.
pub const PRESENT_TIMEOUT: Duration = Duration::from_millis(500);

/// Which condition released the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentTrigger {
    Loaded,
    Failed,
    TimedOut,
}

pub struct DetailsPresenters {
    network: Handle,
    source: Arc<dyn RecordSource>,
}

impl DetailsPresenters {
    pub fn new(network: Handle, source: Arc<dyn RecordSource>) -> Self {
        Self { network, source }
    }

    pub fn presenter(&self, id: PostId) -> DetailsPresenter {
        DetailsPresenter::new(self.network.clone(), Arc::clone(&self.source), id)
    }
}

pub struct DetailsPresenter {
    id: PostId,
    post: ReplayCell<Outcome<PostWithBody>>,
}

impl DetailsPresenter {
    pub fn new(network: Handle, source: Arc<dyn RecordSource>, id: PostId) -> Self {
        let post = {
            let id = id.clone();
            ReplayCell::new(format!("post_{id}"), network, move || source.record_feed(&id))
        };
        Self { id, post }
    }

    pub fn id(&self) -> &PostId {
        &self.id
    }

    /// Number of times the underlying feed has been started.
    pub fn fetches(&self) -> u64 {
        self.post.connections()
    }

    fn names(&self) -> Signal<Outcome<String>> {
        self.post
            .subscribe()
            .map(|outcome| outcome.map(|post| post.name))
            .boxed()
    }

    fn bodies(&self) -> Signal<Outcome<String>> {
        self.post
            .subscribe()
            .map(|outcome| outcome.map(|post| post.body))
            .boxed()
    }

    pub fn title(&self) -> Signal<String> {
        only_success(self.names())
    }

    pub fn body(&self) -> Signal<String> {
        only_success(self.bodies())
    }

    /// `true` until both the name and the body paths have produced an
    /// outcome, then `false` for good.
    pub fn progress(&self) -> Signal<bool> {
        let loaded = combine_latest(self.names(), self.bodies()).map(|_| false);
        distinct_until_changed(start_with(true, loaded))
    }

    /// Latest failure on either path, the name path winning ties.
    pub fn error(&self) -> Signal<Option<FetchError>> {
        let names = start_with(None, failures(self.names()));
        let bodies = start_with(None, failures(self.bodies()));
        let latest = combine_latest(names, bodies)
            .map(|(name_failure, body_failure)| first_failure([name_failure, body_failure]));
        distinct_until_changed(start_with(None, latest))
    }

    /// Emits once: when loading finishes, when an error shows up, or
    /// [`PRESENT_TIMEOUT`] after this call, whichever comes first.
    pub fn ready_to_present(&self) -> Signal<PresentTrigger> {
        let deadline = Instant::now() + PRESENT_TIMEOUT;
        let mut loaded = self
            .progress()
            .filter(|loading| future::ready(!*loading))
            .boxed();
        let mut failed = self
            .error()
            .filter(|error| future::ready(error.is_some()))
            .boxed();
        let id = self.id.clone();
        stream::once(async move {
            let trigger = tokio::select! {
                biased;
                Some(_) = loaded.next() => PresentTrigger::Loaded,
                Some(_) = failed.next() => PresentTrigger::Failed,
                _ = sleep_until(deadline) => PresentTrigger::TimedOut,
            };
            debug!(post_id = %id, ?trigger, "details: ready to present");
            trigger
        })
        .boxed()
    }
}

#[cfg(test)]
#[path = "../tests/details_tests.rs"]
mod tests;
