use std::sync::Arc;

use futures::{future, StreamExt};
use shared::domain::{PostId, PostsPage};
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::debug;

use crate::{
    dao::PostsDao,
    outcome::FetchError,
    signal::{distinct_until_changed, failures, only_success, start_with, Signal},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterItem {
    pub id: PostId,
    pub text: String,
}

pub struct MainPresenter {
    posts_dao: Arc<PostsDao>,
    clicks: broadcast::Sender<AdapterItem>,
}

impl MainPresenter {
    pub fn new(posts_dao: Arc<PostsDao>) -> Self {
        let (clicks, _) = broadcast::channel(16);
        Self { posts_dao, clicks }
    }

    fn pages(&self) -> Signal<PostsPage> {
        only_success(self.posts_dao.posts())
    }

    pub fn title(&self) -> Signal<String> {
        distinct_until_changed(self.pages().map(|page| page.title))
    }

    pub fn items(&self) -> Signal<Vec<AdapterItem>> {
        self.pages()
            .map(|page| {
                page.items
                    .into_iter()
                    .map(|post| AdapterItem {
                        id: post.id,
                        text: post.name,
                    })
                    .collect()
            })
            .boxed()
    }

    /// `true` until the first page (cached or fetched) or failure arrives.
    pub fn progress(&self) -> Signal<bool> {
        distinct_until_changed(start_with(true, self.posts_dao.posts().map(|_| false)))
    }

    pub fn error(&self) -> Signal<Option<FetchError>> {
        distinct_until_changed(start_with(None, failures(self.posts_dao.posts())))
    }

    /// Items the user picked, in click order.
    pub fn open_details(&self) -> Signal<AdapterItem> {
        BroadcastStream::new(self.clicks.subscribe())
            .filter_map(|click| future::ready(click.ok()))
            .boxed()
    }

    /// Clicks made while nobody listens on [`Self::open_details`] are dropped.
    pub fn item_clicked(&self, item: AdapterItem) {
        if let Err(broadcast::error::SendError(item)) = self.clicks.send(item) {
            debug!(post_id = %item.id, "main: click dropped, no details listener");
        }
    }

    pub fn load_more(&self) {
        self.posts_dao.load_more();
    }
}

#[cfg(test)]
#[path = "../tests/main_list_tests.rs"]
mod tests;
