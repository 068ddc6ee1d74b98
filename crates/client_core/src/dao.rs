//! Data access for the guestbook: the paginated post list and single posts,
//! both served cache-first and then from the network.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::{anyhow, Result};
use futures::stream::{self, BoxStream, StreamExt};
use shared::{
    domain::{PostId, PostWithBody, PostsPage},
    protocol::{AddPostRequest, PostsResponse},
};
use tokio::{runtime::Handle, sync::Notify};
use tracing::{info, warn};

use crate::{
    api::GuestbookService,
    cache::{
        cached_then_network, post_cache_key, read_cached, write_cached, ResponseCache,
        POSTS_CACHE_KEY,
    },
    context::CurrentUser,
    outcome::Outcome,
    replay::{Replay, ReplayCell},
};

/// Supplies the feed of one post. The returned stream must be lazy: nothing
/// is fetched until it is polled.
pub trait RecordSource: Send + Sync {
    fn record_feed(&self, id: &PostId) -> BoxStream<'static, Outcome<PostWithBody>>;
}

pub struct PostsDao {
    service: Arc<dyn GuestbookService>,
    cache: Arc<dyn ResponseCache>,
    current_user: Arc<dyn CurrentUser>,
    load_more: Arc<LoadMoreRequests>,
    posts: ReplayCell<Outcome<PostsPage>>,
}

impl PostsDao {
    pub fn new(
        network: Handle,
        service: Arc<dyn GuestbookService>,
        cache: Arc<dyn ResponseCache>,
        current_user: Arc<dyn CurrentUser>,
    ) -> Self {
        let load_more = Arc::new(LoadMoreRequests::default());
        let posts = {
            let service = Arc::clone(&service);
            let cache = Arc::clone(&cache);
            let load_more = Arc::clone(&load_more);
            ReplayCell::new("posts", network, move || {
                Pager::new(
                    Arc::clone(&service),
                    Arc::clone(&cache),
                    Arc::clone(&load_more),
                )
                .into_stream()
            })
        };
        Self {
            service,
            cache,
            current_user,
            load_more,
            posts,
        }
    }

    /// Every page loaded so far, replayed to late subscribers.
    pub fn posts(&self) -> Replay<Outcome<PostsPage>> {
        self.posts.subscribe()
    }

    pub fn posts_cell(&self) -> &ReplayCell<Outcome<PostsPage>> {
        &self.posts
    }

    /// Asks for the next page. Requests made while a page is loading are
    /// dropped. After a failed page this retries it.
    pub fn load_more(&self) {
        self.load_more.request();
    }

    pub async fn create_post(&self, name: &str, body: &str) -> Result<PostWithBody> {
        let authorization = self
            .current_user
            .authorization()
            .await?
            .ok_or_else(|| anyhow!("signing in is required to add a post"))?;
        let request = AddPostRequest {
            name: name.to_string(),
            body: body.to_string(),
        };
        let post = self.service.create_post(&authorization, &request).await?;
        write_cached(self.cache.as_ref(), &post_cache_key(post.id.as_str()), &post).await;
        info!(post_id = %post.id, "dao: created post");
        Ok(post)
    }
}

impl RecordSource for PostsDao {
    fn record_feed(&self, id: &PostId) -> BoxStream<'static, Outcome<PostWithBody>> {
        let service = Arc::clone(&self.service);
        let id = id.clone();
        cached_then_network(
            Arc::clone(&self.cache),
            post_cache_key(id.as_str()),
            move || async move { service.get_post(&id).await },
        )
    }
}

/// Pending load-more flag shared between the DAO and its pager.
#[derive(Default)]
struct LoadMoreRequests {
    requested: AtomicBool,
    notify: Notify,
}

impl LoadMoreRequests {
    fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    async fn wait(&self) {
        while !self.requested.load(Ordering::SeqCst) {
            self.notify.notified().await;
        }
    }

    fn clear(&self) {
        self.requested.store(false, Ordering::SeqCst);
    }
}

enum Step {
    Cached,
    Fetch,
    AwaitMore,
    Exhausted,
}

/// Walks the post list page by page, waiting for a load-more request
/// between pages.
struct Pager {
    service: Arc<dyn GuestbookService>,
    cache: Arc<dyn ResponseCache>,
    load_more: Arc<LoadMoreRequests>,
    page: Option<PostsPage>,
    step: Step,
}

impl Pager {
    fn new(
        service: Arc<dyn GuestbookService>,
        cache: Arc<dyn ResponseCache>,
        load_more: Arc<LoadMoreRequests>,
    ) -> Self {
        Self {
            service,
            cache,
            load_more,
            page: None,
            step: Step::Cached,
        }
    }

    fn into_stream(self) -> BoxStream<'static, Outcome<PostsPage>> {
        stream::unfold(self, |mut pager| async move {
            let outcome = pager.advance().await?;
            Some((outcome, pager))
        })
        .boxed()
    }

    async fn advance(&mut self) -> Option<Outcome<PostsPage>> {
        loop {
            match self.step {
                Step::Cached => {
                    self.step = Step::Fetch;
                    if let Some(page) =
                        read_cached::<PostsPage>(self.cache.as_ref(), POSTS_CACHE_KEY).await
                    {
                        return Some(Outcome::Success(page));
                    }
                }
                Step::Fetch => {
                    let next_token = self.page.as_ref().and_then(|p| p.next_token.clone());
                    let result = self.service.list_posts(next_token.as_deref()).await;
                    self.load_more.clear();
                    self.step = Step::AwaitMore;
                    return Some(match result {
                        Ok(response) => Outcome::Success(self.merge(response).await),
                        Err(err) => {
                            warn!("dao: failed to load posts page: {err:#}");
                            Outcome::from_result(Err(err))
                        }
                    });
                }
                Step::AwaitMore => {
                    if self.page.as_ref().is_some_and(|p| !p.has_more()) {
                        self.step = Step::Exhausted;
                        continue;
                    }
                    self.load_more.wait().await;
                    self.step = Step::Fetch;
                }
                Step::Exhausted => return None,
            }
        }
    }

    async fn merge(&mut self, response: PostsResponse) -> PostsPage {
        let page = match self.page.take() {
            Some(mut page) => {
                page.append(response);
                page
            }
            None => {
                let page = PostsPage::from(response);
                write_cached(self.cache.as_ref(), POSTS_CACHE_KEY, &page).await;
                page
            }
        };
        info!(
            items = page.items.len(),
            has_more = page.has_more(),
            "dao: posts updated"
        );
        self.page = Some(page.clone());
        page
    }
}

#[cfg(test)]
#[path = "tests/dao_tests.rs"]
mod tests;
