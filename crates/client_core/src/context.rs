//! Explicit dependency context: built once at startup and handed to the
//! presenters that need it.

use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use storage::CacheStore;
use tokio::runtime::Handle;
use tracing::info;

use crate::{
    api::{GuestbookService, HttpGuestbookService, DEFAULT_BASE_URL},
    cache::{MemoryResponseCache, ResponseCache},
    dao::{PostsDao, RecordSource},
    presenter::{details::DetailsPresenters, main_list::MainPresenter},
};

#[async_trait]
pub trait CurrentUser: Send + Sync {
    /// Bearer token of the signed-in user, `None` when signed out.
    async fn authorization(&self) -> Result<Option<String>>;
}

pub struct StaticCurrentUser {
    token: Option<String>,
}

impl StaticCurrentUser {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    pub fn anonymous() -> Self {
        Self { token: None }
    }
}

#[async_trait]
impl CurrentUser for StaticCurrentUser {
    async fn authorization(&self) -> Result<Option<String>> {
        Ok(self.token.clone())
    }
}

/// Where fetches run. Derived signals are delivered on whichever task polls
/// them.
#[derive(Clone)]
pub struct Schedulers {
    pub network: Handle,
}

impl Schedulers {
    pub fn current() -> Self {
        Self {
            network: Handle::current(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextOptions {
    pub base_url: String,
    /// Sqlite url for cached responses; responses are kept in memory only
    /// when unset.
    pub cache_database_url: Option<String>,
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
}

impl Default for ContextOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            cache_database_url: None,
            auth_token: None,
            request_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Clone)]
pub struct AppContext {
    schedulers: Schedulers,
    posts_dao: Arc<PostsDao>,
}

impl AppContext {
    /// Must be called from within a tokio runtime; fetches are spawned on it.
    pub async fn initialize(options: ContextOptions) -> Result<Self> {
        let http = Client::builder()
            .timeout(options.request_timeout)
            .build()
            .context("failed to build http client")?;
        let service = HttpGuestbookService::new(http, &options.base_url)?;
        let cache: Arc<dyn ResponseCache> = match &options.cache_database_url {
            Some(database_url) => Arc::new(CacheStore::new(database_url).await.with_context(
                || format!("failed to initialize response cache at '{database_url}'"),
            )?),
            None => Arc::new(MemoryResponseCache::default()),
        };
        info!(
            base_url = %service.base_url(),
            disk_cache = options.cache_database_url.is_some(),
            "context: initialized"
        );

        Ok(Self::with_dependencies(
            Schedulers::current(),
            Arc::new(service),
            cache,
            Arc::new(StaticCurrentUser::new(options.auth_token)),
        ))
    }

    pub fn with_dependencies(
        schedulers: Schedulers,
        service: Arc<dyn GuestbookService>,
        cache: Arc<dyn ResponseCache>,
        current_user: Arc<dyn CurrentUser>,
    ) -> Self {
        let posts_dao = Arc::new(PostsDao::new(
            schedulers.network.clone(),
            service,
            cache,
            current_user,
        ));
        Self {
            schedulers,
            posts_dao,
        }
    }

    pub fn posts_dao(&self) -> Arc<PostsDao> {
        Arc::clone(&self.posts_dao)
    }

    pub fn main_presenter(&self) -> MainPresenter {
        MainPresenter::new(self.posts_dao())
    }

    pub fn details_presenters(&self) -> DetailsPresenters {
        let source: Arc<dyn RecordSource> = self.posts_dao();
        DetailsPresenters::new(self.schedulers.network.clone(), source)
    }
}

#[cfg(test)]
#[path = "tests/context_tests.rs"]
mod tests;
