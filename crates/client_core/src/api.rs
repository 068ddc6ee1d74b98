use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{PostId, PostWithBody},
    error::ApiException,
    protocol::{AddPostRequest, ErrorEnvelope, PostsResponse},
};
use tracing::info;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://atlantean-field-90117.appspot.com/_ah/api/guestbook/";

#[async_trait]
pub trait GuestbookService: Send + Sync {
    async fn list_posts(&self, next_token: Option<&str>) -> Result<PostsResponse>;
    async fn get_post(&self, id: &PostId) -> Result<PostWithBody>;
    async fn create_post(
        &self,
        authorization: &str,
        request: &AddPostRequest,
    ) -> Result<PostWithBody>;
}

pub struct HttpGuestbookService {
    http: Client,
    base_url: Url,
}

impl HttpGuestbookService {
    pub fn new(http: Client, base_url: &str) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("invalid base url '{base_url}'"))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("failed to build endpoint url for '{path}'"))
    }
}

#[async_trait]
impl GuestbookService for HttpGuestbookService {
    async fn list_posts(&self, next_token: Option<&str>) -> Result<PostsResponse> {
        let mut request = self.http.get(self.endpoint("v1/posts")?);
        if let Some(token) = next_token {
            request = request.query(&[("next_token", token)]);
        }
        let response = request.send().await.context("failed to request posts")?;
        let posts: PostsResponse = decode(response).await?;
        info!(
            items = posts.items.len(),
            has_more = posts.next_token.is_some(),
            "api: fetched posts page"
        );
        Ok(posts)
    }

    async fn get_post(&self, id: &PostId) -> Result<PostWithBody> {
        let mut url = self.endpoint("v1/posts")?;
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("base url cannot carry path segments"))?
            .push(id.as_str());
        let response = self
            .http
            .get(url)
            .send()
            .await
            .with_context(|| format!("failed to request post {id}"))?;
        decode(response).await
    }

    async fn create_post(
        &self,
        authorization: &str,
        request: &AddPostRequest,
    ) -> Result<PostWithBody> {
        let response = self
            .http
            .post(self.endpoint("v1/posts")?)
            .bearer_auth(authorization)
            .json(request)
            .send()
            .await
            .context("failed to submit post")?;
        decode(response).await
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let exception = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => ApiException::from(envelope.error),
            Err(_) => ApiException::from_status(status.as_u16(), body),
        };
        return Err(exception.into());
    }
    response
        .json()
        .await
        .with_context(|| format!("failed to decode response from {status}"))
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
