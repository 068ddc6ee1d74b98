use std::fmt;

use serde::{Deserialize, Serialize};

use crate::protocol::PostsResponse;

/// Opaque identifier assigned to a post by the guestbook backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub String);

impl PostId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostWithBody {
    pub id: PostId,
    pub name: String,
    pub body: String,
}

/// Accumulated view of the post list: every page fetched so far, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsPage {
    pub title: String,
    pub items: Vec<Post>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

impl PostsPage {
    pub fn has_more(&self) -> bool {
        self.next_token.is_some()
    }

    /// Merges the next page into this one. The title and continuation token
    /// always follow the most recent response.
    pub fn append(&mut self, response: PostsResponse) {
        self.title = response.title;
        self.items.extend(response.items);
        self.next_token = response.next_token;
    }
}

impl From<PostsResponse> for PostsPage {
    fn from(response: PostsResponse) -> Self {
        Self {
            title: response.title,
            items: response.items,
            next_token: response.next_token,
        }
    }
}
