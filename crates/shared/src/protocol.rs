//! Wire types of the guestbook REST API. Field names are snake_case on the wire.

use serde::{Deserialize, Serialize};

use crate::domain::Post;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostsResponse {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub items: Vec<Post>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPostRequest {
    pub name: String,
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: EndpointError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointError {
    pub code: u16,
    #[serde(default)]
    pub message: String,
}
