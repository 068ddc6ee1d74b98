use super::*;
use axum::{
    extract::{Path, Query},
    http::{HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use shared::{domain::Post, error::ErrorCode};
use tokio::net::TcpListener;

#[derive(Deserialize)]
struct PageQuery {
    next_token: Option<String>,
}

async fn list_posts(Query(query): Query<PageQuery>) -> Json<PostsResponse> {
    let (items, next_token) = match query.next_token.as_deref() {
        None => (vec![("1", "hello")], Some("page-2".to_string())),
        Some("page-2") => (vec![("2", "again")], None),
        Some(_) => (Vec::new(), None),
    };
    Json(PostsResponse {
        title: "Guestbook".into(),
        items: items
            .into_iter()
            .map(|(id, name)| Post {
                id: PostId::new(id),
                name: name.into(),
            })
            .collect(),
        next_token,
    })
}

async fn get_post(Path(id): Path<String>) -> Result<Json<PostWithBody>, (StatusCode, String)> {
    if id == "missing" {
        return Err((
            StatusCode::NOT_FOUND,
            r#"{"error":{"code":404,"message":"post not found"}}"#.to_string(),
        ));
    }
    if id == "broken" {
        return Err((StatusCode::BAD_GATEWAY, "upstream exploded".to_string()));
    }
    Ok(Json(PostWithBody {
        id: PostId::new(id),
        name: "Alice".into(),
        body: "Hello".into(),
    }))
}

async fn create_post(
    headers: HeaderMap,
    Json(request): Json<AddPostRequest>,
) -> Result<Json<PostWithBody>, StatusCode> {
    let authorized = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        == Some("Bearer secret-token");
    if !authorized {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(PostWithBody {
        id: PostId::new("new"),
        name: request.name,
        body: request.body,
    }))
}

async fn spawn_guestbook_server() -> String {
    let app = Router::new()
        .route("/guestbook/v1/posts", get(list_posts).post(create_post))
        .route("/guestbook/v1/posts/:id", get(get_post));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });
    format!("http://{addr}/guestbook")
}

#[test]
fn base_url_gets_trailing_slash() {
    let service =
        HttpGuestbookService::new(Client::new(), "http://localhost:9/api/guestbook").expect("url");
    assert_eq!(service.base_url().as_str(), "http://localhost:9/api/guestbook/");
}

#[test]
fn rejects_invalid_base_url() {
    assert!(HttpGuestbookService::new(Client::new(), "not a url").is_err());
}

#[tokio::test]
async fn lists_posts_and_follows_next_token() {
    let base_url = spawn_guestbook_server().await;
    let service = HttpGuestbookService::new(Client::new(), &base_url).expect("service");

    let first = service.list_posts(None).await.expect("first page");
    assert_eq!(first.title, "Guestbook");
    assert_eq!(first.items[0].id, PostId::new("1"));
    assert_eq!(first.next_token.as_deref(), Some("page-2"));

    let second = service
        .list_posts(first.next_token.as_deref())
        .await
        .expect("second page");
    assert_eq!(second.items[0].name, "again");
    assert_eq!(second.next_token, None);
}

#[tokio::test]
async fn fetches_single_post() {
    let base_url = spawn_guestbook_server().await;
    let service = HttpGuestbookService::new(Client::new(), &base_url).expect("service");

    let post = service.get_post(&PostId::new("42")).await.expect("post");
    assert_eq!(post.id, PostId::new("42"));
    assert_eq!(post.name, "Alice");
    assert_eq!(post.body, "Hello");
}

#[tokio::test]
async fn decodes_error_envelope_into_api_exception() {
    let base_url = spawn_guestbook_server().await;
    let service = HttpGuestbookService::new(Client::new(), &base_url).expect("service");

    let err = service
        .get_post(&PostId::new("missing"))
        .await
        .expect_err("missing post");
    let exception = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(exception.code, ErrorCode::NotFound);
    assert_eq!(exception.message, "post not found");
}

#[tokio::test]
async fn non_envelope_error_keeps_status_and_body() {
    let base_url = spawn_guestbook_server().await;
    let service = HttpGuestbookService::new(Client::new(), &base_url).expect("service");

    let err = service
        .get_post(&PostId::new("broken"))
        .await
        .expect_err("broken post");
    let exception = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(exception.status, 502);
    assert_eq!(exception.code, ErrorCode::Internal);
    assert_eq!(exception.message, "upstream exploded");
}

#[tokio::test]
async fn create_post_sends_bearer_token() {
    let base_url = spawn_guestbook_server().await;
    let service = HttpGuestbookService::new(Client::new(), &base_url).expect("service");
    let request = AddPostRequest {
        name: "Bob".into(),
        body: "Nice page".into(),
    };

    let created = service
        .create_post("secret-token", &request)
        .await
        .expect("created");
    assert_eq!(created.name, "Bob");

    let err = service
        .create_post("wrong", &request)
        .await
        .expect_err("unauthorized");
    let exception = err.downcast_ref::<ApiException>().expect("api exception");
    assert_eq!(exception.code, ErrorCode::Unauthorized);
}
