//! HTTP surface of a node.

#![allow(clippy::unwrap_used)]

mod common;

use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use common::{Cluster, copy_of, wait_until};
use fedsync_federation::{ACTIVITY_JSON, ACTOR_HEADER, REQUESTER_HEADER};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .method("GET")
        .header(header::ACCEPT, ACTIVITY_JSON)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_serves_community_and_post() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "served").await;
    let app = c.alpha.router();

    let response = app.clone().oneshot(get("/c/main")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        ACTIVITY_JSON
    );
    let group = body_json(response).await;
    assert_eq!(group["type"], "Group");
    assert_eq!(group["id"], c.community.ap_id.as_str());

    let response = app.oneshot(get(post.ap_id.inner().path())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let page = body_json(response).await;
    assert_eq!(page["type"], "Page");
    assert_eq!(page["name"], "served");
}

#[tokio::test]
async fn test_mirror_permalink_redirects() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "elsewhere").await;
    let copy = copy_of(&c.beta, &post).await.unwrap();

    let response = c
        .beta
        .router()
        .oneshot(get(&format!("/post/{}", copy.id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(
        response.headers().get(header::LOCATION).unwrap(),
        post.ap_id.as_str()
    );
}

#[tokio::test]
async fn test_missing_and_blocked_look_the_same() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "hidden").await;
    c.alpha
        .site
        .set_instance_blocked(&c.alpha_admin, "gamma.example", true)
        .await
        .unwrap();
    let app = c.alpha.router();

    let missing = app.clone().oneshot(get("/post/9999")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    let missing = body_json(missing).await;

    let blocked = app
        .oneshot(
            Request::builder()
                .uri(post.ap_id.inner().path())
                .header(REQUESTER_HEADER, "https://gamma.example/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(blocked.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(blocked).await, missing);
    assert_eq!(missing["error"]["message"], "couldnt_find_object");
}

#[tokio::test]
async fn test_inbox_requires_verified_actor() {
    let c = Cluster::new().await;

    let response = c
        .beta
        .router()
        .oneshot(
            Request::builder()
                .uri("/inbox")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_inbox_accepts_and_processes_in_background() {
    let c = Cluster::new().await;
    let post = c.post(&c.alpha, &c.alice, "lock over http").await;
    let lock = json!({
        "type": "Lock",
        "id": "https://alpha.example/activities/lock/http",
        "actor": c.alpha_mod.ap_id,
        "object": post.ap_id,
        "audience": c.community.ap_id,
        "published": chrono::Utc::now(),
    });

    let response = c
        .beta
        .router()
        .oneshot(
            Request::builder()
                .uri("/inbox")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .header(ACTOR_HEADER, c.alpha_mod.ap_id.as_str())
                .body(Body::from(lock.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    let (beta, post) = (&c.beta, &post);
    let locked = wait_until(|| async move {
        copy_of(beta, post).await.is_some_and(|p| p.is_locked())
    })
    .await;
    assert!(locked);
}

#[tokio::test]
async fn test_inbox_rejects_malformed_json() {
    let c = Cluster::new().await;

    let response = c
        .beta
        .router()
        .oneshot(
            Request::builder()
                .uri("/inbox")
                .method("POST")
                .header(header::CONTENT_TYPE, "application/json")
                .header(ACTOR_HEADER, c.alice.ap_id.as_str())
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(response.status().is_client_error());
}
