// SPDX-FileCopyrightText: 2026 Confide Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driving the router with `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use confide_core::{ConversationId, ConversationStore, OwnerId};
use confide_gateway::handlers::CONVERSATION_ID_HEADER;
use confide_gateway::{GatewayState, StaticTokenResolver, build_router};
use confide_test_utils::{StreamScript, TestHarness};
use serde_json::{Value, json};
use tower::ServiceExt;

fn router(h: &TestHarness) -> Router {
    let resolver = StaticTokenResolver::new([
        ("t-alice".to_string(), OwnerId::new("alice")),
        ("t-bob".to_string(), OwnerId::new("bob")),
    ]);
    build_router(GatewayState::new(Arc::clone(&h.engine)), Arc::new(resolver))
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    serde_json::from_str(&body_text(response).await).unwrap()
}

/// Start a conversation over HTTP and return its id.
async fn chat(app: &Router, token: &str, message: &str) -> ConversationId {
    let response = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/conversations/chat",
            Some(token),
            Some(json!({ "message": message })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let id = response.headers()[CONVERSATION_ID_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    body_text(response).await;
    ConversationId::new(id)
}

#[tokio::test]
async fn health_is_public() {
    let h = TestHarness::new().await.unwrap();
    let response = router(&h)
        .oneshot(request("GET", "/health", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn api_rejects_missing_and_unknown_tokens() {
    let h = TestHarness::new().await.unwrap();
    let app = router(&h);

    for token in [None, Some("t-nobody")] {
        let response = app
            .clone()
            .oneshot(request("GET", "/api/conversations", token, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(h.provider.stream_calls(), 0);
}

#[tokio::test]
async fn chat_streams_plain_text_with_conversation_header() {
    let h = TestHarness::builder()
        .with_streams(vec![StreamScript::fragments(["I'm ", "here ", "for you"])])
        .build()
        .await
        .unwrap();

    let response = router(&h)
        .oneshot(request(
            "POST",
            "/api/conversations/chat",
            Some("t-alice"),
            Some(json!({ "message": "hello" })),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/plain; charset=utf-8"
    );
    let id = ConversationId::new(
        response.headers()[CONVERSATION_ID_HEADER]
            .to_str()
            .unwrap(),
    );
    assert_eq!(body_text(response).await, "I'm here for you");

    let conversation = h.store.get_conversation(&id).await.unwrap().unwrap();
    assert_eq!(conversation.owner_id, OwnerId::new("alice"));
}

#[tokio::test]
async fn chat_streams_sse_when_requested() {
    let h = TestHarness::new().await.unwrap();
    let mut req = request(
        "POST",
        "/api/conversations/chat",
        Some("t-alice"),
        Some(json!({ "message": "hello" })),
    );
    req.headers_mut()
        .insert(header::ACCEPT, "text/event-stream".parse().unwrap());

    let response = router(&h).oneshot(req).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("event: text_delta"));
    assert!(body.contains(r#"{"text":"mock "}"#));
    assert!(body.contains("event: message_stop"));
    assert!(!body.contains("event: error"));
}

#[tokio::test]
async fn sse_ends_with_error_event_on_upstream_failure() {
    let h = TestHarness::builder()
        .with_streams(vec![StreamScript::failing(["one ", "two "], "upstream reset")])
        .build()
        .await
        .unwrap();
    let mut req = request(
        "POST",
        "/api/conversations/chat",
        Some("t-alice"),
        Some(json!({ "message": "hello" })),
    );
    req.headers_mut()
        .insert(header::ACCEPT, "text/event-stream".parse().unwrap());

    let body = body_text(router(&h).oneshot(req).await.unwrap()).await;
    assert_eq!(body.matches("event: text_delta").count(), 2);
    assert!(body.contains("event: error"));
    assert!(body.contains("upstream reset"));
    assert!(!body.contains("event: message_stop"));
}

#[tokio::test]
async fn blank_message_is_bad_request() {
    let h = TestHarness::new().await.unwrap();
    let response = router(&h)
        .oneshot(request(
            "POST",
            "/api/conversations/chat",
            Some("t-alice"),
            Some(json!({ "message": "   " })),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    insta::assert_json_snapshot!(body_json(response).await, @r#"
    {
      "error": "validation error: message must not be blank"
    }
    "#);
}

#[tokio::test]
async fn ownership_and_existence_are_checked_before_streaming() {
    let h = TestHarness::new().await.unwrap();
    let app = router(&h);
    let id = chat(&app, "t-alice", "hello").await;
    let calls = h.provider.stream_calls();

    let forbidden = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/conversations/chat",
            Some("t-bob"),
            Some(json!({ "conversationId": id, "message": "hi" })),
        ))
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let missing = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/conversations/chat",
            Some("t-alice"),
            Some(json!({ "conversationId": "nope", "message": "hi" })),
        ))
        .await
        .unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    assert_eq!(h.provider.stream_calls(), calls);

    let detail = app
        .clone()
        .oneshot(request(
            "GET",
            &format!("/api/conversations/{id}"),
            Some("t-bob"),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(detail.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn conversation_crud_round() {
    let h = TestHarness::new().await.unwrap();
    let app = router(&h);
    let id = chat(&app, "t-alice", "hello").await;
    let uri = format!("/api/conversations/{id}");

    let list = body_json(
        app.clone()
            .oneshot(request("GET", "/api/conversations", Some("t-alice"), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["id"], id.as_str());
    assert!(list[0]["createdAt"].is_string());

    let bobs = body_json(
        app.clone()
            .oneshot(request("GET", "/api/conversations", Some("t-bob"), None))
            .await
            .unwrap(),
    )
    .await;
    assert!(bobs.as_array().unwrap().is_empty());

    let updated = app
        .clone()
        .oneshot(request(
            "PUT",
            &uri,
            Some("t-alice"),
            Some(json!({ "title": "Evening check-in", "memo": "calmer today" })),
        ))
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    assert_eq!(body_json(updated).await["title"], "Evening check-in");

    let detail = body_json(
        app.clone()
            .oneshot(request("GET", &uri, Some("t-alice"), None))
            .await
            .unwrap(),
    )
    .await;
    assert_eq!(detail["summaryMemo"], "calmer today");
    assert_eq!(detail["messages"][0]["text"], "hello");
    assert_eq!(detail["messages"][0]["sender"], "USER");

    let deleted = app
        .clone()
        .oneshot(request("DELETE", &uri, Some("t-alice"), None))
        .await
        .unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    let gone = app
        .clone()
        .oneshot(request("GET", &uri, Some("t-alice"), None))
        .await
        .unwrap();
    assert_eq!(gone.status(), StatusCode::NOT_FOUND);
}
