//! REST client against an in-process mock backend.

use std::net::SocketAddr;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use campus_chat::FetchError;
use campus_chat::api::{ChatApi, hydrate};
use campus_client::{ClientError, RestClient};
use campus_types::{ChannelRef, GroupId, UserId};

const TOKEN: &str = "test-token";

fn authorized(headers: &HeaderMap) -> Result<(), StatusCode> {
    let expected = format!("Bearer {}", TOKEN);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(StatusCode::UNAUTHORIZED),
    }
}

async fn login(Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    if body["password"] != "hunter2" {
        return Err(StatusCode::UNAUTHORIZED);
    }
    Ok(Json(json!({
        "token": TOKEN,
        "user": {
            "_id": "u-1",
            "firstName": "Mira",
            "lastName": "Chen",
            "department": "Biology",
            "role": "student"
        }
    })))
}

async fn forum_messages(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(json!([
        {
            "_id": "m-1",
            "sender": { "_id": "u-2", "firstName": "Omar", "lastName": "Haddad" },
            "content": "Lab moved to room 4",
            "channel": { "kind": "forum" },
            "createdAt": "2026-03-02T09:00:00Z"
        },
        {
            "id": "m-2",
            "sender": { "id": 7, "displayName": "Prof. Ito", "role": "lecturer" },
            "content": "Thanks",
            "channel": { "kind": "forum" },
            "created_at": "2026-03-02T09:01:00Z"
        }
    ])))
}

async fn forum_members(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(json!([
        { "_id": "u-2", "firstName": "Omar", "lastName": "Haddad", "role": "student" },
        { "_id": "7", "firstName": "Ken", "lastName": "Ito", "role": "lecturer" }
    ])))
}

async fn list_groups(headers: HeaderMap) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    Ok(Json(json!([
        { "_id": "g-1", "name": "Thesis crew", "memberCount": 3 }
    ])))
}

async fn group(headers: HeaderMap, Path(id): Path<String>) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    if id != "g-1" {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(json!({
        "groupName": "Thesis crew",
        "members": [{ "_id": "u-1", "firstName": "Mira" }],
        "messages": [{
            "_id": "gm-1",
            "sender": { "_id": { "_id": "u-1" }, "name": "Mira Chen" },
            "content": "Draft is up",
            "channel": { "kind": "group", "groupId": "g-1" },
            "createdAt": "2026-03-01T18:30:00Z"
        }]
    })))
}

async fn create_group(headers: HeaderMap, Json(body): Json<Value>) -> Result<Json<Value>, StatusCode> {
    authorized(&headers)?;
    if body["member_ids"].as_array().is_none_or(|ids| ids.is_empty()) {
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(json!({ "groupId": "g-new" })))
}

async fn spawn_backend() -> SocketAddr {
    let app = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/chat/forum/messages", get(forum_messages))
        .route("/api/chat/forum/members", get(forum_members))
        .route("/api/chat/groups", get(list_groups).post(create_group))
        .route("/api/chat/groups/{id}", get(group));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn client(addr: SocketAddr) -> RestClient {
    RestClient::new(&format!("http://{}/api", addr)).unwrap()
}

#[tokio::test]
async fn login_returns_token_and_viewer() {
    let addr = spawn_backend().await;
    let login = client(addr).await.login("mira@uni.test", "hunter2").await.unwrap();

    assert_eq!(login.token, TOKEN);
    assert_eq!(login.user.id, UserId::new("u-1"));
    assert_eq!(login.user.display_name(), "Mira Chen");
}

#[tokio::test]
async fn wrong_password_is_a_status_error() {
    let addr = spawn_backend().await;
    let err = client(addr).await.login("mira@uni.test", "nope").await.unwrap_err();

    assert!(matches!(err, ClientError::Status { status: 401, .. }));
}

#[tokio::test]
async fn forum_hydration_normalizes_identities() {
    let addr = spawn_backend().await;
    let api = client(addr).await.with_token(TOKEN);

    let hydration = hydrate(&api, &ChannelRef::Forum).await.unwrap();

    let senders: Vec<&str> = hydration.messages.iter().map(|m| m.sender.id.as_str()).collect();
    assert_eq!(senders, ["u-2", "7"]);
    assert_eq!(hydration.messages[0].sender.display_name, "Omar Haddad");
    assert_eq!(hydration.messages[1].sender.display_name, "Prof. Ito");
    assert_eq!(hydration.members.len(), 2);
    assert_eq!(hydration.members[1].id, UserId::new("7"));
    assert_eq!(hydration.name, None);
}

#[tokio::test]
async fn group_hydration_carries_name() {
    let addr = spawn_backend().await;
    let api = client(addr).await.with_token(TOKEN);

    let hydration = hydrate(&api, &ChannelRef::group("g-1")).await.unwrap();

    assert_eq!(hydration.name.as_deref(), Some("Thesis crew"));
    assert_eq!(hydration.messages[0].sender.id, UserId::new("u-1"));
    assert_eq!(hydration.messages[0].channel, ChannelRef::group("g-1"));
}

#[tokio::test]
async fn unknown_group_maps_to_status() {
    let addr = spawn_backend().await;
    let api = client(addr).await.with_token(TOKEN);

    let err = api.group_history(&GroupId::new("g-404")).await.unwrap_err();
    assert_eq!(err, FetchError::Status { status: 404 });
}

#[tokio::test]
async fn bad_token_maps_to_unauthorized() {
    let addr = spawn_backend().await;
    let api = client(addr).await.with_token("forged");

    assert_eq!(api.forum_history().await.unwrap_err(), FetchError::Unauthorized);
}

#[tokio::test]
async fn groups_list_and_create() {
    let addr = spawn_backend().await;
    let api = client(addr).await.with_token(TOKEN);

    let groups = api.groups().await.unwrap();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].member_count, 3);
    assert!(groups[0].last_message.is_none());

    let created = api
        .create_group("Reading group", &[UserId::new("u-2"), UserId::new("7")])
        .await
        .unwrap();
    assert_eq!(created, GroupId::new("g-new"));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let api = client(addr).await.with_token(TOKEN);
    assert!(matches!(api.groups().await, Err(FetchError::Transport(_))));
}
