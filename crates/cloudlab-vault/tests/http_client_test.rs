//! HttpVault against a minimal fake Vault HTTP server

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use cloudlab_config::VaultSettings;
use cloudlab_core::{EnsureOutcome, LabError, ensure};
use cloudlab_vault::{
    HttpVault, KvMount, VaultApi, VaultResource, VaultTarget, get_field, round_trip,
};
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const ROOT: &str = "root";

#[derive(Default)]
struct FakeState {
    mounts: BTreeMap<String, String>,
    secrets: BTreeMap<String, Value>,
    mount_posts: u32,
}

type Shared = Arc<Mutex<FakeState>>;

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get("X-Vault-Token")
        .and_then(|v| v.to_str().ok())
        .is_some_and(|t| t == ROOT)
}

fn denied() -> axum::response::Response {
    (
        StatusCode::FORBIDDEN,
        Json(json!({"errors": ["permission denied"]})),
    )
        .into_response()
}

async fn health() -> Json<Value> {
    Json(json!({"initialized": true, "sealed": false, "standby": false}))
}

async fn lookup_self(headers: HeaderMap) -> axum::response::Response {
    if authorized(&headers) {
        Json(json!({"data": {"id": ROOT}})).into_response()
    } else {
        denied()
    }
}

async fn list_mounts(State(state): State<Shared>, headers: HeaderMap) -> axum::response::Response {
    if !authorized(&headers) {
        return denied();
    }
    let state = state.lock().unwrap();
    let data: serde_json::Map<String, Value> = state
        .mounts
        .iter()
        .map(|(p, t)| (p.clone(), json!({"type": t})))
        .collect();
    Json(json!({"data": data})).into_response()
}

async fn enable_mount(
    State(state): State<Shared>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return denied();
    }
    let mut state = state.lock().unwrap();
    let key = format!("{}/", path);
    if state.mounts.contains_key(&key) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"errors": [format!("path is already in use at {}", key)]})),
        )
            .into_response();
    }
    let engine = body["type"].as_str().unwrap_or("unknown").to_string();
    state.mounts.insert(key, engine);
    state.mount_posts += 1;
    StatusCode::NO_CONTENT.into_response()
}

async fn read_secret(
    State(state): State<Shared>,
    Path(path): Path<String>,
    headers: HeaderMap,
) -> axum::response::Response {
    if !authorized(&headers) {
        return denied();
    }
    match state.lock().unwrap().secrets.get(&path) {
        Some(data) => Json(json!({"data": {"data": data, "metadata": {"version": 1}}})).into_response(),
        None => (StatusCode::NOT_FOUND, Json(json!({"errors": []}))).into_response(),
    }
}

async fn write_secret(
    State(state): State<Shared>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> axum::response::Response {
    if !authorized(&headers) {
        return denied();
    }
    state
        .lock()
        .unwrap()
        .secrets
        .insert(path, body["data"].clone());
    Json(json!({"data": {"version": 1}})).into_response()
}

async fn list_users(Query(query): Query<HashMap<String, String>>) -> axum::response::Response {
    assert_eq!(query.get("list").map(String::as_str), Some("true"));
    (StatusCode::NOT_FOUND, Json(json!({"errors": []}))).into_response()
}

async fn start_fake_vault() -> (String, Shared) {
    let state: Shared = Arc::new(Mutex::new(FakeState::default()));
    {
        let mut s = state.lock().unwrap();
        s.mounts.insert("secret/".to_string(), "kv".to_string());
        s.mounts.insert("sys/".to_string(), "system".to_string());
    }

    let app = Router::new()
        .route("/v1/sys/health", get(health))
        .route("/v1/auth/token/lookup-self", get(lookup_self))
        .route("/v1/sys/mounts", get(list_mounts))
        .route("/v1/sys/mounts/{path}", axum::routing::post(enable_mount))
        .route(
            "/v1/secret/data/{*path}",
            get(read_secret).post(write_secret),
        )
        .route("/v1/auth/userpass/users", get(list_users))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn client(address: &str) -> HttpVault {
    let settings = VaultSettings {
        address: address.to_string(),
        ..Default::default()
    };
    HttpVault::new(&settings).unwrap()
}

#[tokio::test]
async fn test_health_and_token_lookup() {
    let (address, _) = start_fake_vault().await;
    let vault = client(&address);

    assert!(vault.health().await.unwrap().is_ready());
    assert!(vault.lookup_self(ROOT).await.unwrap());
    assert!(!vault.lookup_self("wrong").await.unwrap());
}

#[tokio::test]
async fn test_calls_without_token_carry_vault_errors() {
    let (address, _) = start_fake_vault().await;
    let vault = client(&address);

    let err = vault.list_mounts().await.unwrap_err();
    assert!(matches!(err, LabError::Api(ref m) if m.contains("403") && m.contains("permission denied")));
}

#[tokio::test]
async fn test_ensure_mount_over_http() {
    let (address, state) = start_fake_vault().await;
    let vault = client(&address);
    vault.set_token(ROOT);

    let kv = VaultTarget::new(&vault, VaultResource::kv_engine("secret", 2));
    assert_eq!(ensure(&kv).await.unwrap(), EnsureOutcome::AlreadyPresent);

    let transit = VaultTarget::new(&vault, VaultResource::transit_engine("transit"));
    assert_eq!(ensure(&transit).await.unwrap(), EnsureOutcome::Created);
    assert_eq!(ensure(&transit).await.unwrap(), EnsureOutcome::AlreadyPresent);

    let state = state.lock().unwrap();
    assert_eq!(state.mount_posts, 1);
    assert_eq!(state.mounts.get("transit/").map(String::as_str), Some("transit"));
}

#[tokio::test]
async fn test_kv2_round_trip_and_overwrite() {
    let (address, _) = start_fake_vault().await;
    let vault = client(&address);
    vault.set_token(ROOT);
    let kv = KvMount::new("secret", 2);

    let read = round_trip(&vault, &kv, "lab/demo", "message", "first")
        .await
        .unwrap();
    assert_eq!(read, "first");

    round_trip(&vault, &kv, "lab/demo", "message", "second")
        .await
        .unwrap();
    assert_eq!(
        get_field(&vault, &kv, "lab/demo", "message").await.unwrap(),
        "second"
    );
}

#[tokio::test]
async fn test_empty_listing_is_not_an_error() {
    let (address, _) = start_fake_vault().await;
    let vault = client(&address);
    vault.set_token(ROOT);

    assert!(vault.list_users("userpass").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_refused_connection_is_connectivity_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let vault = client(&address);
    let err = vault.health().await.unwrap_err();
    assert!(err.is_connectivity(), "unexpected error: {err}");
}
