//! In-process axum server standing in for the document-chat backend.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::body::Body;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use docchat_core::event::EventBus;
use docchat_core::store::AuthStore;
use docchat_core::token::TokenStore;
use docchat_types::config::ClientConfig;
use serde_json::{Value, json};

use crate::http::HttpClient;

pub(crate) const SESSION_ID: &str = "9a7d3c1e-2b4f-4e6a-8c0d-1e2f3a4b5c6d";
pub(crate) const DOCUMENT_ID: &str = "3f1e2d3c-4b5a-4968-8776-a5b4c3d2e1f0";
const LINK_ID: &str = "5c4b3a29-1807-4f6e-9d5c-4b3a29180706";

#[derive(Default)]
pub(crate) struct ServerState {
    pub refresh_calls: AtomicUsize,
    pub me_calls: AtomicUsize,
    pub logout_calls: AtomicUsize,
    pub chat_queries: std::sync::Mutex<Vec<Value>>,
    pub registrations: std::sync::Mutex<Vec<Value>>,
    /// Uploaded file names with their sizes, in arrival order.
    pub uploads: std::sync::Mutex<Vec<(String, usize)>>,
    pub attached: std::sync::Mutex<Vec<String>>,
}

pub(crate) struct TestServer {
    pub addr: SocketAddr,
    pub state: Arc<ServerState>,
}

impl TestServer {
    pub async fn start() -> Self {
        let state = Arc::new(ServerState::default());
        let app = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/refresh", post(refresh))
            .route("/auth/logout", post(logout))
            .route("/auth/me", get(me))
            .route("/always-401", get(always_unauthorized))
            .route("/sessions/", get(list_sessions).post(create_session))
            .route(
                "/sessions/{id}",
                get(get_session).patch(rename_session).delete(delete_session),
            )
            .route("/sessions/add_documents", post(attach_document))
            .route("/sessions/{id}/messages", get(list_messages))
            .route("/sessions/{id}/documents", get(session_documents))
            .route("/sessions/{id}/documents/{doc_id}", axum::routing::delete(detach_document))
            .route("/documents/", get(list_documents).post(upload_documents))
            .route("/chat/", post(chat))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            base_url: self.base_url(),
            ..ClientConfig::default()
        }
    }
}

pub(crate) fn client_for(server: &TestServer, tokens: Arc<dyn TokenStore>) -> HttpClient {
    let auth = AuthStore::new(tokens, EventBus::default());
    HttpClient::new(&server.config(), auth).unwrap()
}

fn authorized(headers: &HeaderMap) -> bool {
    matches!(
        headers.get("authorization").and_then(|v| v.to_str().ok()),
        Some("Bearer valid") | Some("Bearer fresh")
    )
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"detail": "Could not validate credentials"})),
    )
        .into_response()
}

fn session_json(id: &str, name: &str) -> Value {
    json!({"id": id, "name": name, "updated_at": "2025-03-01T10:15:30.5"})
}

async fn login(Form(form): Form<HashMap<String, String>>) -> Response {
    if form.get("grant_type").map(String::as_str) != Some("password") {
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"detail": [{"msg": "grant_type required"}]})))
            .into_response();
    }
    let username = form.get("username").cloned().unwrap_or_default();
    let password = form.get("password").cloned().unwrap_or_default();
    match (username.as_str(), password.as_str()) {
        ("ada@example.com", "correct horse") => Json(json!({
            "status": "success",
            "message": "Login successful",
            "data": {"access_token": "valid", "refresh_token": "good-refresh", "token_type": "bearer"}
        }))
        .into_response(),
        ("ada@example.com", _) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid credentials"})),
        )
            .into_response(),
        ("locked@example.com", _) => Json(json!({
            "status": "error",
            "message": "Account locked",
            "data": null
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "User not found"})),
        )
            .into_response(),
    }
}

async fn refresh(
    State(state): State<Arc<ServerState>>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.refresh_calls.fetch_add(1, Ordering::SeqCst);
    match form.get("refresh_token").map(String::as_str) {
        Some("good-refresh") => Json(json!({
            "status": "success",
            "message": "Token refreshed",
            "data": {"access_token": "fresh", "token_type": "bearer"}
        }))
        .into_response(),
        Some("rotating-refresh") => Json(json!({
            "status": "success",
            "message": "Token refreshed",
            "data": {"access_token": "fresh", "refresh_token": "rotated"}
        }))
        .into_response(),
        Some("bare-refresh") => Json(json!({
            "status": "success",
            "message": "Token refreshed",
            "data": "fresh"
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({"detail": "Invalid refresh token"})),
        )
            .into_response(),
    }
}

async fn logout(State(state): State<Arc<ServerState>>) -> Response {
    state.logout_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!({"status": "success", "message": "Logged out", "data": null})).into_response()
}

async fn me(State(state): State<Arc<ServerState>>, headers: HeaderMap) -> Response {
    state.me_calls.fetch_add(1, Ordering::SeqCst);
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "status": "success",
        "message": "User fetched",
        "data": {"id": 7, "email": "ada@example.com", "firstname": "Ada", "lastname": "Lovelace"}
    }))
    .into_response()
}

async fn always_unauthorized() -> Response {
    unauthorized()
}

async fn list_sessions(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "status": "success",
        "message": "Chat sessions fetched successfully",
        "data": [
            session_json(SESSION_ID, "Quarterly report"),
            session_json("1b2c3d4e-5f60-4718-8a9b-0c1d2e3f4a5b", "Handbook")
        ]
    }))
    .into_response()
}

async fn create_session(headers: HeaderMap, Query(q): Query<HashMap<String, String>>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let name = q.get("session_name").cloned().unwrap_or_else(|| "New chat".to_string());
    Json(json!({
        "status": "success",
        "message": "Chat session created successfully",
        "data": {"data": session_json("0d9c8b7a-6f5e-4d3c-8b2a-190817263544", &name)}
    }))
    .into_response()
}

async fn get_session(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != SESSION_ID {
        return not_found("Chat session not found");
    }
    Json(json!({
        "status": "success",
        "message": "Chat session fetched successfully",
        "data": session_json(SESSION_ID, "Quarterly report")
    }))
    .into_response()
}

async fn rename_session(
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let Some(name) = q.get("name") else {
        return (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({"detail": [{"loc": ["query", "name"], "msg": "field required"}]})),
        )
            .into_response();
    };
    Json(json!({
        "status": "success",
        "message": "Chat session updated successfully",
        "data": session_json(&id, name)
    }))
    .into_response()
}

async fn delete_session(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != SESSION_ID {
        return not_found("Chat session not found");
    }
    Json(json!({
        "status": "success",
        "message": "Chat session deleted successfully",
        "data": {"message": "deleted"}
    }))
    .into_response()
}

async fn list_messages(
    headers: HeaderMap,
    Query(q): Query<HashMap<String, String>>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let page: u32 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let page_size: u32 = q.get("page_size").and_then(|p| p.parse().ok()).unwrap_or(20);
    let turn = "0b6f3c2e-8d55-4c43-a1d2-3f4e5a6b7c8d";
    Json(json!({
        "data": [
            {"id": turn, "role": "user", "content": format!("question on page {page}"), "created_at": "2025-03-01T10:00:00"},
            {"id": format!("{turn}-a"), "role": "assistant", "content": "answer", "created_at": "2025-03-01T10:00:00"}
        ],
        "meta": {"page": page, "page_size": page_size, "total": 3, "has_next_page": page < 2}
    }))
    .into_response()
}

async fn chat(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    state.chat_queries.lock().unwrap().push(body);
    let reply = "Der Bericht ist fertig – schön!".as_bytes().to_vec();
    // Split inside the multi-byte "–" and "ö".
    let dash = reply.iter().position(|&b| b == 0xE2).unwrap();
    let umlaut = reply.iter().position(|&b| b == 0xC3).unwrap();
    let chunks: Vec<Result<Vec<u8>, std::io::Error>> = vec![
        Ok(reply[..dash + 1].to_vec()),
        Ok(reply[dash + 1..umlaut + 1].to_vec()),
        Ok(reply[umlaut + 1..].to_vec()),
    ];
    Body::from_stream(futures_util::stream::iter(chunks)).into_response()
}

fn not_found(detail: &str) -> Response {
    (StatusCode::NOT_FOUND, Json(json!({"detail": detail}))).into_response()
}

async fn register(State(state): State<Arc<ServerState>>, Json(body): Json<Value>) -> Response {
    state.registrations.lock().unwrap().push(body.clone());
    if body["email"] == "ada@example.com" {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": "Email already registered"})),
        )
            .into_response();
    }
    (
        StatusCode::CREATED,
        Json(json!({
            "status": "success",
            "message": "User registered successfully",
            "data": {
                "email": body["email"],
                "firstname": body["firstname"],
                "lastname": body.get("lastname").cloned().unwrap_or(Value::Null)
            }
        })),
    )
        .into_response()
}

async fn upload_documents(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut processed = Vec::new();
    let mut skipped = Vec::new();
    while let Some(field) = multipart.next_field().await.unwrap() {
        assert_eq!(field.name(), Some("files"));
        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.unwrap();
        state.uploads.lock().unwrap().push((name.clone(), bytes.len()));
        if name == "handbook.pdf" {
            return Json(json!({
                "status": "error",
                "message": "A document with same name already exists for this user.",
                "data": {"filename": name}
            }))
            .into_response();
        }
        if name.ends_with(".pdf") || name.ends_with(".txt") || name.ends_with(".md") {
            processed.push(json!({"file": name, "job_id": format!("job-{}", processed.len() + 1)}));
        } else {
            skipped.push(name);
        }
    }
    Json(json!({
        "status": "success",
        "message": "Documents uploaded and queued for processing.",
        "data": {"processed_files": processed, "skipped_files": skipped, "time_taken": "0.01 seconds"}
    }))
    .into_response()
}

async fn list_documents(headers: HeaderMap) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "status": "success",
        "message": "Documents fetched successfully",
        "data": [
            {"id": DOCUMENT_ID, "filename": "handbook.pdf", "status": "completed", "created_at": "2025-03-01T09:00:00"},
            {"id": "6d5c4b3a-2918-4706-b5f4-e3d2c1b0a998", "filename": "notes.md", "status": "processing", "created_at": "2025-03-02T09:00:00"}
        ]
    }))
    .into_response()
}

fn link_json(session_id: &str) -> Value {
    json!({"id": LINK_ID, "session_id": session_id, "document_id": DOCUMENT_ID, "created_at": "2025-03-01T09:30:00"})
}

async fn attach_document(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let session_id = body["session_id"].as_str().unwrap_or_default().to_string();
    state
        .attached
        .lock()
        .unwrap()
        .push(body["document_id"].as_str().unwrap_or_default().to_string());
    Json(json!({
        "status": "success",
        "message": "Documents added to session successfully",
        "data": {"data": link_json(&session_id)}
    }))
    .into_response()
}

async fn session_documents(headers: HeaderMap, Path(id): Path<String>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    Json(json!({
        "status": "success",
        "message": "Documents fetched successfully",
        "data": {"data": [link_json(&id)]}
    }))
    .into_response()
}

async fn detach_document(headers: HeaderMap, Path((_id, doc_id)): Path<(String, String)>) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if doc_id != DOCUMENT_ID {
        return not_found("Document not linked to session");
    }
    Json(json!({
        "status": "success",
        "message": "Document removed from session successfully",
        "data": {"data": {"message": "deleted"}}
    }))
    .into_response()
}
