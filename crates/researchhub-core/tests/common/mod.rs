//! In-process fake of the ResearchHub API for integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use researchhub_core::auth::{CredentialStore, MemoryCredentialStore};
use researchhub_core::models::{Conversation, Message, Paper, Role, UserProfile, Workspace};
use researchhub_core::{ApiClient, ClientConfig};

const TIMESTAMP: &str = "2024-03-01T10:15:00.000000";

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: &'static str,
    pub path: String,
    pub authorization: Option<String>,
    pub query: HashMap<String, String>,
}

#[derive(Default)]
pub struct FakeState {
    next_id: AtomicI64,
    users: Mutex<Vec<(UserProfile, String)>>,
    tokens: Mutex<HashMap<String, i64>>,
    workspaces: Mutex<Vec<Workspace>>,
    papers: Mutex<Vec<(Paper, Option<String>)>>,
    conversations: Mutex<Vec<Conversation>>,
    requests: Mutex<Vec<Recorded>>,
    me_delay_ms: AtomicU64,
    fail_next_me: AtomicBool,
}

impl FakeState {
    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn record(
        &self,
        method: &'static str,
        path: String,
        headers: &HeaderMap,
        query: HashMap<String, String>,
    ) {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        self.requests.lock().unwrap().push(Recorded {
            method,
            path,
            authorization,
            query,
        });
    }

    fn authorize(
        &self,
        method: &'static str,
        path: String,
        headers: &HeaderMap,
    ) -> Result<i64, Response> {
        self.authorize_with_query(method, path, headers, HashMap::new())
    }

    fn authorize_with_query(
        &self,
        method: &'static str,
        path: String,
        headers: &HeaderMap,
        query: HashMap<String, String>,
    ) -> Result<i64, Response> {
        self.record(method, path, headers, query);
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));
        token
            .and_then(|t| self.tokens.lock().unwrap().get(t).copied())
            .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Could not validate credentials"))
    }

    fn user(&self, user_id: i64) -> Option<UserProfile> {
        self.users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| u.id == user_id)
            .map(|(u, _)| u.clone())
    }

    fn owns_workspace(&self, user_id: i64, workspace_id: i64) -> bool {
        self.workspaces
            .lock()
            .unwrap()
            .iter()
            .any(|w| w.id == workspace_id && w.owner_id == user_id)
    }

    // ===== Test controls =====

    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no request recorded")
    }

    /// Server-side revocation of every credential.
    pub fn revoke_all_tokens(&self) {
        self.tokens.lock().unwrap().clear();
    }

    pub fn issue_token(&self, user_id: i64) -> String {
        let token = format!("token-{}-{}", user_id, self.next_id());
        self.tokens.lock().unwrap().insert(token.clone(), user_id);
        token
    }

    /// Delay `/auth/me` responses. The user is resolved before the delay.
    pub fn set_me_delay(&self, delay: Duration) {
        self.me_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Answer the next authorized `/auth/me` with a 500.
    pub fn fail_next_profile(&self) {
        self.fail_next_me.store(true, Ordering::SeqCst);
    }

    pub fn paper_count(&self, workspace_id: i64) -> usize {
        self.papers
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p.workspace_id == workspace_id)
            .count()
    }

    /// Delete a paper behind the client's back.
    pub fn remove_paper(&self, paper_id: i64) {
        self.papers.lock().unwrap().retain(|(p, _)| p.id != paper_id);
    }

    pub fn remove_workspace(&self, workspace_id: i64) {
        self.workspaces
            .lock()
            .unwrap()
            .retain(|w| w.id != workspace_id);
    }
}

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn ok<T: serde::Serialize>(status: StatusCode, body: T) -> Response {
    (status, Json(body)).into_response()
}

type Shared = State<Arc<FakeState>>;

// ===== Auth =====

async fn register(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("POST", "/auth/register".into(), &headers, HashMap::new());
    let email = body["email"].as_str().unwrap_or_default().to_string();
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let password = body["password"].as_str().unwrap_or_default().to_string();

    let mut users = state.users.lock().unwrap();
    if users.iter().any(|(u, _)| u.email == email) {
        return error(StatusCode::BAD_REQUEST, "Email already registered");
    }
    if users.iter().any(|(u, _)| u.username == username) {
        return error(StatusCode::BAD_REQUEST, "Username already taken");
    }
    let user = UserProfile {
        id: state.next_id(),
        email,
        username,
        created_at: TIMESTAMP.to_string(),
    };
    users.push((user.clone(), password));
    ok(StatusCode::CREATED, user)
}

async fn login(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    state.record("POST", "/auth/login".into(), &headers, HashMap::new());
    let email = body["email"].as_str().unwrap_or_default();
    let password = body["password"].as_str().unwrap_or_default();

    let user_id = state
        .users
        .lock()
        .unwrap()
        .iter()
        .find(|(u, p)| u.email == email && p == password)
        .map(|(u, _)| u.id);
    match user_id {
        Some(user_id) => {
            let token = state.issue_token(user_id);
            ok(
                StatusCode::OK,
                json!({ "access_token": token, "token_type": "bearer" }),
            )
        }
        None => error(StatusCode::UNAUTHORIZED, "Incorrect email or password"),
    }
}

async fn me(State(state): Shared, headers: HeaderMap) -> Response {
    let user = match state.authorize("GET", "/auth/me".into(), &headers) {
        Ok(user_id) => state.user(user_id),
        Err(response) => return response,
    };
    if state.fail_next_me.swap(false, Ordering::SeqCst) {
        return error(StatusCode::INTERNAL_SERVER_ERROR, "Profile service unavailable");
    }
    let delay = state.me_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    match user {
        Some(user) => ok(StatusCode::OK, user),
        None => error(StatusCode::UNAUTHORIZED, "User not found"),
    }
}

// ===== Workspaces =====

async fn list_workspaces(State(state): Shared, headers: HeaderMap) -> Response {
    let user_id = match state.authorize("GET", "/workspaces/".into(), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let mine: Vec<Workspace> = state
        .workspaces
        .lock()
        .unwrap()
        .iter()
        .filter(|w| w.owner_id == user_id)
        .cloned()
        .collect();
    ok(StatusCode::OK, mine)
}

async fn create_workspace(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let user_id = match state.authorize("POST", "/workspaces/".into(), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let workspace = Workspace {
        id: state.next_id(),
        name: body["name"].as_str().unwrap_or_default().to_string(),
        description: body["description"].as_str().unwrap_or_default().to_string(),
        created_at: TIMESTAMP.to_string(),
        owner_id: user_id,
        paper_count: 0,
    };
    state.workspaces.lock().unwrap().push(workspace.clone());
    ok(StatusCode::CREATED, workspace)
}

async fn get_workspace(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let user_id = match state.authorize("GET", format!("/workspaces/{}", id), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let found = state
        .workspaces
        .lock()
        .unwrap()
        .iter()
        .find(|w| w.id == id && w.owner_id == user_id)
        .cloned();
    match found {
        Some(mut workspace) => {
            workspace.paper_count = state.paper_count(id) as i64;
            ok(StatusCode::OK, workspace)
        }
        None => error(StatusCode::NOT_FOUND, "Workspace not found"),
    }
}

async fn delete_workspace(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let user_id = match state.authorize("DELETE", format!("/workspaces/{}", id), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if !state.owns_workspace(user_id, id) {
        return error(StatusCode::NOT_FOUND, "Workspace not found");
    }
    state.remove_workspace(id);
    StatusCode::NO_CONTENT.into_response()
}

// ===== Papers =====

async fn search_papers(
    State(state): Shared,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    if let Err(response) =
        state.authorize_with_query("GET", "/papers/search".into(), &headers, query.clone())
    {
        return response;
    }
    let limit: usize = query
        .get("limit")
        .and_then(|l| l.parse().ok())
        .unwrap_or(15);
    let q = query.get("q").cloned().unwrap_or_default();
    let results: Vec<Value> = (1..=limit.min(3))
        .map(|n| {
            json!({
                "title": format!("{} study #{}", q, n),
                "authors": "Ada Lovelace, Alan Turing",
                "abstract": "No abstract available.",
                "year": 2020 + n as i64,
                "doi": null,
                "url": format!("https://openalex.org/W{}", n),
                "source": "openalex",
                "external_id": format!("W{}", n),
            })
        })
        .collect();
    ok(StatusCode::OK, results)
}

async fn import_paper(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user_id = match state.authorize("POST", "/papers/import".into(), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let workspace_id = body["workspace_id"].as_i64().unwrap_or_default();
    if !state.owns_workspace(user_id, workspace_id) {
        return error(StatusCode::NOT_FOUND, "Workspace not found");
    }
    let external_id = body["external_id"].as_str().map(str::to_string);

    let mut papers = state.papers.lock().unwrap();
    if external_id.is_some()
        && papers
            .iter()
            .any(|(p, ext)| p.workspace_id == workspace_id && *ext == external_id)
    {
        return error(StatusCode::CONFLICT, "Paper already in workspace");
    }
    let paper = Paper {
        id: state.next_id(),
        title: body["title"].as_str().unwrap_or_default().to_string(),
        authors: body["authors"].as_str().unwrap_or_default().to_string(),
        r#abstract: body["abstract"].as_str().unwrap_or_default().to_string(),
        year: body["year"].as_i64().map(|y| y as i32),
        doi: body["doi"].as_str().map(str::to_string),
        url: body["url"].as_str().map(str::to_string),
        source: body["source"].as_str().unwrap_or("openalex").to_string(),
        imported_at: TIMESTAMP.to_string(),
        workspace_id,
    };
    papers.push((paper.clone(), external_id));
    ok(StatusCode::CREATED, paper)
}

async fn list_papers(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let user_id = match state.authorize("GET", format!("/papers/workspace/{}", id), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if !state.owns_workspace(user_id, id) {
        return error(StatusCode::NOT_FOUND, "Workspace not found");
    }
    let papers: Vec<Paper> = state
        .papers
        .lock()
        .unwrap()
        .iter()
        .filter(|(p, _)| p.workspace_id == id)
        .map(|(p, _)| p.clone())
        .collect();
    ok(StatusCode::OK, papers)
}

async fn delete_paper(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let user_id = match state.authorize("DELETE", format!("/papers/{}", id), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let workspace_id = state
        .papers
        .lock()
        .unwrap()
        .iter()
        .find(|(p, _)| p.id == id)
        .map(|(p, _)| p.workspace_id);
    match workspace_id {
        Some(ws) if state.owns_workspace(user_id, ws) => {
            state.papers.lock().unwrap().retain(|(p, _)| p.id != id);
            StatusCode::NO_CONTENT.into_response()
        }
        _ => error(StatusCode::NOT_FOUND, "Paper not found"),
    }
}

// ===== Chat =====

async fn chat(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let user_id = match state.authorize("POST", "/chat/".into(), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let workspace_id = body["workspace_id"].as_i64().unwrap_or_default();
    if !state.owns_workspace(user_id, workspace_id) {
        return error(StatusCode::NOT_FOUND, "Workspace not found");
    }
    let text = body["message"].as_str().unwrap_or_default().to_string();
    let reply = format!("Echo: {}", text);

    let mut conversations = state.conversations.lock().unwrap();
    let conversation_id = match body["conversation_id"].as_i64() {
        Some(id) if conversations.iter().any(|c| c.id == id) => id,
        Some(_) => return error(StatusCode::NOT_FOUND, "Conversation not found"),
        None => {
            let id = state.next_id();
            conversations.push(Conversation {
                id,
                title: text.chars().take(60).collect(),
                created_at: TIMESTAMP.to_string(),
                workspace_id,
                messages: Vec::new(),
            });
            id
        }
    };
    let conversation = conversations
        .iter_mut()
        .find(|c| c.id == conversation_id)
        .expect("conversation exists");
    for (role, content) in [(Role::User, text), (Role::Assistant, reply.clone())] {
        conversation.messages.push(Message {
            id: state.next_id(),
            role,
            content,
            created_at: TIMESTAMP.to_string(),
            conversation_id,
        });
    }
    ok(
        StatusCode::OK,
        json!({ "conversation_id": conversation_id, "reply": reply }),
    )
}

async fn chat_history(State(state): Shared, headers: HeaderMap, Path(id): Path<i64>) -> Response {
    let user_id = match state.authorize("GET", format!("/chat/history/{}", id), &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    if !state.owns_workspace(user_id, id) {
        return error(StatusCode::NOT_FOUND, "Workspace not found");
    }
    let history: Vec<Conversation> = state
        .conversations
        .lock()
        .unwrap()
        .iter()
        .filter(|c| c.workspace_id == id)
        .cloned()
        .collect();
    ok(StatusCode::OK, history)
}

async fn delete_conversation(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    if let Err(response) =
        state.authorize("DELETE", format!("/chat/conversation/{}", id), &headers)
    {
        return response;
    }
    let mut conversations = state.conversations.lock().unwrap();
    let before = conversations.len();
    conversations.retain(|c| c.id != id);
    if conversations.len() == before {
        return error(StatusCode::NOT_FOUND, "Conversation not found");
    }
    StatusCode::NO_CONTENT.into_response()
}

// ===== Server =====

pub struct FakeServer {
    pub base_url: String,
    pub state: Arc<FakeState>,
    handle: JoinHandle<()>,
}

impl FakeServer {
    pub async fn start() -> Self {
        let state = Arc::new(FakeState::default());
        let app = Router::new()
            .route("/auth/register", post(register))
            .route("/auth/login", post(login))
            .route("/auth/me", get(me))
            .route("/workspaces/", get(list_workspaces).post(create_workspace))
            .route("/workspaces/:id", get(get_workspace).delete(delete_workspace))
            .route("/papers/search", get(search_papers))
            .route("/papers/import", post(import_paper))
            .route("/papers/workspace/:id", get(list_papers))
            .route("/papers/:id", delete(delete_paper))
            .route("/chat/", post(chat))
            .route("/chat/history/:id", get(chat_history))
            .route("/chat/conversation/:id", delete(delete_conversation))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("local TCP listener should bind");
        let addr = listener.local_addr().expect("resolved local listener address");
        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn client(&self, store: Arc<dyn CredentialStore>) -> ApiClient {
        ApiClient::new(ClientConfig::new(&self.base_url), store).expect("client builds")
    }

    /// A client over a fresh in-memory store, returned with the store.
    pub fn memory_client(&self) -> (ApiClient, Arc<MemoryCredentialStore>) {
        let store = Arc::new(MemoryCredentialStore::new());
        (self.client(store.clone()), store)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub const EMAIL: &str = "ada@uni.edu";
pub const USERNAME: &str = "ada";
pub const PASSWORD: &str = "analytical-engine";
