//! API client for the ResearchHub REST service.
//!
//! Every request goes through one pipeline: the bearer credential is read
//! from the credential store at send time, and any 401 clears the store.
//! Outside the startup check, a 401 on a request that carried a credential
//! also notifies session listeners before the error reaches the caller.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use crate::auth::credentials::{stored_token, CredentialStore};
use crate::auth::validation::validate_query;
use crate::models::user::{LoginRequest, RegisterRequest};
use crate::models::{
    ChatReply, ChatRequest, Conversation, NewWorkspace, Paper, PaperImport, SearchResult,
    TokenGrant, UserProfile, Workspace,
};

use super::error::{ApiError, ApiResult};

// ============================================================================
// Constants
// ============================================================================

/// Base URL used when nothing is configured.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// HTTP request timeout in seconds.
/// Chat replies come from a language model on the server, so this is generous.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Number of search results requested when the caller does not say.
pub const DEFAULT_SEARCH_LIMIT: u32 = 15;

/// Largest page the search endpoint accepts.
pub const MAX_SEARCH_LIMIT: u32 = 50;

// ============================================================================
// Session events
// ============================================================================

/// Session-level signals raised by the request pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The server rejected the credential attached to a request.
    Invalidated,
    /// The user signed out explicitly.
    LoggedOut,
}

pub type SessionListener = Arc<dyn Fn(SessionEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Whether a 401 on a request ends the session for listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OnReject {
    Invalidate,
    Quiet,
}

#[derive(Default)]
struct Listeners {
    next_id: AtomicU64,
    entries: RwLock<Vec<(ListenerId, SessionListener)>>,
}

// ============================================================================
// Client
// ============================================================================

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(REQUEST_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// API client for ResearchHub.
/// Clone is cheap - the connection pool, credential store and listener
/// registry are all shared between clones.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Arc<str>,
    credentials: Arc<dyn CredentialStore>,
    listeners: Arc<Listeners>,
}

impl ApiClient {
    pub fn new(config: ClientConfig, credentials: Arc<dyn CredentialStore>) -> ApiResult<Self> {
        let client = Client::builder().timeout(config.timeout).build()?;
        let base_url = config.base_url.trim_end_matches('/').to_string();

        Ok(Self {
            client,
            base_url: base_url.into(),
            credentials,
            listeners: Arc::new(Listeners::default()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn credentials(&self) -> Arc<dyn CredentialStore> {
        Arc::clone(&self.credentials)
    }

    /// Register a callback for session events. Listeners run synchronously on
    /// the task that observed the event.
    pub fn on_session_event<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(SessionEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(self.listeners.next_id.fetch_add(1, Ordering::Relaxed));
        match self.listeners.entries.write() {
            Ok(mut entries) => entries.push((id, Arc::new(listener))),
            Err(_) => warn!("Session listener registry poisoned, listener dropped"),
        }
        id
    }

    pub fn remove_listener(&self, id: ListenerId) {
        if let Ok(mut entries) = self.listeners.entries.write() {
            entries.retain(|(entry_id, _)| *entry_id != id);
        }
    }

    /// Deliver an event to every registered listener.
    pub fn notify(&self, event: SessionEvent) {
        // Snapshot first so a listener may (un)register without deadlocking.
        let listeners: Vec<SessionListener> = match self.listeners.entries.read() {
            Ok(entries) => entries.iter().map(|(_, l)| Arc::clone(l)).collect(),
            Err(_) => return,
        };
        debug!(?event, listeners = listeners.len(), "Dispatching session event");
        for listener in listeners {
            listener(event);
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, self.url(path))
    }

    /// Send a request through the credential pipeline.
    async fn execute(&self, builder: RequestBuilder, path: &str) -> ApiResult<Response> {
        self.execute_with(builder, path, OnReject::Invalidate).await
    }

    async fn execute_with(
        &self,
        builder: RequestBuilder,
        path: &str,
        on_reject: OnReject,
    ) -> ApiResult<Response> {
        let token = stored_token(self.credentials.as_ref());
        let builder = match token.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        debug!(path, has_token = token.is_some(), "Sending request");

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            let notify = token.is_some() && on_reject == OnReject::Invalidate;
            self.handle_unauthorized(path, notify);
        }

        let body = response.text().await.unwrap_or_default();
        debug!(path, status = status.as_u16(), "Request failed");
        Err(ApiError::from_status(status, &body))
    }

    /// A 401 always empties the store. Listeners only hear about it when the
    /// rejected request carried a credential and was not a startup check.
    fn handle_unauthorized(&self, path: &str, notify: bool) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear rejected credential");
        }
        if notify {
            info!(path, "Credential rejected by server, session invalidated");
            self.notify(SessionEvent::Invalidated);
        }
    }

    async fn parse<T: DeserializeOwned>(response: Response, path: &str) -> ApiResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| ApiError::InvalidResponse(format!("{}: {}", path, e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let response = self.execute(self.request(Method::GET, path), path).await?;
        Self::parse(response, path).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let builder = self.request(Method::POST, path).json(body);
        let response = self.execute(builder, path).await?;
        Self::parse(response, path).await
    }

    async fn delete(&self, path: &str) -> ApiResult<()> {
        self.execute(self.request(Method::DELETE, path), path).await?;
        Ok(())
    }

    // ===== Auth =====

    /// Create an account. Does not sign in.
    pub async fn register(
        &self,
        email: &str,
        username: &str,
        password: &str,
    ) -> ApiResult<UserProfile> {
        let body = RegisterRequest {
            email,
            username,
            password,
        };
        self.post("/auth/register", &body).await
    }

    /// Exchange email and password for a bearer credential.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<TokenGrant> {
        self.post("/auth/login", &LoginRequest { email, password }).await
    }

    pub async fn fetch_current_user(&self) -> ApiResult<UserProfile> {
        self.get("/auth/me").await
    }

    /// Check a persisted credential at startup. A rejection clears the store
    /// like any other 401 but is not reported to session listeners.
    pub async fn restore_current_user(&self) -> ApiResult<UserProfile> {
        let path = "/auth/me";
        let builder = self.request(Method::GET, path);
        let response = self.execute_with(builder, path, OnReject::Quiet).await?;
        Self::parse(response, path).await
    }

    // ===== Workspaces =====

    pub async fn list_workspaces(&self) -> ApiResult<Vec<Workspace>> {
        self.get("/workspaces/").await
    }

    pub async fn create_workspace(&self, name: &str, description: &str) -> ApiResult<Workspace> {
        let body = NewWorkspace {
            name: name.to_string(),
            description: description.to_string(),
        };
        self.post("/workspaces/", &body).await
    }

    pub async fn get_workspace(&self, id: i64) -> ApiResult<Workspace> {
        self.get(&format!("/workspaces/{}", id)).await
    }

    pub async fn delete_workspace(&self, id: i64) -> ApiResult<()> {
        self.delete(&format!("/workspaces/{}", id)).await
    }

    // ===== Papers =====

    /// Search the external catalogue. `limit` is clamped to what the server
    /// accepts; a query shorter than two characters is rejected locally.
    pub async fn search_papers(&self, query: &str, limit: u32) -> ApiResult<Vec<SearchResult>> {
        let query = validate_query(query)?;
        let limit = limit.clamp(1, MAX_SEARCH_LIMIT).to_string();
        let path = "/papers/search";
        let builder = self
            .request(Method::GET, path)
            .query(&[("q", query), ("limit", limit.as_str())]);
        let response = self.execute(builder, path).await?;
        Self::parse(response, path).await
    }

    /// Import a paper into a workspace. A paper whose external id is already
    /// in the workspace comes back as `ApiError::Conflict`.
    pub async fn import_paper(&self, paper: &PaperImport) -> ApiResult<Paper> {
        self.post("/papers/import", paper).await
    }

    pub async fn list_papers(&self, workspace_id: i64) -> ApiResult<Vec<Paper>> {
        self.get(&format!("/papers/workspace/{}", workspace_id)).await
    }

    pub async fn delete_paper(&self, paper_id: i64) -> ApiResult<()> {
        self.delete(&format!("/papers/{}", paper_id)).await
    }

    // ===== Chat =====

    pub async fn send_chat(
        &self,
        workspace_id: i64,
        message: &str,
        conversation_id: Option<i64>,
    ) -> ApiResult<ChatReply> {
        let body = ChatRequest {
            workspace_id,
            message,
            conversation_id,
        };
        self.post("/chat/", &body).await
    }

    pub async fn chat_history(&self, workspace_id: i64) -> ApiResult<Vec<Conversation>> {
        self.get(&format!("/chat/history/{}", workspace_id)).await
    }

    pub async fn delete_conversation(&self, conversation_id: i64) -> ApiResult<()> {
        self.delete(&format!("/chat/conversation/{}", conversation_id)).await
    }
}
