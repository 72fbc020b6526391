//! Session lifecycle: bootstrap, sign-in, registration and sign-out.
//!
//! `SessionContext` is the only component that moves a session between
//! phases. The credential store stays authoritative; the session keeps a
//! cached copy of the credential plus the profile it resolved to.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::{ApiClient, ApiError, ListenerId, SessionEvent};
use crate::models::UserProfile;

use super::credentials::{stored_token, CredentialStore, StoreError};
use super::validation::{validate_login, validate_registration, ValidationError};

/// Fallback shown when sign-in fails without a server message.
pub const LOGIN_FAILED_MESSAGE: &str = "Invalid credentials. Please try again.";

/// Fallback shown when sign-up fails without a server message.
pub const REGISTRATION_FAILED_MESSAGE: &str = "Registration failed. Please try again.";

const NETWORK_FAILED_MESSAGE: &str = "Unable to connect to server. Check your internet connection.";

// ============================================================================
// Session state
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Bootstrapping,
    Anonymous,
    Authenticated,
}

/// Snapshot of the client-side session.
///
/// `user` is only present once the credential has been accepted by at least
/// one authenticated call. A credential without a user is a sign-in or
/// bootstrap still in flight.
#[derive(Clone, PartialEq)]
pub struct Session {
    pub phase: SessionPhase,
    pub user: Option<UserProfile>,
    pub credential: Option<String>,
}

impl Session {
    fn bootstrapping(credential: Option<String>) -> Self {
        Self {
            phase: SessionPhase::Bootstrapping,
            user: None,
            credential,
        }
    }

    fn anonymous() -> Self {
        Self {
            phase: SessionPhase::Anonymous,
            user: None,
            credential: None,
        }
    }

    fn pending(credential: String) -> Self {
        Self {
            phase: SessionPhase::Anonymous,
            user: None,
            credential: Some(credential),
        }
    }

    fn authenticated(credential: String, user: UserProfile) -> Self {
        Self {
            phase: SessionPhase::Authenticated,
            user: Some(user),
            credential: Some(credential),
        }
    }

    pub fn is_bootstrapping(&self) -> bool {
        self.phase == SessionPhase::Bootstrapping
    }

    pub fn is_authenticated(&self) -> bool {
        self.phase == SessionPhase::Authenticated
    }
}

// Tokens never reach logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("phase", &self.phase)
            .field("user", &self.user)
            .field("has_credential", &self.credential.is_some())
            .finish()
    }
}

// ============================================================================
// Errors
// ============================================================================

#[derive(Error, Debug)]
pub enum SessionError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Failed to persist credential: {0}")]
    Storage(#[from] StoreError),

    #[error("Session was cleared before sign-in completed")]
    Superseded,

    #[error("Not signed in")]
    NotSignedIn,
}

impl SessionError {
    /// Sentence to show the user. Server-provided detail wins over
    /// `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            SessionError::Validation(e) => e.to_string(),
            SessionError::Api(ApiError::Validation(e)) => e.to_string(),
            SessionError::Api(e) if e.is_network() => NETWORK_FAILED_MESSAGE.to_string(),
            SessionError::Api(e) => e
                .detail()
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string()),
            SessionError::Storage(e) => format!("Could not save your session: {}", e),
            SessionError::Superseded => {
                "Your session ended while signing in. Please try again.".to_string()
            }
            SessionError::NotSignedIn => "You are not signed in.".to_string(),
        }
    }
}

// ============================================================================
// Context
// ============================================================================

pub struct SessionContext {
    api: ApiClient,
    credentials: Arc<dyn CredentialStore>,
    state: Arc<watch::Sender<Session>>,
    /// Bumped on every invalidation and sign-out. A profile response is only
    /// applied if the generation it started under is still current.
    generation: Arc<AtomicU64>,
    listener: ListenerId,
}

impl SessionContext {
    pub fn new(api: ApiClient) -> Self {
        let credentials = api.credentials();
        let (tx, _rx) = watch::channel(Session::bootstrapping(None));
        let state = Arc::new(tx);
        let generation = Arc::new(AtomicU64::new(0));

        let listener = api.on_session_event({
            let state = Arc::clone(&state);
            let generation = Arc::clone(&generation);
            move |event| {
                generation.fetch_add(1, Ordering::SeqCst);
                let changed = state.send_if_modified(|session| {
                    if *session == Session::anonymous() {
                        false
                    } else {
                        *session = Session::anonymous();
                        true
                    }
                });
                debug!(?event, changed, "Session cleared");
            }
        });

        Self {
            api,
            credentials,
            state,
            generation,
            listener,
        }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> Session {
        self.state.borrow().clone()
    }

    /// Observe session transitions.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    pub fn user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    fn set(&self, session: Session) {
        self.state.send_replace(session);
    }

    fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// True when nothing cleared the session since `generation` was taken and
    /// the store still holds the credential the request was made with.
    fn is_current(&self, generation: u64, token: &str) -> bool {
        self.current_generation() == generation
            && stored_token(self.credentials.as_ref()).as_deref() == Some(token)
    }

    /// Clear the store, but only if it still holds `token`.
    fn discard_credential(&self, token: &str) {
        if stored_token(self.credentials.as_ref()).as_deref() == Some(token) {
            if let Err(e) = self.credentials.clear() {
                warn!(error = %e, "Failed to clear credential");
            }
        }
    }

    fn clear_local(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.set(Session::anonymous());
    }

    /// Rebuild the session from a persisted credential. Never fails: a missing
    /// or rejected credential simply resolves to `Anonymous`.
    pub async fn bootstrap(&mut self) -> SessionPhase {
        let Some(token) = stored_token(self.credentials.as_ref()) else {
            debug!("No stored credential, starting signed out");
            self.set(Session::anonymous());
            return SessionPhase::Anonymous;
        };

        self.set(Session::bootstrapping(Some(token.clone())));
        let generation = self.current_generation();

        match self.api.restore_current_user().await {
            Ok(user) if self.is_current(generation, &token) => {
                info!(user_id = user.id, "Session restored");
                self.set(Session::authenticated(token, user));
                SessionPhase::Authenticated
            }
            Ok(_) => {
                debug!("Discarding profile for a credential cleared during bootstrap");
                self.set(Session::anonymous());
                SessionPhase::Anonymous
            }
            Err(e) => {
                debug!(error = %e, "Stored credential not accepted, starting signed out");
                self.discard_credential(&token);
                self.set(Session::anonymous());
                SessionPhase::Anonymous
            }
        }
    }

    /// Sign in. The credential is persisted before the profile is fetched;
    /// if the profile fetch fails the credential is removed again.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        validate_login(email, password)?;

        let grant = match self.api.login(email, password).await {
            Ok(grant) => grant,
            Err(e) => {
                warn!(error = %e, "Login failed");
                self.fail_sign_in(None);
                return Err(e.into());
            }
        };
        let token = grant.access_token;

        if let Err(e) = self.credentials.save(&token) {
            warn!(error = %e, "Failed to persist credential");
            self.fail_sign_in(None);
            return Err(e.into());
        }
        let generation = self.current_generation();
        self.set(Session::pending(token.clone()));

        match self.api.fetch_current_user().await {
            Ok(user) if self.is_current(generation, &token) => {
                info!(user_id = user.id, "Signed in");
                self.set(Session::authenticated(token, user.clone()));
                Ok(user)
            }
            Ok(_) => {
                debug!("Discarding profile for a credential cleared during sign-in");
                self.fail_sign_in(Some(&token));
                Err(SessionError::Superseded)
            }
            Err(e) => {
                warn!(error = %e, "Profile fetch after login failed");
                self.fail_sign_in(Some(&token));
                Err(e.into())
            }
        }
    }

    fn fail_sign_in(&self, token: Option<&str>) {
        match token {
            Some(token) => self.discard_credential(token),
            None => {
                if let Err(e) = self.credentials.clear() {
                    warn!(error = %e, "Failed to clear credential");
                }
            }
        }
        self.set(Session::anonymous());
    }

    /// Create an account, then sign in with the same credentials.
    pub async fn register(
        &mut self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<UserProfile, SessionError> {
        validate_registration(email, username, password)?;

        match self.api.register(email, username, password).await {
            Ok(created) => info!(user_id = created.id, "Account created"),
            Err(e) => {
                warn!(error = %e, "Registration failed");
                return Err(e.into());
            }
        }

        self.login(email, password).await
    }

    /// Re-fetch the profile for the current credential.
    pub async fn refresh_user(&mut self) -> Result<UserProfile, SessionError> {
        let Some(token) = stored_token(self.credentials.as_ref()) else {
            self.set(Session::anonymous());
            return Err(SessionError::NotSignedIn);
        };
        let generation = self.current_generation();

        let user = self.api.fetch_current_user().await?;
        if !self.is_current(generation, &token) {
            return Err(SessionError::Superseded);
        }
        self.set(Session::authenticated(token, user.clone()));
        Ok(user)
    }

    /// Sign out: forget the credential and tell listeners to return to the
    /// login entry point.
    pub fn logout(&mut self) {
        if let Err(e) = self.credentials.clear() {
            warn!(error = %e, "Failed to clear credential on logout");
        }
        self.clear_local();
        info!("Signed out");
        self.api.notify(SessionEvent::LoggedOut);
    }
}

impl Drop for SessionContext {
    fn drop(&mut self) {
        self.api.remove_listener(self.listener);
    }
}
