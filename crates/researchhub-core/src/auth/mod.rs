//! Authentication module for managing the user session and its credential.
//!
//! This module provides:
//! - `CredentialStore`: persistent bearer-token storage (keychain, file or memory)
//! - `SessionContext`: the bootstrap / login / register / logout lifecycle
//! - `validation`: form checks that run before any request is sent
//!
//! There is no token expiry tracking: a credential is valid until the server
//! rejects it.

pub mod credentials;
pub mod session;
pub mod validation;

pub use credentials::{
    open_store, stored_token, CredentialBackend, CredentialStore, FileCredentialStore,
    KeyringCredentialStore, MemoryCredentialStore, StoreError,
};
pub use session::{
    Session, SessionContext, SessionError, SessionPhase, LOGIN_FAILED_MESSAGE,
    REGISTRATION_FAILED_MESSAGE,
};
pub use validation::{RegistrationForm, ValidationError};
