//! ResearchHub client core.
//!
//! Talks to the ResearchHub REST service: sign-in and registration,
//! workspaces, paper search and import, and workspace chat. All requests go
//! through [`ApiClient`], which attaches the stored credential and reports a
//! rejected one to [`SessionContext`].

pub mod api;
pub mod auth;
pub mod board;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiResult, ClientConfig, SessionEvent};
pub use auth::{
    CredentialBackend, CredentialStore, Session, SessionContext, SessionError, SessionPhase,
};
pub use config::Config;
