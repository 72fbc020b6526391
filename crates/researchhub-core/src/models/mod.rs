//! Data models for ResearchHub entities.
//!
//! These mirror the JSON shapes served by the ResearchHub API:
//!
//! - `UserProfile`, `TokenGrant`: account and credential payloads
//! - `Workspace`: a named collection of papers owned by a user
//! - `Paper`, `SearchResult`, `PaperImport`: library entries and search hits
//! - `Conversation`, `Message`, `ChatReply`: workspace chat history

pub mod chat;
pub mod paper;
pub mod user;
pub mod workspace;

pub use chat::{ChatReply, ChatRequest, Conversation, Message, Role};
pub use paper::{Paper, PaperImport, SearchResult};
pub use user::{TokenGrant, UserProfile};
pub use workspace::{NewWorkspace, Workspace};
