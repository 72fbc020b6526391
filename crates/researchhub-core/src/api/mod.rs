//! REST API client module for the ResearchHub service.
//!
//! This module provides the `ApiClient`, the single gateway for every
//! outbound request. It attaches the stored bearer credential and turns
//! a 401 from any endpoint into a session invalidation.

pub mod client;
pub mod error;

pub use client::{
    ApiClient, ClientConfig, ListenerId, SessionEvent, DEFAULT_BASE_URL, DEFAULT_SEARCH_LIMIT,
    MAX_SEARCH_LIMIT,
};
pub use error::{ApiError, ApiResult};
