//! Client-side state behind the workspace screens.
//!
//! Each helper owns a cloned `ApiClient` and the list it renders, applying
//! server results the way the screens expect: deletes are optimistic and
//! rolled back on failure, duplicate imports count as already present, and
//! chat failures become an assistant notice in the thread.

pub mod chat;
pub mod dashboard;
pub mod library;
pub mod optimistic;
pub mod search;

pub use chat::ChatThread;
pub use dashboard::WorkspaceBoard;
pub use library::WorkspaceLibrary;
pub use optimistic::{Keyed, OptimisticList, Removed};
pub use search::{ImportOutcome, SearchSession};
