//! Authentication module for managing the bearer credential.
//!
//! This module provides:
//! - `CredentialStore`: the single source of truth for the current token,
//!   a two-tier cache over a durable side-store
//! - `TokenBackend`: the durable tier (file, OS keychain, or memory)
//! - `SessionState` / `SessionEvent`: the session lifecycle as seen by the UI
//!
//! The token never expires locally. A rejected token is detected by the API
//! gateway, which clears the store and broadcasts `SessionEvent::SessionInvalid`.

pub mod backend;
pub mod session;
pub mod store;

pub use backend::{FileBackend, KeyringBackend, MemoryBackend, TokenBackend};
pub use session::{SessionEvent, SessionState};
pub use store::CredentialStore;
