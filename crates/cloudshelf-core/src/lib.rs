//! Core library for cloudshelf.
//!
//! - `auth`: the credential store and its durable backends
//! - `api`: the authenticated request gateway for the storage backend
//! - `models`: wire records exchanged with the backend
//! - `config`: user configuration and directory layout

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod utils;

pub use api::{ApiClient, ApiError};
pub use auth::{CredentialStore, SessionEvent, SessionState};
pub use config::Config;
