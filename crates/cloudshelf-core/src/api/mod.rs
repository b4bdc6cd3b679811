//! Authenticated request gateway for the storage backend.
//!
//! `ApiClient` wraps every backend capability in the same discipline: read
//! the current credential from the `CredentialStore` at dispatch, attach it
//! as a bearer header, send through a `Transport`, and classify failures
//! into `ApiError`.
//!
//! The backend is a REST service rooted at e.g. `http://localhost:8000/S3`.

pub mod client;
pub mod error;
pub mod transport;

pub use client::ApiClient;
pub use error::ApiError;
pub use transport::{ApiRequest, ApiResponse, RequestBody, ReqwestTransport, Transport, TransportError};
