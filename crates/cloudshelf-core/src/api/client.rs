//! API client for the storage backend.
//!
//! Every protected call reads the credential from the `CredentialStore` at
//! the moment it is dispatched, so a token replaced mid-session is used by
//! the very next request while calls already in flight keep the token they
//! were sent with.

use std::sync::Arc;

use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::{CredentialStore, SessionEvent};
use crate::models::file::UploadPayload;
use crate::models::folder::NewFolder;
use crate::models::version::VersionsResponse;
use crate::models::{
    AccessType, Ack, AuthToken, Download, FileRecord, FileUpload, FileVersion, FilesAndFolders,
    Folder, Profile, Registration, SearchQuery, UploadedFile, UsageAnalytics,
};

use super::transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
use super::ApiError;

/// Whether a call needs the stored credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Auth {
    /// Protected resource: fail with `Unauthenticated` if no token is held.
    Required,
    /// Public resource: attach the token if one is held.
    Optional,
    /// Never attach a credential, even if one is held.
    Anonymous,
}

/// Gateway to the storage backend.
/// Clone is cheap - the transport and the credential store are shared.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
    store: Arc<CredentialStore>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<CredentialStore>) -> Self {
        Self { transport, store }
    }

    /// Client talking to `base_url` over HTTP.
    pub fn connect(base_url: &str, store: Arc<CredentialStore>) -> anyhow::Result<Self> {
        let transport = ReqwestTransport::new(base_url)?;
        Ok(Self::new(Arc::new(transport), store))
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    // ===== Dispatch =====

    /// Attach the credential, send, and classify the outcome.
    async fn dispatch(&self, mut request: ApiRequest, auth: Auth) -> Result<ApiResponse, ApiError> {
        request.bearer = match auth {
            Auth::Required => Some(self.store.get_token().ok_or(ApiError::Unauthenticated)?),
            Auth::Optional => self.store.get_token(),
            Auth::Anonymous => None,
        };
        let sent_token = request.bearer.clone();
        let method = request.method.clone();
        let path = request.path.clone();

        let response = self.transport.execute(request).await.map_err(|e| {
            warn!(%method, path = %path, error = %e, "Request not delivered");
            ApiError::from(e)
        })?;

        if response.status.is_success() {
            return Ok(response);
        }

        if response.status.as_u16() == 401 && auth == Auth::Required {
            warn!(%method, path = %path, "Credential rejected by backend");
            if let Some(ref token) = sent_token {
                self.invalidate(token);
            }
            return Err(ApiError::SessionInvalid);
        }

        let err = ApiError::from_status(response.status, &response.body);
        debug!(%method, path = %path, status = response.status.as_u16(), error = %err, "Request failed");
        Err(err)
    }

    /// Clear the store, but only if it still holds the rejected token. A token
    /// stored by a later login must survive a stale call's rejection.
    fn invalidate(&self, rejected: &str) {
        if self.store.clear_if(rejected) {
            self.store.notify(SessionEvent::SessionInvalid);
        } else {
            debug!("Rejected token already replaced, keeping current credential");
        }
    }

    fn parse<T: DeserializeOwned>(response: &ApiResponse, context: &str) -> Result<T, ApiError> {
        serde_json::from_slice(&response.body)
            .map_err(|e| ApiError::invalid_body(context, &response.body, e))
    }

    fn parse_ack(response: &ApiResponse, context: &str) -> Result<Ack, ApiError> {
        if response.body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Ack::default());
        }
        Self::parse(response, context)
    }

    fn to_json<B: Serialize>(body: &B) -> Result<serde_json::Value, ApiError> {
        serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidResponse(format!("Failed to encode request body: {}", e)))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self.dispatch(ApiRequest::get(path), Auth::Required).await?;
        Self::parse(&response, path)
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T, ApiError> {
        let request = ApiRequest::post(path).json(Self::to_json(body)?);
        let response = self.dispatch(request, Auth::Required).await?;
        Self::parse(&response, path)
    }

    // ===== Session =====

    /// Create an account. On success the returned credential becomes current.
    /// No credential is sent, since the new account has none yet.
    pub async fn register(&self, registration: &Registration) -> Result<AuthToken, ApiError> {
        let request = ApiRequest::post("/auth/oauth/register").json(Self::to_json(registration)?);
        let response = self.dispatch(request, Auth::Anonymous).await?;
        let token: AuthToken = Self::parse(&response, "register")?;

        self.store.set_token(token.access_token.clone());
        self.store.notify(SessionEvent::LoggedIn);
        info!(username = %registration.username, "Registered");
        Ok(token)
    }

    /// Log in with a username and password. On success the returned
    /// credential becomes current.
    pub async fn login(&self, username: &str, password: &str) -> Result<AuthToken, ApiError> {
        let request = ApiRequest::post("/auth/oauth/login")
            .form(&[("username", username), ("password", password)]);
        let response = self.dispatch(request, Auth::Optional).await?;
        let token: AuthToken = Self::parse(&response, "login")?;

        self.store.set_token(token.access_token.clone());
        self.store.notify(SessionEvent::LoggedIn);
        info!(username = %username, "Logged in");
        Ok(token)
    }

    /// Drop the credential locally. The backend keeps no session to end.
    pub fn logout(&self) {
        self.store.clear_token();
        self.store.notify(SessionEvent::LoggedOut);
        info!("Logged out");
    }

    pub async fn profile(&self) -> Result<Profile, ApiError> {
        self.get("/auth/profile").await
    }

    // ===== Files =====

    pub async fn upload_file(&self, upload: &FileUpload) -> Result<UploadedFile, ApiError> {
        let payload: UploadPayload<'_> = upload.payload();
        debug!(
            file_name = %upload.file_name,
            bytes = upload.content.len(),
            folder = ?upload.folder_name,
            "Uploading file"
        );
        self.post("/files/upload", &payload).await
    }

    pub async fn list_files(&self) -> Result<Vec<FileRecord>, ApiError> {
        self.get("/files").await
    }

    pub async fn list_files_and_folders(&self) -> Result<FilesAndFolders, ApiError> {
        self.get("/files-and-folders").await
    }

    /// Fetch file content. The body is returned byte-for-byte.
    pub async fn download_file(&self, file_id: i64) -> Result<Download, ApiError> {
        let path = format!("/files/download/{}", file_id);
        let response = self.dispatch(ApiRequest::get(path), Auth::Required).await?;

        let content_type = response.header(CONTENT_TYPE.as_str()).map(str::to_string);
        let file_name = response
            .header(CONTENT_DISPOSITION.as_str())
            .and_then(disposition_filename);
        Ok(Download {
            bytes: response.body,
            content_type,
            file_name,
        })
    }

    pub async fn delete_file(&self, file_id: i64) -> Result<Ack, ApiError> {
        let path = format!("/files/{}", file_id);
        let response = self.dispatch(ApiRequest::delete(path.as_str()), Auth::Required).await?;
        Self::parse_ack(&response, &path)
    }

    pub async fn search_files(&self, query: &SearchQuery) -> Result<Vec<FileRecord>, ApiError> {
        let request = ApiRequest::get("/files/search").query(query.to_pairs());
        let response = self.dispatch(request, Auth::Required).await?;
        Self::parse(&response, "/files/search")
    }

    pub async fn file_versions(&self, file_id: i64) -> Result<Vec<FileVersion>, ApiError> {
        let response: VersionsResponse = self.get(&format!("/files/{}/versions", file_id)).await?;
        Ok(response.versions)
    }

    pub async fn rollback(&self, file_id: i64, version_number: i64) -> Result<Ack, ApiError> {
        let body = serde_json::json!({
            "file_id": file_id,
            "version_number": version_number,
        });
        let response = self
            .dispatch(ApiRequest::post("/files/rollback").json(body), Auth::Required)
            .await?;
        Self::parse_ack(&response, "/files/rollback")
    }

    pub async fn share_file(&self, file_id: i64, user_id: &str, access_type: AccessType) -> Result<Ack, ApiError> {
        let path = format!("/share_file/{}", file_id);
        let body = serde_json::json!({
            "user_id": user_id,
            "access_type": access_type,
        });
        let response = self
            .dispatch(ApiRequest::post(path.as_str()).json(body), Auth::Required)
            .await?;
        Self::parse_ack(&response, &path)
    }

    // ===== Folders =====

    pub async fn create_folder(&self, folder_name: &str, parent_id: Option<i64>) -> Result<Folder, ApiError> {
        self.post("/folders", &NewFolder { folder_name, parent_id }).await
    }

    pub async fn list_folders(&self) -> Result<Vec<Folder>, ApiError> {
        self.get("/folders").await
    }

    pub async fn delete_folder(&self, folder_id: i64) -> Result<Ack, ApiError> {
        let path = format!("/folders/{}", folder_id);
        let response = self.dispatch(ApiRequest::delete(path.as_str()), Auth::Required).await?;
        Self::parse_ack(&response, &path)
    }

    // ===== Analytics =====

    pub async fn usage_analytics(&self) -> Result<UsageAnalytics, ApiError> {
        self.get("/Analytics").await
    }
}

/// File name from a `Content-Disposition` value such as
/// `attachment; filename="report.pdf"`.
///
/// Only the last path component is kept, so the result is always a bare
/// name that stays inside whatever directory the caller writes to.
fn disposition_filename(value: &str) -> Option<String> {
    let name = value
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))?
        .trim_matches('"');
    // Both separators, whatever the host platform.
    let base = name.rsplit(['/', '\\']).next()?.trim();
    match base {
        "" | "." | ".." => None,
        base => Some(base.to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================
