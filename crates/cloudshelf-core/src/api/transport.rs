//! HTTP transport seam.
//!
//! The gateway builds `ApiRequest`s and hands them to a `Transport`. The
//! production implementation is `ReqwestTransport`; tests substitute a
//! recording mock.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Method, StatusCode};
use thiserror::Error;
use tracing::debug;

/// No response was received (connection refused, DNS failure, reset...).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// One outbound call, fully resolved (credential included).
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base, starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            bearer: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = RequestBody::Json(body);
        self
    }

    pub fn form(mut self, fields: &[(&str, &str)]) -> Self {
        self.body = RequestBody::Form(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        );
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query = pairs;
        self
    }
}

/// Response as received: status, headers and the undecoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Send the request. Any HTTP status is a successful transport;
    /// `Err` means no response arrived.
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError>;
}

/// Transport backed by a shared `reqwest::Client`.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    /// No client-side timeout is configured; calls run until the transport
    /// itself gives up.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let ApiRequest {
            method,
            path,
            query,
            body,
            bearer,
        } = request;
        let url = self.url(&path);

        let mut builder = self.client.request(method.clone(), &url);
        if !query.is_empty() {
            builder = builder.query(&query);
        }
        if let Some(ref token) = bearer {
            builder = builder.bearer_auth(token);
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(ref value) => builder.json(value),
            RequestBody::Form(ref fields) => builder.form(fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(format!("Failed to send {} request to {}: {}", method, url, e)))?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(format!("Failed to read response from {}: {}", url, e)))?
            .to_vec();

        debug!(%method, url = %url, status = status.as_u16(), bytes = body.len(), "Response received");
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Recording transport for gateway tests.

    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
    use tokio::sync::{mpsc, Semaphore};

    use super::*;

    pub(crate) struct MockTransport {
        requests: Mutex<Vec<ApiRequest>>,
        responses: Mutex<VecDeque<Result<ApiResponse, TransportError>>>,
        gate: Option<Arc<Semaphore>>,
        dispatched: Option<mpsc::UnboundedSender<ApiRequest>>,
    }

    impl MockTransport {
        pub(crate) fn new() -> Self {
            Self {
                requests: Mutex::new(Vec::new()),
                responses: Mutex::new(VecDeque::new()),
                gate: None,
                dispatched: None,
            }
        }

        /// Transport that reports each dispatch and then holds the call until
        /// a permit is added to the returned semaphore.
        pub(crate) fn gated() -> (Self, Arc<Semaphore>, mpsc::UnboundedReceiver<ApiRequest>) {
            let gate = Arc::new(Semaphore::new(0));
            let (tx, rx) = mpsc::unbounded_channel();
            let mut transport = Self::new();
            transport.gate = Some(Arc::clone(&gate));
            transport.dispatched = Some(tx);
            (transport, gate, rx)
        }

        pub(crate) fn respond(&self, status: u16, body: &[u8], content_type: Option<&str>) -> &Self {
            let mut headers = HeaderMap::new();
            if let Some(ct) = content_type {
                headers.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
            }
            self.push(Ok(ApiResponse {
                status: StatusCode::from_u16(status).unwrap(),
                headers,
                body: body.to_vec(),
            }))
        }

        pub(crate) fn respond_json(&self, status: u16, body: serde_json::Value) -> &Self {
            self.respond(status, body.to_string().as_bytes(), Some("application/json"))
        }

        pub(crate) fn respond_with(&self, response: ApiResponse) -> &Self {
            self.push(Ok(response))
        }

        pub(crate) fn fail(&self, message: &str) -> &Self {
            self.push(Err(TransportError(message.to_string())))
        }

        fn push(&self, response: Result<ApiResponse, TransportError>) -> &Self {
            self.responses.lock().unwrap().push_back(response);
            self
        }

        pub(crate) fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn last_request(&self) -> ApiRequest {
            self.requests().pop().expect("no request was dispatched")
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(ref tx) = self.dispatched {
                let _ = tx.send(request);
            }
            if let Some(ref gate) = self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(TransportError("no response queued".to_string())))
        }
    }
}
