use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Method;
use serde::{Serialize, de::DeserializeOwned};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    error::{ClientError, ClientResult},
    navigation::{Navigator, Redirect, Route},
    session::SessionHandle,
};

/// Header used to correlate a client request with server-side logs.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Status that signals a missing, expired or invalid credential.
pub const UNAUTHORIZED: u16 = 401;

// --- Request / Response ---

/// FilePart
///
/// One file inside a multipart body. The data is shared, so cloning a request
/// does not copy file contents.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub content_type: String,
    pub data: Arc<[u8]>,
}

#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FilePart>),
}

/// ApiRequest
///
/// A transport-neutral description of one API call. Paths are relative to the
/// configured API base URL. The gateway fills in `bearer` and `request_id`.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
    /// Credential-exchange calls (login, register) never carry a token.
    pub anonymous: bool,
    pub bearer: Option<String>,
    pub request_id: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: RequestBody::Empty,
            anonymous: false,
            bearer: None,
            request_id: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FilePart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.anonymous = true;
        self
    }
}

/// ApiResponse
///
/// Status and raw body of a completed exchange.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// A response with a JSON body. Serializing a `serde_json::Value` cannot fail.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::new(status, body.to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> ClientResult<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// detail
    ///
    /// The human-readable failure message. The API reports errors as
    /// `{"detail": "..."}`; validation errors put a list there instead.
    pub fn detail(&self) -> String {
        if let Ok(value) = serde_json::from_slice::<serde_json::Value>(&self.body) {
            match value.get("detail") {
                Some(serde_json::Value::String(detail)) => return detail.clone(),
                Some(other) => return other.to_string(),
                None => {}
            }
        }
        let text = String::from_utf8_lossy(&self.body).trim().to_string();
        if text.is_empty() {
            format!("request failed with status {}", self.status)
        } else {
            text
        }
    }
}

// 1. Transport Contract
/// Transport
///
/// Performs the raw HTTP exchange. Any status code is a successful exchange;
/// only connection-level problems are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse>;
}

// 2. The Real Implementation (reqwest)
/// ReqwestTransport
///
/// Sends requests to `base_url` (e.g. `http://localhost:8000/api`).
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: &str, timeout: Duration) -> ClientResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        let mut builder = self
            .client
            .request(request.method.clone(), self.url(&request.path));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(request_id) = &request.request_id {
            builder = builder.header(REQUEST_ID_HEADER, request_id);
        }

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Multipart(parts) => {
                let mut form = reqwest::multipart::Form::new();
                for part in parts {
                    let file = reqwest::multipart::Part::bytes(part.data.to_vec())
                        .file_name(part.file_name)
                        .mime_str(&part.content_type)
                        .map_err(|e| ClientError::Transport(e.to_string()))?;
                    form = form.part(part.field, file);
                }
                builder.multipart(form)
            }
        };

        let response = builder
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        Ok(ApiResponse::new(status, body.to_vec()))
    }
}

// 3. The Mock Implementation (For Tests)
type MockHandler = dyn Fn(&ApiRequest) -> ClientResult<ApiResponse> + Send + Sync;

/// MockTransport
///
/// Answers every request through a closure and records what it was sent. It
/// yields to the scheduler before answering so concurrent calls interleave the
/// way real network calls would.
pub struct MockTransport {
    handler: Box<MockHandler>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl MockTransport {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&ApiRequest) -> ClientResult<ApiResponse> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answers every request with the same status and JSON body.
    pub fn always(status: u16, body: serde_json::Value) -> Self {
        Self::new(move |_| Ok(ApiResponse::json(status, body.clone())))
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: ApiRequest) -> ClientResult<ApiResponse> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        tokio::task::yield_now().await;
        (self.handler)(&request)
    }
}

pub type TransportState = Arc<dyn Transport>;

/// RequestGateway
///
/// The single outbound channel for API calls. Two hooks wrap every exchange:
///
/// 1. **Request phase**: the current bearer token (if any) is attached, along
///    with a fresh `x-request-id`.
/// 2. **Response phase**: a 401 ends the session (store cleared, state
///    anonymous) and redirects to the login page, whether or not a token was
///    sent. The rejection is tied to the session epoch seen in the request
///    phase, so concurrent rejections of the same session only log out once
///    and a late rejection never ends a newer session.
///
/// Every other failure is converted to a `ClientError` and passed through.
/// No retries, no queueing.
#[derive(Clone)]
pub struct RequestGateway {
    transport: TransportState,
    session: Arc<SessionHandle>,
    navigator: Arc<dyn Navigator>,
}

impl RequestGateway {
    pub fn new(
        transport: TransportState,
        session: Arc<SessionHandle>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            transport,
            session,
            navigator,
        }
    }

    /// send
    ///
    /// Runs one request through both hooks. Success is any 2xx status.
    pub async fn send(&self, mut request: ApiRequest) -> ClientResult<ApiResponse> {
        let request_id = Uuid::new_v4().to_string();
        let span = tracing::info_span!(
            "api_request",
            method = %request.method,
            path = %request.path,
            req_id = %request_id,
        );

        async move {
            // Request phase
            let exchange = request.anonymous;
            let credential = self.session.credential();
            if !exchange {
                request.bearer = credential.token.clone();
            }
            request.request_id = Some(request_id);

            // Response phase
            let response = self.transport.execute(request).await.inspect_err(|e| {
                tracing::warn!(error = %e, "request did not complete");
            })?;
            tracing::debug!(status = response.status, "response received");

            // A 401 on a credential exchange is a bad login, not a dead session.
            if response.status == UNAUTHORIZED && !exchange {
                self.reject(credential.epoch);
                return Err(ClientError::AuthorizationRejection);
            }

            if !response.is_success() {
                return Err(ClientError::Api {
                    status: response.status,
                    detail: response.detail(),
                });
            }

            Ok(response)
        }
        .instrument(span)
        .await
    }

    fn reject(&self, epoch: u64) {
        if self.session.revoke(epoch) {
            tracing::warn!("authorization rejected, redirecting to login");
            self.navigator.redirect(Redirect::replace(Route::Login));
        } else {
            tracing::debug!(epoch, "authorization rejection from a previous session");
        }
    }

    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.send(request).await?.parse()
    }

    pub async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        self.send_json(request).await
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    /// PUT without a body, ignoring the response payload.
    pub async fn put_empty(&self, path: &str) -> ClientResult<()> {
        self.send(ApiRequest::put(path)).await.map(|_| ())
    }

    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        self.send(ApiRequest::delete(path)).await.map(|_| ())
    }
}
