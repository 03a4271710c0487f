use async_trait::async_trait;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::{
    error::{ClientError, ClientResult, UploadFailureKind},
    gateway::{ApiRequest, FilePart, RequestGateway},
    models::{UploadBatchResponse, UploadResponse},
};

/// LocalFile
///
/// A file picked by the user and not yet uploaded. Contents are shared, so
/// cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    pub name: String,
    pub content_type: String,
    pub data: Arc<[u8]>,
}

impl LocalFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            data: data.into(),
        }
    }

    /// from_path
    ///
    /// Reads a file from disk without blocking the runtime, inferring its MIME
    /// type from the extension.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let content_type = content_type_for(&name);
        Ok(Self::new(name, content_type, data))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn to_part(&self, field: &str) -> FilePart {
        FilePart {
            field: field.to_string(),
            file_name: self.name.clone(),
            content_type: self.content_type.clone(),
            data: Arc::clone(&self.data),
        }
    }
}

/// content_type_for
///
/// MIME type for the image extensions the server accepts. Anything else is
/// sent as opaque bytes and left to the server to refuse.
pub fn content_type_for(file_name: &str) -> &'static str {
    let extension = Path::new(file_name)
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

// 1. UploadService Contract
/// UploadService
///
/// The image upload collaborator. A batch either succeeds as a whole, yielding
/// one URL per file in input order, or fails as a whole.
#[async_trait]
pub trait UploadService: Send + Sync {
    async fn upload_batch(&self, files: &[LocalFile]) -> ClientResult<Vec<String>>;

    async fn upload_one(&self, file: &LocalFile) -> ClientResult<String>;
}

/// UploadState
///
/// The concrete type used to share the upload collaborator.
pub type UploadState = Arc<dyn UploadService>;

// 2. The Real Implementation (REST, multipart)
/// HttpUploadService
///
/// `POST /upload/images` with one `files` part per file, in order. Server
/// refusals are mapped to `UploadFailure` so the caller can tell a bad file
/// from a dead session.
#[derive(Clone)]
pub struct HttpUploadService {
    gateway: RequestGateway,
}

impl HttpUploadService {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }
}

fn map_upload_error(error: ClientError) -> ClientError {
    match error {
        ClientError::Api { status: 413, detail } => {
            ClientError::UploadFailure(UploadFailureKind::PayloadTooLarge { detail })
        }
        ClientError::Api {
            status: 400 | 415,
            detail,
        } => ClientError::UploadFailure(UploadFailureKind::UnsupportedType { detail }),
        ClientError::Api { status, detail } if status != 401 => {
            ClientError::UploadFailure(UploadFailureKind::Rejected { status, detail })
        }
        other => other,
    }
}

#[async_trait]
impl UploadService for HttpUploadService {
    async fn upload_batch(&self, files: &[LocalFile]) -> ClientResult<Vec<String>> {
        let parts = files.iter().map(|f| f.to_part("files")).collect();
        let request = ApiRequest::post("/upload/images").multipart(parts);

        let response: UploadBatchResponse = self
            .gateway
            .send_json(request)
            .await
            .map_err(map_upload_error)?;

        tracing::info!(count = response.urls.len(), "images uploaded");
        Ok(response.urls)
    }

    async fn upload_one(&self, file: &LocalFile) -> ClientResult<String> {
        let request = ApiRequest::post("/upload/image").multipart(vec![file.to_part("file")]);

        let response: UploadResponse = self
            .gateway
            .send_json(request)
            .await
            .map_err(map_upload_error)?;
        Ok(response.url)
    }
}

/// sanitize_file_name
///
/// Strips directory components (`..`, `.`, separators) so a picked file name
/// can be embedded in a URL path.
fn sanitize_file_name(name: &str) -> String {
    name.split(['/', '\\'])
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("_")
}

// 3. The Mock Implementation (For Unit Tests)
/// MockUploadService
///
/// Answers uploads with deterministic `/uploads/...` URLs and records every
/// batch it receives, so tests can assert upload order and that failed
/// submissions never reached the post service.
#[derive(Default)]
pub struct MockUploadService {
    /// When set, every upload fails with this reason.
    pub failure: Option<UploadFailureKind>,
    /// Number of URLs to leave off the end of each batch response.
    pub short_by: usize,
    batches: Mutex<Vec<Vec<String>>>,
    counter: AtomicUsize,
}

impl MockUploadService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn new_failing(kind: UploadFailureKind) -> Self {
        Self {
            failure: Some(kind),
            ..Self::default()
        }
    }

    /// File names of every batch received, in call order.
    pub fn batches(&self) -> Vec<Vec<String>> {
        self.batches.lock().map(|b| b.clone()).unwrap_or_default()
    }

    fn url_for(&self, file: &LocalFile) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("/uploads/{n}-{}", sanitize_file_name(&file.name))
    }
}

#[async_trait]
impl UploadService for MockUploadService {
    async fn upload_batch(&self, files: &[LocalFile]) -> ClientResult<Vec<String>> {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(files.iter().map(|f| f.name.clone()).collect());
        }
        tokio::task::yield_now().await;

        if let Some(kind) = &self.failure {
            return Err(ClientError::UploadFailure(kind.clone()));
        }

        let keep = files.len().saturating_sub(self.short_by);
        Ok(files.iter().take(keep).map(|f| self.url_for(f)).collect())
    }

    async fn upload_one(&self, file: &LocalFile) -> ClientResult<String> {
        if let Some(kind) = &self.failure {
            return Err(ClientError::UploadFailure(kind.clone()));
        }
        Ok(self.url_for(file))
    }
}
