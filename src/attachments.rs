//! Image attachments for the compose and edit views.
//!
//! An [`AttachmentReconciler`] keeps two ordered lists: URLs already stored on
//! the server (`persisted`, only non-empty when editing) and files picked
//! locally (`pending`). The final attachment list is always `persisted`
//! followed by `pending`, each in insertion order.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tokio::sync::watch;

use crate::{
    error::{ClientError, ClientResult, UploadFailureKind},
    upload::{LocalFile, UploadService},
};

/// Maximum number of images on a single post.
pub const MAX_ATTACHMENTS: usize = 10;

/// PreviewState
///
/// Local preview of a pending file. Entries exist (as `Pending`) before their
/// preview has been produced, so the view can render a placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewState {
    Pending,
    /// A `data:` URL ready to be used as an image source.
    Ready(String),
    Failed(String),
}

impl PreviewState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// PendingAttachment
///
/// A locally selected file plus the receiving end of its preview task.
#[derive(Debug, Clone)]
pub struct PendingAttachment {
    file: LocalFile,
    preview: watch::Receiver<PreviewState>,
}

impl PendingAttachment {
    fn new(file: LocalFile) -> Self {
        let preview = spawn_preview(file.clone());
        Self { file, preview }
    }

    pub fn file(&self) -> &LocalFile {
        &self.file
    }

    /// The preview as of now.
    pub fn preview(&self) -> PreviewState {
        self.preview.borrow().clone()
    }

    /// Waits until the preview task has finished.
    pub async fn ready_preview(&self) -> PreviewState {
        let mut preview = self.preview.clone();
        let resolved = preview
            .wait_for(|state| !state.is_pending())
            .await
            .map(|state| state.clone());
        // The task only drops its sender after sending.
        resolved.unwrap_or_else(|_| self.preview())
    }
}

/// data_url
///
/// Encodes a file as `data:<type>;base64,<payload>`.
pub fn data_url(file: &LocalFile) -> String {
    format!(
        "data:{};base64,{}",
        file.content_type,
        STANDARD.encode(&file.data)
    )
}

/// spawn_preview
///
/// Produces the preview on a blocking worker so large images never stall the
/// runtime. Outside a runtime the preview is computed inline. If the entry is
/// removed before the preview is ready, the result is dropped.
fn spawn_preview(file: LocalFile) -> watch::Receiver<PreviewState> {
    let Ok(runtime) = tokio::runtime::Handle::try_current() else {
        let (_, rx) = watch::channel(PreviewState::Ready(data_url(&file)));
        return rx;
    };

    let (tx, rx) = watch::channel(PreviewState::Pending);
    runtime.spawn(async move {
        let name = file.name.clone();
        let state = match tokio::task::spawn_blocking(move || data_url(&file)).await {
            Ok(url) => PreviewState::Ready(url),
            Err(e) => PreviewState::Failed(e.to_string()),
        };
        if tx.send(state).is_err() {
            tracing::debug!(file = %name, "attachment discarded before preview finished");
        }
    });
    rx
}

/// AttachmentReconciler
///
/// Working state for a post's images between opening the form and submitting
/// it. The combined count never exceeds the limit: an add that would overflow
/// is refused without touching either list.
#[derive(Debug)]
pub struct AttachmentReconciler {
    persisted: Vec<String>,
    pending: Vec<PendingAttachment>,
    limit: usize,
}

impl Default for AttachmentReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl AttachmentReconciler {
    /// An empty set, for the create flow.
    pub fn new() -> Self {
        Self {
            persisted: Vec::new(),
            pending: Vec::new(),
            limit: MAX_ATTACHMENTS,
        }
    }

    /// A set pre-populated with a post's stored image URLs, for the edit flow.
    /// URLs beyond the limit are kept; only new additions are refused.
    pub fn from_persisted(urls: impl IntoIterator<Item = String>) -> Self {
        Self {
            persisted: urls.into_iter().collect(),
            ..Self::new()
        }
    }

    pub fn persisted(&self) -> &[String] {
        &self.persisted
    }

    pub fn pending(&self) -> &[PendingAttachment] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.persisted.len() + self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// How many more files can be added.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.len())
    }

    /// add_local_files
    ///
    /// Appends each file as a pending entry, starting its preview in the
    /// background. All or nothing: if the batch would push the total past the
    /// limit, nothing is added and `CapacityExceeded` is returned.
    pub fn add_local_files(&mut self, files: Vec<LocalFile>) -> ClientResult<()> {
        let requested = self.len() + files.len();
        if requested > self.limit {
            tracing::debug!(requested, limit = self.limit, "attachment limit reached");
            return Err(ClientError::CapacityExceeded {
                limit: self.limit,
                requested,
            });
        }

        self.pending
            .extend(files.into_iter().map(PendingAttachment::new));
        Ok(())
    }

    /// Removes a stored URL by its position in `persisted`.
    pub fn remove_persisted(&mut self, index: usize) -> Option<String> {
        (index < self.persisted.len()).then(|| self.persisted.remove(index))
    }

    /// Removes a staged file by its position in `pending`.
    pub fn remove_pending(&mut self, index: usize) -> Option<LocalFile> {
        (index < self.pending.len()).then(|| self.pending.remove(index).file)
    }

    pub fn clear(&mut self) {
        self.persisted.clear();
        self.pending.clear();
    }

    /// finalize
    ///
    /// Uploads every pending file in one batch, in order, and returns the full
    /// attachment list: persisted URLs followed by the new ones.
    ///
    /// If the upload fails, or answers with the wrong number of URLs, nothing
    /// changes and the error is returned so the post is never saved. On
    /// success the uploaded files move into `persisted`, so a repeated call
    /// uploads nothing.
    pub async fn finalize(&mut self, uploader: &dyn UploadService) -> ClientResult<Vec<String>> {
        if self.pending.is_empty() {
            return Ok(self.persisted.clone());
        }

        let files: Vec<LocalFile> = self.pending.iter().map(|p| p.file.clone()).collect();
        let urls = uploader.upload_batch(&files).await?;

        if urls.len() != files.len() {
            tracing::warn!(
                expected = files.len(),
                received = urls.len(),
                "upload returned an unexpected number of urls"
            );
            return Err(ClientError::UploadFailure(UploadFailureKind::CountMismatch {
                expected: files.len(),
                received: urls.len(),
            }));
        }

        self.persisted.extend(urls);
        self.pending.clear();
        Ok(self.persisted.clone())
    }
}
