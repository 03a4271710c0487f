use crate::{
    api::posts::PostsApi,
    attachments::AttachmentReconciler,
    error::{ClientError, ClientResult},
    models::{Post, PostCreateData, PostUpdateData, User},
    navigation::ViewScope,
    upload::UploadService,
};

/// Longest title the server accepts, in characters.
pub const TITLE_MAX_CHARS: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComposeMode {
    Create,
    Edit { post_id: String, author_id: String },
}

/// PostComposer
///
/// Form state behind the create and edit views: the text fields plus the
/// staged attachments. Submission is strictly ordered:
///
/// 1. client-side validation, before any network call;
/// 2. attachment upload, which must fully succeed;
/// 3. the post create/update itself.
///
/// A failure at any step stops the sequence and leaves the form intact.
#[derive(Debug)]
pub struct PostComposer {
    mode: ComposeMode,
    pub title: String,
    pub content: String,
    attachments: AttachmentReconciler,
}

impl PostComposer {
    pub fn for_create() -> Self {
        Self {
            mode: ComposeMode::Create,
            title: String::new(),
            content: String::new(),
            attachments: AttachmentReconciler::new(),
        }
    }

    /// Pre-fills the form from a stored post, its images becoming the
    /// persisted attachments.
    pub fn for_edit(post: &Post) -> Self {
        Self {
            mode: ComposeMode::Edit {
                post_id: post.id.clone(),
                author_id: post.author_id.clone(),
            },
            title: post.title.clone(),
            content: post.content.clone(),
            attachments: AttachmentReconciler::from_persisted(post.images().to_vec()),
        }
    }

    /// load_for_edit
    ///
    /// Fetches the post and builds the edit form. Returns `Ok(None)` if the
    /// view was disposed while the fetch was in flight.
    pub async fn load_for_edit(
        posts: &PostsApi,
        post_id: &str,
        scope: &ViewScope,
    ) -> ClientResult<Option<Self>> {
        match scope.guard(posts.get(post_id)).await {
            Some(fetched) => Ok(Some(Self::for_edit(&fetched?.post))),
            None => Ok(None),
        }
    }

    pub fn mode(&self) -> &ComposeMode {
        &self.mode
    }

    /// Only the author may edit a post; anyone may create one.
    pub fn is_editable_by(&self, user: &User) -> bool {
        match &self.mode {
            ComposeMode::Create => true,
            ComposeMode::Edit { author_id, .. } => *author_id == user.id,
        }
    }

    pub fn attachments(&self) -> &AttachmentReconciler {
        &self.attachments
    }

    pub fn attachments_mut(&mut self) -> &mut AttachmentReconciler {
        &mut self.attachments
    }

    /// validate
    ///
    /// Returns the trimmed title and content, or the first field that fails.
    pub fn validate(&self) -> ClientResult<(String, String)> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ClientError::validation("title", "title is required"));
        }
        if title.chars().count() > TITLE_MAX_CHARS {
            return Err(ClientError::validation(
                "title",
                format!("title must be at most {TITLE_MAX_CHARS} characters"),
            ));
        }

        let content = self.content.trim();
        if content.is_empty() {
            return Err(ClientError::validation("content", "content is required"));
        }

        Ok((title.to_string(), content.to_string()))
    }

    /// submit
    ///
    /// Validates, uploads pending images, then creates or updates the post.
    /// The post call is never attempted unless every image was uploaded.
    pub async fn submit(&mut self, posts: &PostsApi, uploader: &dyn UploadService) -> ClientResult<Post> {
        let (title, content) = self.validate()?;
        let image_urls = self.attachments.finalize(uploader).await?;

        let post = match &self.mode {
            ComposeMode::Create => {
                let data = PostCreateData {
                    title,
                    content,
                    image_urls: (!image_urls.is_empty()).then_some(image_urls),
                };
                posts.create(&data).await?
            }
            ComposeMode::Edit { post_id, .. } => {
                // Always sent, so removing every image is persisted too.
                let data = PostUpdateData {
                    title: Some(title),
                    content: Some(content),
                    image_urls: Some(image_urls),
                };
                posts.update(post_id, &data).await?
            }
        };

        tracing::info!(post_id = %post.id, images = post.images().len(), "post saved");
        Ok(post)
    }
}
