use crate::{
    error::ClientResult,
    gateway::{ApiRequest, RequestGateway},
    models::{Comment, Post, User},
};

/// Default page size for the moderation user table.
pub const USER_PAGE_LIMIT: u32 = 100;
/// Default page size for the moderation post and comment tables.
pub const CONTENT_PAGE_LIMIT: u32 = 50;

/// AdminApi
///
/// Moderation endpoints. The server answers 403 to non-admins; the client only
/// reaches these views through the admin `RoleGate`.
#[derive(Clone)]
pub struct AdminApi {
    gateway: RequestGateway,
}

impl AdminApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    // --- Users ---

    pub async fn users(&self, skip: u32, limit: u32) -> ClientResult<Vec<User>> {
        self.gateway
            .get_json(paged("/admin/users", skip, limit))
            .await
    }

    pub async fn block_user(&self, user_id: &str) -> ClientResult<()> {
        self.gateway
            .put_empty(&format!("/admin/users/{user_id}/block"))
            .await
    }

    pub async fn unblock_user(&self, user_id: &str) -> ClientResult<()> {
        self.gateway
            .put_empty(&format!("/admin/users/{user_id}/unblock"))
            .await
    }

    // --- Posts ---

    /// All posts, hidden ones included.
    pub async fn posts(&self, skip: u32, limit: u32) -> ClientResult<Vec<Post>> {
        self.gateway
            .get_json(paged("/admin/posts", skip, limit))
            .await
    }

    pub async fn hide_post(&self, post_id: &str) -> ClientResult<()> {
        self.gateway
            .put_empty(&format!("/admin/posts/{post_id}/hide"))
            .await
    }

    pub async fn delete_post(&self, post_id: &str) -> ClientResult<()> {
        self.gateway.delete(&format!("/admin/posts/{post_id}")).await
    }

    // --- Comments ---

    pub async fn comments(&self, skip: u32, limit: u32) -> ClientResult<Vec<Comment>> {
        self.gateway
            .get_json(paged("/admin/comments", skip, limit))
            .await
    }

    pub async fn hide_comment(&self, comment_id: &str) -> ClientResult<()> {
        self.gateway
            .put_empty(&format!("/admin/comments/{comment_id}/hide"))
            .await
    }

    pub async fn delete_comment(&self, comment_id: &str) -> ClientResult<()> {
        self.gateway
            .delete(&format!("/admin/comments/{comment_id}"))
            .await
    }
}

fn paged(path: &str, skip: u32, limit: u32) -> ApiRequest {
    ApiRequest::get(path).query("skip", skip).query("limit", limit)
}
