use crate::{
    error::ClientResult,
    gateway::{ApiRequest, RequestGateway},
    models::{Comment, CommentCreateData, CommentUpdateData},
};

/// CommentsApi
///
/// `/comments` endpoints. Threads are read per post; edits and deletes are
/// owner-only on the server.
#[derive(Clone)]
pub struct CommentsApi {
    gateway: RequestGateway,
}

impl CommentsApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    pub async fn for_post(&self, post_id: &str) -> ClientResult<Vec<Comment>> {
        self.gateway
            .get_json(ApiRequest::get(format!("/comments/post/{post_id}")))
            .await
    }

    pub async fn create(&self, post_id: &str, data: &CommentCreateData) -> ClientResult<Comment> {
        self.gateway
            .post_json(&format!("/comments/post/{post_id}"), data)
            .await
    }

    pub async fn update(&self, id: &str, data: &CommentUpdateData) -> ClientResult<Comment> {
        self.gateway.put_json(&format!("/comments/{id}"), data).await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.gateway.delete(&format!("/comments/{id}")).await
    }

    pub async fn by_user(&self, user_id: &str, skip: u32, limit: u32) -> ClientResult<Vec<Comment>> {
        let request = ApiRequest::get(format!("/comments/user/{user_id}"))
            .query("skip", skip)
            .query("limit", limit);
        self.gateway.get_json(request).await
    }
}
