use crate::{
    api::DEFAULT_PAGE_LIMIT,
    error::ClientResult,
    gateway::{ApiRequest, RequestGateway},
    models::{Post, PostCreateData, PostUpdateData, PostWithComments},
};

/// PostsApi
///
/// `/posts` endpoints. Listing and detail are public; create, update and
/// delete require a session and are owner-only on the server.
#[derive(Clone)]
pub struct PostsApi {
    gateway: RequestGateway,
}

impl PostsApi {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }

    /// GET /posts?skip=&limit=
    pub async fn list(&self, skip: u32, limit: u32) -> ClientResult<Vec<Post>> {
        let request = ApiRequest::get("/posts")
            .query("skip", skip)
            .query("limit", limit);
        self.gateway.get_json(request).await
    }

    /// First page of the public feed.
    pub async fn latest(&self) -> ClientResult<Vec<Post>> {
        self.list(0, DEFAULT_PAGE_LIMIT).await
    }

    /// GET /posts/{id}, including visible comments.
    pub async fn get(&self, id: &str) -> ClientResult<PostWithComments> {
        self.gateway.get_json(ApiRequest::get(format!("/posts/{id}"))).await
    }

    pub async fn create(&self, data: &PostCreateData) -> ClientResult<Post> {
        self.gateway.post_json("/posts", data).await
    }

    pub async fn update(&self, id: &str, data: &PostUpdateData) -> ClientResult<Post> {
        self.gateway.put_json(&format!("/posts/{id}"), data).await
    }

    pub async fn delete(&self, id: &str) -> ClientResult<()> {
        self.gateway.delete(&format!("/posts/{id}")).await
    }

    /// GET /posts/user/{user_id}
    pub async fn by_user(&self, user_id: &str, skip: u32, limit: u32) -> ClientResult<Vec<Post>> {
        let request = ApiRequest::get(format!("/posts/user/{user_id}"))
            .query("skip", skip)
            .query("limit", limit);
        self.gateway.get_json(request).await
    }
}
