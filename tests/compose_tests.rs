mod common;

use postboard_client::{
    AppConfig, Client, ClientError,
    compose::{ComposeMode, PostComposer, TITLE_MAX_CHARS},
    credential_store::MemoryCredentialStore,
    error::UploadFailureKind,
    gateway::{ApiRequest, ApiResponse, MockTransport, RequestBody},
    models::Role,
    navigation::{Redirect, Route, ViewScope},
};
use serde_json::{Value, json};
use std::sync::Arc;

// --- Helpers ---

/// A fake backend covering the endpoints the compose flow touches.
fn backend(request: &ApiRequest) -> ApiResponse {
    match (request.method.as_str(), request.path.as_str()) {
        ("POST", "/upload/images") => {
            let urls: Vec<String> = match &request.body {
                RequestBody::Multipart(parts) => parts
                    .iter()
                    .map(|part| format!("/uploads/{}", part.file_name))
                    .collect(),
                _ => Vec::new(),
            };
            ApiResponse::json(200, json!({ "urls": urls }))
        }
        ("GET", "/posts/p1") => {
            ApiResponse::json(200, common::post_json("p1", "alice", &["/uploads/old.png"]))
        }
        ("POST", "/posts") => ApiResponse::json(201, echo_post("p-new", request)),
        ("PUT", "/posts/p1") => ApiResponse::json(200, echo_post("p1", request)),
        _ => ApiResponse::json(404, json!({ "detail": "Not Found" })),
    }
}

fn echo_post(id: &str, request: &ApiRequest) -> Value {
    let mut post = common::post_json(id, "alice", &[]);
    if let RequestBody::Json(body) = &request.body {
        for field in ["title", "content", "image_urls"] {
            if let Some(value) = body.get(field) {
                post[field] = value.clone();
            }
        }
    }
    post
}

fn client_with(transport: MockTransport) -> (Client, Arc<MockTransport>) {
    let transport = Arc::new(transport);
    let store = MemoryCredentialStore::with_session(&common::session("alice", Role::User));
    let client = Client::assemble(AppConfig::default(), transport.clone(), Arc::new(store));
    (client, transport)
}

fn signed_in_client() -> (Client, Arc<MockTransport>) {
    client_with(MockTransport::new(|request| Ok(backend(request))))
}

fn json_body(request: &ApiRequest) -> Value {
    match &request.body {
        RequestBody::Json(body) => body.clone(),
        other => panic!("expected a json body, got {other:?}"),
    }
}

fn filled(title: &str, content: &str) -> PostComposer {
    let mut composer = PostComposer::for_create();
    composer.title = title.to_string();
    composer.content = content.to_string();
    composer
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[tokio::test]
    async fn test_blank_title_fails_before_any_request() {
        let (client, transport) = signed_in_client();
        let mut composer = filled("   ", "body");
        composer
            .attachments_mut()
            .add_local_files(vec![common::png("a.png")])
            .unwrap();

        let result = composer.submit(&client.posts, client.uploads.as_ref()).await;

        assert!(matches!(
            result,
            Err(ClientError::ValidationFailure { field: "title", .. })
        ));
        assert!(transport.requests().is_empty());
    }

    #[test]
    fn test_title_length_limit() {
        let at_limit = filled(&"t".repeat(TITLE_MAX_CHARS), "body");
        assert!(at_limit.validate().is_ok());

        let over = filled(&"t".repeat(TITLE_MAX_CHARS + 1), "body");
        assert!(matches!(
            over.validate(),
            Err(ClientError::ValidationFailure { field: "title", .. })
        ));
    }

    #[test]
    fn test_blank_content_is_rejected() {
        let composer = filled("Title", "\n\t ");
        assert!(matches!(
            composer.validate(),
            Err(ClientError::ValidationFailure { field: "content", .. })
        ));
    }

    #[test]
    fn test_fields_are_trimmed() {
        let composer = filled("  Title  ", " body ");
        assert_eq!(
            composer.validate().unwrap(),
            ("Title".to_string(), "body".to_string())
        );
    }
}

#[cfg(test)]
mod create_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_images_are_uploaded_before_the_post() {
        let (client, transport) = signed_in_client();
        let mut composer = filled("Morning walk", "Saw a heron.");
        composer
            .attachments_mut()
            .add_local_files(vec![common::png("heron.png"), common::png("pond.png")])
            .unwrap();

        let post = composer
            .submit(&client.posts, client.uploads.as_ref())
            .await
            .unwrap();

        assert_eq!(post.images(), &["/uploads/heron.png", "/uploads/pond.png"]);

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].path, "/upload/images");
        match &sent[0].body {
            RequestBody::Multipart(parts) => {
                assert!(parts.iter().all(|p| p.field == "files"));
                assert_eq!(parts.len(), 2);
            }
            other => panic!("expected multipart, got {other:?}"),
        }
        assert_eq!(sent[1].path, "/posts");
        assert_eq!(
            json_body(&sent[1])["image_urls"],
            json!(["/uploads/heron.png", "/uploads/pond.png"])
        );
        assert!(sent.iter().all(|r| r.bearer.as_deref() == Some("token-alice")));
    }

    #[tokio::test]
    async fn test_post_without_images_omits_the_field() {
        let (client, transport) = signed_in_client();
        let mut composer = filled("Text only", "No pictures today.");

        let post = composer
            .submit(&client.posts, client.uploads.as_ref())
            .await
            .unwrap();

        assert!(post.images().is_empty());
        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        let body = json_body(&sent[0]);
        assert_eq!(body["title"], "Text only");
        assert!(body.get("image_urls").is_none());
    }

    #[tokio::test]
    async fn test_rejected_upload_never_creates_the_post() {
        let (client, transport) = client_with(MockTransport::new(|request| {
            if request.path == "/upload/images" {
                return Ok(ApiResponse::json(413, json!({ "detail": "File too large" })));
            }
            Ok(backend(request))
        }));
        let mut composer = filled("Big picture", "Very big.");
        composer
            .attachments_mut()
            .add_local_files(vec![common::png("huge.png")])
            .unwrap();

        let result = composer.submit(&client.posts, client.uploads.as_ref()).await;

        match result {
            Err(ClientError::UploadFailure(UploadFailureKind::PayloadTooLarge { detail })) => {
                assert_eq!(detail, "File too large")
            }
            other => panic!("expected an upload failure, got {other:?}"),
        }
        assert!(transport.requests().iter().all(|r| r.path != "/posts"));
        // The form is intact for a retry.
        assert_eq!(composer.attachments().pending().len(), 1);
        assert_eq!(composer.title, "Big picture");
    }

    #[tokio::test]
    async fn test_expired_session_is_revoked_mid_submit() {
        let (client, _transport) = client_with(MockTransport::new(|request| {
            if request.path == "/posts" {
                return Ok(ApiResponse::json(401, json!({ "detail": "Token expired" })));
            }
            Ok(backend(request))
        }));
        let mut composer = filled("Draft", "Unsaved.");

        let result = composer.submit(&client.posts, client.uploads.as_ref()).await;

        assert!(matches!(result, Err(ClientError::AuthorizationRejection)));
        assert!(!client.session.is_authenticated());
        assert_eq!(client.navigator.take(), vec![Redirect::replace(Route::Login)]);
        assert_eq!(composer.content, "Unsaved.");
    }
}

#[cfg(test)]
mod edit_flow_tests {
    use super::*;

    #[tokio::test]
    async fn test_loaded_post_prefills_the_form() {
        let (client, _) = signed_in_client();

        let composer = PostComposer::load_for_edit(&client.posts, "p1", &ViewScope::new())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(
            composer.mode(),
            &ComposeMode::Edit {
                post_id: "p1".into(),
                author_id: "id-alice".into()
            }
        );
        assert_eq!(composer.title, "Morning walk");
        assert_eq!(composer.attachments().persisted(), &["/uploads/old.png"]);
        assert!(composer.is_editable_by(&common::user("alice", Role::User)));
        assert!(!composer.is_editable_by(&common::user("mallory", Role::Admin)));
    }

    #[tokio::test]
    async fn test_disposed_view_drops_the_loaded_post() {
        let (client, transport) = signed_in_client();
        let scope = ViewScope::new();
        scope.dispose();

        let loaded = PostComposer::load_for_edit(&client.posts, "p1", &scope)
            .await
            .unwrap();

        assert!(loaded.is_none());
        // The request still went out; only its result was discarded.
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_update_sends_kept_and_new_images() {
        let (client, transport) = signed_in_client();
        let mut composer = PostComposer::load_for_edit(&client.posts, "p1", &ViewScope::new())
            .await
            .unwrap()
            .unwrap();
        composer
            .attachments_mut()
            .add_local_files(vec![common::png("new.png")])
            .unwrap();

        let post = composer
            .submit(&client.posts, client.uploads.as_ref())
            .await
            .unwrap();

        assert_eq!(post.images(), &["/uploads/old.png", "/uploads/new.png"]);
        let update = transport.requests().pop().unwrap();
        assert_eq!(update.method.as_str(), "PUT");
        assert_eq!(update.path, "/posts/p1");
    }

    #[tokio::test]
    async fn test_removing_every_image_is_persisted() {
        let (client, transport) = signed_in_client();
        let mut composer = PostComposer::load_for_edit(&client.posts, "p1", &ViewScope::new())
            .await
            .unwrap()
            .unwrap();
        composer.attachments_mut().remove_persisted(0).unwrap();

        composer
            .submit(&client.posts, client.uploads.as_ref())
            .await
            .unwrap();

        let update = transport.requests().pop().unwrap();
        assert_eq!(json_body(&update)["image_urls"], json!([]));
    }
}
