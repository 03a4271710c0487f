mod common;

use chrono::{TimeZone, Utc};
use postboard_client::{
    ClientError,
    models::{
        AuthToken, LoginData, Post, PostCreateData, PostUpdateData, PostWithComments, RegisterData,
        Role, User,
    },
};
use serde_json::json;

// --- Tests ---

#[test]
fn test_user_accepts_offset_less_timestamps() {
    let user: User = serde_json::from_value(common::user_json("alice", "admin")).unwrap();

    assert_eq!(user.created_at, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    assert!(user.is_admin());
}

#[test]
fn test_user_accepts_rfc3339_timestamps() {
    let mut raw = common::user_json("alice", "user");
    raw["created_at"] = json!("2024-05-01T12:00:00+02:00");

    let user: User = serde_json::from_value(raw).unwrap();

    assert_eq!(user.created_at, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
}

#[test]
fn test_missing_role_defaults_to_user() {
    let mut raw = common::user_json("alice", "user");
    raw.as_object_mut().unwrap().remove("role");

    let user: User = serde_json::from_value(raw).unwrap();

    assert_eq!(user.role, Role::User);
    assert!(!user.is_admin());
}

#[test]
fn test_unknown_role_is_rejected() {
    let raw = common::user_json("alice", "superuser");
    assert!(serde_json::from_value::<User>(raw).is_err());
}

#[test]
fn test_user_survives_storage_round_trip() {
    let user = common::user("alice", Role::Admin);
    let stored = serde_json::to_string(&user).unwrap();

    assert_eq!(serde_json::from_str::<User>(&stored).unwrap(), user);
}

#[test]
fn test_auth_token_defaults_token_type() {
    let token: AuthToken = serde_json::from_value(json!({
        "access_token": "abc",
        "user": common::user_json("alice", "user")
    }))
    .unwrap();

    assert_eq!(token.token_type, "bearer");
    let session = token.into_session();
    assert_eq!(session.token, "abc");
    assert_eq!(session.user.username, "alice");
}

#[test]
fn test_post_create_omits_empty_images() {
    let data = PostCreateData {
        title: "t".into(),
        content: "c".into(),
        image_urls: None,
    };

    let value = serde_json::to_value(&data).unwrap();

    assert_eq!(value, json!({"title": "t", "content": "c"}));
}

#[test]
fn test_post_update_only_sends_provided_fields() {
    let data = PostUpdateData {
        image_urls: Some(vec![]),
        ..Default::default()
    };

    let value = serde_json::to_value(&data).unwrap();

    assert_eq!(value, json!({"image_urls": []}));
}

#[test]
fn test_post_with_null_images() {
    let mut raw = common::post_json("p1", "alice", &[]);
    raw["image_urls"] = json!(null);

    let post: Post = serde_json::from_value(raw).unwrap();

    assert!(post.images().is_empty());
    assert_eq!(post.updated_at, None);
}

#[test]
fn test_post_detail_flattens_post_fields() {
    let mut raw = common::post_json("p1", "alice", &["/uploads/a.png"]);
    raw["updated_at"] = json!("2024-05-03T09:15:00.123456");
    raw["comments"] = json!([{
        "id": "c1",
        "content": "Nice!",
        "post_id": "p1",
        "author_id": "id-bob",
        "created_at": "2024-05-02T09:00:00",
        "author": common::user_json("bob", "user")
    }]);

    let detail: PostWithComments = serde_json::from_value(raw).unwrap();

    assert_eq!(detail.post.id, "p1");
    assert_eq!(detail.post.images(), &["/uploads/a.png"]);
    assert!(detail.post.updated_at.is_some());
    assert_eq!(detail.comments.len(), 1);
    assert!(!detail.comments[0].is_hidden);
}

#[test]
fn test_passwords_are_redacted_from_debug() {
    let login = format!("{:?}", LoginData::new("alice", "hunter2"));
    let register = format!("{:?}", RegisterData::new("alice", "a@example.com", "hunter2"));

    assert!(!login.contains("hunter2"));
    assert!(!register.contains("hunter2"));
    assert!(login.contains("alice"));
}

#[test]
fn test_register_validation() {
    let valid = RegisterData::new("alice", "alice@example.com", "pw");
    assert!(valid.validate().is_ok());

    let cases = [
        (RegisterData::new("", "alice@example.com", "pw"), "username"),
        (RegisterData::new("alice", " ", "pw"), "email"),
        (RegisterData::new("alice", "alice.example.com", "pw"), "email"),
        (RegisterData::new("alice", "alice@example.com", ""), "password"),
    ];
    for (data, expected) in cases {
        match data.validate() {
            Err(ClientError::ValidationFailure { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected {expected} to fail validation, got {other:?}"),
        }
    }
}

#[test]
fn test_login_data_from_registration() {
    let register = RegisterData::new("alice", "alice@example.com", "pw");
    assert_eq!(register.login_data(), LoginData::new("alice", "pw"));
}
