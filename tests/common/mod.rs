#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use postboard_client::{
    models::{Role, Session, User},
    upload::LocalFile,
};
use serde_json::{Value, json};

// --- Shared Fixtures ---

pub fn user(username: &str, role: Role) -> User {
    User {
        id: format!("id-{username}"),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        role,
        is_blocked: false,
        created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
    }
}

pub fn session(username: &str, role: Role) -> Session {
    Session::new(format!("token-{username}"), user(username, role))
}

/// A user as the server serializes it (offset-less timestamp).
pub fn user_json(username: &str, role: &str) -> Value {
    json!({
        "id": format!("id-{username}"),
        "username": username,
        "email": format!("{username}@example.com"),
        "role": role,
        "is_blocked": false,
        "created_at": "2024-05-01T10:00:00"
    })
}

pub fn post_json(id: &str, author: &str, images: &[&str]) -> Value {
    json!({
        "id": id,
        "title": "Morning walk",
        "content": "Saw a heron.",
        "image_urls": images,
        "author_id": format!("id-{author}"),
        "is_hidden": false,
        "created_at": "2024-05-02T08:30:00",
        "updated_at": null,
        "author": user_json(author, "user"),
        "comments": []
    })
}

pub fn png(name: &str) -> LocalFile {
    LocalFile::new(name, "image/png", name.as_bytes().to_vec())
}
