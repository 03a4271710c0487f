//! API Service Index
//!
//! Thin typed wrappers over the REST endpoints. Every call goes through the
//! [`RequestGateway`](crate::gateway::RequestGateway), so credential injection
//! and the global 401 handling apply uniformly to all of them.
//!
//! The modules follow the server's route groups.

/// `/auth`: credential exchange (login, register). Sent without a token.
pub mod auth;

/// `/posts`: public listing and owner-only mutations.
pub mod posts;

/// `/comments`: per-post threads and owner-only edits.
pub mod comments;

/// `/admin`: moderation endpoints, admin role only.
pub mod admin;

/// Default page size for post and comment listings.
pub const DEFAULT_PAGE_LIMIT: u32 = 20;
