use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Notify;
use uuid::Uuid;

use crate::{
    error::{ClientError, ClientResult},
    gateway::{ApiRequest, RequestGateway},
    models::{AuthToken, LoginData, RegisterData, Role, User},
};

// 1. AuthService Contract
/// AuthService
///
/// The remote authentication collaborator. The server is the source of truth
/// for identity; the client only stores what it is handed back.
///
/// - `login` fails with `AuthenticationFailure` on bad credentials or a
///   blocked account.
/// - `register` fails with `Conflict` on a duplicate username or email.
#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, data: &LoginData) -> ClientResult<AuthToken>;

    async fn register(&self, data: &RegisterData) -> ClientResult<User>;
}

/// AuthServiceState
///
/// The concrete type used to share the auth collaborator.
pub type AuthServiceState = Arc<dyn AuthService>;

// 2. The Real Implementation (REST)
/// HttpAuthService
///
/// Calls `/auth/login` and `/auth/register` through the gateway as credential
/// exchanges: no bearer token is attached and a 401 here never ends a session.
#[derive(Clone)]
pub struct HttpAuthService {
    gateway: RequestGateway,
}

impl HttpAuthService {
    pub fn new(gateway: RequestGateway) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl AuthService for HttpAuthService {
    async fn login(&self, data: &LoginData) -> ClientResult<AuthToken> {
        let request = ApiRequest::post("/auth/login").json(data)?.anonymous();

        self.gateway
            .send_json(request)
            .await
            .map_err(|e| match e {
                ClientError::Api {
                    status: 400 | 401 | 403,
                    detail,
                } => ClientError::AuthenticationFailure { detail },
                other => other,
            })
    }

    async fn register(&self, data: &RegisterData) -> ClientResult<User> {
        let request = ApiRequest::post("/auth/register").json(data)?.anonymous();

        self.gateway
            .send_json(request)
            .await
            .map_err(|e| match e {
                ClientError::Api { status: 409, detail } => ClientError::Conflict { detail },
                // The server reports duplicates as a plain 400; other 400s pass through.
                ClientError::Api { status: 400, detail } if is_duplicate_detail(&detail) => {
                    ClientError::Conflict { detail }
                }
                other => other,
            })
    }
}

/// Duplicate username/email messages, in the server's languages.
fn is_duplicate_detail(detail: &str) -> bool {
    let detail = detail.to_lowercase();
    ["already", "exists", "已存在"]
        .iter()
        .any(|marker| detail.contains(marker))
}

// 3. The Mock Implementation (For Tests)
struct MockAccount {
    password: String,
    user: User,
}

/// MockAuthService
///
/// An in-memory account table with the same failure semantics as the real
/// service. Logins can be forced to fail, or held until released, to exercise
/// session ordering.
#[derive(Default)]
pub struct MockAuthService {
    accounts: Mutex<HashMap<String, MockAccount>>,
    failing_logins: AtomicUsize,
    login_calls: AtomicUsize,
    hold: Option<Arc<Notify>>,
    register_hold: Option<Arc<Notify>>,
}

impl MockAuthService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an account.
    pub fn with_user(self, username: &str, password: &str, role: Role) -> Self {
        let user = mock_user(username, &format!("{username}@example.com"), role);
        if let Ok(mut accounts) = self.accounts.lock() {
            accounts.insert(
                username.to_string(),
                MockAccount {
                    password: password.to_string(),
                    user,
                },
            );
        }
        self
    }

    /// Every login waits for one `notify_one` on `release` before answering.
    pub fn holding_logins(mut self, release: Arc<Notify>) -> Self {
        self.hold = Some(release);
        self
    }

    /// Every registration waits for one `notify_one` on `release` before
    /// answering.
    pub fn holding_registrations(mut self, release: Arc<Notify>) -> Self {
        self.register_hold = Some(release);
        self
    }

    /// The next `count` logins fail regardless of credentials.
    pub fn fail_next_logins(&self, count: usize) {
        self.failing_logins.store(count, Ordering::SeqCst);
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn has_account(&self, username: &str) -> bool {
        self.accounts
            .lock()
            .map(|accounts| accounts.contains_key(username))
            .unwrap_or(false)
    }

    pub fn block(&self, username: &str) {
        if let Ok(mut accounts) = self.accounts.lock() {
            if let Some(account) = accounts.get_mut(username) {
                account.user.is_blocked = true;
            }
        }
    }
}

#[async_trait]
impl AuthService for MockAuthService {
    async fn login(&self, data: &LoginData) -> ClientResult<AuthToken> {
        let call = self.login_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(release) = &self.hold {
            release.notified().await;
        }

        let forced_failure = self
            .failing_logins
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if forced_failure {
            return Err(ClientError::AuthenticationFailure {
                detail: "login temporarily refused".to_string(),
            });
        }

        let accounts = self
            .accounts
            .lock()
            .map_err(|_| ClientError::Transport("mock poisoned".to_string()))?;
        let account = accounts
            .get(&data.username)
            .filter(|account| account.password == data.password && !account.user.is_blocked)
            .ok_or_else(|| ClientError::AuthenticationFailure {
                detail: "Incorrect username or password, or account blocked".to_string(),
            })?;

        Ok(AuthToken {
            access_token: format!("token-{}-{call}", account.user.username),
            token_type: "bearer".to_string(),
            user: account.user.clone(),
        })
    }

    async fn register(&self, data: &RegisterData) -> ClientResult<User> {
        if let Some(release) = &self.register_hold {
            release.notified().await;
        }

        let mut accounts = self
            .accounts
            .lock()
            .map_err(|_| ClientError::Transport("mock poisoned".to_string()))?;

        if accounts.contains_key(&data.username) {
            return Err(ClientError::Conflict {
                detail: "Username already exists".to_string(),
            });
        }
        if accounts.values().any(|account| account.user.email == data.email) {
            return Err(ClientError::Conflict {
                detail: "Email already exists".to_string(),
            });
        }

        let user = mock_user(&data.username, &data.email, Role::User);
        accounts.insert(
            data.username.clone(),
            MockAccount {
                password: data.password.clone(),
                user: user.clone(),
            },
        );
        Ok(user)
    }
}

fn mock_user(username: &str, email: &str, role: Role) -> User {
    User {
        id: Uuid::new_v4().to_string(),
        username: username.to_string(),
        email: email.to_string(),
        role,
        is_blocked: false,
        created_at: Utc::now(),
    }
}
