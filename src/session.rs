//! Session state machine.
//!
//! The session lives in a single [`SessionHandle`] shared (via `Arc`) by the
//! [`SessionManager`], the request gateway and the navigation guards. State is
//! held in a `tokio::sync::watch` channel: every transition is one
//! `send_modify` call, so readers always observe a complete snapshot and
//! subscribers are woken on every change.

use std::sync::Arc;

use tokio::sync::watch;

use crate::{
    api::auth::AuthServiceState,
    credential_store::CredentialStoreState,
    error::{ClientError, ClientResult},
    models::{LoginData, RegisterData, Session, User},
};

/// SessionPhase
///
/// `Initializing` only exists until the credential store has been read once.
/// Consumers must treat it as "decision deferred".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Initializing,
    Authenticated,
    Anonymous,
}

/// SessionSnapshot
///
/// The read model. Every flag is derived from the same `phase` + `session`
/// pair, so the four observations are always mutually consistent.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    phase: SessionPhase,
    session: Option<Session>,
    epoch: u64,
}

impl SessionSnapshot {
    fn initializing() -> Self {
        Self {
            phase: SessionPhase::Initializing,
            session: None,
            epoch: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn is_initializing(&self) -> bool {
        self.phase == SessionPhase::Initializing
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.user.is_admin())
    }

    pub fn current_user(&self) -> Option<&User> {
        self.session.as_ref().map(|s| &s.user)
    }

    pub fn token(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.token.as_str())
    }

    /// Monotonic counter bumped on every committed transition.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    fn set_session(&mut self, session: Option<Session>) {
        self.phase = if session.is_some() {
            SessionPhase::Authenticated
        } else {
            SessionPhase::Anonymous
        };
        self.session = session;
        self.epoch += 1;
    }
}

/// Credential
///
/// The bearer token (if any) captured at request time, tagged with the epoch
/// it belonged to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub token: Option<String>,
    pub epoch: u64,
}

/// SessionHandle
///
/// The shared state core. It is the only writer of the credential store; the
/// in-memory snapshot is a cache of the store, re-synchronized by
/// [`initialize`](Self::initialize).
pub struct SessionHandle {
    state: watch::Sender<SessionSnapshot>,
    store: CredentialStoreState,
}

impl SessionHandle {
    pub fn new(store: CredentialStoreState) -> Self {
        let (state, _) = watch::channel(SessionSnapshot::initializing());
        Self { state, store }
    }

    /// initialize
    ///
    /// Rehydrates from the credential store, leaving `Initializing` for either
    /// `Authenticated` or `Anonymous`. Only the first call has any effect.
    pub fn initialize(&self) -> SessionPhase {
        self.state.send_if_modified(|state| {
            if !state.is_initializing() {
                return false;
            }
            let restored = self.store.load();
            match &restored {
                Some(session) => tracing::info!(user = %session.user.username, "session restored"),
                None => tracing::debug!("no stored session, starting anonymous"),
            }
            state.set_session(restored);
            true
        });
        self.state.borrow().phase()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.state.subscribe()
    }

    pub fn epoch(&self) -> u64 {
        self.state.borrow().epoch()
    }

    /// The current bearer token and epoch, read in one step.
    pub fn credential(&self) -> Credential {
        let state = self.state.borrow();
        Credential {
            token: state.token().map(str::to_string),
            epoch: state.epoch(),
        }
    }

    /// commit
    ///
    /// Installs a freshly obtained session, but only if no transition happened
    /// since `started_epoch`. The store write and the in-memory transition
    /// happen in the same step; a failed store write leaves the state untouched.
    pub(crate) fn commit(&self, started_epoch: u64, session: Session) -> ClientResult<()> {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| {
            if state.epoch() != started_epoch {
                tracing::debug!(
                    started_epoch,
                    current_epoch = state.epoch(),
                    "discarding stale session result"
                );
                outcome = Err(ClientError::Superseded);
                return false;
            }
            if let Err(e) = self.store.save(&session) {
                tracing::warn!(error = %e, "failed to persist session");
                outcome = Err(ClientError::Storage(e.to_string()));
                return false;
            }
            state.set_session(Some(session));
            true
        });
        outcome
    }

    /// end
    ///
    /// Unconditional logout. Always advances the epoch, so any session
    /// mutation still in flight is discarded when it resolves.
    pub fn end(&self) {
        self.state.send_modify(|state| {
            self.clear_store();
            state.set_session(None);
        });
    }

    /// revoke
    ///
    /// Handles an authorization rejection for a request sent during `epoch`.
    /// Returns `true` when the caller should redirect to the login page.
    ///
    /// - Stale epoch: a newer session exists (or the old one already ended),
    ///   nothing happens.
    /// - Authenticated: the store is cleared and the state becomes
    ///   `Anonymous`, advancing the epoch, so only one of any number of
    ///   concurrent rejections gets here.
    /// - Anonymous: the store is cleared again and the state is left alone.
    pub fn revoke(&self, epoch: u64) -> bool {
        let mut rejected = false;
        self.state.send_if_modified(|state| {
            if state.epoch() != epoch || state.is_initializing() {
                return false;
            }
            rejected = true;
            self.clear_store();
            if !state.is_authenticated() {
                return false;
            }
            state.set_session(None);
            true
        });
        rejected
    }

    fn clear_store(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "failed to clear credential store");
        }
    }
}

/// SessionManager
///
/// Owns the login/register/logout operations on top of the shared
/// [`SessionHandle`]. Results of remote calls are tagged with the epoch they
/// started against and dropped if a logout (or any other transition) happened
/// meanwhile.
#[derive(Clone)]
pub struct SessionManager {
    handle: Arc<SessionHandle>,
    auth: AuthServiceState,
}

impl SessionManager {
    pub fn new(handle: Arc<SessionHandle>, auth: AuthServiceState) -> Self {
        Self { handle, auth }
    }

    pub fn handle(&self) -> &Arc<SessionHandle> {
        &self.handle
    }

    pub fn initialize(&self) -> SessionPhase {
        self.handle.initialize()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        self.handle.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.handle.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.snapshot().is_authenticated()
    }

    pub fn is_admin(&self) -> bool {
        self.snapshot().is_admin()
    }

    pub fn is_initializing(&self) -> bool {
        self.snapshot().is_initializing()
    }

    pub fn current_user(&self) -> Option<User> {
        self.snapshot().current_user().cloned()
    }

    /// login
    ///
    /// Exchanges credentials for a session and writes it through to the store.
    /// Remote failures propagate unchanged and leave the state as it was.
    pub async fn login(&self, data: LoginData) -> ClientResult<User> {
        data.validate()?;
        self.login_at(self.handle.epoch(), data).await
    }

    /// Runs the credential exchange and commits it against `started_epoch`.
    async fn login_at(&self, started_epoch: u64, data: LoginData) -> ClientResult<User> {
        let token = match self.auth.login(&data).await {
            Ok(token) => token,
            Err(e) => {
                tracing::info!(username = %data.username, error = %e, "login failed");
                return Err(e);
            }
        };

        let session = token.into_session();
        let user = session.user.clone();
        self.handle.commit(started_epoch, session)?;

        tracing::info!(username = %user.username, role = ?user.role, "logged in");
        Ok(user)
    }

    /// register
    ///
    /// Creates the account, then logs in with the same username and password.
    /// If the account is created but the login fails, the login error is
    /// returned and the client stays anonymous. Both steps are tagged with the
    /// epoch at which registration started, so a logout during either one
    /// wins.
    pub async fn register(&self, data: RegisterData) -> ClientResult<User> {
        data.validate()?;
        let started_epoch = self.handle.epoch();

        let created = self.auth.register(&data).await?;
        tracing::info!(username = %created.username, "account created, logging in");
        self.login_at(started_epoch, data.login_data()).await
    }

    /// Clears the store and the in-memory session. No network call.
    pub fn logout(&self) {
        self.handle.end();
        tracing::info!("logged out");
    }
}
