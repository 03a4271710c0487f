//! Navigation guards.
//!
//! Gates are pure functions of the session read model: they hold no state and
//! are re-evaluated whenever the [`SessionSnapshot`] changes. While the session
//! is still initializing every gate answers [`GateDecision::Wait`], never a
//! redirect.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::Url;
use tokio::sync::watch;

use crate::{models::Role, session::SessionSnapshot};

// Any origin works; only path and query are ever read back.
const ROUTE_BASE: &str = "http://postboard.local";

/// Access
///
/// What a view requires of the session before it may render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
    Admin,
}

/// Route
///
/// The client-side views. Unknown paths resolve to `Home`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Home,
    Login,
    Register,
    Search(String),
    PostDetail(String),
    Create,
    Edit(String),
    Profile,
    Admin,
}

impl Route {
    pub fn path(&self) -> String {
        match self {
            Self::Home => "/".to_string(),
            Self::Login => "/login".to_string(),
            Self::Register => "/register".to_string(),
            Self::Search(query) => Url::parse_with_params(&format!("{ROUTE_BASE}/search"), &[("q", query)])
                .ok()
                .and_then(|url| url.query().map(|q| format!("/search?{q}")))
                .unwrap_or_else(|| "/search".to_string()),
            Self::PostDetail(id) => format!("/post/{id}"),
            Self::Create => "/create".to_string(),
            Self::Edit(id) => format!("/edit/{id}"),
            Self::Profile => "/profile".to_string(),
            Self::Admin => "/admin".to_string(),
        }
    }

    pub fn from_path(path: &str) -> Self {
        let Ok(url) = Url::parse(ROUTE_BASE).and_then(|base| base.join(path)) else {
            return Self::Home;
        };
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|s| !s.is_empty()).collect())
            .unwrap_or_default();

        match segments.as_slice() {
            ["login"] => Self::Login,
            ["register"] => Self::Register,
            ["search"] => Self::Search(
                url.query_pairs()
                    .find(|(key, _)| key == "q")
                    .map(|(_, value)| value.into_owned())
                    .unwrap_or_default(),
            ),
            ["post", id] => Self::PostDetail((*id).to_string()),
            ["create"] => Self::Create,
            ["edit", id] => Self::Edit((*id).to_string()),
            ["profile"] => Self::Profile,
            ["admin"] => Self::Admin,
            _ => Self::Home,
        }
    }

    pub fn access(&self) -> Access {
        match self {
            Self::Create | Self::Edit(_) | Self::Profile => Access::Authenticated,
            Self::Admin => Access::Admin,
            _ => Access::Public,
        }
    }
}

/// Redirect
///
/// A navigation instruction. `replace` drops the current history entry so the
/// user cannot navigate back into the view that denied them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub to: Route,
    pub replace: bool,
}

impl Redirect {
    pub fn replace(to: Route) -> Self {
        Self { to, replace: true }
    }

    pub fn push(to: Route) -> Self {
        Self { to, replace: false }
    }
}

/// Navigator
///
/// The view layer's router, as seen by the client core.
pub trait Navigator: Send + Sync {
    fn redirect(&self, redirect: Redirect);
}

/// RecordingNavigator
///
/// Queues redirects for the view layer (or a test) to drain.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<Redirect>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every redirect issued since the last `take`.
    pub fn pending(&self) -> Vec<Redirect> {
        self.redirects
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Drains the queue.
    pub fn take(&self) -> Vec<Redirect> {
        self.redirects
            .lock()
            .map(|mut r| std::mem::take(&mut *r))
            .unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, redirect: Redirect) {
        tracing::debug!(to = %redirect.to.path(), replace = redirect.replace, "redirect");
        if let Ok(mut redirects) = self.redirects.lock() {
            redirects.push(redirect);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
    /// Session still initializing: render a neutral waiting state.
    Wait,
    Render,
    Redirect(Redirect),
}

// --- Gates ---

/// Gate
///
/// The shared capability-check pattern. Implementors say whether a resolved
/// session may pass and where to send it otherwise; `evaluate` supplies the
/// initializing/redirect ordering common to every gate.
pub trait Gate: Send + Sync {
    fn permits(&self, snapshot: &SessionSnapshot) -> bool;

    fn denied_route(&self, snapshot: &SessionSnapshot) -> Route;

    fn evaluate(&self, snapshot: &SessionSnapshot) -> GateDecision {
        if snapshot.is_initializing() {
            return GateDecision::Wait;
        }
        if self.permits(snapshot) {
            GateDecision::Render
        } else {
            GateDecision::Redirect(Redirect::replace(self.denied_route(snapshot)))
        }
    }
}

/// AuthGate
///
/// Lets any authenticated user through; anonymous users go to the login page.
#[derive(Debug, Clone, Copy, Default)]
pub struct AuthGate;

impl Gate for AuthGate {
    fn permits(&self, snapshot: &SessionSnapshot) -> bool {
        snapshot.is_authenticated()
    }

    fn denied_route(&self, _snapshot: &SessionSnapshot) -> Route {
        Route::Login
    }
}

/// RoleGate
///
/// Requires authentication plus a role. An authenticated user lacking the role
/// is sent home rather than to the login page.
#[derive(Debug, Clone, Copy)]
pub struct RoleGate {
    role: Role,
}

impl RoleGate {
    pub fn new(role: Role) -> Self {
        Self { role }
    }

    pub fn admin() -> Self {
        Self::new(Role::Admin)
    }
}

impl Gate for RoleGate {
    fn permits(&self, snapshot: &SessionSnapshot) -> bool {
        snapshot.current_user().is_some_and(|user| user.role == self.role)
    }

    fn denied_route(&self, snapshot: &SessionSnapshot) -> Route {
        if snapshot.is_authenticated() {
            Route::Home
        } else {
            Route::Login
        }
    }
}

/// Lets everyone through, even while the session is initializing.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenGate;

impl Gate for OpenGate {
    fn permits(&self, _snapshot: &SessionSnapshot) -> bool {
        true
    }

    fn denied_route(&self, _snapshot: &SessionSnapshot) -> Route {
        Route::Home
    }

    fn evaluate(&self, _snapshot: &SessionSnapshot) -> GateDecision {
        GateDecision::Render
    }
}

/// The gate guarding `route`.
pub fn gate_for(route: &Route) -> Box<dyn Gate> {
    match route.access() {
        Access::Public => Box::new(OpenGate),
        Access::Authenticated => Box::new(AuthGate),
        Access::Admin => Box::new(RoleGate::admin()),
    }
}

/// wait_for_decision
///
/// Waits until the session has left `Initializing`, then evaluates `gate`.
/// Never yields a redirect decided on the initializing state.
pub async fn wait_for_decision<G: Gate + ?Sized>(
    gate: &G,
    session: &mut watch::Receiver<SessionSnapshot>,
) -> GateDecision {
    let resolved = session
        .wait_for(|snapshot| !snapshot.is_initializing())
        .await
        .map(|snapshot| gate.evaluate(&snapshot));

    match resolved {
        Ok(decision) => decision,
        // Sender gone: evaluate the last known state.
        Err(_) => gate.evaluate(&session.borrow()),
    }
}

/// Waits for the next session change and re-evaluates `gate` against it.
/// Returns `None` once the session has been dropped.
pub async fn next_decision<G: Gate + ?Sized>(
    gate: &G,
    session: &mut watch::Receiver<SessionSnapshot>,
) -> Option<GateDecision> {
    session.changed().await.ok()?;
    let snapshot = session.borrow_and_update().clone();
    Some(gate.evaluate(&snapshot))
}

/// ViewScope
///
/// Tracks whether the view that started an operation is still mounted. Network
/// calls are never cancelled; their results are simply dropped once the scope
/// has been disposed.
#[derive(Debug, Clone, Default)]
pub struct ViewScope {
    disposed: Arc<AtomicBool>,
}

impl ViewScope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Awaits `operation` to completion, returning `None` if the scope was
    /// disposed in the meantime.
    pub async fn guard<F: Future>(&self, operation: F) -> Option<F::Output> {
        let output = operation.await;
        if self.is_disposed() {
            tracing::debug!("view disposed, discarding result");
            return None;
        }
        Some(output)
    }
}
