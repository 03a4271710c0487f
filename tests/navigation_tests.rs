mod common;

use postboard_client::{
    credential_store::MemoryCredentialStore,
    models::Role,
    navigation::{
        Access, AuthGate, Gate, GateDecision, OpenGate, Redirect, RoleGate, Route, ViewScope,
        gate_for, next_decision, wait_for_decision,
    },
    session::{SessionHandle, SessionSnapshot},
};
use std::sync::Arc;
use std::time::Duration;

// --- Helpers ---

fn handle_for(store: MemoryCredentialStore) -> Arc<SessionHandle> {
    Arc::new(SessionHandle::new(Arc::new(store)))
}

fn initializing() -> SessionSnapshot {
    handle_for(MemoryCredentialStore::new()).snapshot()
}

fn anonymous() -> SessionSnapshot {
    let handle = handle_for(MemoryCredentialStore::new());
    handle.initialize();
    handle.snapshot()
}

fn signed_in(role: Role) -> SessionSnapshot {
    let handle = handle_for(MemoryCredentialStore::with_session(&common::session("alice", role)));
    handle.initialize();
    handle.snapshot()
}

fn redirect(to: Route) -> GateDecision {
    GateDecision::Redirect(Redirect::replace(to))
}

#[cfg(test)]
mod gate_decision_tests {
    use super::*;

    #[test]
    fn test_every_gate_waits_while_initializing() {
        let snapshot = initializing();

        assert_eq!(AuthGate.evaluate(&snapshot), GateDecision::Wait);
        assert_eq!(RoleGate::admin().evaluate(&snapshot), GateDecision::Wait);
    }

    #[test]
    fn test_auth_gate() {
        assert_eq!(AuthGate.evaluate(&anonymous()), redirect(Route::Login));
        assert_eq!(AuthGate.evaluate(&signed_in(Role::User)), GateDecision::Render);
        assert_eq!(AuthGate.evaluate(&signed_in(Role::Admin)), GateDecision::Render);
    }

    #[test]
    fn test_admin_gate() {
        let gate = RoleGate::admin();

        assert_eq!(gate.evaluate(&anonymous()), redirect(Route::Login));
        assert_eq!(gate.evaluate(&signed_in(Role::User)), redirect(Route::Home));
        assert_eq!(gate.evaluate(&signed_in(Role::Admin)), GateDecision::Render);
    }

    #[test]
    fn test_open_gate_renders_even_while_initializing() {
        assert_eq!(OpenGate.evaluate(&initializing()), GateDecision::Render);
        assert_eq!(OpenGate.evaluate(&anonymous()), GateDecision::Render);
    }

    #[test]
    fn test_gate_for_follows_route_access() {
        let user = signed_in(Role::User);

        assert_eq!(gate_for(&Route::Home).evaluate(&anonymous()), GateDecision::Render);
        assert_eq!(gate_for(&Route::Create).evaluate(&anonymous()), redirect(Route::Login));
        assert_eq!(gate_for(&Route::Profile).evaluate(&user), GateDecision::Render);
        assert_eq!(gate_for(&Route::Admin).evaluate(&user), redirect(Route::Home));
    }
}

#[cfg(test)]
mod route_tests {
    use super::*;

    #[test]
    fn test_access_levels() {
        assert_eq!(Route::Home.access(), Access::Public);
        assert_eq!(Route::PostDetail("p1".into()).access(), Access::Public);
        assert_eq!(Route::Search("cats".into()).access(), Access::Public);
        assert_eq!(Route::Create.access(), Access::Authenticated);
        assert_eq!(Route::Edit("p1".into()).access(), Access::Authenticated);
        assert_eq!(Route::Profile.access(), Access::Authenticated);
        assert_eq!(Route::Admin.access(), Access::Admin);
    }

    #[test]
    fn test_paths_parse_back_to_routes() {
        let routes = [
            Route::Home,
            Route::Login,
            Route::Register,
            Route::Search("black & white cats".into()),
            Route::PostDetail("p-42".into()),
            Route::Create,
            Route::Edit("p-42".into()),
            Route::Profile,
            Route::Admin,
        ];
        for route in routes {
            assert_eq!(Route::from_path(&route.path()), route, "path {}", route.path());
        }
    }

    #[test]
    fn test_search_query_is_encoded() {
        let path = Route::Search("a&b".into()).path();
        assert!(path.starts_with("/search?q="));
        assert!(!path.contains("a&b"));
    }

    #[test]
    fn test_unknown_paths_fall_back_home() {
        assert_eq!(Route::from_path("/nowhere/at/all"), Route::Home);
        assert_eq!(Route::from_path("/edit"), Route::Home);
        assert_eq!(Route::from_path("/admin/"), Route::Admin);
    }
}

#[cfg(test)]
mod reevaluation_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_decision_before_initialization() {
        let handle = handle_for(MemoryCredentialStore::new());
        let mut rx = handle.subscribe();

        let pending =
            tokio::time::timeout(Duration::from_millis(50), wait_for_decision(&AuthGate, &mut rx)).await;
        assert!(pending.is_err(), "gate must not decide while initializing");

        handle.initialize();
        let decision = wait_for_decision(&AuthGate, &mut rx).await;
        assert_eq!(decision, redirect(Route::Login));
    }

    #[tokio::test]
    async fn test_initialization_resolves_a_waiting_gate() {
        let handle = handle_for(MemoryCredentialStore::with_session(&common::session(
            "root",
            Role::Admin,
        )));
        let mut rx = handle.subscribe();

        let gate = RoleGate::admin();
        let (decision, _) = tokio::join!(wait_for_decision(&gate, &mut rx), async {
            tokio::task::yield_now().await;
            handle.initialize()
        });

        assert_eq!(decision, GateDecision::Render);
    }

    #[tokio::test]
    async fn test_logout_redirects_a_rendered_view() {
        let handle = handle_for(MemoryCredentialStore::with_session(&common::session(
            "alice",
            Role::User,
        )));
        handle.initialize();
        let mut rx = handle.subscribe();
        assert_eq!(wait_for_decision(&AuthGate, &mut rx).await, GateDecision::Render);

        handle.end();

        assert_eq!(
            next_decision(&AuthGate, &mut rx).await,
            Some(redirect(Route::Login))
        );
    }

    #[tokio::test]
    async fn test_next_decision_ends_with_the_session() {
        let handle = handle_for(MemoryCredentialStore::new());
        handle.initialize();
        let mut rx = handle.subscribe();
        drop(handle);

        assert_eq!(next_decision(&AuthGate, &mut rx).await, None);
    }
}

#[cfg(test)]
mod view_scope_tests {
    use super::*;

    #[tokio::test]
    async fn test_live_scope_keeps_result() {
        let scope = ViewScope::new();
        assert_eq!(scope.guard(async { 7 }).await, Some(7));
    }

    #[tokio::test]
    async fn test_disposed_scope_discards_result() {
        let scope = ViewScope::new();
        let view = scope.clone();

        let result = scope
            .guard(async move {
                // The view unmounts while the call is in flight.
                view.dispose();
                "late"
            })
            .await;

        assert_eq!(result, None);
        assert!(scope.is_disposed());
    }
}
