//! Client-side session, authorization and attachment handling for the
//! Postboard content-sharing service.
//!
//! The view layer is an external collaborator: it reads the session through
//! [`SessionManager`], asks [`navigation`] gates whether a view may render, and
//! sends every API call through the [`RequestGateway`].

use std::sync::Arc;

// --- Module Structure ---

// Core client components.
pub mod attachments;
pub mod compose;
pub mod config;
pub mod credential_store;
pub mod error;
pub mod gateway;
pub mod models;
pub mod navigation;
pub mod session;
pub mod upload;

// Typed wrappers over the REST route groups.
pub mod api;

use api::{admin::AdminApi, auth::HttpAuthService, comments::CommentsApi, posts::PostsApi};

// --- Public Re-exports ---

pub use attachments::{AttachmentReconciler, MAX_ATTACHMENTS};
pub use config::AppConfig;
pub use credential_store::{CredentialStore, CredentialStoreState, FileCredentialStore, MemoryCredentialStore};
pub use error::{ClientError, ClientResult};
pub use gateway::{RequestGateway, ReqwestTransport, TransportState};
pub use navigation::{AuthGate, Gate, GateDecision, RecordingNavigator, RoleGate, Route};
pub use session::{SessionHandle, SessionManager, SessionSnapshot};
pub use upload::{HttpUploadService, UploadState};

/// Client
///
/// The single owned bundle of client services, passed down to views instead of
/// any module-level state. Cloning is cheap; all clones share one session.
#[derive(Clone)]
pub struct Client {
    pub session: SessionManager,
    pub gateway: RequestGateway,
    pub posts: PostsApi,
    pub comments: CommentsApi,
    pub admin: AdminApi,
    pub uploads: UploadState,
    /// Redirects issued by the gateway, waiting for the view layer.
    pub navigator: Arc<RecordingNavigator>,
    pub config: AppConfig,
}

impl Client {
    /// from_config
    ///
    /// Production wiring: a reqwest transport against `api_base_url` and a
    /// file-backed credential store under `credential_dir`.
    pub fn from_config(config: AppConfig) -> ClientResult<Self> {
        let transport = Arc::new(ReqwestTransport::new(
            &config.api_base_url,
            config.request_timeout,
        )?) as TransportState;
        let store = Arc::new(FileCredentialStore::new(config.credential_dir.clone())) as CredentialStoreState;

        Ok(Self::assemble(config, transport, store))
    }

    /// assemble
    ///
    /// Wires the components leaf-first (store, session handle, gateway,
    /// services, manager) and rehydrates the session before returning, so no
    /// gate or gateway decision is ever made against unread storage.
    pub fn assemble(config: AppConfig, transport: TransportState, store: CredentialStoreState) -> Self {
        let handle = Arc::new(SessionHandle::new(store));
        let navigator = Arc::new(RecordingNavigator::new());
        let gateway = RequestGateway::new(transport, Arc::clone(&handle), navigator.clone());

        let auth = Arc::new(HttpAuthService::new(gateway.clone()));
        let session = SessionManager::new(handle, auth);
        session.initialize();

        Self {
            session,
            posts: PostsApi::new(gateway.clone()),
            comments: CommentsApi::new(gateway.clone()),
            admin: AdminApi::new(gateway.clone()),
            uploads: Arc::new(HttpUploadService::new(gateway.clone())),
            gateway,
            navigator,
            config,
        }
    }
}
