//! Request/response middleware for the HTTP client.
//!
//! The client runs every outgoing request through an ordered list of
//! `RequestLayer`s and every response status through an ordered list of
//! `ResponseLayer`s. The two layers that matter in production:
//!
//! - `BearerAuth` reads the session record from storage on every request
//!   (storage is authoritative for the token, the in-memory container may
//!   lag a write) and attaches the bearer header when one is present.
//! - `SessionGuard` watches for 401/403 and tears the session down
//!   globally: storage cleared, auth state force-reset, redirect to the
//!   sign-in entry point. Safe under concurrent rejections.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{RequestBuilder, StatusCode};
use tracing::{debug, warn};

use crate::auth::state::AuthState;
use crate::auth::teardown;
use crate::auth::SessionStore;
use crate::nav::Navigator;

#[async_trait]
pub trait RequestLayer: Send + Sync {
    async fn prepare(&self, req: RequestBuilder) -> RequestBuilder;
}

#[async_trait]
pub trait ResponseLayer: Send + Sync {
    async fn inspect(&self, status: StatusCode);
}

/// Attaches `Authorization: Bearer <token>` from the stored session
/// record, when one exists.
pub struct BearerAuth {
    sessions: SessionStore,
}

impl BearerAuth {
    pub fn new(sessions: SessionStore) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl RequestLayer for BearerAuth {
    async fn prepare(&self, req: RequestBuilder) -> RequestBuilder {
        match self.sessions.load().await {
            Some(record) => req.bearer_auth(record.token),
            None => req,
        }
    }
}

/// Attaches a fixed bearer token. Used by the session validator, which
/// must present the credential from the record under test rather than
/// whatever storage currently holds.
pub struct StaticBearer {
    token: String,
}

impl StaticBearer {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into() }
    }
}

#[async_trait]
impl RequestLayer for StaticBearer {
    async fn prepare(&self, req: RequestBuilder) -> RequestBuilder {
        req.bearer_auth(&self.token)
    }
}

/// Forces a session teardown whenever the server answers 401 or 403,
/// regardless of which call triggered it.
pub struct SessionGuard {
    sessions: SessionStore,
    state: Arc<AuthState>,
    navigator: Arc<dyn Navigator>,
}

impl SessionGuard {
    pub fn new(sessions: SessionStore, state: Arc<AuthState>, navigator: Arc<dyn Navigator>) -> Self {
        Self {
            sessions,
            state,
            navigator,
        }
    }
}

#[async_trait]
impl ResponseLayer for SessionGuard {
    async fn inspect(&self, status: StatusCode) {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(status = %status, "Server rejected the session, forcing logout");
            teardown::force_sign_out(&self.sessions, &self.state, self.navigator.as_ref()).await;
        } else {
            debug!(status = %status, "Response passed session guard");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use reqwest::header::AUTHORIZATION;

    use super::*;
    use crate::auth::SessionRecord;
    use crate::models::{Patient, PATIENT_ROLE};
    use crate::nav::Route;
    use crate::store::SecureStore;

    struct CountingNavigator {
        replaced: AtomicUsize,
    }

    impl Navigator for CountingNavigator {
        fn replace(&self, _route: Route) {
            self.replaced.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn patient() -> Patient {
        Patient {
            id: "p-1".to_string(),
            name: None,
            email: None,
            phone: None,
            date_of_birth: None,
            gender: None,
            role: PATIENT_ROLE.to_string(),
            profile_picture: None,
            wallet: 0.0,
            is_banned: false,
            banned_until: None,
            is_deleted: false,
            created_at: None,
            updated_at: None,
        }
    }

    fn session_store(dir: &tempfile::TempDir) -> SessionStore {
        let store = SecureStore::with_passphrase(dir.path().to_path_buf(), "test").unwrap();
        SessionStore::new(Arc::new(store))
    }

    #[tokio::test]
    async fn bearer_auth_attaches_the_stored_token() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = session_store(&dir);
        sessions
            .save(&SessionRecord::new("stored-token", patient()))
            .await
            .unwrap();

        let layer = BearerAuth::new(sessions);
        let client = reqwest::Client::new();
        let req = layer
            .prepare(client.get("http://localhost/user/current"))
            .await
            .build()
            .unwrap();

        let header = req.headers().get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(header, "Bearer stored-token");
    }

    #[tokio::test]
    async fn bearer_auth_leaves_anonymous_requests_alone() {
        let dir = tempfile::tempdir().unwrap();
        let layer = BearerAuth::new(session_store(&dir));

        let client = reqwest::Client::new();
        let req = layer
            .prepare(client.get("http://localhost/auth/login"))
            .await
            .build()
            .unwrap();

        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[tokio::test]
    async fn static_bearer_presents_its_own_token() {
        let layer = StaticBearer::new("probe-token");
        let client = reqwest::Client::new();
        let req = layer
            .prepare(client.get("http://localhost/user/current"))
            .await
            .build()
            .unwrap();

        let header = req.headers().get(AUTHORIZATION).unwrap().to_str().unwrap();
        assert_eq!(header, "Bearer probe-token");
    }

    #[tokio::test]
    async fn guard_tears_down_on_credential_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = session_store(&dir);
        sessions
            .save(&SessionRecord::new("tok", patient()))
            .await
            .unwrap();

        let state = Arc::new(AuthState::new());
        state.set_initialized();
        state.login(patient());
        let navigator = Arc::new(CountingNavigator {
            replaced: AtomicUsize::new(0),
        });

        let guard = SessionGuard::new(sessions.clone(), state.clone(), navigator.clone());
        guard.inspect(StatusCode::FORBIDDEN).await;
        // A second rejection from a parallel request changes nothing
        guard.inspect(StatusCode::UNAUTHORIZED).await;

        assert!(sessions.load().await.is_none());
        assert!(!state.is_authenticated());
        assert!(state.is_initialized());
        assert_eq!(navigator.replaced.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn guard_ignores_ordinary_failures() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = session_store(&dir);
        sessions
            .save(&SessionRecord::new("tok", patient()))
            .await
            .unwrap();

        let state = Arc::new(AuthState::new());
        state.login(patient());
        let navigator = Arc::new(CountingNavigator {
            replaced: AtomicUsize::new(0),
        });

        let guard = SessionGuard::new(sessions.clone(), state.clone(), navigator.clone());
        guard.inspect(StatusCode::NOT_FOUND).await;
        guard.inspect(StatusCode::INTERNAL_SERVER_ERROR).await;

        assert!(sessions.load().await.is_some());
        assert!(state.is_authenticated());
        assert_eq!(navigator.replaced.load(Ordering::SeqCst), 0);
    }
}
