//! Sign-out paths.
//!
//! Two distinct teardowns, matching how the session can end:
//!
//! - `sign_out`: the user asked to leave. The server is told first
//!   (best-effort, a failure never blocks the local teardown), then local
//!   state is cleared and the caller may redirect.
//! - `force_sign_out`: the server rejected the credential. No server
//!   call, full state reset, redirect to sign-in. Built to be idempotent
//!   because concurrent in-flight requests can all hit 401 at once; the
//!   storage clear and the state reset repeat harmlessly and only the
//!   caller that performed the actual authenticated-to-signed-out
//!   transition issues the redirect.

use tracing::{info, warn};

use crate::api::ApiClient;
use crate::nav::{Navigator, Route};

use super::state::AuthState;
use super::SessionStore;

/// Graceful, user-initiated logout.
pub async fn sign_out(
    api: &ApiClient,
    sessions: &SessionStore,
    state: &AuthState,
    navigator: &dyn Navigator,
    redirect: bool,
) {
    match api.logout().await {
        Ok(message) => info!(%message, "Server logout acknowledged"),
        Err(e) => warn!(error = %e, "Server logout failed, continuing local teardown"),
    }

    sessions.clear().await;
    state.logout();

    if redirect {
        navigator.replace(Route::SignIn);
    }
}

/// Forced teardown after a server-side credential rejection.
pub async fn force_sign_out(sessions: &SessionStore, state: &AuthState, navigator: &dyn Navigator) {
    sessions.clear().await;

    if state.force_logout() {
        info!("Session torn down, redirecting to sign-in");
        navigator.replace(Route::SignIn);
    }
}
