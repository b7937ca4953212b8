use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, warn};

use crate::models::{Patient, PatientUpdate};

/// Point-in-time view of the auth state, handed to screens for gating
/// their own rendering and data fetching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSnapshot {
    pub is_authenticated: bool,
    pub patient: Option<Patient>,
    pub is_initialized: bool,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// In-memory source of truth for "is this session valid right now".
///
/// Created once at process start and shared by reference; reset on
/// logout, never destroyed before process exit. Two invariants hold at
/// every observable point:
///
/// - `is_authenticated` is true iff `patient` is set. The two are only
///   ever written together.
/// - `is_initialized` becomes true exactly once, when bootstrap
///   completes, and never reverts. A forced teardown resets everything
///   else but leaves it alone, otherwise the startup gate would re-engage
///   and hang the app.
///
/// Every operation is total: there is nothing to propagate, and a
/// poisoned lock is recovered rather than unwound into a panic.
#[derive(Default)]
pub struct AuthState {
    inner: RwLock<AuthSnapshot>,
}

impl AuthState {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, AuthSnapshot> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, AuthSnapshot> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ===== Transitions =====

    /// Successful login or successful session validation
    pub fn login(&self, patient: Patient) {
        let mut state = self.write();
        state.patient = Some(patient);
        state.is_authenticated = true;
        state.is_loading = false;
        state.error = None;
    }

    /// Shallow-merge a partial update into the signed-in patient.
    /// Returns false (and changes nothing) when no patient is present;
    /// merging into an absent identity is a caller bug, not a panic.
    pub fn update_patient(&self, update: &PatientUpdate) -> bool {
        let mut state = self.write();
        match state.patient.as_mut() {
            Some(patient) => {
                update.apply(patient);
                true
            }
            None => {
                warn!("update_patient called while signed out, ignoring");
                false
            }
        }
    }

    /// User-initiated logout. Leaves `is_initialized` untouched.
    pub fn logout(&self) {
        let mut state = self.write();
        state.patient = None;
        state.is_authenticated = false;
        state.is_loading = false;
        state.error = None;
    }

    /// Hard teardown after the server rejected the session. Clears the
    /// transient flags too, so nothing stale survives, and reports
    /// whether this call performed the authenticated-to-signed-out
    /// transition. Under concurrent rejections exactly one caller sees
    /// true, which is what keeps the redirect single-shot.
    pub fn force_logout(&self) -> bool {
        let mut state = self.write();
        let was_authenticated = state.is_authenticated;
        let initialized = state.is_initialized;
        *state = AuthSnapshot {
            is_initialized: initialized,
            ..AuthSnapshot::default()
        };
        if was_authenticated {
            debug!("Forced logout reset the auth state");
        }
        was_authenticated
    }

    // ===== Transient flags =====

    /// Starting a new operation clears any previous error
    pub fn set_loading(&self, loading: bool) {
        let mut state = self.write();
        state.is_loading = loading;
        if loading {
            state.error = None;
        }
    }

    pub fn set_error(&self, message: impl Into<String>) {
        let mut state = self.write();
        state.error = Some(message.into());
        state.is_loading = false;
    }

    pub fn clear_error(&self) {
        self.write().error = None;
    }

    /// Marks bootstrap completion. Idempotent; never unset afterwards.
    pub fn set_initialized(&self) {
        self.write().is_initialized = true;
    }

    // ===== Reads =====

    pub fn snapshot(&self) -> AuthSnapshot {
        self.read().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().is_authenticated
    }

    pub fn is_initialized(&self) -> bool {
        self.read().is_initialized
    }
}
