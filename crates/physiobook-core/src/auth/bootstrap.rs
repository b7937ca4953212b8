use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use super::state::AuthState;
use super::validator::ValidateSession;
use super::SessionStore;

/// Terminal result of the startup sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapOutcome {
    Authenticated,
    SignedOut,
}

/// Run-once startup sequencer.
///
/// Moves through not-started, running, done exactly once per process;
/// concurrent and repeated `run` calls all settle on the first run's
/// outcome without touching storage or the network again. The sequence:
///
/// 1. Read the session record from storage.
/// 2. Absent: sign out locally and clear the key (a no-op when already
///    absent).
/// 3. Present: hand it to the validator. Valid: `login` with the merged
///    record and write it back. Invalid: sign out and clear the key.
/// 4. In every branch, mark the state initialized.
///
/// Step 4 is the property everything else bends around: the storage and
/// validator collaborators are total (their failures collapse to "absent"
/// or "invalid" before reaching this sequencer), so `set_initialized`
/// is reached unconditionally and the startup gate can never hang.
pub struct Bootstrap {
    sessions: SessionStore,
    validator: Arc<dyn ValidateSession>,
    state: Arc<AuthState>,
    outcome: OnceCell<BootstrapOutcome>,
}

impl Bootstrap {
    pub fn new(
        sessions: SessionStore,
        validator: Arc<dyn ValidateSession>,
        state: Arc<AuthState>,
    ) -> Self {
        Self {
            sessions,
            validator,
            state,
            outcome: OnceCell::new(),
        }
    }

    /// Establish the initial auth state, or return the already-settled
    /// outcome on every call after the first.
    pub async fn run(&self) -> BootstrapOutcome {
        *self.outcome.get_or_init(|| self.run_once()).await
    }

    /// True once the sequence has completed
    pub fn is_complete(&self) -> bool {
        self.outcome.initialized()
    }

    async fn run_once(&self) -> BootstrapOutcome {
        info!("Bootstrap starting");

        let outcome = match self.sessions.load().await {
            None => {
                debug!("No stored session");
                self.settle_signed_out().await
            }
            stored @ Some(_) => match self.validator.validate(stored).await {
                Some(record) => {
                    // Persist the server-refreshed snapshot; a write
                    // failure costs nothing but next launch's freshness
                    if let Err(e) = self.sessions.save(&record).await {
                        warn!(error = %e, "Failed to persist refreshed session");
                    }
                    self.state.login(record.patient);
                    BootstrapOutcome::Authenticated
                }
                None => self.settle_signed_out().await,
            },
        };

        self.state.set_initialized();
        info!(?outcome, "Bootstrap complete");
        outcome
    }

    async fn settle_signed_out(&self) -> BootstrapOutcome {
        self.sessions.clear().await;
        self.state.logout();
        BootstrapOutcome::SignedOut
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tempfile::TempDir;

    use super::*;
    use crate::auth::SessionRecord;
    use crate::models::{Patient, PatientUpdate, PATIENT_ROLE};
    use crate::store::SecureStore;

    fn patient(id: &str, wallet: f64) -> Patient {
        Patient {
            id: id.to_string(),
            name: Some("Asha Rao".to_string()),
            email: None,
            phone: None,
            date_of_birth: None,
            gender: None,
            role: PATIENT_ROLE.to_string(),
            profile_picture: None,
            wallet,
            is_banned: false,
            banned_until: None,
            is_deleted: false,
            created_at: None,
            updated_at: None,
        }
    }

    /// Validator stub that counts calls and either refreshes the record
    /// with a new wallet balance or declares it invalid.
    struct StubValidator {
        calls: AtomicUsize,
        accept_with_wallet: Option<f64>,
    }

    impl StubValidator {
        fn accepting(wallet: f64) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                accept_with_wallet: Some(wallet),
            }
        }

        fn rejecting() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                accept_with_wallet: None,
            }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ValidateSession for StubValidator {
        async fn validate(&self, record: Option<SessionRecord>) -> Option<SessionRecord> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let record = record?;
            let wallet = self.accept_with_wallet?;
            let mut refreshed = record.clone();
            PatientUpdate::wallet(wallet).apply(&mut refreshed.patient);
            Some(refreshed)
        }
    }

    struct Fixture {
        _dir: TempDir,
        sessions: SessionStore,
        state: Arc<AuthState>,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = SecureStore::with_passphrase(dir.path().to_path_buf(), "test").unwrap();
        Fixture {
            _dir: dir,
            sessions: SessionStore::new(Arc::new(store)),
            state: Arc::new(AuthState::new()),
        }
    }

    #[tokio::test]
    async fn no_stored_session_settles_signed_out_without_validation() {
        let fx = fixture();
        let validator = Arc::new(StubValidator::accepting(500.0));
        let bootstrap = Bootstrap::new(fx.sessions.clone(), validator.clone(), fx.state.clone());

        let outcome = bootstrap.run().await;

        assert_eq!(outcome, BootstrapOutcome::SignedOut);
        assert_eq!(validator.call_count(), 0);
        let snapshot = fx.state.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.is_initialized);
    }

    #[tokio::test]
    async fn valid_session_logs_in_with_merged_record() {
        let fx = fixture();
        fx.sessions
            .save(&SessionRecord::new("tok-1", patient("p-1", 100.0)))
            .await
            .unwrap();

        let validator = Arc::new(StubValidator::accepting(250.0));
        let bootstrap = Bootstrap::new(fx.sessions.clone(), validator, fx.state.clone());

        let outcome = bootstrap.run().await;

        assert_eq!(outcome, BootstrapOutcome::Authenticated);
        let snapshot = fx.state.snapshot();
        assert!(snapshot.is_authenticated);
        assert_eq!(snapshot.patient.as_ref().unwrap().wallet, 250.0);
        assert!(snapshot.is_initialized);

        // The refreshed record was written back to storage
        let stored = fx.sessions.load().await.unwrap();
        assert_eq!(stored.patient.wallet, 250.0);
        assert_eq!(stored.token, "tok-1");
    }

    #[tokio::test]
    async fn invalid_session_clears_storage_and_still_initializes() {
        let fx = fixture();
        fx.sessions
            .save(&SessionRecord::new("tok-stale", patient("p-1", 100.0)))
            .await
            .unwrap();

        let validator = Arc::new(StubValidator::rejecting());
        let bootstrap = Bootstrap::new(fx.sessions.clone(), validator, fx.state.clone());

        let outcome = bootstrap.run().await;

        assert_eq!(outcome, BootstrapOutcome::SignedOut);
        assert!(fx.sessions.load().await.is_none());
        let snapshot = fx.state.snapshot();
        assert!(!snapshot.is_authenticated);
        assert!(snapshot.is_initialized);
    }

    #[tokio::test]
    async fn broken_vault_degrades_to_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = SecureStore::with_passphrase(dir.path().to_path_buf(), "test").unwrap();
        // Unreadable ciphertext under the session key
        std::fs::write(dir.path().join("patient.vault"), b"corrupted").unwrap();

        let sessions = SessionStore::new(Arc::new(store));
        let state = Arc::new(AuthState::new());
        let validator = Arc::new(StubValidator::accepting(1.0));
        let bootstrap = Bootstrap::new(sessions, validator.clone(), state.clone());

        let outcome = bootstrap.run().await;

        assert_eq!(outcome, BootstrapOutcome::SignedOut);
        assert_eq!(validator.call_count(), 0);
        assert!(state.is_initialized());
    }

    #[tokio::test]
    async fn second_run_reuses_the_settled_outcome() {
        let fx = fixture();
        fx.sessions
            .save(&SessionRecord::new("tok-1", patient("p-1", 100.0)))
            .await
            .unwrap();

        let validator = Arc::new(StubValidator::accepting(100.0));
        let bootstrap = Bootstrap::new(fx.sessions.clone(), validator.clone(), fx.state.clone());

        assert_eq!(bootstrap.run().await, BootstrapOutcome::Authenticated);
        assert_eq!(bootstrap.run().await, BootstrapOutcome::Authenticated);
        assert_eq!(validator.call_count(), 1);
        assert!(bootstrap.is_complete());
    }

    #[tokio::test]
    async fn concurrent_runs_share_one_sequence() {
        let fx = fixture();
        fx.sessions
            .save(&SessionRecord::new("tok-1", patient("p-1", 100.0)))
            .await
            .unwrap();

        let validator = Arc::new(StubValidator::accepting(100.0));
        let bootstrap = Arc::new(Bootstrap::new(
            fx.sessions.clone(),
            validator.clone(),
            fx.state.clone(),
        ));

        let (a, b) = tokio::join!(bootstrap.run(), bootstrap.run());

        assert_eq!(a, BootstrapOutcome::Authenticated);
        assert_eq!(b, BootstrapOutcome::Authenticated);
        assert_eq!(validator.call_count(), 1);
    }
}
