use async_trait::async_trait;
use tracing::{debug, warn};

use crate::api::ApiClient;

use super::SessionRecord;

/// Capability contract for session validation, so the bootstrap
/// sequencer can be exercised without a network.
#[async_trait]
pub trait ValidateSession: Send + Sync {
    async fn validate(&self, record: Option<SessionRecord>) -> Option<SessionRecord>;
}

/// Confirms that a stored session record still represents a live account
/// and refreshes it with current server-side fields.
///
/// Fail-closed by design: a network error, a rejected envelope and an
/// explicit 401/403 all collapse to "no session". An app that cannot
/// reach the server cannot safely claim the user is authenticated, so
/// there is no retry here.
pub struct SessionValidator {
    base_url: String,
}

impl SessionValidator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl ValidateSession for SessionValidator {
    /// Absent record: answers immediately, no network call. Present
    /// record: one "who am I" request using the record's own credential,
    /// through a probe client with no session-guard middleware so the
    /// check itself has no side effects on storage or state.
    async fn validate(&self, record: Option<SessionRecord>) -> Option<SessionRecord> {
        let record = record?;

        let api = match ApiClient::probe(&self.base_url, &record.token) {
            Ok(api) => api,
            Err(e) => {
                warn!(error = %e, "Failed to build validation client");
                return None;
            }
        };

        match api.fetch_current_user().await {
            Ok(server_patient) => {
                debug!(patient_id = %server_patient.id, "Stored session confirmed");
                Some(SessionRecord {
                    token: record.token,
                    patient: record.patient.merged_with(server_patient),
                    created_at: record.created_at,
                })
            }
            Err(e) => {
                warn!(error = %e, "Session validation failed, treating as signed out");
                None
            }
        }
    }
}
