//! API client for the booking platform.
//!
//! One method per consumed endpoint. Requests flow through whatever
//! middleware pipeline the wrapped `HttpClient` carries; the production
//! wiring attaches `BearerAuth` and `SessionGuard`, while the session
//! validator uses `ApiClient::probe` with a fixed token and no guard.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::SessionRecord;
use crate::models::{
    Booking, BookingRequest, DecisionRequest, Patient, Physiotherapist, Transaction,
    WalletReceipt, PATIENT_ROLE,
};

use super::middleware::StaticBearer;
use super::{ApiError, HttpClient};

// ============================================================================
// Constants
// ============================================================================

/// Country calling code prefixed to bare phone-number identifiers
const PHONE_COUNTRY_CODE: &str = "+91";

/// Required length for a bare phone-number identifier
const PHONE_DIGITS: usize = 10;

/// Minimum wallet top-up amount in rupees
pub const MIN_TOPUP_AMOUNT: f64 = 100.0;

// ============================================================================
// Request/response wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    email_or_phone: &'a str,
    password: &'a str,
}

#[derive(Debug, Serialize)]
struct SignupRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    phone: Option<String>,
    password: &'a str,
    role: &'static str,
}

#[derive(Debug, Serialize)]
struct NameUpdateRequest<'a> {
    name: &'a str,
}

#[derive(Debug, Serialize)]
struct TopUpRequest {
    amount: f64,
}

/// Login response data: the patient document plus the bearer token
#[derive(Debug, Deserialize)]
struct AuthPayload {
    token: String,
    #[serde(flatten)]
    patient: Patient,
}

// ============================================================================
// Identifier classification
// ============================================================================

/// A sign-in/sign-up identifier: an email address or a bare local phone
/// number. Anything else is a local validation error, never sent to the
/// server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    Phone(String),
}

impl Identifier {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ApiError::Validation(
                "Identifier (phone or email) is required".to_string(),
            ));
        }

        if raw.chars().all(|c| c.is_ascii_digit()) {
            if raw.len() == PHONE_DIGITS {
                return Ok(Identifier::Phone(raw.to_string()));
            }
            return Err(ApiError::Validation(format!(
                "Phone number must be exactly {} digits",
                PHONE_DIGITS
            )));
        }

        if Self::looks_like_email(raw) {
            return Ok(Identifier::Email(raw.to_string()));
        }

        Err(ApiError::Validation(
            "Identifier must be a valid email or a phone number containing only digits"
                .to_string(),
        ))
    }

    /// Minimal shape check: one '@' with a dot somewhere after it and no
    /// whitespace.
    fn looks_like_email(s: &str) -> bool {
        if s.chars().any(char::is_whitespace) {
            return false;
        }
        match s.split_once('@') {
            Some((local, domain)) => {
                !local.is_empty()
                    && !domain.starts_with('.')
                    && !domain.ends_with('.')
                    && domain.contains('.')
                    && !domain.contains('@')
            }
            None => false,
        }
    }

    /// The identifier as typed, for echoing back into a login form
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Email(s) | Identifier::Phone(s) => s,
        }
    }
}

// ============================================================================
// Client
// ============================================================================

/// API client for the booking platform.
/// Clone is cheap - the inner reqwest client and layers are shared.
#[derive(Clone)]
pub struct ApiClient {
    http: HttpClient,
}

impl ApiClient {
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// Build a client that presents exactly `token` and carries no
    /// response middleware. The session validator uses this to check a
    /// stored record without touching global state.
    pub fn probe(base_url: &str, token: &str) -> Result<Self, ApiError> {
        let mut http = HttpClient::new(base_url)?;
        http.layer_request(Arc::new(StaticBearer::new(token)));
        Ok(Self { http })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    // ===== Authentication =====

    /// Authenticate and return a fresh session record. Accounts with a
    /// non-patient role are rejected client-side without being persisted.
    pub async fn authenticate(
        &self,
        identifier: &str,
        password: &str,
    ) -> Result<SessionRecord, ApiError> {
        let body = LoginRequest {
            email_or_phone: identifier,
            password,
        };
        let payload: AuthPayload = self.http.post("/auth/login", &body).await?;
        Self::ensure_patient_role(&payload.patient)?;

        debug!(patient_id = %payload.patient.id, "Authenticated");
        Ok(SessionRecord {
            token: payload.token,
            patient: payload.patient,
            created_at: Utc::now(),
        })
    }

    /// Register a new patient account. The payload shape depends on
    /// whether the identifier is an email or a phone number; phone
    /// numbers get the country code prefixed. Returns the server message.
    pub async fn register(&self, identifier: &Identifier, password: &str) -> Result<String, ApiError> {
        let body = match identifier {
            Identifier::Email(email) => SignupRequest {
                email: Some(email),
                phone: None,
                password,
                role: PATIENT_ROLE,
            },
            Identifier::Phone(digits) => SignupRequest {
                email: None,
                phone: Some(format!("{}{}", PHONE_COUNTRY_CODE, digits)),
                password,
                role: PATIENT_ROLE,
            },
        };
        self.http.post_ack("/auth/signup", &body).await
    }

    /// Best-effort server-side logout
    pub async fn logout(&self) -> Result<String, ApiError> {
        self.http.get_ack("/auth/logout").await
    }

    fn ensure_patient_role(patient: &Patient) -> Result<(), ApiError> {
        if patient.role != PATIENT_ROLE {
            return Err(ApiError::Rejected(
                "You are not authorized to access this application".to_string(),
            ));
        }
        Ok(())
    }

    // ===== Current user =====

    pub async fn fetch_current_user(&self) -> Result<Patient, ApiError> {
        self.http.get("/user/current").await
    }

    /// Update the display name. The server result is unused beyond the
    /// acknowledgement; callers merge the name into local state themselves.
    pub async fn update_display_name(&self, name: &str) -> Result<String, ApiError> {
        self.http
            .patch_ack("/user/current", &NameUpdateRequest { name })
            .await
    }

    /// Top up the wallet, returning the new balance
    pub async fn top_up_wallet(&self, amount: f64) -> Result<WalletReceipt, ApiError> {
        if amount <= 0.0 {
            return Err(ApiError::Validation(
                "Please select an amount to top up".to_string(),
            ));
        }
        if amount < MIN_TOPUP_AMOUNT {
            return Err(ApiError::Validation(format!(
                "Minimum top-up amount is ₹{:.0}",
                MIN_TOPUP_AMOUNT
            )));
        }
        self.http
            .post("/user/wallet/topup", &TopUpRequest { amount })
            .await
    }

    // ===== Physiotherapists =====

    pub async fn fetch_physiotherapists(&self) -> Result<Vec<Physiotherapist>, ApiError> {
        self.http.get("/partners/physiotherapists").await
    }

    pub async fn fetch_physiotherapist(&self, id: &str) -> Result<Physiotherapist, ApiError> {
        self.http
            .get(&format!("/partners/physiotherapists/{}", id))
            .await
    }

    // ===== Bookings =====

    pub async fn create_booking(&self, request: &BookingRequest) -> Result<Booking, ApiError> {
        self.http.post("/booking", request).await
    }

    pub async fn fetch_bookings(&self) -> Result<Vec<Booking>, ApiError> {
        self.http.get("/booking/currentuser").await
    }

    /// Accept or reject a proposed appointment. Returns the server message.
    pub async fn decide_booking(&self, request: &DecisionRequest) -> Result<String, ApiError> {
        self.http.post_ack("/booking/decision", request).await
    }

    // ===== Transactions =====

    pub async fn fetch_transactions(&self) -> Result<Vec<Transaction>, ApiError> {
        self.http.get("/transaction/currentuser").await
    }
}
