use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Wire format for appointment start times
pub const BOOKING_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BookingStatus::Pending => write!(f, "pending"),
            BookingStatus::Accepted => write!(f, "accepted"),
            BookingStatus::Rejected => write!(f, "rejected"),
            BookingStatus::Completed => write!(f, "completed"),
            BookingStatus::Cancelled => write!(f, "cancelled"),
            BookingStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// An appointment as returned by the booking endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    #[serde(default)]
    pub physiotherapist_user_id: Option<String>,
    #[serde(default)]
    pub patient_user_id: Option<String>,
    #[serde(default)]
    pub date_time: Option<String>,
    #[serde(default)]
    pub status: BookingStatus,
    #[serde(default)]
    pub amount: Option<f64>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl Booking {
    /// Parsed appointment start, when the server sent a well-formed one
    pub fn start_time(&self) -> Option<NaiveDateTime> {
        let raw = self.date_time.as_deref()?;
        NaiveDateTime::parse_from_str(raw, BOOKING_TIME_FORMAT).ok()
    }
}

/// Payload for creating an appointment request
#[derive(Debug, Clone, Serialize)]
pub struct BookingRequest {
    pub physiotherapist_user_id: String,
    pub date_time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BookingDecision {
    Accept,
    Reject,
}

/// Payload for accepting or rejecting a proposed appointment. Accepted
/// bookings are paid from the wallet, so the decision carries the amount.
#[derive(Debug, Clone, Serialize)]
pub struct DecisionRequest {
    pub booking_id: String,
    pub decision: BookingDecision,
    pub payment_type: String,
    pub amount: f64,
}

impl DecisionRequest {
    pub fn accept(booking_id: impl Into<String>, amount: f64) -> Self {
        Self {
            booking_id: booking_id.into(),
            decision: BookingDecision::Accept,
            payment_type: "wallet".to_string(),
            amount,
        }
    }

    pub fn reject(booking_id: impl Into<String>) -> Self {
        Self {
            booking_id: booking_id.into(),
            decision: BookingDecision::Reject,
            payment_type: "wallet".to_string(),
            amount: 0.0,
        }
    }
}
