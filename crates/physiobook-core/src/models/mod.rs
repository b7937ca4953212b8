//! Data models for physiobook entities.
//!
//! This module contains the data structures exchanged with the booking
//! platform API:
//!
//! - `Patient`, `PatientUpdate`: the signed-in user and partial updates
//! - `Physiotherapist`: provider profiles from the partners directory
//! - `Booking` types: appointments and the accept/reject decision payloads
//! - `Transaction`, `WalletReceipt`: wallet history and top-up results

pub mod booking;
pub mod patient;
pub mod physiotherapist;
pub mod transaction;

pub use booking::{Booking, BookingDecision, BookingRequest, BookingStatus, DecisionRequest};
pub use patient::{Patient, PatientUpdate, PATIENT_ROLE};
pub use physiotherapist::Physiotherapist;
pub use transaction::{Transaction, WalletReceipt};
