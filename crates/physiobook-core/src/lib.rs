//! Core library for the physiobook patient client.
//!
//! This crate contains everything below the presentation layer:
//!
//! - `store`: encrypted on-device key-value storage for the session record
//! - `auth`: auth state container, session validation, startup bootstrap
//! - `api`: REST client with request/response middleware for bearer auth
//!   and server-side session rejection
//! - `models`: patient, physiotherapist, booking and transaction types
//! - `schedule`: appointment date and time-slot helpers
//!
//! The binary in `physiobook-cli` wires these together; screens (or CLI
//! commands) gate themselves on the auth state exposed here.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod nav;
pub mod schedule;
pub mod store;
