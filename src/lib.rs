//! qrstudio - styled QR code designer with a one-time-payment premium gate
//!
//! This library holds the design model, the mapping from a design to
//! rendering instructions, premium feature classification and the export
//! gate, the persisted entitlement and hand-off stores, the return-from-payment
//! flow, and the HTTP endpoint that verifies checkout sessions.

pub mod config;
pub mod entitlement;
pub mod error;
pub mod extractors;
pub mod features;
pub mod gate;
pub mod handlers;
pub mod handoff;
pub mod models;
pub mod payments;
#[cfg(feature = "qr")]
pub mod qr;
pub mod render;
pub mod returns;
pub mod storage;
pub mod studio;
pub mod verify;
