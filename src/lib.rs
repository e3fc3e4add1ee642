//! Payment-initiation relay for the QPay and CyberSource gateways.
//!
//! The relay signs outbound payment requests and verifies the signatures of
//! gateway callbacks. Secrets never leave the server.

pub mod config;
pub mod error;
pub mod payments;
pub mod signing;

#[cfg(feature = "server")]
pub mod api;
