//! Payment gateway implementations
//!
//! Concrete implementations of the PaymentGateway trait for each supported gateway.

pub mod cybersource;
pub mod qpay;

pub use cybersource::{CyberSourceConfig, CyberSourceGateway};
pub use qpay::{QPayConfig, QPayGateway};
