//! Payment gateway integration module
//!
//! This module builds signed payment requests for QPay and CyberSource Secure
//! Acceptance and verifies their asynchronous responses behind one interface.

pub mod format;
pub mod providers;
pub mod traits;
pub mod transport;
pub mod types;

pub use providers::{CyberSourceGateway, QPayGateway};
pub use traits::PaymentGateway;
pub use types::{
    CallbackOutcome, CallbackStatus, GatewayId, PaymentRequest, SignedPayload,
    TransactionContext, TransportMode,
};
