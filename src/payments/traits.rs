//! Payment gateway trait definitions
//!
//! Defines the common interface that all payment gateways must implement.

use crate::error::PaymentResult;
use crate::payments::transport::GatewayClient;
use crate::payments::types::{
    CallbackOutcome, GatewayId, GatewayReply, PaymentRequest, SignedPayload, TransactionContext,
};
use crate::signing::{FieldMap, VerifiedCallback};
use async_trait::async_trait;
use tracing::{info, warn};

/// Trait for payment gateway implementations
///
/// QPay and CyberSource both implement this trait. Building and verifying are
/// pure; only `submit_payment` touches the network.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn id(&self) -> GatewayId;

    /// Whether a non-empty secret key is available for signing
    fn is_configured(&self) -> bool;

    /// Build and sign the gateway payload for a client request
    ///
    /// # Arguments
    /// * `request` - Loosely typed client input
    /// * `context` - Timestamp and optional forced identifiers
    ///
    /// # Returns
    /// * `SignedPayload` - Every signed field, the signature, and the target URL
    fn build_payment(
        &self,
        request: &PaymentRequest,
        context: &TransactionContext,
    ) -> PaymentResult<SignedPayload>;

    /// Verify the signature of a gateway callback
    ///
    /// # Returns
    /// * `VerifiedCallback` on match, `VerificationFailed` on mismatch,
    ///   `MalformedResponse` when the signature or field list is absent
    fn verify_callback(&self, fields: &FieldMap) -> PaymentResult<VerifiedCallback>;

    /// HTTP client used for server-to-server submission
    fn client(&self) -> &GatewayClient;

    /// POST a signed payload to the gateway, form encoded. Never retried.
    async fn submit_payment(&self, payload: &SignedPayload) -> PaymentResult<GatewayReply> {
        self.client().submit(payload).await
    }

    /// Verify a callback and fold the result into a terminal outcome
    fn handle_callback(&self, fields: &FieldMap) -> CallbackOutcome {
        let outcome = CallbackOutcome::from_result(self.id(), self.verify_callback(fields), fields);
        if outcome.is_verified() {
            info!(
                "{} callback verified: status={}, confirmation={}",
                self.id(),
                outcome.status.as_str(),
                outcome.confirmation_id.as_deref().unwrap_or("none")
            );
        } else {
            warn!(
                "{} callback rejected: status={}",
                self.id(),
                outcome.status.as_str()
            );
        }
        outcome
    }
}
