//! Inbound callback verification.

use secrecy::SecretString;
use serde::Serialize;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use super::signer::ensure_secret;
use super::{canonical_string, compute_signature, CallbackProfile, FieldMap, FieldOrder, Without};
use crate::error::{PaymentError, PaymentResult};

/// A callback whose signature matched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedCallback {
    pub status: String,
    pub confirmation_id: Option<String>,
    pub status_message: Option<String>,
    pub raw_fields: FieldMap,
}

/// Verifies a gateway callback against `profile`.
///
/// The callback is never mutated. Terminal in one call: either a
/// [`VerifiedCallback`], `VerificationFailed`, or `MalformedResponse`.
pub fn verify(
    profile: &CallbackProfile,
    fields: &FieldMap,
    secret: &SecretString,
) -> PaymentResult<VerifiedCallback> {
    let signing = &profile.signing;
    ensure_secret(signing, secret)?;

    let received = fields
        .get(signing.signature_field)
        .map(String::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            PaymentError::malformed_response(format!(
                "{} response is missing {}",
                signing.name, signing.signature_field
            ))
        })?;

    let order = signing.resolve_field_order(fields)?;

    if let FieldOrder::Declared { .. } = signing.field_order {
        if !order.iter().any(|name| name == profile.status_field) {
            warn!(
                "{} response declares signed fields that do not cover {}",
                signing.name, profile.status_field
            );
        }
    }

    let unsigned = Without {
        inner: fields,
        hidden: signing.signature_field,
    };
    let canonical = canonical_string(signing, &order, &unsigned, secret);
    let expected = compute_signature(signing, &canonical, secret)?;

    if !signatures_match(&expected, received) {
        warn!("{} response signature mismatch", signing.name);
        return Err(PaymentError::verification_failed(signing.name));
    }

    let status = fields
        .get(profile.status_field)
        .filter(|s| !s.is_empty())
        .cloned()
        .unwrap_or_else(|| profile.default_status.to_string());

    debug!("{} response verified with status {}", signing.name, status);

    Ok(VerifiedCallback {
        status,
        confirmation_id: fields.get(profile.confirmation_field).cloned(),
        status_message: profile
            .message_field
            .and_then(|name| fields.get(name))
            .cloned(),
        raw_fields: fields.clone(),
    })
}

/// Exact, case-sensitive comparison run in constant time.
fn signatures_match(expected: &str, received: &str) -> bool {
    expected.len() == received.len() && bool::from(expected.as_bytes().ct_eq(received.as_bytes()))
}
