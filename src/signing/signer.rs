//! Outbound signing.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{canonical_string, FieldMap, HashAlgorithm, SigningProfile, SigningString, Without};
use crate::error::{PaymentError, PaymentResult};

type HmacSha256 = Hmac<Sha256>;

/// A field map that has gone through signing. Its fields include the
/// signature and, for transcript profiles, the signed field names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedFields {
    pub fields: FieldMap,
    pub signature: String,
    pub signed_field_names: Vec<String>,
}

pub(crate) fn ensure_secret(profile: &SigningProfile, secret: &SecretString) -> PaymentResult<()> {
    if secret.expose_secret().trim().is_empty() {
        return Err(PaymentError::configuration(format!(
            "{} secret key is not configured",
            profile.name
        )));
    }
    Ok(())
}

/// Computes the signature of an already canonicalized string.
pub fn compute_signature(
    profile: &SigningProfile,
    signing: &SigningString,
    secret: &SecretString,
) -> PaymentResult<String> {
    ensure_secret(profile, secret)?;

    match profile.algorithm {
        HashAlgorithm::HmacSha256Base64 => {
            let mut mac = HmacSha256::new_from_slice(secret.expose_secret().as_bytes())
                .map_err(|e| PaymentError::configuration(format!("Invalid HMAC key: {}", e)))?;
            mac.update(signing.as_bytes());
            Ok(STANDARD.encode(mac.finalize().into_bytes()))
        }
        HashAlgorithm::PrefixedSha256UpperHex => {
            Ok(hex::encode_upper(Sha256::digest(signing.as_bytes())))
        }
    }
}

/// Signs `fields` under `profile`.
///
/// The secret is checked before anything else so an unsigned payload can
/// never be produced. Fields are consumed: signing is the last change made to
/// an outbound payload.
pub fn sign(
    profile: &SigningProfile,
    mut fields: FieldMap,
    secret: &SecretString,
) -> PaymentResult<SignedFields> {
    ensure_secret(profile, secret)?;

    let order = profile.resolve_field_order(&fields)?;

    if let Some(transcript) = profile.transcript_field {
        fields.insert(transcript.to_string(), order.join(","));
    }

    let unsigned = Without {
        inner: &fields,
        hidden: profile.signature_field,
    };
    let signing = canonical_string(profile, &order, &unsigned, secret);
    let signature = compute_signature(profile, &signing, secret)?;

    debug!(
        "Signed {} payload over {} fields",
        profile.name,
        order.len()
    );

    fields.insert(profile.signature_field.to_string(), signature.clone());

    Ok(SignedFields {
        fields,
        signature,
        signed_field_names: order,
    })
}
