//! Static description of a gateway signing protocol.

use std::borrow::Cow;

use super::FieldSource;
use crate::error::{PaymentError, PaymentResult};

/// How the canonical string is joined before hashing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinStyle {
    /// `field=value` tokens joined by commas.
    KeyValueComma,
    /// Secret key followed by the bare values, no separators.
    SecretPrefixed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// HMAC-SHA-256 keyed by the secret, standard base64 output.
    HmacSha256Base64,
    /// SHA-256 over the secret-prefixed string, uppercase hex output.
    PrefixedSha256UpperHex,
}

impl HashAlgorithm {
    pub fn join_style(self) -> JoinStyle {
        match self {
            Self::HmacSha256Base64 => JoinStyle::KeyValueComma,
            Self::PrefixedSha256UpperHex => JoinStyle::SecretPrefixed,
        }
    }
}

/// Representation of an absent field in the canonical string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingFieldPolicy {
    Placeholder(&'static str),
    Omit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueNormalization {
    pub trim: bool,
}

impl ValueNormalization {
    pub const TRIM: Self = Self { trim: true };
    pub const VERBATIM: Self = Self { trim: false };

    pub fn apply<'a>(&self, value: &'a str) -> &'a str {
        if self.trim {
            value.trim()
        } else {
            value
        }
    }
}

/// Source of the ordered list of signed fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOrder {
    /// Fixed by the gateway's documentation.
    Fixed(Cow<'static, [&'static str]>),
    /// Read from a comma-separated field of the payload itself. The list is not
    /// bound to anything the relay controls.
    Declared { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningProfile {
    /// Gateway name, used in errors and logs.
    pub name: &'static str,
    pub field_order: FieldOrder,
    pub algorithm: HashAlgorithm,
    pub missing_field_policy: MissingFieldPolicy,
    pub normalization: ValueNormalization,
    /// Field that carries the computed signature.
    pub signature_field: &'static str,
    /// Field that receives the comma-joined list of signed field names when
    /// signing. It must itself appear in the field order.
    pub transcript_field: Option<&'static str>,
}

impl SigningProfile {
    pub fn join_style(&self) -> JoinStyle {
        self.algorithm.join_style()
    }

    /// Returns a copy of this profile signing over `order` instead.
    pub fn with_field_order(&self, order: Vec<&'static str>) -> Self {
        Self {
            field_order: FieldOrder::Fixed(Cow::Owned(order)),
            ..self.clone()
        }
    }

    /// Resolves the signed field names for `fields`.
    ///
    /// Fails with `MalformedResponse` when the order is declared by the
    /// payload and the declaring field is absent or empty.
    pub fn resolve_field_order<S: FieldSource + ?Sized>(
        &self,
        fields: &S,
    ) -> PaymentResult<Vec<String>> {
        match &self.field_order {
            FieldOrder::Fixed(names) => Ok(names.iter().map(|n| n.to_string()).collect()),
            FieldOrder::Declared { field } => {
                let declared = fields
                    .field(field)
                    .filter(|v| !v.trim().is_empty())
                    .ok_or_else(|| {
                        PaymentError::malformed_response(format!(
                            "{} response is missing {}",
                            self.name, field
                        ))
                    })?;

                Ok(declared.split(',').map(str::to_string).collect())
            }
        }
    }
}

/// Signing profile of a gateway callback, with the fields a verified
/// callback is summarized from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackProfile {
    pub signing: SigningProfile,
    pub status_field: &'static str,
    pub confirmation_field: &'static str,
    pub message_field: Option<&'static str>,
    /// Status reported when the gateway sends none.
    pub default_status: &'static str,
}
