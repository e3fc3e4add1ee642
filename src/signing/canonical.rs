//! Canonical field serialization.

use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use super::{FieldSource, JoinStyle, MissingFieldPolicy, SigningProfile};

/// The exact byte string a signature is computed over.
///
/// For secret-prefixed profiles it contains the secret key, so it is never
/// printed.
pub struct SigningString(String);

impl SigningString {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for SigningString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SigningString([REDACTED])")
    }
}

/// Renders `fields` in `order` according to the profile's join style.
///
/// Absent fields never abort: they degrade to the profile's placeholder, or
/// are dropped under [`MissingFieldPolicy::Omit`]. `secret` is only read by
/// secret-prefixed profiles.
pub fn canonical_string<F, S>(
    profile: &SigningProfile,
    order: &[F],
    fields: &S,
    secret: &SecretString,
) -> SigningString
where
    F: AsRef<str>,
    S: FieldSource + ?Sized,
{
    let values = order.iter().filter_map(|name| {
        let name = name.as_ref();
        let value = match fields.field(name) {
            Some(raw) => profile.normalization.apply(&raw).to_string(),
            None => match profile.missing_field_policy {
                MissingFieldPolicy::Placeholder(placeholder) => placeholder.to_string(),
                MissingFieldPolicy::Omit => return None,
            },
        };
        Some((name, value))
    });

    let rendered = match profile.join_style() {
        JoinStyle::KeyValueComma => values
            .map(|(name, value)| format!("{}={}", name, value))
            .collect::<Vec<_>>()
            .join(","),
        JoinStyle::SecretPrefixed => {
            let mut out = secret.expose_secret().to_string();
            for (_, value) in values {
                out.push_str(&value);
            }
            out
        }
    };

    SigningString(rendered)
}
