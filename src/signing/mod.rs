//! Gateway signature protocol
//!
//! Both supported gateways sign a canonical, ordered rendering of a flat field
//! map. The protocol is parametrized by a [`SigningProfile`]; there is one
//! signer and one verifier shared by every gateway.

pub mod canonical;
pub mod profile;
pub mod signer;
pub mod verifier;

pub use canonical::{canonical_string, SigningString};
pub use profile::{
    CallbackProfile, FieldOrder, HashAlgorithm, JoinStyle, MissingFieldPolicy, SigningProfile,
    ValueNormalization,
};
pub use signer::{compute_signature, sign, SignedFields};
pub use verifier::{verify, VerifiedCallback};

use serde_json::Value;
use std::borrow::Cow;
use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;

/// Flat field map as sent to or received from a gateway.
pub type FieldMap = BTreeMap<String, String>;

/// Read access to a loosely typed field mapping.
///
/// Returns `None` for absent fields. Non-string values are rendered as text.
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;
}

impl FieldSource for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl<S: BuildHasher> FieldSource for HashMap<String, String, S> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        self.get(name).map(|v| Cow::Borrowed(v.as_str()))
    }
}

impl FieldSource for serde_json::Map<String, Value> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        match self.get(name)? {
            Value::Null => None,
            Value::String(s) => Some(Cow::Borrowed(s.as_str())),
            Value::Number(n) => Some(Cow::Owned(n.to_string())),
            Value::Bool(b) => Some(Cow::Owned(b.to_string())),
            other => Some(Cow::Owned(other.to_string())),
        }
    }
}

/// Hides one field of the underlying source.
pub(crate) struct Without<'a, S: ?Sized> {
    pub(crate) inner: &'a S,
    pub(crate) hidden: &'a str,
}

impl<S: FieldSource + ?Sized> FieldSource for Without<'_, S> {
    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        if name == self.hidden {
            None
        } else {
            self.inner.field(name)
        }
    }
}
