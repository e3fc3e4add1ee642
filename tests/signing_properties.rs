//! Property tests for the gateway signature protocol
//!
//! Covers determinism, sign/verify round trips, tamper and order sensitivity
//! and missing-field handling for both join styles, plus concrete QPay and
//! CyberSource callback scenarios.

use std::borrow::Cow;

use proptest::prelude::*;
use secrecy::SecretString;
use sha2::{Digest, Sha256};

use payrelay_backend::error::PaymentError;
use payrelay_backend::payments::providers::{cybersource, qpay};
use payrelay_backend::payments::providers::{
    CyberSourceConfig, CyberSourceGateway, QPayConfig, QPayGateway,
};
use payrelay_backend::payments::{CallbackStatus, PaymentGateway};
use payrelay_backend::signing::{
    sign, verify, CallbackProfile, FieldMap, FieldOrder, HashAlgorithm, MissingFieldPolicy,
    SigningProfile, ValueNormalization,
};

const FIELDS: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

fn profile(algorithm: HashAlgorithm, order: Vec<&'static str>) -> SigningProfile {
    SigningProfile {
        name: "test",
        field_order: FieldOrder::Fixed(Cow::Owned(order)),
        algorithm,
        missing_field_policy: MissingFieldPolicy::Placeholder(""),
        normalization: ValueNormalization::VERBATIM,
        signature_field: "signature",
        transcript_field: None,
    }
}

fn callback(signing: SigningProfile) -> CallbackProfile {
    CallbackProfile {
        signing,
        status_field: "alpha",
        confirmation_field: "beta",
        message_field: None,
        default_status: "UNKNOWN",
    }
}

fn secret(raw: &str) -> SecretString {
    SecretString::new(raw.to_string())
}

fn field_map(values: &[String]) -> FieldMap {
    FIELDS
        .iter()
        .zip(values)
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn algorithm() -> impl Strategy<Value = HashAlgorithm> {
    prop_oneof![
        Just(HashAlgorithm::HmacSha256Base64),
        Just(HashAlgorithm::PrefixedSha256UpperHex),
    ]
}

fn values() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[A-Za-z0-9]{1,12}", FIELDS.len())
}

proptest! {
    #[test]
    fn signing_is_deterministic(alg in algorithm(), vals in values(), key in "[a-z0-9]{8,24}") {
        let profile = profile(alg, FIELDS.to_vec());
        let first = sign(&profile, field_map(&vals), &secret(&key)).unwrap();
        let second = sign(&profile, field_map(&vals), &secret(&key)).unwrap();
        prop_assert_eq!(first.signature, second.signature);
    }

    #[test]
    fn signed_fields_verify(alg in algorithm(), vals in values(), key in "[a-z0-9]{8,24}") {
        let profile = profile(alg, FIELDS.to_vec());
        let signed = sign(&profile, field_map(&vals), &secret(&key)).unwrap();

        let verified = verify(&callback(profile), &signed.fields, &secret(&key)).unwrap();
        prop_assert_eq!(&verified.status, &vals[0]);
        prop_assert_eq!(verified.confirmation_id.as_deref(), Some(vals[1].as_str()));
    }

    #[test]
    fn tampered_value_fails_verification(
        alg in algorithm(),
        vals in values(),
        key in "[a-z0-9]{8,24}",
        index in 0..FIELDS.len(),
    ) {
        let profile = profile(alg, FIELDS.to_vec());
        let mut signed = sign(&profile, field_map(&vals), &secret(&key)).unwrap().fields;
        if let Some(value) = signed.get_mut(FIELDS[index]) {
            value.push('X');
        }

        let err = verify(&callback(profile), &signed, &secret(&key)).unwrap_err();
        let is_verification_failure = matches!(err, PaymentError::VerificationFailed { .. });
        prop_assert!(is_verification_failure);
    }

    #[test]
    fn wrong_secret_fails_verification(
        alg in algorithm(),
        vals in values(),
        key in "[a-z0-9]{8,24}",
    ) {
        let profile = profile(alg, FIELDS.to_vec());
        let signed = sign(&profile, field_map(&vals), &secret(&key)).unwrap();

        let other = format!("{}x", key);
        let result = verify(&callback(profile), &signed.fields, &secret(&other));
        prop_assert!(result.is_err());
    }

    #[test]
    fn verifying_under_swapped_order_fails(
        alg in algorithm(),
        vals in values(),
        key in "[a-z0-9]{8,24}",
        (i, j) in (0..FIELDS.len(), 0..FIELDS.len())
            .prop_filter("distinct indices", |(i, j)| i != j),
    ) {
        // Prefix each value with its field name so no two values coincide
        let vals: Vec<String> = FIELDS
            .iter()
            .zip(&vals)
            .map(|(f, v)| format!("{}{}", f, v))
            .collect();
        let forward = profile(alg, FIELDS.to_vec());
        let signed = sign(&forward, field_map(&vals), &secret(&key)).unwrap();

        let mut swapped = FIELDS.to_vec();
        swapped.swap(i, j);
        let result = verify(&callback(profile(alg, swapped)), &signed.fields, &secret(&key));
        let is_verification_failure =
            matches!(result, Err(PaymentError::VerificationFailed { .. }));
        prop_assert!(is_verification_failure);
    }

    #[test]
    fn missing_field_signs_as_placeholder_and_still_verifies(
        alg in algorithm(),
        vals in values(),
        key in "[a-z0-9]{8,24}",
        index in 1..FIELDS.len(),
    ) {
        let profile = profile(alg, FIELDS.to_vec());

        let mut absent = field_map(&vals);
        absent.remove(FIELDS[index]);
        let mut blank = field_map(&vals);
        blank.insert(FIELDS[index].to_string(), String::new());

        let without = sign(&profile, absent, &secret(&key)).unwrap();
        let with_blank = sign(&profile, blank, &secret(&key)).unwrap();
        prop_assert_eq!(&without.signature, &with_blank.signature);

        let verified = verify(&callback(profile), &without.fields, &secret(&key));
        prop_assert!(verified.is_ok());
    }
}

const QPAY_SECRET: &str = "qpay_test_secret";

fn qpay_gateway() -> QPayGateway {
    QPayGateway::new(QPayConfig {
        secret_key: secret(QPAY_SECRET),
        gateway_url: "https://pg.qpay.example/payment".to_string(),
        return_url: "https://relay.example/payment/qpay/response".to_string(),
        ..QPayConfig::default()
    })
    .unwrap()
}

fn qpay_callback(status: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("Response.AcquirerID".into(), "ACQ1".into());
    fields.insert("Response.Amount".into(), "1250".into());
    fields.insert("Response.BankID".into(), "QPAYPG03".into());
    fields.insert("Response.ConfirmationID".into(), "CONF-42".into());
    fields.insert("Response.CurrencyCode".into(), "634".into());
    fields.insert("Response.Lang".into(), "En".into());
    fields.insert("Response.MerchantID".into(), "M123".into());
    fields.insert("Response.MerchantModuleSessionID".into(), "PUN0001".into());
    fields.insert("Response.PUN".into(), "PUN0001".into());
    fields.insert("Response.Status".into(), status.into());
    fields.insert("Response.StatusMessage".into(), "Transaction approved".into());

    let mut input = QPAY_SECRET.to_string();
    for name in qpay::RESPONSE_FIELDS {
        input.push_str(fields.get(name).map(|v| v.trim()).unwrap_or(""));
    }
    let hash = hex::encode_upper(Sha256::digest(input.as_bytes()));
    fields.insert("Response.SecureHash".into(), hash);
    fields
}

#[test]
fn test_swapped_order_fails_for_both_algorithms() {
    let vals: Vec<String> = ["ACCEPT", "CONF-1", "1250", "QAR"]
        .iter()
        .map(|v| v.to_string())
        .collect();
    for alg in [
        HashAlgorithm::HmacSha256Base64,
        HashAlgorithm::PrefixedSha256UpperHex,
    ] {
        let forward = profile(alg, FIELDS.to_vec());
        let signed = sign(&forward, field_map(&vals), &secret("k3y")).unwrap();
        let swapped = vec!["beta", "alpha", "gamma", "delta"];

        let err = verify(&callback(profile(alg, swapped)), &signed.fields, &secret("k3y"))
            .unwrap_err();
        assert!(
            matches!(err, PaymentError::VerificationFailed { .. }),
            "{:?} accepted a reordered field list",
            alg
        );
    }
}

#[test]
fn test_qpay_accepted_callback_verifies() {
    let gateway = qpay_gateway();
    let verified = gateway.verify_callback(&qpay_callback("ACCEPT")).unwrap();

    assert_eq!(verified.status, "ACCEPT");
    assert_eq!(verified.confirmation_id.as_deref(), Some("CONF-42"));
    assert_eq!(
        verified.status_message.as_deref(),
        Some("Transaction approved")
    );

    let outcome = gateway.handle_callback(&qpay_callback("ACCEPT"));
    assert_eq!(outcome.status, CallbackStatus::Accepted);
}

#[test]
fn test_qpay_flipped_hash_character_fails() {
    let gateway = qpay_gateway();
    let mut fields = qpay_callback("ACCEPT");
    let hash = fields["Response.SecureHash"].clone();
    let replacement = if hash.starts_with('A') { "B" } else { "A" };
    fields.insert(
        "Response.SecureHash".into(),
        format!("{}{}", replacement, &hash[1..]),
    );

    let err = gateway.verify_callback(&fields).unwrap_err();
    assert!(matches!(err, PaymentError::VerificationFailed { .. }));
    assert!(!err.is_retryable());

    let outcome = gateway.handle_callback(&fields);
    assert_eq!(outcome.status, CallbackStatus::InvalidSignature);
}

#[test]
fn test_qpay_callback_without_hash_is_malformed() {
    let gateway = qpay_gateway();
    let mut fields = qpay_callback("ACCEPT");
    fields.remove("Response.SecureHash");

    let err = gateway.verify_callback(&fields).unwrap_err();
    assert!(matches!(err, PaymentError::MalformedResponse { .. }));
}

#[test]
fn test_qpay_declined_callback_maps_to_declined() {
    let outcome = qpay_gateway().handle_callback(&qpay_callback("DECLINED"));
    assert_eq!(outcome.status, CallbackStatus::Declined);
    assert_eq!(outcome.gateway_status.as_deref(), Some("DECLINED"));
}

const CYBERSOURCE_SECRET: &str = "cybersource_test_secret";

fn cybersource_gateway() -> CyberSourceGateway {
    CyberSourceGateway::new(CyberSourceConfig {
        profile_id: "PROFILE".to_string(),
        access_key: "ACCESS".to_string(),
        secret_key: secret(CYBERSOURCE_SECRET),
        response_url: "https://relay.example/payment/cybersource/response".to_string(),
        ..CyberSourceConfig::default()
    })
    .unwrap()
}

fn cybersource_callback(decision: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    fields.insert("decision".into(), decision.into());
    fields.insert("transaction_id".into(), "7001".into());
    fields.insert("req_reference_number".into(), "REF-1".into());
    fields.insert("message".into(), "Request was processed successfully.".into());
    fields.insert(
        "signed_field_names".into(),
        "decision,transaction_id,req_reference_number,message,signed_field_names".into(),
    );

    let order = vec![
        "decision",
        "transaction_id",
        "req_reference_number",
        "message",
        "signed_field_names",
    ];
    let profile = cybersource::CALLBACK_PROFILE.signing.with_field_order(order);
    sign(&profile, fields, &secret(CYBERSOURCE_SECRET))
        .unwrap()
        .fields
}

#[test]
fn test_cybersource_callback_verifies_declared_fields() {
    let gateway = cybersource_gateway();
    let outcome = gateway.handle_callback(&cybersource_callback("ACCEPT"));

    assert_eq!(outcome.status, CallbackStatus::Accepted);
    assert_eq!(outcome.confirmation_id.as_deref(), Some("7001"));
    assert_eq!(
        outcome.message.as_deref(),
        Some("Request was processed successfully.")
    );
}

#[test]
fn test_cybersource_unsigned_extra_field_is_ignored() {
    let gateway = cybersource_gateway();
    let mut fields = cybersource_callback("DECLINE");
    fields.insert("auth_code".into(), "unsigned".into());

    let outcome = gateway.handle_callback(&fields);
    assert_eq!(outcome.status, CallbackStatus::Declined);
}

#[test]
fn test_cybersource_tampered_decision_fails() {
    let gateway = cybersource_gateway();
    let mut fields = cybersource_callback("DECLINE");
    fields.insert("decision".into(), "ACCEPT".into());

    let outcome = gateway.handle_callback(&fields);
    assert_eq!(outcome.status, CallbackStatus::InvalidSignature);
    assert!(!outcome.is_verified());
}

#[test]
fn test_cybersource_missing_field_list_is_malformed() {
    let gateway = cybersource_gateway();
    let mut fields = cybersource_callback("ACCEPT");
    fields.remove("signed_field_names");

    let outcome = gateway.handle_callback(&fields);
    assert_eq!(outcome.status, CallbackStatus::Malformed);
}
