//! CyberSource Secure Acceptance gateway implementation
//!
//! Hosted checkout fields are signed with HMAC-SHA-256 over
//! `name=value` pairs joined by commas, in the order listed by the
//! `signed_field_names` field, and the digest is sent as base64.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::{PaymentError, PaymentResult};
use crate::payments::format::{format_signed_date_time, parse_amount};
use crate::payments::traits::PaymentGateway;
use crate::payments::transport::GatewayClient;
use crate::payments::types::{
    present, GatewayId, PaymentRequest, SignedPayload, TransactionContext, TransportMode,
};
use crate::signing::{
    self, CallbackProfile, FieldMap, FieldOrder, HashAlgorithm, MissingFieldPolicy,
    SigningProfile, ValueNormalization, VerifiedCallback,
};

pub const DEFAULT_PAYMENT_URL: &str = "https://secureacceptance.cybersource.com/pay";

pub const SIGNED_FIELD_NAMES: &str = "signed_field_names";

pub const REQUEST_FIELDS: [&str; 13] = [
    "access_key",
    "profile_id",
    "transaction_uuid",
    SIGNED_FIELD_NAMES,
    "signed_date_time",
    "transaction_type",
    "reference_number",
    "amount",
    "currency",
    "locale",
    "device_fingerprint_id",
    "override_custom_cancel_page",
    "override_custom_receipt_page",
];

pub const REQUEST_PROFILE: SigningProfile = SigningProfile {
    name: "cybersource",
    field_order: FieldOrder::Fixed(Cow::Borrowed(&REQUEST_FIELDS)),
    algorithm: HashAlgorithm::HmacSha256Base64,
    missing_field_policy: MissingFieldPolicy::Placeholder(""),
    normalization: ValueNormalization::VERBATIM,
    signature_field: "signature",
    transcript_field: Some(SIGNED_FIELD_NAMES),
};

/// Responses declare their own signed field list.
pub const CALLBACK_PROFILE: CallbackProfile = CallbackProfile {
    signing: SigningProfile {
        name: "cybersource",
        field_order: FieldOrder::Declared {
            field: SIGNED_FIELD_NAMES,
        },
        algorithm: HashAlgorithm::HmacSha256Base64,
        missing_field_policy: MissingFieldPolicy::Placeholder(""),
        normalization: ValueNormalization::VERBATIM,
        signature_field: "signature",
        transcript_field: None,
    },
    status_field: "decision",
    confirmation_field: "transaction_id",
    message_field: Some("message"),
    default_status: "UNKNOWN",
};

/// CyberSource gateway configuration
#[derive(Debug, Clone)]
pub struct CyberSourceConfig {
    pub profile_id: String,
    pub access_key: String,
    /// HMAC key of the Secure Acceptance profile
    pub secret_key: SecretString,
    /// Hosted checkout endpoint
    pub payment_url: String,
    /// Relay URL CyberSource posts the result to (cancel and receipt pages)
    pub response_url: String,
    pub default_currency: String,
    pub locale: String,
    /// Timeout for server-to-server submissions
    pub timeout_secs: u64,
}

impl Default for CyberSourceConfig {
    fn default() -> Self {
        Self {
            profile_id: String::new(),
            access_key: String::new(),
            secret_key: SecretString::new(String::new()),
            payment_url: DEFAULT_PAYMENT_URL.to_string(),
            response_url: String::new(),
            default_currency: "USD".to_string(),
            locale: "en-us".to_string(),
            timeout_secs: 30,
        }
    }
}

impl CyberSourceConfig {
    /// Create config from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> PaymentResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secret_key = lookup("CYBERSOURCE_SECRET_KEY")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if secret_key.is_empty() {
            warn!("CYBERSOURCE_SECRET_KEY is not set; CyberSource payments will be rejected");
        }

        let timeout_secs = match lookup("GATEWAY_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                PaymentError::configuration("GATEWAY_TIMEOUT_SECS must be a valid number")
            })?,
            None => defaults.timeout_secs,
        };

        Ok(Self {
            profile_id: lookup("CYBERSOURCE_PROFILE_ID").unwrap_or_default(),
            access_key: lookup("CYBERSOURCE_ACCESS_KEY").unwrap_or_default(),
            secret_key: SecretString::new(secret_key),
            payment_url: lookup("CYBERSOURCE_PAYMENT_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.payment_url),
            response_url: lookup("CYBERSOURCE_RESPONSE_URL").unwrap_or_default(),
            timeout_secs,
            ..defaults
        })
    }
}

/// CyberSource Secure Acceptance gateway
pub struct CyberSourceGateway {
    config: CyberSourceConfig,
    client: GatewayClient,
}

impl CyberSourceGateway {
    pub fn new(config: CyberSourceConfig) -> PaymentResult<Self> {
        let client = GatewayClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> PaymentResult<Self> {
        Self::new(CyberSourceConfig::from_env()?)
    }

    pub fn config(&self) -> &CyberSourceConfig {
        &self.config
    }
}

#[async_trait]
impl PaymentGateway for CyberSourceGateway {
    fn id(&self) -> GatewayId {
        GatewayId::CyberSource
    }

    fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    fn build_payment(
        &self,
        request: &PaymentRequest,
        context: &TransactionContext,
    ) -> PaymentResult<SignedPayload> {
        let amount = request
            .amount_text()
            .ok_or_else(|| PaymentError::missing_fields(["amount"]))?;
        parse_amount("amount", &amount)?;

        if self.config.profile_id.trim().is_empty() || self.config.access_key.trim().is_empty() {
            return Err(PaymentError::configuration(
                "CYBERSOURCE_PROFILE_ID and CYBERSOURCE_ACCESS_KEY must be configured",
            ));
        }

        let reference = present(&request.pun)
            .or(context.reference.as_deref())
            .map(str::to_string)
            .unwrap_or_else(|| format!("REF-{}", context.issued_at.timestamp_millis()));
        let transaction_uuid = context.transaction_uuid.unwrap_or_else(Uuid::new_v4);

        let mut fields = FieldMap::new();
        fields.insert("access_key".into(), self.config.access_key.clone());
        fields.insert("profile_id".into(), self.config.profile_id.clone());
        fields.insert("transaction_uuid".into(), transaction_uuid.to_string());
        fields.insert(
            "signed_date_time".into(),
            format_signed_date_time(&context.issued_at.with_timezone(&Utc)),
        );
        fields.insert("transaction_type".into(), "sale".into());
        fields.insert("reference_number".into(), reference.clone());
        fields.insert("amount".into(), amount.trim().to_string());
        fields.insert(
            "currency".into(),
            present(&request.currency)
                .unwrap_or(&self.config.default_currency)
                .to_string(),
        );
        fields.insert("locale".into(), self.config.locale.clone());
        fields.insert(
            "device_fingerprint_id".into(),
            present(&request.device_fingerprint_id)
                .unwrap_or_default()
                .to_string(),
        );
        fields.insert(
            "override_custom_cancel_page".into(),
            self.config.response_url.clone(),
        );
        fields.insert(
            "override_custom_receipt_page".into(),
            self.config.response_url.clone(),
        );

        let signed = signing::sign(&REQUEST_PROFILE, fields, &self.config.secret_key)?;

        info!(
            "CyberSource payment prepared: reference={}, transaction_uuid={}",
            reference, transaction_uuid
        );

        Ok(SignedPayload {
            gateway: GatewayId::CyberSource,
            target_url: self.config.payment_url.clone(),
            transport: TransportMode::ClientAutoPost,
            fields: signed.fields,
            signature: signed.signature,
            signed_field_names: signed.signed_field_names,
            reference,
        })
    }

    fn verify_callback(&self, fields: &FieldMap) -> PaymentResult<VerifiedCallback> {
        signing::verify(&CALLBACK_PROFILE, fields, &self.config.secret_key)
    }

    fn client(&self) -> &GatewayClient {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payments::types::AmountInput;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::{FixedOffset, TimeZone};
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    fn create_test_gateway() -> CyberSourceGateway {
        CyberSourceGateway::new(CyberSourceConfig {
            profile_id: "PROFILE-1".to_string(),
            access_key: "ACCESS-1".to_string(),
            secret_key: SecretString::new("cs_test_secret".to_string()),
            response_url: "https://relay.example/payment/cybersource/response".to_string(),
            ..CyberSourceConfig::default()
        })
        .unwrap()
    }

    fn fixed_context() -> TransactionContext {
        let offset = FixedOffset::east_opt(3 * 3600).unwrap();
        TransactionContext::at(offset.with_ymd_and_hms(2025, 3, 1, 12, 15, 0).unwrap())
            .with_transaction_uuid(Uuid::nil())
    }

    fn request(amount: &str) -> PaymentRequest {
        PaymentRequest {
            amount: Some(AmountInput::Text(amount.to_string())),
            pun: Some("ORDER-1".to_string()),
            ..PaymentRequest::default()
        }
    }

    #[test]
    fn test_build_payment_fields() {
        let payload = create_test_gateway()
            .build_payment(&request("25.00"), &fixed_context())
            .unwrap();

        assert_eq!(payload.fields["signed_date_time"], "2025-03-01T09:15:00Z");
        assert_eq!(payload.fields["amount"], "25.00");
        assert_eq!(payload.fields["currency"], "USD");
        assert_eq!(payload.fields["locale"], "en-us");
        assert_eq!(payload.fields["transaction_type"], "sale");
        assert_eq!(payload.fields["reference_number"], "ORDER-1");
        assert_eq!(payload.fields["device_fingerprint_id"], "");
        assert_eq!(
            payload.fields["transaction_uuid"],
            "00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(payload.fields[SIGNED_FIELD_NAMES], REQUEST_FIELDS.join(","));
        assert_eq!(payload.target_url, DEFAULT_PAYMENT_URL);
    }

    #[test]
    fn test_signature_matches_reference_hmac() {
        let payload = create_test_gateway()
            .build_payment(&request("25.00"), &fixed_context())
            .unwrap();

        let signing_string = REQUEST_FIELDS
            .iter()
            .map(|name| format!("{}={}", name, payload.fields[*name]))
            .collect::<Vec<_>>()
            .join(",");
        let mut mac = Hmac::<Sha256>::new_from_slice(b"cs_test_secret").unwrap();
        mac.update(signing_string.as_bytes());

        assert_eq!(payload.signature, STANDARD.encode(mac.finalize().into_bytes()));
        assert_eq!(payload.fields["signature"], payload.signature);
    }

    #[test]
    fn test_default_reference_uses_timestamp() {
        let mut req = request("1");
        req.pun = None;
        let context = fixed_context();
        let payload = create_test_gateway().build_payment(&req, &context).unwrap();
        assert_eq!(
            payload.reference,
            format!("REF-{}", context.issued_at.timestamp_millis())
        );
    }

    #[test]
    fn test_amount_is_required() {
        let err = create_test_gateway()
            .build_payment(&PaymentRequest::default(), &fixed_context())
            .unwrap_err();
        match err {
            PaymentError::MissingFields { fields } => assert_eq!(fields, vec!["amount"]),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unconfigured_profile_is_configuration_error() {
        let gateway = CyberSourceGateway::new(CyberSourceConfig::default()).unwrap();
        let err = gateway
            .build_payment(&request("5"), &fixed_context())
            .unwrap_err();
        assert!(matches!(err, PaymentError::Configuration { .. }));
    }

    #[test]
    fn test_signed_request_verifies_as_callback() {
        let gateway = create_test_gateway();
        let payload = gateway
            .build_payment(&request("25.00"), &fixed_context())
            .unwrap();

        let verified = gateway.verify_callback(&payload.fields).unwrap();
        assert_eq!(verified.status, "UNKNOWN");
    }

    #[test]
    fn test_callback_decision() {
        let gateway = create_test_gateway();
        let mut fields = FieldMap::new();
        fields.insert("decision".into(), "ACCEPT".into());
        fields.insert("transaction_id".into(), "7400000000000000".into());
        fields.insert("req_reference_number".into(), "ORDER-1".into());
        fields.insert(
            SIGNED_FIELD_NAMES.into(),
            "decision,transaction_id,req_reference_number,signed_field_names".into(),
        );
        let signed = signing::sign(
            &CALLBACK_PROFILE.signing,
            fields,
            &gateway.config.secret_key,
        )
        .unwrap();

        let verified = gateway.verify_callback(&signed.fields).unwrap();
        assert_eq!(verified.status, "ACCEPT");
        assert_eq!(verified.confirmation_id.as_deref(), Some("7400000000000000"));

        let mut tampered = signed.fields.clone();
        tampered.insert("decision".into(), "DECLINE".into());
        assert!(matches!(
            gateway.verify_callback(&tampered),
            Err(PaymentError::VerificationFailed { .. })
        ));
    }

    #[test]
    fn test_config_from_lookup_defaults() {
        let config = CyberSourceConfig::from_lookup(|key| match key {
            "CYBERSOURCE_SECRET_KEY" => Some("abc".to_string()),
            "CYBERSOURCE_PAYMENT_URL" => Some(String::new()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.payment_url, DEFAULT_PAYMENT_URL);
        assert_eq!(config.default_currency, "USD");
        assert_eq!(config.secret_key.expose_secret(), "abc");
    }
}
