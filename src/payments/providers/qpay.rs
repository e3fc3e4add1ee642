//! QPay payment gateway implementation
//!
//! QPay signs with SHA-256 over the secret key followed by the trimmed field
//! values in a documented order, and expects the hash as uppercase hex. The
//! same rule, over a different field list, protects the payment response.

use std::borrow::Cow;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};

use crate::error::{PaymentError, PaymentResult};
use crate::payments::format::{
    format_transaction_date, generate_reference, to_minor_units, truncate_reference,
};
use crate::payments::traits::PaymentGateway;
use crate::payments::transport::GatewayClient;
use crate::payments::types::{
    present, GatewayId, PaymentRequest, SignedPayload, TransactionContext, TransportMode,
};
use crate::signing::{
    self, CallbackProfile, FieldMap, FieldOrder, HashAlgorithm, MissingFieldPolicy,
    SigningProfile, ValueNormalization, VerifiedCallback,
};

/// Maximum PUN length accepted by QPay
pub const PUN_MAX_LEN: usize = 20;

/// ISO 4217 numeric code for QAR
pub const CURRENCY_CODE: &str = "634";

pub const REQUEST_FIELDS: [&str; 13] = [
    "Action",
    "BankID",
    "MerchantID",
    "CurrencyCode",
    "Amount",
    "PUN",
    "PaymentDescription",
    "MerchantModuleSessionID",
    "TransactionRequestDate",
    "Quantity",
    "ExtraFields_f14",
    "Lang",
    "NationalID",
];

pub const RESPONSE_FIELDS: [&str; 15] = [
    "Response.AcquirerID",
    "Response.Amount",
    "Response.BankID",
    "Response.CardExpiryDate",
    "Response.CardHolderName",
    "Response.CardNumber",
    "Response.ConfirmationID",
    "Response.CurrencyCode",
    "Response.EZConnectResponseDate",
    "Response.Lang",
    "Response.MerchantID",
    "Response.MerchantModuleSessionID",
    "Response.PUN",
    "Response.Status",
    "Response.StatusMessage",
];

pub const REQUEST_PROFILE: SigningProfile = SigningProfile {
    name: "qpay",
    field_order: FieldOrder::Fixed(Cow::Borrowed(&REQUEST_FIELDS)),
    algorithm: HashAlgorithm::PrefixedSha256UpperHex,
    missing_field_policy: MissingFieldPolicy::Placeholder(""),
    normalization: ValueNormalization::TRIM,
    signature_field: "SecureHash",
    transcript_field: None,
};

pub const CALLBACK_PROFILE: CallbackProfile = CallbackProfile {
    signing: SigningProfile {
        name: "qpay",
        field_order: FieldOrder::Fixed(Cow::Borrowed(&RESPONSE_FIELDS)),
        algorithm: HashAlgorithm::PrefixedSha256UpperHex,
        missing_field_policy: MissingFieldPolicy::Placeholder(""),
        normalization: ValueNormalization::TRIM,
        signature_field: "Response.SecureHash",
        transcript_field: None,
    },
    status_field: "Response.Status",
    confirmation_field: "Response.ConfirmationID",
    message_field: Some("Response.StatusMessage"),
    default_status: "UNKNOWN",
};

/// QPay gateway configuration
#[derive(Debug, Clone)]
pub struct QPayConfig {
    /// Secret used to prefix the hash input
    pub secret_key: SecretString,
    /// QPay payment page / API endpoint
    pub gateway_url: String,
    /// Where QPay sends the shopper back (ExtraFields_f14)
    pub return_url: String,
    /// Language used when the client sends none
    pub default_language: String,
    /// NationalID used when the client sends none
    pub default_national_id: String,
    /// Timeout for server-to-server submissions
    pub timeout_secs: u64,
}

impl Default for QPayConfig {
    fn default() -> Self {
        Self {
            secret_key: SecretString::new(String::new()),
            gateway_url: String::new(),
            return_url: String::new(),
            default_language: "En".to_string(),
            default_national_id: String::new(),
            timeout_secs: 30,
        }
    }
}

impl QPayConfig {
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

        let secret_key = lookup("QPAY_SECRET_KEY")
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if secret_key.is_empty() {
            warn!("QPAY_SECRET_KEY is not set; QPay payments will be rejected");
        }

        let timeout_secs = match lookup("GATEWAY_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                PaymentError::configuration("GATEWAY_TIMEOUT_SECS must be a valid number")
            })?,
            None => defaults.timeout_secs,
        };

        Ok(Self {
            secret_key: SecretString::new(secret_key),
            gateway_url: lookup("QPAY_REDIRECT_URL").unwrap_or_default(),
            return_url: lookup("RETURN_URL").unwrap_or_default(),
            default_language: lookup("QPAY_DEFAULT_LANGUAGE")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.default_language),
            default_national_id: lookup("QPAY_DEFAULT_NATIONAL_ID").unwrap_or_default(),
            timeout_secs,
        })
    }
}

/// QPay payment gateway
pub struct QPayGateway {
    config: QPayConfig,
    client: GatewayClient,
}

impl QPayGateway {
    /// Create a new QPay gateway instance
    pub fn new(config: QPayConfig) -> PaymentResult<Self> {
        let client = GatewayClient::new(Duration::from_secs(config.timeout_secs))?;
        Ok(Self { config, client })
    }

    /// Create gateway from environment variables
    pub fn from_env() -> PaymentResult<Self> {
        Self::new(QPayConfig::from_env()?)
    }

    pub fn config(&self) -> &QPayConfig {
        &self.config
    }

    fn validate(request: &PaymentRequest) -> PaymentResult<()> {
        let mut missing = Vec::new();
        if request.amount_text().is_none() {
            missing.push("amount");
        }
        if present(&request.bank_id).is_none() {
            missing.push("bankId");
        }
        if present(&request.merchant_id).is_none() {
            missing.push("merchantId");
        }
        if present(&request.description).is_none() {
            missing.push("description");
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(PaymentError::missing_fields(missing))
        }
    }
}

#[async_trait]
impl PaymentGateway for QPayGateway {
    fn id(&self) -> GatewayId {
        GatewayId::QPay
    }

    fn is_configured(&self) -> bool {
        !self.config.secret_key.expose_secret().is_empty()
    }

    fn build_payment(
        &self,
        request: &PaymentRequest,
        context: &TransactionContext,
    ) -> PaymentResult<SignedPayload> {
        Self::validate(request)?;

        if self.config.gateway_url.trim().is_empty() {
            return Err(PaymentError::configuration("QPAY_REDIRECT_URL is not configured"));
        }

        let amount = to_minor_units("amount", &request.amount_text().unwrap_or_default())?;

        let pun = present(&request.pun)
            .or(context.reference.as_deref())
            .map(|p| truncate_reference(p, PUN_MAX_LEN))
            .unwrap_or_else(|| generate_reference(PUN_MAX_LEN));

        let language = present(&request.language)
            .unwrap_or(&self.config.default_language)
            .to_string();
        let national_id = present(&request.national_id)
            .unwrap_or(&self.config.default_national_id)
            .to_string();

        let mut fields = FieldMap::new();
        fields.insert("Action".into(), "0".into());
        fields.insert("Amount".into(), amount);
        fields.insert(
            "BankID".into(),
            present(&request.bank_id).unwrap_or_default().to_string(),
        );
        fields.insert("CurrencyCode".into(), CURRENCY_CODE.into());
        fields.insert("ExtraFields_f14".into(), self.config.return_url.clone());
        fields.insert("Lang".into(), language);
        fields.insert(
            "MerchantID".into(),
            present(&request.merchant_id).unwrap_or_default().to_string(),
        );
        fields.insert("MerchantModuleSessionID".into(), pun.clone());
        fields.insert("NationalID".into(), national_id);
        fields.insert("PUN".into(), pun.clone());
        fields.insert(
            "PaymentDescription".into(),
            present(&request.description).unwrap_or_default().to_string(),
        );
        fields.insert("Quantity".into(), "1".into());
        fields.insert(
            "TransactionRequestDate".into(),
            format_transaction_date(&context.issued_at),
        );

        let signed = signing::sign(&REQUEST_PROFILE, fields, &self.config.secret_key)?;

        info!(
            "QPay payment prepared: reference={}, amount={}",
            pun,
            signed.fields.get("Amount").map(String::as_str).unwrap_or_default()
        );

        Ok(SignedPayload {
            gateway: GatewayId::QPay,
            target_url: self.config.gateway_url.clone(),
            transport: TransportMode::ClientAutoPost,
            fields: signed.fields,
            signature: signed.signature,
            signed_field_names: signed.signed_field_names,
            reference: pun,
        })
    }

    fn verify_callback(&self, fields: &FieldMap) -> PaymentResult<VerifiedCallback> {
        signing::verify(&CALLBACK_PROFILE, fields, &self.config.secret_key)
    }

    fn client(&self) -> &GatewayClient {
        &self.client
    }
}
