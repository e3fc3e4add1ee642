//! Payment relay types and data structures
//!
//! Common types shared by every gateway for requests, signed payloads and
//! callback outcomes.

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ErrorCategory, PaymentError, PaymentResult};
use crate::signing::{FieldMap, VerifiedCallback};

/// Supported gateways
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayId {
    QPay,
    CyberSource,
}

impl GatewayId {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayId::QPay => "qpay",
            GatewayId::CyberSource => "cybersource",
        }
    }
}

impl std::fmt::Display for GatewayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Amount as sent by the client: JSON number or string
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountInput {
    Number(serde_json::Number),
    Text(String),
}

impl AmountInput {
    pub fn as_text(&self) -> String {
        match self {
            AmountInput::Number(n) => n.to_string(),
            AmountInput::Text(s) => s.clone(),
        }
    }
}

/// Payment request from the client application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// Amount in major currency units (e.g. `12.50`)
    pub amount: Option<AmountInput>,
    /// ISO currency code (CyberSource only)
    pub currency: Option<String>,
    /// Acquiring bank identifier (QPay)
    pub bank_id: Option<String>,
    /// Merchant identifier (QPay)
    pub merchant_id: Option<String>,
    /// Free-text payment description
    pub description: Option<String>,
    /// Checkout page language
    pub language: Option<String>,
    /// Payer national id
    pub national_id: Option<String>,
    /// Caller-supplied transaction reference (QPay PUN, CyberSource reference number)
    #[serde(alias = "referenceNumber")]
    pub pun: Option<String>,
    /// Device fingerprint session id (CyberSource)
    #[serde(alias = "device_fingerprint_id")]
    pub device_fingerprint_id: Option<String>,
}

/// Returns the trimmed value when it is present and not blank.
pub fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl PaymentRequest {
    pub fn amount_text(&self) -> Option<String> {
        self.amount
            .as_ref()
            .map(AmountInput::as_text)
            .filter(|s| !s.trim().is_empty())
    }
}

/// Per-transaction inputs that would otherwise be taken from the clock or RNG
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub issued_at: DateTime<FixedOffset>,
    /// Reference to use when the caller supplies none
    pub reference: Option<String>,
    pub transaction_uuid: Option<Uuid>,
}

impl TransactionContext {
    pub fn now() -> Self {
        Self {
            issued_at: Local::now().fixed_offset(),
            reference: None,
            transaction_uuid: None,
        }
    }

    pub fn at(issued_at: DateTime<FixedOffset>) -> Self {
        Self {
            issued_at,
            reference: None,
            transaction_uuid: None,
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_transaction_uuid(mut self, uuid: Uuid) -> Self {
        self.transaction_uuid = Some(uuid);
        self
    }
}

/// How the signed payload reaches the gateway
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    /// JSON returned to the client, which posts the form itself
    ClientAutoPost,
    /// HTML page that auto-submits hidden fields
    RedirectForm,
    /// Form-encoded POST made by the relay
    ServerToServer,
}

/// Signed payload ready for the gateway
#[derive(Debug, Clone, Serialize)]
pub struct SignedPayload {
    pub gateway: GatewayId,
    pub target_url: String,
    pub transport: TransportMode,
    /// Every signed field plus the signature field
    pub fields: FieldMap,
    pub signature: String,
    pub signed_field_names: Vec<String>,
    /// Transaction reference (PUN or reference number)
    pub reference: String,
}

impl SignedPayload {
    pub fn with_transport(mut self, transport: TransportMode) -> Self {
        self.transport = transport;
        self
    }
}

/// Reply from a server-to-server gateway call
#[derive(Debug, Clone, Serialize)]
pub struct GatewayReply {
    pub status: u16,
}

/// Normalized, terminal status of a gateway callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CallbackStatus {
    Accepted,
    Declined,
    Error,
    InvalidSignature,
    Malformed,
}

impl CallbackStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackStatus::Accepted => "accepted",
            CallbackStatus::Declined => "declined",
            CallbackStatus::Error => "error",
            CallbackStatus::InvalidSignature => "invalid-signature",
            CallbackStatus::Malformed => "malformed",
        }
    }

    /// Maps a gateway status or decision code.
    pub fn from_gateway_status(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "ACCEPT" | "ACCEPTED" | "SUCCESS" | "APPROVED" | "0000" | "00" => {
                CallbackStatus::Accepted
            }
            "DECLINE" | "DECLINED" | "REJECT" | "REJECTED" | "CANCEL" | "CANCELLED"
            | "FAILED" => CallbackStatus::Declined,
            _ => CallbackStatus::Error,
        }
    }
}

/// What the relay reports back after handling a callback
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackOutcome {
    pub gateway: GatewayId,
    pub status: CallbackStatus,
    pub gateway_status: Option<String>,
    pub confirmation_id: Option<String>,
    pub message: Option<String>,
    pub raw_fields: FieldMap,
}

impl CallbackOutcome {
    pub fn from_result(
        gateway: GatewayId,
        result: PaymentResult<VerifiedCallback>,
        received: &FieldMap,
    ) -> Self {
        match result {
            Ok(verified) => Self {
                gateway,
                status: CallbackStatus::from_gateway_status(&verified.status),
                gateway_status: Some(verified.status),
                confirmation_id: verified.confirmation_id,
                message: verified.status_message,
                raw_fields: verified.raw_fields,
            },
            Err(err) => Self::from_error(gateway, &err, received),
        }
    }

    pub fn from_error(gateway: GatewayId, err: &PaymentError, received: &FieldMap) -> Self {
        let status = match err.category() {
            ErrorCategory::Verification => CallbackStatus::InvalidSignature,
            ErrorCategory::MalformedResponse => CallbackStatus::Malformed,
            _ => CallbackStatus::Error,
        };
        Self {
            gateway,
            status,
            gateway_status: None,
            confirmation_id: None,
            message: Some(err.to_string()),
            raw_fields: received.clone(),
        }
    }

    pub fn is_verified(&self) -> bool {
        self.gateway_status.is_some()
    }
}
