use thiserror::Error;

pub type PaymentResult<T> = Result<T, PaymentError>;

/// Broad grouping of payment errors, used by callers that only need to know
/// which side of the relay is at fault.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Configuration,
    Verification,
    MalformedResponse,
    Upstream,
}

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("Missing required fields: {}", .fields.join(", "))]
    MissingFields { fields: Vec<String> },

    #[error("Invalid value for {field}: {reason}")]
    InvalidField { field: String, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Signature verification failed for {gateway} response")]
    VerificationFailed { gateway: String },

    #[error("Malformed gateway response: {message}")]
    MalformedResponse { message: String },

    #[error("Gateway request failed: {message}")]
    Upstream { message: String, status: Option<u16> },
}

impl PaymentError {
    pub fn missing_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::MissingFields {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn verification_failed(gateway: impl Into<String>) -> Self {
        Self::VerificationFailed {
            gateway: gateway.into(),
        }
    }

    pub fn malformed_response(message: impl Into<String>) -> Self {
        Self::MalformedResponse {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Upstream {
            message: message.into(),
            status,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MissingFields { .. } | Self::InvalidField { .. } => ErrorCategory::Validation,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::VerificationFailed { .. } => ErrorCategory::Verification,
            Self::MalformedResponse { .. } => ErrorCategory::MalformedResponse,
            Self::Upstream { .. } => ErrorCategory::Upstream,
        }
    }

    /// Only transport-level failures are worth retrying. A signature mismatch
    /// is final.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { status: None, .. } => true,
            Self::Upstream {
                status: Some(code), ..
            } => *code >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for PaymentError {
    fn from(err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        if err.is_timeout() {
            PaymentError::upstream("gateway request timed out", status)
        } else {
            PaymentError::upstream(format!("Request error: {}", err), status)
        }
    }
}
