//! Payment initiation and callback handlers.

use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
    Form, Json,
};
use serde::Serialize;
use tracing::{error, info};
use url::Url;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::error::PaymentError;
use crate::payments::transport::render_auto_post_form;
use crate::payments::{
    CallbackOutcome, PaymentGateway, PaymentRequest, SignedPayload, TransactionContext,
    TransportMode,
};
use crate::signing::FieldMap;

/// Signed fields for the client to post to the gateway itself
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFormResponse {
    pub success: bool,
    pub message: String,
    pub payment_url: String,
    pub form_fields: FieldMap,
}

impl PaymentFormResponse {
    fn from_payload(payload: SignedPayload, message: &str) -> Self {
        Self {
            success: true,
            message: message.to_string(),
            payment_url: payload.target_url,
            form_fields: payload.fields,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerPaymentResponse {
    pub status: &'static str,
    pub redirect_url: String,
    pub payment_data: FieldMap,
}

#[derive(Debug, Serialize)]
pub struct CallbackData {
    #[serde(rename = "paymentStatus")]
    pub payment_status: String,
    #[serde(rename = "confirmationID")]
    pub confirmation_id: Option<String>,
    #[serde(rename = "transactionDetails")]
    pub transaction_details: FieldMap,
}

#[derive(Debug, Serialize)]
pub struct CallbackResponse {
    pub status: &'static str,
    pub data: CallbackData,
}

/// POST /payment/qpay/request
pub async fn qpay_request(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<PaymentFormResponse>, ApiError> {
    let payload = state
        .qpay
        .build_payment(&request, &TransactionContext::now())?;
    Ok(Json(PaymentFormResponse::from_payload(payload, "Payment ready")))
}

/// POST /payment/qpay/checkout
pub async fn qpay_checkout(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Html<String>, ApiError> {
    let payload = state
        .qpay
        .build_payment(&request, &TransactionContext::now())?
        .with_transport(TransportMode::RedirectForm);
    Ok(Html(render_auto_post_form(&payload)))
}

/// POST /payment/request
///
/// The relay posts the signed form to QPay itself and hands the signed
/// fields back so the client can follow up on the gateway page.
pub async fn qpay_server_request(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<ServerPaymentResponse>, ApiError> {
    let payload = state
        .qpay
        .build_payment(&request, &TransactionContext::now())?
        .with_transport(TransportMode::ServerToServer);

    let reply = state.qpay.submit_payment(&payload).await?;
    info!(
        "QPay accepted server-to-server request: reference={}, http_status={}",
        payload.reference, reply.status
    );

    Ok(Json(ServerPaymentResponse {
        status: "success",
        redirect_url: payload.target_url,
        payment_data: payload.fields,
    }))
}

/// POST /payment/qpay/response
pub async fn qpay_response(
    State(state): State<AppState>,
    Form(fields): Form<FieldMap>,
) -> Response {
    let outcome = state.qpay.handle_callback(&fields);
    frontend_redirect(&state, &outcome)
}

/// POST /payment/response
pub async fn qpay_response_json(
    State(state): State<AppState>,
    Form(fields): Form<FieldMap>,
) -> Result<Json<CallbackResponse>, ApiError> {
    let verified = state.qpay.verify_callback(&fields)?;
    info!(
        "QPay callback verified: status={}, confirmation={}",
        verified.status,
        verified.confirmation_id.as_deref().unwrap_or("none")
    );

    Ok(Json(CallbackResponse {
        status: "success",
        data: CallbackData {
            payment_status: verified.status,
            confirmation_id: verified.confirmation_id,
            transaction_details: verified.raw_fields,
        },
    }))
}

/// POST /payment/cybersource/request
pub async fn cybersource_request(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Json<PaymentFormResponse>, ApiError> {
    let payload = state
        .cybersource
        .build_payment(&request, &TransactionContext::now())?;
    Ok(Json(PaymentFormResponse::from_payload(
        payload,
        "Payment form parameters generated successfully.",
    )))
}

/// POST /payment/cybersource/checkout
pub async fn cybersource_checkout(
    State(state): State<AppState>,
    Json(request): Json<PaymentRequest>,
) -> Result<Html<String>, ApiError> {
    let payload = state
        .cybersource
        .build_payment(&request, &TransactionContext::now())?
        .with_transport(TransportMode::RedirectForm);
    Ok(Html(render_auto_post_form(&payload)))
}

/// POST /payment/cybersource/response
pub async fn cybersource_response(
    State(state): State<AppState>,
    Form(fields): Form<FieldMap>,
) -> Response {
    let outcome = state.cybersource.handle_callback(&fields);
    frontend_redirect(&state, &outcome)
}

/// 303 to the frontend result page carrying the normalized outcome.
fn frontend_redirect(state: &AppState, outcome: &CallbackOutcome) -> Response {
    match redirect_url(&state.config.frontend.payment_response_url, outcome) {
        Ok(url) => Redirect::to(url.as_str()).into_response(),
        Err(e) => {
            error!("Invalid frontend response URL: {}", e);
            ApiError::from(PaymentError::configuration(
                "FRONTEND_RESPONSE_URL is not a valid URL",
            ))
            .into_response()
        }
    }
}

pub fn redirect_url(base: &str, outcome: &CallbackOutcome) -> Result<Url, url::ParseError> {
    let status = outcome.status.as_str();
    let message = outcome
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("Transaction {}", status));

    let mut params = vec![("status", status.to_string()), ("message", message)];
    if let Some(confirmation_id) = outcome.confirmation_id.as_deref() {
        if !confirmation_id.is_empty() {
            params.push(("confirmationId", confirmation_id.to_string()));
        }
    }

    Url::parse_with_params(base, &params)
}
