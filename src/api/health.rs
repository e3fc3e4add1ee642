use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::payments::PaymentGateway;

#[derive(Serialize, Deserialize)]
pub struct GatewayHealth {
    pub configured: bool,
    pub target_url: String,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub qpay: GatewayHealth,
    pub cybersource: GatewayHealth,
}

pub async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: state.config.server.environment.clone(),
        qpay: GatewayHealth {
            configured: state.qpay.is_configured(),
            target_url: state.qpay.config().gateway_url.clone(),
        },
        cybersource: GatewayHealth {
            configured: state.cybersource.is_configured(),
            target_url: state.cybersource.config().payment_url.clone(),
        },
    };

    Ok(Json(response))
}
