//! HTTP surface of the relay.

pub mod error;
pub mod health;
pub mod payment;

use std::sync::Arc;

use axum::{
    response::Html,
    routing::{get, post},
    Router,
};
use http::{HeaderValue, Method};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowHeaders, AllowOrigin, Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use tracing::warn;

use crate::config::Config;
use crate::error::PaymentResult;
use crate::payments::{CyberSourceGateway, QPayGateway};

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub qpay: Arc<QPayGateway>,
    pub cybersource: Arc<CyberSourceGateway>,
}

impl AppState {
    pub fn new(config: Config) -> PaymentResult<Self> {
        let qpay = QPayGateway::new(config.qpay.clone())?;
        let cybersource = CyberSourceGateway::new(config.cybersource.clone())?;

        Ok(Self {
            config: Arc::new(config),
            qpay: Arc::new(qpay),
            cybersource: Arc::new(cybersource),
        })
    }
}

/// Creates the relay [`Router`].
///
/// Gateway callbacks arrive form encoded; client requests arrive as JSON.
/// Any origin is allowed in development, otherwise only the configured one.
pub fn create_router(state: AppState) -> Router {
    let payment_routes = Router::new()
        .route("/qpay/request", post(payment::qpay_request))
        .route("/qpay/checkout", post(payment::qpay_checkout))
        .route("/qpay/response", post(payment::qpay_response))
        .route("/request", post(payment::qpay_server_request))
        .route("/response", post(payment::qpay_response_json))
        .route("/cybersource/request", post(payment::cybersource_request))
        .route("/cybersource/checkout", post(payment::cybersource_checkout))
        .route("/cybersource/response", post(payment::cybersource_response));

    let cors = cors_layer(&state.config);

    Router::new()
        .route("/", get(index))
        .route("/health", get(health::health_check))
        .nest("/payment", payment_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors),
        )
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let methods = [Method::GET, Method::POST];

    if config.is_development() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let layer = CorsLayer::new()
        .allow_methods(methods)
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true);

    match HeaderValue::from_str(&config.server.cors_allowed_origin) {
        Ok(origin) => layer.allow_origin(AllowOrigin::exact(origin)),
        Err(_) => {
            warn!(
                "CORS_ALLOWED_ORIGIN is not a valid header value; cross-origin requests will be refused"
            );
            layer
        }
    }
}

async fn index() -> Html<&'static str> {
    Html("<h1 style='text-align:center;color:green'>Website is Running</h1>")
}
