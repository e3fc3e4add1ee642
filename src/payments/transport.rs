//! Delivery of signed payloads to a gateway.

use std::time::Duration;

use reqwest::Client;
use tracing::{error, info};

use crate::error::{PaymentError, PaymentResult};
use crate::payments::types::{GatewayReply, SignedPayload};

/// Thin wrapper around the HTTP client used for server-to-server posts.
#[derive(Debug, Clone)]
pub struct GatewayClient {
    http_client: Client,
}

impl GatewayClient {
    pub fn new(timeout: Duration) -> PaymentResult<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("payrelay-backend/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                PaymentError::configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { http_client })
    }

    /// Posts `payload.fields` as `application/x-www-form-urlencoded`.
    pub async fn submit(&self, payload: &SignedPayload) -> PaymentResult<GatewayReply> {
        info!(
            "Submitting {} payment to gateway: reference={}",
            payload.gateway, payload.reference
        );

        let response = self
            .http_client
            .post(&payload.target_url)
            .form(&payload.fields)
            .send()
            .await
            .map_err(|e| {
                error!("{} gateway request failed: {}", payload.gateway, e);
                PaymentError::from(e)
            })?;

        // Only the status matters; the gateway's HTML body is not consumed
        let status = response.status();

        if !status.is_success() {
            error!("{} gateway returned HTTP {}", payload.gateway, status);
            return Err(PaymentError::upstream(
                format!("HTTP {}", status),
                Some(status.as_u16()),
            ));
        }

        info!(
            "{} gateway accepted payment: reference={}, status={}",
            payload.gateway, payload.reference, status
        );

        Ok(GatewayReply {
            status: status.as_u16(),
        })
    }
}

/// Renders an HTML page that posts `payload.fields` to the gateway on load.
pub fn render_auto_post_form(payload: &SignedPayload) -> String {
    let inputs: String = payload
        .fields
        .iter()
        .map(|(name, value)| {
            format!(
                "      <input type=\"hidden\" name=\"{}\" value=\"{}\">\n",
                escape_html(name),
                escape_html(value)
            )
        })
        .collect();

    format!(
        "<!DOCTYPE html>\n<html>\n  <body onload=\"document.forms[0].submit()\">\n    \
         <form method=\"post\" action=\"{}\">\n{}      \
         <noscript><button type=\"submit\">Continue</button></noscript>\n    \
         </form>\n  </body>\n</html>\n",
        escape_html(&payload.target_url),
        inputs
    )
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
