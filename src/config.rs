use anyhow::{anyhow, Context, Result};
use std::env;
use url::Url;

use crate::payments::providers::{CyberSourceConfig, QPayConfig};

pub const DEFAULT_FRONTEND_RESPONSE_URL: &str = "https://dpay-dev.netlify.app/payment-response";
pub const DEFAULT_CORS_ORIGIN: &str = "https://dpay-dev.netlify.app";

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub qpay: QPayConfig,
    pub cybersource: CyberSourceConfig,
    pub frontend: FrontendConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub cors_allowed_origin: String,
}

#[derive(Debug, Clone)]
pub struct FrontendConfig {
    /// Page the shopper lands on after a gateway callback
    pub payment_response_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let server = ServerConfig {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: lookup("PORT")
                .unwrap_or_else(|| "8080".to_string())
                .trim()
                .parse()
                .context("PORT must be a valid number")?,
            environment: lookup("ENVIRONMENT").unwrap_or_else(|| "development".to_string()),
            cors_allowed_origin: lookup("CORS_ALLOWED_ORIGIN")
                .unwrap_or_else(|| DEFAULT_CORS_ORIGIN.to_string()),
        };

        let qpay = QPayConfig::from_lookup(&lookup).context("Invalid QPay configuration")?;
        let cybersource =
            CyberSourceConfig::from_lookup(&lookup).context("Invalid CyberSource configuration")?;

        let frontend = FrontendConfig {
            payment_response_url: lookup("FRONTEND_RESPONSE_URL")
                .unwrap_or_else(|| DEFAULT_FRONTEND_RESPONSE_URL.to_string()),
        };

        let config = Config {
            server,
            qpay,
            cybersource,
            frontend,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.server.environment == "development"
    }

    pub fn validate(&self) -> Result<()> {
        // Validate port range
        if self.server.port < 1024 {
            return Err(anyhow!(
                "Port must be at least 1024, got {}",
                self.server.port
            ));
        }

        // Validate environment
        let valid_environments = ["development", "staging", "production"];
        if !valid_environments.contains(&self.server.environment.as_str()) {
            return Err(anyhow!(
                "Environment must be one of: {:?}, got {}",
                valid_environments,
                self.server.environment
            ));
        }

        if self.frontend.payment_response_url.trim().is_empty() {
            return Err(anyhow!("FRONTEND_RESPONSE_URL cannot be empty"));
        }

        // Gateway URLs may be unset; the affected gateway then refuses to sign
        let urls = [
            ("QPAY_REDIRECT_URL", &self.qpay.gateway_url),
            ("RETURN_URL", &self.qpay.return_url),
            ("CYBERSOURCE_PAYMENT_URL", &self.cybersource.payment_url),
            ("CYBERSOURCE_RESPONSE_URL", &self.cybersource.response_url),
            ("FRONTEND_RESPONSE_URL", &self.frontend.payment_response_url),
            ("CORS_ALLOWED_ORIGIN", &self.server.cors_allowed_origin),
        ];
        for (name, value) in urls {
            if value.trim().is_empty() {
                continue;
            }
            Url::parse(value).with_context(|| format!("{} must be a valid URL", name))?;
        }

        if self.qpay.timeout_secs == 0 {
            return Err(anyhow!("GATEWAY_TIMEOUT_SECS must be greater than 0"));
        }

        Ok(())
    }
}
