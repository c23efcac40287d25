//! The gateway capability and backend selection

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use crate::{GatewayError, LoggingGateway, WhatsAppCloudGateway, WhatsAppConfig};

/// Result of one send attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendOutcome {
    pub success: bool,
    /// Provider message id on success
    pub message_id: Option<String>,
    /// Provider or transport error detail on failure
    pub error: Option<String>,
}

impl SendOutcome {
    pub fn delivered(message_id: impl Into<String>) -> Self {
        Self {
            success: true,
            message_id: Some(message_id.into()),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            message_id: None,
            error: Some(error.into()),
        }
    }
}

impl From<GatewayError> for SendOutcome {
    fn from(err: GatewayError) -> Self {
        SendOutcome::failure(err.to_string())
    }
}

/// Sends a pre-registered template message to one recipient.
///
/// Implementations never fail the call: every problem, missing credentials
/// included, comes back as an unsuccessful [`SendOutcome`].
#[async_trait]
pub trait NotificationGateway: Send + Sync {
    /// Short backend name for logs
    fn name(&self) -> &'static str;

    async fn send(&self, recipient: &str, template_id: &str, parameters: &[String]) -> SendOutcome;
}

/// Which gateway backend to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayMode {
    /// Simulate sends and log them
    #[default]
    Test,
    /// Send through the WhatsApp Cloud API
    Production,
}

impl FromStr for GatewayMode {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" => Ok(GatewayMode::Test),
            "production" | "prod" => Ok(GatewayMode::Production),
            other => Err(GatewayError::InvalidMode(format!(
                "'{}', expected 'test' or 'production'",
                other
            ))),
        }
    }
}

impl fmt::Display for GatewayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GatewayMode::Test => f.write_str("test"),
            GatewayMode::Production => f.write_str("production"),
        }
    }
}

/// Everything needed to build either backend
#[derive(Debug, Clone, Default)]
pub struct GatewaySettings {
    pub mode: GatewayMode,
    pub whatsapp: WhatsAppConfig,
    /// JSON-lines file the logging gateway appends to
    pub test_log: Option<PathBuf>,
}

/// Build the configured gateway. Called once at startup.
pub fn build_gateway(
    settings: &GatewaySettings,
) -> Result<Arc<dyn NotificationGateway>, GatewayError> {
    let gateway: Arc<dyn NotificationGateway> = match settings.mode {
        GatewayMode::Test => {
            tracing::warn!("Using TEST gateway mode: messages are simulated and logged");
            Arc::new(LoggingGateway::new(settings.test_log.clone()))
        }
        GatewayMode::Production => {
            let gateway = WhatsAppCloudGateway::new(settings.whatsapp.clone())?;
            if !gateway.has_credentials() {
                tracing::warn!(
                    "WhatsApp credentials missing; sends will report the gateway as unavailable"
                );
            }
            tracing::info!(
                "Using PRODUCTION gateway mode: messages are sent via the WhatsApp Cloud API"
            );
            Arc::new(gateway)
        }
    };
    Ok(gateway)
}
