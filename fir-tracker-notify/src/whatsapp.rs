//! WhatsApp Cloud API gateway

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{GatewayError, NotificationGateway, SendOutcome};

/// WhatsApp Cloud API configuration
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Graph API base including version
    pub api_base: String,
    /// Sending phone-number id registered with Meta
    pub phone_number_id: Option<String>,
    /// Bearer token
    pub access_token: Option<String>,
    /// Template language code
    pub language_code: String,
    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            api_base: "https://graph.facebook.com/v17.0".to_string(),
            phone_number_id: None,
            access_token: None,
            language_code: "en_US".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Serialize)]
struct TemplateMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    template: Template<'a>,
}

#[derive(Debug, Serialize)]
struct Template<'a> {
    name: &'a str,
    language: Language<'a>,
    components: Vec<Component<'a>>,
}

#[derive(Debug, Serialize)]
struct Language<'a> {
    code: &'a str,
}

#[derive(Debug, Serialize)]
struct Component<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    parameters: Vec<TextParameter<'a>>,
}

#[derive(Debug, Serialize)]
struct TextParameter<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

/// Sends approved templates through the Meta Graph API
pub struct WhatsAppCloudGateway {
    config: WhatsAppConfig,
    http_client: reqwest::Client,
}

impl WhatsAppCloudGateway {
    pub fn new(config: WhatsAppConfig) -> Result<Self, GatewayError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { config, http_client })
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials().is_some()
    }

    fn credentials(&self) -> Option<(&str, &str)> {
        let token = self.config.access_token.as_deref().filter(|t| !t.is_empty())?;
        let phone_id = self.config.phone_number_id.as_deref().filter(|p| !p.is_empty())?;
        Some((token, phone_id))
    }

    fn build_message<'a>(
        &'a self,
        to: &'a str,
        template_id: &'a str,
        parameters: &'a [String],
    ) -> TemplateMessage<'a> {
        TemplateMessage {
            messaging_product: "whatsapp",
            to,
            kind: "template",
            template: Template {
                name: template_id,
                language: Language {
                    code: &self.config.language_code,
                },
                components: vec![Component {
                    kind: "body",
                    parameters: parameters
                        .iter()
                        .map(|text| TextParameter { kind: "text", text })
                        .collect(),
                }],
            },
        }
    }

    async fn try_send(
        &self,
        to: &str,
        template_id: &str,
        parameters: &[String],
    ) -> Result<String, GatewayError> {
        let (token, phone_id) = self
            .credentials()
            .ok_or_else(|| GatewayError::Unavailable("WhatsApp credentials missing".to_string()))?;

        let url = format!("{}/{}/messages", self.config.api_base.trim_end_matches('/'), phone_id);
        let body = self.build_message(to, template_id, parameters);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GatewayError::Timeout(self.config.request_timeout.as_millis() as u64)
                } else {
                    GatewayError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: SendResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

        parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| {
                GatewayError::InvalidResponse("response carried no message id".to_string())
            })
    }
}

#[async_trait]
impl NotificationGateway for WhatsAppCloudGateway {
    fn name(&self) -> &'static str {
        "whatsapp"
    }

    async fn send(&self, recipient: &str, template_id: &str, parameters: &[String]) -> SendOutcome {
        match self.try_send(recipient, template_id, parameters).await {
            Ok(message_id) => {
                tracing::info!(
                    to = %recipient,
                    template = %template_id,
                    message_id = %message_id,
                    "WhatsApp message sent"
                );
                SendOutcome::delivered(message_id)
            }
            Err(GatewayError::Unavailable(reason)) => {
                tracing::warn!(
                    to = %recipient,
                    template = %template_id,
                    parameters = %parameters.join(", "),
                    "{}; message not sent",
                    reason
                );
                SendOutcome::failure(GatewayError::Unavailable(reason).to_string())
            }
            Err(e) => {
                tracing::error!(
                    to = %recipient,
                    template = %template_id,
                    error = %e,
                    "WhatsApp API error"
                );
                SendOutcome::from(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn gateway_for(server: &MockServer) -> WhatsAppCloudGateway {
        WhatsAppCloudGateway::new(WhatsAppConfig {
            api_base: server.uri(),
            phone_number_id: Some("1234567890".to_string()),
            access_token: Some("secret-token".to_string()),
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_sends_template_with_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/1234567890/messages"))
            .and(header("authorization", "Bearer secret-token"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "919876543210",
                "type": "template",
                "template": {
                    "name": "investigation_overdue",
                    "language": { "code": "en_US" },
                    "components": [{
                        "type": "body",
                        "parameters": [
                            { "type": "text", "text": "FIR-2025-003" },
                            { "type": "text", "text": "75" }
                        ]
                    }]
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "messages": [{ "id": "wamid.HBgM" }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = gateway_for(&server)
            .send(
                "919876543210",
                "investigation_overdue",
                &["FIR-2025-003".to_string(), "75".to_string()],
            )
            .await;

        assert!(outcome.success, "{:?}", outcome);
        assert_eq!(outcome.message_id.as_deref(), Some("wamid.HBgM"));
    }

    #[tokio::test]
    async fn test_provider_rejection_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_string(r#"{"error":{"message":"Template name does not exist"}}"#),
            )
            .mount(&server)
            .await;

        let outcome = gateway_for(&server)
            .send("919876543210", "investigation_reminder_30", &["FIR-1".to_string()])
            .await;

        assert!(!outcome.success);
        let error = outcome.error.unwrap();
        assert!(error.contains("400"));
        assert!(error.contains("Template name does not exist"));
    }

    #[tokio::test]
    async fn test_missing_credentials_never_hit_the_network() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let gateway = WhatsAppCloudGateway::new(WhatsAppConfig {
            api_base: server.uri(),
            phone_number_id: Some("1234567890".to_string()),
            access_token: None,
            ..Default::default()
        })
        .unwrap();
        assert!(!gateway.has_credentials());

        let outcome = gateway
            .send("919876543210", "investigation_reminder_30", &["FIR-1".to_string()])
            .await;
        assert!(!outcome.success);
        assert_eq!(
            outcome.error.as_deref(),
            Some("Gateway unavailable: WhatsApp credentials missing")
        );
    }

    #[tokio::test]
    async fn test_response_without_message_id_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "messages": [] })))
            .mount(&server)
            .await;

        let outcome = gateway_for(&server)
            .send("919876543210", "investigation_critical_60", &["FIR-1".to_string()])
            .await;
        assert!(!outcome.success);
        assert!(outcome.error.unwrap().starts_with("Invalid provider response"));
    }
}
