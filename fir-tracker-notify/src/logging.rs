//! Simulating gateway for environments without live credentials

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::templates::render_preview;
use crate::{GatewayError, NotificationGateway, SendOutcome};

/// One line of the simulation log
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulatedMessage<'a> {
    timestamp: DateTime<Utc>,
    to: &'a str,
    template_name: &'a str,
    parameters: &'a [String],
    message: &'a str,
    status: &'static str,
    mock_message_id: &'a str,
}

/// Logs every message instead of sending it and reports success with a
/// mock message id
pub struct LoggingGateway {
    log_file: Option<PathBuf>,
}

impl LoggingGateway {
    pub fn new(log_file: Option<PathBuf>) -> Self {
        Self { log_file }
    }

    fn mock_message_id(now: DateTime<Utc>) -> String {
        let suffix = Uuid::new_v4().simple().to_string();
        format!("mock_{}_{}", now.timestamp_millis(), &suffix[..9])
    }

    async fn append(path: &Path, entry: &SimulatedMessage<'_>) -> Result<(), GatewayError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await?;
        }
        let mut line =
            serde_json::to_vec(entry).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl NotificationGateway for LoggingGateway {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn send(&self, recipient: &str, template_id: &str, parameters: &[String]) -> SendOutcome {
        let now = Utc::now();
        let message = render_preview(template_id, parameters);
        let mock_id = Self::mock_message_id(now);

        tracing::info!(
            to = %recipient,
            template = %template_id,
            parameters = %parameters.join(", "),
            mock_message_id = %mock_id,
            "[TEST MODE] WhatsApp message simulated\n{}",
            message
        );

        if let Some(path) = &self.log_file {
            let entry = SimulatedMessage {
                timestamp: now,
                to: recipient,
                template_name: template_id,
                parameters,
                message: &message,
                status: "SIMULATED",
                mock_message_id: &mock_id,
            };
            // The simulated send itself succeeded even if the log write did not.
            if let Err(e) = Self::append(path, &entry).await {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to write simulation log"
                );
            }
        }

        SendOutcome::delivered(mock_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_send_succeeds_with_mock_id() {
        let gateway = LoggingGateway::new(None);
        let outcome = gateway
            .send("919876543210", "investigation_reminder_30", &["FIR-2025-001".to_string()])
            .await;

        assert!(outcome.success);
        let id = outcome.message_id.unwrap();
        assert!(id.starts_with("mock_"));
        assert_eq!(id.rsplit('_').next().unwrap().len(), 9);
    }

    #[tokio::test]
    async fn test_simulated_send_appends_json_line() {
        let path = std::env::temp_dir()
            .join(format!("fir-tracker-{}", Uuid::new_v4()))
            .join("whatsapp-test.log");
        let gateway = LoggingGateway::new(Some(path.clone()));

        gateway.send("919876543210", "investigation_reminder_30", &["FIR-1".to_string()]).await;
        gateway
            .send("919876543211", "investigation_overdue", &["FIR-2".to_string(), "75".to_string()])
            .await;

        let contents = tokio::fs::read_to_string(&path).await.unwrap();
        let lines: Vec<serde_json::Value> = contents
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["to"], "919876543210");
        assert_eq!(lines[0]["status"], "SIMULATED");
        assert_eq!(lines[1]["templateName"], "investigation_overdue");
        assert_eq!(lines[1]["parameters"][1], "75");

        if let Some(dir) = path.parent() {
            let _ = tokio::fs::remove_dir_all(dir).await;
        }
    }
}
