//! In-memory gateway double that records every send

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::{NotificationGateway, SendOutcome};

/// A send the gateway received
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub recipient: String,
    pub template_id: String,
    pub parameters: Vec<String>,
}

/// Records sends in memory. Recipients can be scripted to fail and every
/// send can be slowed down, which lets tests observe isolation, timeouts and
/// parallelism.
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<SentMessage>>,
    failing: Mutex<HashSet<String>>,
    delay: Option<Duration>,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    counter: AtomicUsize,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every send for `delay` before answering
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Make sends to `recipient` fail with a provider error
    pub fn fail_for(&self, recipient: impl Into<String>) {
        self.failing.lock().insert(recipient.into());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }

    pub fn sent_to(&self, recipient: &str) -> Vec<SentMessage> {
        self.sent
            .lock()
            .iter()
            .filter(|m| m.recipient == recipient)
            .cloned()
            .collect()
    }

    /// Highest number of sends that were in progress at once
    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotificationGateway for RecordingGateway {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, recipient: &str, template_id: &str, parameters: &[String]) -> SendOutcome {
        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);

        self.sent.lock().push(SentMessage {
            recipient: recipient.to_string(),
            template_id: template_id.to_string(),
            parameters: parameters.to_vec(),
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.failing.lock().contains(recipient) {
            return SendOutcome::failure(format!("Provider rejected message for {}", recipient));
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        SendOutcome::delivered(format!("recorded-{}", n))
    }
}
