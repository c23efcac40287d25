//! Alert dispatcher: runs one sweep end to end

use chrono::{DateTime, Utc};
use fir_tracker_core::{AlertEvent, AlertTier, Clock};
use fir_tracker_notify::{GatewayError, NotificationGateway, SendOutcome};
use fir_tracker_storage::{CaseStorage, UnreadableCase};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use uuid::Uuid;

use crate::{plan_sweep, AlertConfig, AlertError, Rejection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// The gateway accepted the message
    Sent,
    /// The gateway was called and reported a failure, or timed out
    Failed,
    /// The case had bad input and no send was attempted
    Skipped,
    /// Shutdown arrived before the send was issued
    Cancelled,
}

/// What happened to one case during a sweep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchRecord {
    pub case_id: Uuid,
    pub fir_number: String,
    pub tier: Option<AlertTier>,
    pub recipient: Option<String>,
    pub template_id: Option<String>,
    pub status: DispatchStatus,
    pub message_id: Option<String>,
    pub error: Option<String>,
}

impl DispatchRecord {
    fn from_event(event: &AlertEvent, status: DispatchStatus) -> Self {
        Self {
            case_id: event.case_id,
            fir_number: event.fir_number.clone(),
            tier: Some(event.threshold_crossed),
            recipient: Some(event.recipient.clone()),
            template_id: Some(event.template_id.clone()),
            status,
            message_id: None,
            error: None,
        }
    }

    fn from_outcome(event: &AlertEvent, outcome: SendOutcome) -> Self {
        let status = if outcome.success {
            DispatchStatus::Sent
        } else {
            DispatchStatus::Failed
        };
        Self {
            message_id: outcome.message_id,
            error: outcome.error,
            ..Self::from_event(event, status)
        }
    }

    fn from_rejection(rejection: Rejection) -> Self {
        Self {
            case_id: rejection.case_id,
            fir_number: rejection.fir_number,
            tier: rejection.tier,
            recipient: None,
            template_id: None,
            status: DispatchStatus::Skipped,
            message_id: None,
            error: Some(rejection.error.to_string()),
        }
    }
}

/// Aggregated result of one sweep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub open_cases: usize,
    /// Cases whose recomputed fields were written back
    pub recomputed: usize,
    /// Write-backs dropped because the case was completed or re-dated
    /// after the sweep read it
    pub superseded: usize,
    pub persist_failures: usize,
    /// Open-case documents that could not be decoded
    pub unreadable: Vec<UnreadableCase>,
    /// Sends handed to the gateway
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Cases skipped for bad input
    pub skipped: usize,
    /// Sends not issued because of shutdown
    pub cancelled: usize,
    pub records: Vec<DispatchRecord>,
}

impl SweepSummary {
    fn record(&mut self, record: DispatchRecord) {
        match record.status {
            DispatchStatus::Sent => {
                self.attempted += 1;
                self.succeeded += 1;
            }
            DispatchStatus::Failed => {
                self.attempted += 1;
                self.failed += 1;
            }
            DispatchStatus::Skipped => self.skipped += 1,
            DispatchStatus::Cancelled => self.cancelled += 1,
        }
        self.records.push(record);
    }
}

/// Clears the running flag when a sweep ends, however it ends
struct SweepGuard<'a> {
    running: &'a AtomicBool,
}

impl<'a> SweepGuard<'a> {
    fn acquire(running: &'a AtomicBool) -> Option<Self> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { running })
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

/// Resolves once shutdown has been signalled. Never resolves if the sender
/// is gone without signalling.
async fn shutdown_signalled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Runs sweeps against a case store and a notification gateway
pub struct AlertDispatcher {
    storage: Arc<dyn CaseStorage>,
    gateway: Arc<dyn NotificationGateway>,
    clock: Arc<dyn Clock>,
    config: AlertConfig,
    running: AtomicBool,
}

impl AlertDispatcher {
    pub fn new(
        storage: Arc<dyn CaseStorage>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        config: AlertConfig,
    ) -> Result<Self, AlertError> {
        config.validate()?;
        Ok(Self {
            storage,
            gateway,
            clock,
            config,
            running: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &AlertConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run a sweep that cannot be cancelled
    pub async fn sweep_now(&self) -> Result<SweepSummary, AlertError> {
        let (_tx, rx) = watch::channel(false);
        self.run_sweep(rx).await
    }

    /// Run one sweep. Fails only when another sweep is running or the open
    /// cases cannot be read; everything else lands in the summary.
    ///
    /// Once `shutdown` flips to `true` no further sends are issued. Sends
    /// already in flight run to completion or to their timeout.
    pub async fn run_sweep(
        &self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<SweepSummary, AlertError> {
        let _guard = SweepGuard::acquire(&self.running).ok_or(AlertError::SweepInProgress)?;

        let now = self.clock.now();
        let mut summary = SweepSummary {
            started_at: Some(now),
            ..Default::default()
        };

        let scan = self.storage.scan_open().await?;
        summary.unreadable = scan.unreadable;
        let plan = plan_sweep(scan.cases, now, &self.config);
        summary.open_cases = plan.examined;

        tracing::info!(
            open_cases = plan.examined,
            unreadable = summary.unreadable.len(),
            alerts = plan.events.len(),
            rejected = plan.rejected.len(),
            gateway = self.gateway.name(),
            "Running investigation alert sweep"
        );

        for case in &plan.updates {
            match self.storage.store_derived(case).await {
                Ok(true) => summary.recomputed += 1,
                Ok(false) => {
                    summary.superseded += 1;
                    tracing::debug!(
                        case_id = %case.id,
                        fir_number = %case.fir_number,
                        "Case changed since it was read; keeping the stored fields"
                    );
                }
                Err(e) => {
                    summary.persist_failures += 1;
                    tracing::error!(
                        case_id = %case.id,
                        fir_number = %case.fir_number,
                        error = %e,
                        "Failed to persist recomputed case"
                    );
                }
            }
        }

        for rejection in plan.rejected {
            tracing::warn!(
                case_id = %rejection.case_id,
                fir_number = %rejection.fir_number,
                error = %rejection.error,
                "Skipping alert for case"
            );
            summary.record(DispatchRecord::from_rejection(rejection));
        }

        self.dispatch(plan.events, &mut shutdown, &mut summary).await;

        summary.finished_at = Some(self.clock.now());
        tracing::info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            cancelled = summary.cancelled,
            recomputed = summary.recomputed,
            superseded = summary.superseded,
            persist_failures = summary.persist_failures,
            "Alert sweep finished"
        );
        Ok(summary)
    }

    async fn dispatch(
        &self,
        events: Vec<AlertEvent>,
        shutdown: &mut watch::Receiver<bool>,
        summary: &mut SweepSummary,
    ) {
        let permits = Arc::new(Semaphore::new(self.config.max_concurrent_sends));
        let timeout = self.config.send_timeout;
        let mut sends = JoinSet::new();
        let mut stopping = false;

        for event in events {
            if stopping || *shutdown.borrow() {
                stopping = true;
                summary.record(DispatchRecord::from_event(&event, DispatchStatus::Cancelled));
                continue;
            }

            let permit = tokio::select! {
                biased;
                _ = shutdown_signalled(shutdown) => None,
                permit = permits.clone().acquire_owned() => permit.ok(),
            };
            let Some(permit) = permit else {
                stopping = true;
                summary.record(DispatchRecord::from_event(&event, DispatchStatus::Cancelled));
                continue;
            };

            let gateway = Arc::clone(&self.gateway);
            sends.spawn(async move {
                let _permit = permit;
                let send = gateway.send(&event.recipient, &event.template_id, &event.parameters);
                let outcome = match tokio::time::timeout(timeout, send).await {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        SendOutcome::from(GatewayError::Timeout(timeout.as_millis() as u64))
                    }
                };
                (event, outcome)
            });
        }

        while let Some(joined) = sends.join_next().await {
            match joined {
                Ok((event, outcome)) => {
                    if outcome.success {
                        tracing::info!(
                            case_id = %event.case_id,
                            fir_number = %event.fir_number,
                            tier = %event.threshold_crossed,
                            recipient = %event.recipient,
                            "Alert sent"
                        );
                    } else {
                        tracing::warn!(
                            case_id = %event.case_id,
                            fir_number = %event.fir_number,
                            tier = %event.threshold_crossed,
                            recipient = %event.recipient,
                            error = outcome.error.as_deref().unwrap_or("unknown"),
                            "Alert send failed"
                        );
                    }
                    summary.record(DispatchRecord::from_outcome(&event, outcome));
                }
                Err(e) => {
                    // The event went down with the task; count the attempt.
                    summary.attempted += 1;
                    summary.failed += 1;
                    tracing::error!(error = %e, "Alert send task aborted");
                }
            }
        }
    }
}
