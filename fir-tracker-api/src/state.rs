//! Application state shared across handlers

use fir_tracker_alerts::{AlertConfig, AlertDispatcher, AlertError};
use fir_tracker_core::Clock;
use fir_tracker_notify::NotificationGateway;
use fir_tracker_storage::CaseStorage;
use std::sync::Arc;

/// Shared application state
pub struct AppState {
    pub storage: Arc<dyn CaseStorage>,
    pub dispatcher: Arc<AlertDispatcher>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    pub fn new(
        storage: Arc<dyn CaseStorage>,
        gateway: Arc<dyn NotificationGateway>,
        clock: Arc<dyn Clock>,
        alerts: AlertConfig,
    ) -> Result<Self, AlertError> {
        let dispatcher = AlertDispatcher::new(storage.clone(), gateway, clock.clone(), alerts)?;
        Ok(Self {
            storage,
            dispatcher: Arc::new(dispatcher),
            clock,
        })
    }
}
