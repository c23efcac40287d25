//! Notification gateways for FIR Tracker
//!
//! The alert dispatcher only sees [`NotificationGateway`]. Which backend sits
//! behind it is decided once at startup from [`GatewayMode`]:
//! the WhatsApp Cloud API in production, a logging simulator otherwise.
//! [`RecordingGateway`] is an in-memory double for tests.

pub mod error;
pub mod gateway;
pub mod logging;
pub mod recording;
pub mod templates;
pub mod whatsapp;

pub use error::GatewayError;
pub use gateway::{build_gateway, GatewayMode, GatewaySettings, NotificationGateway, SendOutcome};
pub use logging::LoggingGateway;
pub use recording::{RecordingGateway, SentMessage};
pub use templates::{CRITICAL_TEMPLATE, OVERDUE_TEMPLATE, REMINDER_TEMPLATE};
pub use whatsapp::{WhatsAppCloudGateway, WhatsAppConfig};
