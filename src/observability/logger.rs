//! Structured logging observer
//!
//! Turns observer events into `tracing` calls keyed by the event's level,
//! per §4.7 and §10. Pairs with a `tracing_subscriber::fmt` layer configured
//! by the hosting binary (JSON in production, pretty in local dev) — this
//! observer only decides *what* to log, not how it's formatted.

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use super::bus::Observer;
use super::event::{Level, ObserverEvent};

/// Logs every lifecycle event via `tracing`, at a level derived from the
/// event itself.
pub struct LoggingObserver;

#[async_trait]
impl Observer for LoggingObserver {
    fn name(&self) -> &str {
        "logging"
    }

    async fn on_event(&self, event: &ObserverEvent) {
        let envelope = event.envelope();
        match envelope.level {
            Level::Debug => debug!(event_type = %envelope.event_type, "{}", envelope.message),
            Level::Info => info!(event_type = %envelope.event_type, "{}", envelope.message),
            Level::Warning => warn!(event_type = %envelope.event_type, "{}", envelope.message),
            Level::Error => error!(event_type = %envelope.event_type, "{}", envelope.message),
        }
    }
}
