//! Request logging hooks

use tracing::{debug, info};

/// Receives request lifecycle messages from the retry engine.
///
/// Both methods default to no-ops.
pub trait RequestLogger: Send + Sync {
    /// Request start and retry decisions
    fn info(&self, _message: &str) {}

    /// Response details
    fn debug(&self, _message: &str) {}
}

/// Forwards request logs to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn info(&self, message: &str) {
        info!(target: "deepl_translator::http", "{}", message);
    }

    fn debug(&self, message: &str) {
        debug!(target: "deepl_translator::http", "{}", message);
    }
}
