//! Destinations for non-fatal normalization messages.

use tracing::warn;

/// Receives human-readable diagnostics (missing fields, skipped entries).
pub trait DiagnosticSink {
    fn report(&mut self, message: &str);
}

/// Collects messages in memory.
impl DiagnosticSink for Vec<String> {
    fn report(&mut self, message: &str) {
        self.push(message.to_string());
    }
}

/// Logs each message at `warn` level and counts them.
#[derive(Debug, Default)]
pub struct TracingSink {
    reported: usize,
}

impl TracingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages logged so far.
    #[must_use]
    pub fn reported(&self) -> usize {
        self.reported
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&mut self, message: &str) {
        self.reported += 1;
        warn!(diagnostic = %message, "Normalization diagnostic");
    }
}
