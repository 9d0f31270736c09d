use std::path::PathBuf;
use std::time::Duration;

/// Polling interval used when a caller does not give one.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// Runtime settings shared by the server and the one-shot `watch` command.
#[derive(Debug, Clone)]
pub struct Settings {
    pub headless: bool,
    /// Explicit Chrome binary; auto-detected when `None`.
    pub chrome_path: Option<PathBuf>,
    pub default_interval: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            default_interval: DEFAULT_INTERVAL,
        }
    }
}

impl Settings {
    /// Resolve an optional per-call interval in milliseconds against the default.
    pub fn interval_or_default(&self, interval_ms: Option<u64>) -> Duration {
        interval_ms
            .map(Duration::from_millis)
            .unwrap_or(self.default_interval)
    }
}
