//! Root monitor configuration.

use serde::{Deserialize, Serialize};

/// Configuration for a root [`ProgressMonitor`](crate::ProgressMonitor).
///
/// # Example
///
/// ```rust
/// use promon_monitor::{MonitorConfig, ProgressMonitor};
///
/// let config = MonitorConfig::new().with_allow_cancellation(true);
/// let monitor = ProgressMonitor::with_config(config);
/// monitor.cancel()?;
/// assert!(monitor.is_canceled());
/// # Ok::<(), promon_monitor::MonitorError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Whether `cancel` is permitted. Default: false.
    pub allow_cancellation: bool,
}

impl MonitorConfig {
    /// Creates a config with default values.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            allow_cancellation: false,
        }
    }

    /// Enables or disables cancellation.
    #[must_use]
    pub const fn with_allow_cancellation(mut self, allow: bool) -> Self {
        self.allow_cancellation = allow;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_cancelable_by_default() {
        assert!(!MonitorConfig::new().allow_cancellation);
        assert_eq!(MonitorConfig::default(), MonitorConfig::new());
    }

    #[test]
    fn test_builder() {
        let config = MonitorConfig::new().with_allow_cancellation(true);
        assert!(config.allow_cancellation);
    }

    #[test]
    fn test_config_deserialization() {
        let parsed: MonitorConfig = serde_json::from_str("{}").unwrap();
        assert!(!parsed.allow_cancellation);

        let parsed: MonitorConfig =
            serde_json::from_str(r#"{"allow_cancellation":true}"#).unwrap();
        assert!(parsed.allow_cancellation);
    }
}
