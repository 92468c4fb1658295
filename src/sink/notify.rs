use super::{Notification, Notifier, Severity, Tags};
use anyhow::Result;
use prometheus::{IntCounterVec, Opts, Registry};
use tracing::{info, warn};

/// Writes notifications to the log and counts them per instance/severity.
#[derive(Clone)]
pub struct LogNotifier {
    notifications_total: IntCounterVec,
}

impl Default for LogNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl LogNotifier {
    #[must_use]
    #[allow(clippy::expect_used)]
    /// Create a new notifier.
    ///
    /// # Panics
    ///
    /// Panics if metric names are invalid (should not occur with static names).
    pub fn new() -> Self {
        Self {
            notifications_total: IntCounterVec::new(
                Opts::new(
                    "mysql_sampler_notifications_total",
                    "Notifications raised per instance and severity",
                ),
                &["instance", "severity"],
            )
            .expect("valid mysql_sampler_notifications_total metric"),
        }
    }

    /// # Errors
    ///
    /// Returns an error if metric registration fails.
    pub fn register(&self, registry: &Registry) -> Result<()> {
        registry.register(Box::new(self.notifications_total.clone()))?;
        Ok(())
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, tags: &Tags, notification: &Notification) {
        self.notifications_total
            .with_label_values(&[tags.instance.as_str(), notification.severity.as_str()])
            .inc();

        match notification.severity {
            Severity::Okay => info!(
                host = %tags.host,
                instance = %tags.instance,
                time = %notification.time,
                "{}",
                notification.message
            ),
            Severity::Warning => warn!(
                host = %tags.host,
                instance = %tags.instance,
                time = %notification.time,
                "{}",
                notification.message
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notify_counts_by_severity() {
        let notifier = LogNotifier::new();
        let tags = Tags {
            host: "db1".to_string(),
            instance: "replica".to_string(),
        };

        notifier.notify(&tags, &Notification::new(Severity::Warning, "down"));
        notifier.notify(&tags, &Notification::new(Severity::Warning, "down"));
        notifier.notify(&tags, &Notification::new(Severity::Okay, "up"));

        assert_eq!(
            notifier
                .notifications_total
                .with_label_values(&["replica", "warning"])
                .get(),
            2
        );
        assert_eq!(
            notifier
                .notifications_total
                .with_label_values(&["replica", "okay"])
                .get(),
            1
        );
    }

    #[test]
    fn test_register() {
        let registry = Registry::new();
        assert!(LogNotifier::new().register(&registry).is_ok());
    }
}
