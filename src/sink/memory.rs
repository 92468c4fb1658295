use super::{Emission, MetricSink, Notification, Notifier, Tags};
use std::sync::Mutex;

/// Sink that keeps every emission in memory (used by `--check` and tests).
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<(Tags, Emission)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain recorded emissions.
    pub fn take(&self) -> Vec<(Tags, Emission)> {
        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *records)
    }

    /// Snapshot of the recorded emissions without tags.
    #[must_use]
    pub fn emissions(&self) -> Vec<Emission> {
        let records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.iter().map(|(_, e)| e.clone()).collect()
    }
}

impl MetricSink for MemorySink {
    fn emit(&self, tags: &Tags, emission: &Emission) {
        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push((tags.clone(), emission.clone()));
    }
}

#[derive(Default)]
pub struct MemoryNotifier {
    records: Mutex<Vec<(Tags, Notification)>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self) -> Vec<(Tags, Notification)> {
        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *records)
    }

    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        let records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.iter().map(|(_, n)| n.clone()).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, tags: &Tags, notification: &Notification) {
        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        records.push((tags.clone(), notification.clone()));
    }
}
