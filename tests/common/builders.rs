use parking_lot::Mutex;
use resilient_records::events::{CloudNotification, NotificationBroadcaster, NotificationName};
use resilient_records::models::Record;
use resilient_records::operation::{OperationReport, OperationState};
use std::sync::Arc;

/// `count` notes with ids `{prefix}-0 .. {prefix}-{count-1}`
pub fn notes(prefix: &str, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| Record::new(format!("{prefix}-{i}"), "Note").with_field("index", serde_json::json!(i)))
        .collect()
}

/// Collects every notification posted through a broadcaster
#[derive(Clone, Default)]
pub struct NotificationLog {
    seen: Arc<Mutex<Vec<NotificationName>>>,
}

impl NotificationLog {
    pub fn attach(broadcaster: &NotificationBroadcaster) -> Self {
        let log = Self::default();
        let seen = log.seen.clone();
        broadcaster.subscribe_all(move |notification: &CloudNotification| {
            seen.lock().push(notification.name.clone());
        });
        log
    }

    pub fn names(&self) -> Vec<NotificationName> {
        self.seen.lock().clone()
    }

    pub fn count(&self, name: &NotificationName) -> usize {
        self.seen.lock().iter().filter(|seen| *seen == name).count()
    }
}

/// Collects completion reports
#[derive(Clone, Default)]
pub struct CompletionLog {
    reports: Arc<Mutex<Vec<OperationReport>>>,
}

impl CompletionLog {
    pub fn callback(&self) -> impl Fn(&OperationReport) + Send + Sync + 'static {
        let reports = self.reports.clone();
        move |report: &OperationReport| reports.lock().push(report.clone())
    }

    pub fn states(&self) -> Vec<OperationState> {
        self.reports.lock().iter().map(|report| report.state).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.reports
            .lock()
            .iter()
            .map(|report| report.operation.name.clone())
            .collect()
    }
}
