//! Conversion of remote push payloads into local notifications.

use super::{NotificationBroadcaster, NotificationName};
use crate::constants::remote_payload;
use serde_json::Value;
use tracing::{debug, warn};

/// Re-posts remote push payloads through the local broadcaster
#[derive(Debug, Clone)]
pub struct RemoteNotificationConverter {
    broadcaster: NotificationBroadcaster,
}

impl RemoteNotificationConverter {
    pub fn new(broadcaster: NotificationBroadcaster) -> Self {
        Self { broadcaster }
    }

    /// Notification name carried by `payload`, if any.
    ///
    /// Looks under `alert.loc-key` first, then a top-level `notification` key.
    pub fn notification_name(payload: &Value) -> Option<NotificationName> {
        payload
            .get(remote_payload::ALERT)
            .and_then(|alert| alert.get(remote_payload::LOCALIZATION_KEY))
            .or_else(|| payload.get(remote_payload::NOTIFICATION))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .map(|name| NotificationName::new(name.to_string()))
    }

    /// Post the payload under its notification name. Returns the name posted.
    pub fn convert(&self, payload: &Value) -> Option<NotificationName> {
        let Some(name) = Self::notification_name(payload) else {
            warn!(payload = %payload, "Remote notification without a name ignored");
            return None;
        };

        let delivered = self.broadcaster.post(name.clone(), payload.clone());
        debug!(
            notification = %name,
            catalogued = name.is_catalogued(),
            delivered = delivered,
            "Remote notification converted"
        );
        Some(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_reads_alert_localization_key() {
        let payload = json!({ "alert": { "loc-key": "CLOUD_ERROR_FATAL" } });
        assert_eq!(
            RemoteNotificationConverter::notification_name(&payload),
            Some(NotificationName::FATAL)
        );
    }

    #[test]
    fn test_falls_back_to_top_level_key() {
        let payload = json!({ "notification": "ZONE_CHANGED" });
        assert_eq!(
            RemoteNotificationConverter::notification_name(&payload),
            Some(NotificationName::from("ZONE_CHANGED"))
        );
    }

    #[test]
    fn test_convert_posts_payload() {
        let broadcaster = NotificationBroadcaster::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        broadcaster.subscribe(NotificationName::from("ZONE_CHANGED"), move |notification| {
            sink.lock().push(notification.payload().cloned());
        });

        let converter = RemoteNotificationConverter::new(broadcaster);
        let payload = json!({ "alert": { "loc-key": "ZONE_CHANGED" }, "zone": "notes" });
        assert!(converter.convert(&payload).is_some());
        assert_eq!(*seen.lock(), vec![Some(payload)]);
    }

    #[test]
    fn test_payload_without_name_is_ignored() {
        let broadcaster = NotificationBroadcaster::default();
        let converter = RemoteNotificationConverter::new(broadcaster.clone());

        assert_eq!(converter.convert(&json!({ "alert": "hello" })), None);
        assert_eq!(converter.convert(&json!({ "notification": "" })), None);
        assert_eq!(broadcaster.stats().notifications, 0);
    }
}
