//! # Notification Broadcaster
//!
//! Publishes classified failures to every interested consumer without the
//! resilience core knowing who they are.
//!
//! ## Delivery guarantees
//!
//! - **Synchronous**: [`NotificationBroadcaster::announce`] returns only after
//!   every callback registered at call time has run.
//! - **Snapshot**: the consumer list is copied before delivery, so callbacks
//!   may subscribe or unsubscribe without deadlocking; changes apply to the
//!   next announcement.
//! - **Unordered across consumers**: consumers must not rely on running
//!   before or after each other.
//! - Async consumers can additionally take a [`broadcast::Receiver`] through
//!   [`NotificationBroadcaster::subscribe_channel`]; the send happens inside
//!   `announce` and never blocks.

use super::catalog::{names_for, NotificationName};
use crate::orchestration::{ErrorCategory, ErrorClassification};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::constants::DEFAULT_NOTIFICATION_CAPACITY;

/// Consumer callback
pub type NotificationCallback = Arc<dyn Fn(&CloudNotification) + Send + Sync>;

/// Token returned by subscribe, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SubscriptionId(u64);

/// What a notification carries
#[derive(Debug, Clone)]
pub enum NotificationBody {
    /// A classified remote failure
    Classified(Box<ErrorClassification>),
    /// Free-form payload from a notify operation or a remote push
    Payload(Value),
}

/// One delivered notification
#[derive(Debug, Clone)]
pub struct CloudNotification {
    pub name: NotificationName,
    pub body: NotificationBody,
    pub posted_at: DateTime<Utc>,
}

impl CloudNotification {
    /// Category of a classified failure, so consumers can filter without the raw error
    pub fn category(&self) -> Option<ErrorCategory> {
        match &self.body {
            NotificationBody::Classified(classification) => Some(classification.category),
            NotificationBody::Payload(_) => None,
        }
    }

    pub fn classification(&self) -> Option<&ErrorClassification> {
        match &self.body {
            NotificationBody::Classified(classification) => Some(classification.as_ref()),
            NotificationBody::Payload(_) => None,
        }
    }

    pub fn payload(&self) -> Option<&Value> {
        match &self.body {
            NotificationBody::Payload(payload) => Some(payload),
            NotificationBody::Classified(_) => None,
        }
    }
}

/// Counters for observability
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BroadcasterStats {
    /// Calls to `announce`
    pub announcements: u64,
    /// Individual notifications posted (several per announcement)
    pub notifications: u64,
    /// Callback invocations
    pub deliveries: u64,
}

struct Subscriber {
    id: SubscriptionId,
    filter: Option<NotificationName>,
    callback: NotificationCallback,
}

struct BroadcasterInner {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
    sender: broadcast::Sender<CloudNotification>,
    announcements: AtomicU64,
    notifications: AtomicU64,
    deliveries: AtomicU64,
}

/// Process-wide notification channel, cheap to clone and share between queues
#[derive(Clone)]
pub struct NotificationBroadcaster {
    inner: Arc<BroadcasterInner>,
}

impl NotificationBroadcaster {
    /// Create a broadcaster whose async channel buffers `capacity` notifications
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            inner: Arc::new(BroadcasterInner {
                subscribers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
                sender,
                announcements: AtomicU64::new(0),
                notifications: AtomicU64::new(0),
                deliveries: AtomicU64::new(0),
            }),
        }
    }

    /// Call `callback` for every notification posted under `name`
    pub fn subscribe<F>(&self, name: NotificationName, callback: F) -> SubscriptionId
    where
        F: Fn(&CloudNotification) + Send + Sync + 'static,
    {
        self.register(Some(name), Arc::new(callback))
    }

    /// Call `callback` for every notification
    pub fn subscribe_all<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CloudNotification) + Send + Sync + 'static,
    {
        self.register(None, Arc::new(callback))
    }

    fn register(&self, filter: Option<NotificationName>, callback: NotificationCallback) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        debug!(subscription = id.0, filter = ?filter, "Notification consumer registered");
        self.inner.subscribers.write().push(Subscriber {
            id,
            filter,
            callback,
        });
        id
    }

    /// Remove a consumer. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.inner.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|subscriber| subscriber.id != id);
        before != subscribers.len()
    }

    /// Receive every notification on an async channel
    pub fn subscribe_channel(&self) -> broadcast::Receiver<CloudNotification> {
        self.inner.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }

    /// Publish a classification under every name of its category.
    ///
    /// Returns the number of callback invocations.
    pub fn announce(&self, classification: &ErrorClassification) -> usize {
        self.inner.announcements.fetch_add(1, Ordering::Relaxed);

        let names = names_for(classification.category);
        info!(
            category = %classification.category,
            operation_id = %classification.operation.id,
            operation_name = %classification.operation.name,
            error_code = %classification.error.code,
            names = names.len(),
            "Announcing classified remote error"
        );

        let body = NotificationBody::Classified(Box::new(classification.clone()));
        names
            .into_iter()
            .map(|name| self.deliver(name, body.clone()))
            .sum()
    }

    /// Post a classification under one extra name, e.g. [`NotificationName::UNRECOVERED`]
    pub fn announce_as(&self, name: NotificationName, classification: &ErrorClassification) -> usize {
        self.deliver(name, NotificationBody::Classified(Box::new(classification.clone())))
    }

    /// Post a free-form payload under `name`
    pub fn post(&self, name: NotificationName, payload: Value) -> usize {
        self.deliver(name, NotificationBody::Payload(payload))
    }

    fn deliver(&self, name: NotificationName, body: NotificationBody) -> usize {
        let notification = CloudNotification {
            name,
            body,
            posted_at: Utc::now(),
        };

        let targets: Vec<NotificationCallback> = self
            .inner
            .subscribers
            .read()
            .iter()
            .filter(|subscriber| {
                subscriber
                    .filter
                    .as_ref()
                    .map_or(true, |filter| *filter == notification.name)
            })
            .map(|subscriber| subscriber.callback.clone())
            .collect();

        for callback in &targets {
            callback(&notification);
        }

        self.inner.notifications.fetch_add(1, Ordering::Relaxed);
        self.inner
            .deliveries
            .fetch_add(targets.len() as u64, Ordering::Relaxed);

        // No channel receivers is fine: notifications are fire-and-forget
        let _ = self.inner.sender.send(notification);

        targets.len()
    }

    pub fn stats(&self) -> BroadcasterStats {
        BroadcasterStats {
            announcements: self.inner.announcements.load(Ordering::Relaxed),
            notifications: self.inner.notifications.load(Ordering::Relaxed),
            deliveries: self.inner.deliveries.load(Ordering::Relaxed),
        }
    }
}

impl Default for NotificationBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_CAPACITY)
    }
}

impl fmt::Debug for NotificationBroadcaster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotificationBroadcaster")
            .field("subscribers", &self.subscriber_count())
            .field("stats", &self.stats())
            .finish()
    }
}
