//! # Notification Events
//!
//! Process-wide publish/subscribe for classified failures.
//!
//! - [`catalog`]: the fixed set of notification names consumers subscribe to
//! - [`broadcaster`]: the synchronous, multi-consumer [`NotificationBroadcaster`]
//! - [`remote`]: turns remote push payloads into local notifications

pub mod broadcaster;
pub mod catalog;
pub mod remote;

pub use broadcaster::{
    BroadcasterStats, CloudNotification, NotificationBody, NotificationBroadcaster,
    NotificationCallback, SubscriptionId,
};
pub use catalog::{names_for, NotificationName};
pub use remote::RemoteNotificationConverter;
