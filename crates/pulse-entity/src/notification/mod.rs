//! Notification domain entities.

pub mod action;
pub mod model;
pub mod types;

pub use action::{ActionKind, NotificationAction};
pub use model::{Notification, NotificationMetadata};
pub use types::{Channel, NotificationStatus, NotificationType, Priority};
