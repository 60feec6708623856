//! Domain entities for the Pulse notification platform.
//!
//! Notifications and deliveries are owned by the notification store;
//! rules and preferences are tenant/user configuration and read-only
//! to the delivery engine during evaluation.

pub mod delivery;
pub mod notification;
pub mod preference;
pub mod rule;

pub use delivery::{Delivery, DeliveryStatus, RetryPolicy};
pub use notification::{
    ActionKind, Channel, Notification, NotificationAction, NotificationMetadata,
    NotificationStatus, NotificationType, Priority,
};
pub use preference::{DigestCadence, Preference, QuietHours, TypePreference};
pub use rule::{CombineLogic, ConditionOp, Rule, RuleAction, RuleCondition, RuleSchedule};
