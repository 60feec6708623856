//! Shared type definitions.

pub mod id;

pub use id::{DeliveryId, NotificationId, RuleId, TenantId, UserId};
