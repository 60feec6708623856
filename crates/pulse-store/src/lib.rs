//! The authoritative notification store.
//!
//! Owns notifications and their child delivery records, enforces the
//! status lifecycle, and derives an always-fresh statistics snapshot.
//! Every mutation emits a [`StoreEvent`] on a broadcast channel that
//! feeds the sync layer.

pub mod event;
pub mod filter;
pub mod group;
pub mod stats;
pub mod store;

pub use event::StoreEvent;
pub use filter::NotificationFilter;
pub use group::{GroupBy, NotificationGroup};
pub use stats::NotificationStats;
pub use store::NotificationStore;
