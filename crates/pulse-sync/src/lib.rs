//! The client-facing sync channel.
//!
//! Keeps a remote client's view of the notification store eventually
//! consistent under unreliable connectivity: a persistent push channel
//! with a linear-backoff reconnect state machine, a polling fallback
//! that fires only while disconnected, and one idempotent reconciler
//! both paths merge through.

pub mod client;
pub mod envelope;
pub mod reconciler;
pub mod state;
pub mod transport;

pub use client::SyncClient;
pub use envelope::SyncEvent;
pub use reconciler::LocalView;
pub use state::ConnectionState;
pub use transport::{FetchTransport, Mutation, PushTransport, StoreTransport};
