//! The Pulse delivery engine.
//!
//! Turns incoming events into notifications: rules route and escalate,
//! the quiet-hours gate defers, and the dispatcher drives per-channel
//! delivery attempts with bounded exponential-backoff retries.

pub mod channel;
pub mod dedup;
pub mod dispatcher;
pub mod evaluator;
pub mod event;
pub mod gate;
pub mod providers;
pub mod runner;
pub mod template;

pub use channel::{ChannelError, ChannelRegistry, ChannelSender};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use evaluator::{Evaluation, RuleEvaluator};
pub use event::Event;
pub use gate::{GateDecision, QuietHoursGate};
pub use providers::{MemoryPreferences, MemoryRules, PreferenceProvider, RuleProvider};
pub use runner::DispatcherRunner;
