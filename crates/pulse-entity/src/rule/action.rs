//! Rule action variants.

use serde::{Deserialize, Serialize};

use crate::notification::{Channel, Priority};

/// An action emitted by a matching rule.
///
/// Modeled as a closed tagged union so the dispatcher's handling is
/// exhaustive and compiler-checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RuleAction {
    /// Route the notification to the given channels.
    Route {
        /// Channels to deliver on.
        channels: Vec<Channel>,
    },
    /// Raise priority and/or add channels after initial routing.
    ///
    /// Escalation never lowers an already-higher priority.
    Escalate {
        /// New priority floor, if any.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        priority: Option<Priority>,
        /// Additional channels to union into the route set.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        add_channels: Vec<Channel>,
    },
    /// Drop the notification entirely. Terminal: no lower-priority
    /// rule's actions apply once a suppress is emitted.
    Suppress {
        /// Optional operator-facing reason.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// Rewrite title and/or message using `{{placeholder}}` templates
    /// resolved from event data.
    Transform {
        /// Replacement title template.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        /// Replacement message template.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// Defer the entire dispatch to a future time.
    Delay {
        /// Seconds to wait before dispatching.
        seconds: u64,
    },
}
