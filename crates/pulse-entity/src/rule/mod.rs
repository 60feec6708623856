//! Routing rule domain entities.

pub mod action;
pub mod condition;
pub mod model;
pub mod schedule;

pub use action::RuleAction;
pub use condition::{CombineLogic, ConditionOp, RuleCondition};
pub use model::Rule;
pub use schedule::{RuleSchedule, TimeRange};
