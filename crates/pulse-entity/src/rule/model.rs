//! Routing rule entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pulse_core::types::{RuleId, TenantId};

use super::action::RuleAction;
use super::condition::{CombineLogic, RuleCondition};
use super::schedule::RuleSchedule;

/// A tenant-scoped routing rule.
///
/// Rules are evaluated in descending `priority` order; ties are broken
/// by insertion order. A rule with zero conditions never matches, so an
/// accidentally empty rule cannot swallow all events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Unique rule identifier.
    pub id: RuleId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Human-readable rule name.
    pub name: String,
    /// Whether the rule participates in evaluation.
    pub enabled: bool,
    /// Evaluation priority; higher is evaluated first.
    pub priority: i32,
    /// Ordered condition list.
    pub conditions: Vec<RuleCondition>,
    /// How conditions combine (AND/OR over the whole list).
    #[serde(default)]
    pub logic: CombineLogic,
    /// Ordered action list applied when the rule matches.
    pub actions: Vec<RuleAction>,
    /// Optional activation schedule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<RuleSchedule>,
    /// When the rule was created.
    pub created_at: DateTime<Utc>,
}

impl Rule {
    /// Create a new enabled rule with default priority.
    pub fn new(tenant_id: TenantId, name: impl Into<String>) -> Self {
        Self {
            id: RuleId::new(),
            tenant_id,
            name: name.into(),
            enabled: true,
            priority: 0,
            conditions: Vec::new(),
            logic: CombineLogic::And,
            actions: Vec::new(),
            schedule: None,
            created_at: Utc::now(),
        }
    }

    /// Set the evaluation priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the condition list.
    pub fn with_conditions(mut self, conditions: Vec<RuleCondition>) -> Self {
        self.conditions = conditions;
        self
    }

    /// Set the combination logic.
    pub fn with_logic(mut self, logic: CombineLogic) -> Self {
        self.logic = logic;
        self
    }

    /// Set the action list.
    pub fn with_actions(mut self, actions: Vec<RuleAction>) -> Self {
        self.actions = actions;
        self
    }

    /// Set the activation schedule.
    pub fn with_schedule(mut self, schedule: RuleSchedule) -> Self {
        self.schedule = Some(schedule);
        self
    }

    /// Whether the rule can match at all at the given moment.
    ///
    /// Disabled rules and rules with an empty condition list never
    /// match; rules outside their schedule are inactive.
    pub fn is_evaluable_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled || self.conditions.is_empty() {
            return false;
        }
        match &self.schedule {
            Some(schedule) => schedule.is_active_at(now),
            None => true,
        }
    }
}
