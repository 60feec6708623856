//! Rule condition types.

use serde::{Deserialize, Serialize};

/// Condition comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOp {
    /// Exact equality.
    Eq,
    /// Not equal.
    Ne,
    /// Greater than (numeric).
    Gt,
    /// Greater than or equal (numeric).
    Gte,
    /// Less than (numeric).
    Lt,
    /// Less than or equal (numeric).
    Lte,
    /// Membership in a list value.
    In,
    /// Non-membership in a list value.
    Nin,
    /// Substring or list-element containment.
    Contains,
    /// Regular-expression match.
    Matches,
}

impl ConditionOp {
    /// Return the operator as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Gt => "gt",
            Self::Gte => "gte",
            Self::Lt => "lt",
            Self::Lte => "lte",
            Self::In => "in",
            Self::Nin => "nin",
            Self::Contains => "contains",
            Self::Matches => "matches",
        }
    }
}

impl std::fmt::Display for ConditionOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How a rule's condition list is combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineLogic {
    /// Every condition must hold.
    #[default]
    And,
    /// At least one condition must hold.
    Or,
}

/// A single condition on a named event field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleCondition {
    /// The event field name to compare.
    pub field: String,
    /// The comparison operator.
    pub op: ConditionOp,
    /// The value to compare against.
    pub value: serde_json::Value,
}

impl RuleCondition {
    /// Create a new condition.
    pub fn new(field: impl Into<String>, op: ConditionOp, value: serde_json::Value) -> Self {
        Self {
            field: field.into(),
            op,
            value,
        }
    }
}
