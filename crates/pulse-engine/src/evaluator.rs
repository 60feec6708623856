//! Rule evaluation against incoming events.

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing;

use pulse_entity::{CombineLogic, ConditionOp, Rule, RuleAction, RuleCondition};

use crate::event::Event;

/// The outcome of evaluating an event against a rule set.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// The cumulative, ordered action list from every matching rule.
    Actions(Vec<RuleAction>),
    /// A matched rule emitted `suppress`; delivery is skipped entirely.
    Suppressed {
        /// Operator-facing reason, if the rule carried one.
        reason: Option<String>,
    },
}

/// Matches events against a tenant's rules.
///
/// Evaluation is deterministic: the same event against the same rule
/// set always yields the same action list in the same order.
#[derive(Debug, Default)]
pub struct RuleEvaluator;

impl RuleEvaluator {
    /// Evaluate `event` against `rules` at the given moment.
    ///
    /// All matching rules contribute their actions, in descending rule
    /// priority (ties broken by the slice's insertion order), to one
    /// cumulative list. A `suppress` action is terminal: accumulation
    /// stops and the event is dropped.
    pub fn evaluate(&self, rules: &[Rule], event: &Event, now: DateTime<Utc>) -> Evaluation {
        // Stable sort keeps insertion order for equal priorities.
        let mut ordered: Vec<&Rule> = rules.iter().filter(|r| r.is_evaluable_at(now)).collect();
        ordered.sort_by_key(|r| std::cmp::Reverse(r.priority));

        let mut actions = Vec::new();
        for rule in ordered {
            if !self.rule_matches(rule, event) {
                continue;
            }
            tracing::debug!(rule = %rule.name, "Rule matched");
            for action in &rule.actions {
                if let RuleAction::Suppress { reason } = action {
                    tracing::debug!(rule = %rule.name, "Suppress action is terminal");
                    return Evaluation::Suppressed {
                        reason: reason.clone(),
                    };
                }
                actions.push(action.clone());
            }
        }
        Evaluation::Actions(actions)
    }

    /// Whether a single rule's condition list holds for the event.
    fn rule_matches(&self, rule: &Rule, event: &Event) -> bool {
        match rule.logic {
            CombineLogic::And => rule
                .conditions
                .iter()
                .all(|c| condition_holds(c, event)),
            CombineLogic::Or => rule
                .conditions
                .iter()
                .any(|c| condition_holds(c, event)),
        }
    }
}

/// Evaluate one condition against the event.
///
/// An unknown field is "not satisfied" for every operator except
/// `ne`/`nin`. A malformed condition (type-incompatible comparison,
/// bad regex) evaluates false and is logged; it never aborts the
/// evaluation of other rules.
fn condition_holds(condition: &RuleCondition, event: &Event) -> bool {
    let field_value = match event.get(&condition.field) {
        Some(v) => v,
        None => {
            return matches!(condition.op, ConditionOp::Ne | ConditionOp::Nin);
        }
    };

    match condition.op {
        ConditionOp::Eq => values_equal(field_value, &condition.value),
        ConditionOp::Ne => !values_equal(field_value, &condition.value),
        ConditionOp::Gt => compare(condition, field_value, |o| o.is_gt()),
        ConditionOp::Gte => compare(condition, field_value, |o| o.is_ge()),
        ConditionOp::Lt => compare(condition, field_value, |o| o.is_lt()),
        ConditionOp::Lte => compare(condition, field_value, |o| o.is_le()),
        ConditionOp::In => list_contains(condition, field_value),
        ConditionOp::Nin => !list_contains(condition, field_value),
        ConditionOp::Contains => contains(condition, field_value),
        ConditionOp::Matches => regex_matches(condition, field_value),
    }
}

/// Equality with numeric coercion (`5` equals `5.0`).
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordered comparison over numbers, or lexicographic over strings.
fn compare(
    condition: &RuleCondition,
    field_value: &Value,
    check: impl Fn(std::cmp::Ordering) -> bool,
) -> bool {
    let ordering = match (field_value, &condition.value) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (field_value.as_f64(), condition.value.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => None,
        },
    };
    match ordering {
        Some(o) => check(o),
        None => {
            tracing::warn!(
                field = %condition.field,
                op = %condition.op,
                "Malformed condition: type-incompatible comparison"
            );
            false
        }
    }
}

/// Membership of the field value in the condition's list value.
fn list_contains(condition: &RuleCondition, field_value: &Value) -> bool {
    match condition.value.as_array() {
        Some(list) => list.iter().any(|v| values_equal(field_value, v)),
        None => {
            tracing::warn!(
                field = %condition.field,
                op = %condition.op,
                "Malformed condition: value is not a list"
            );
            false
        }
    }
}

/// Substring containment for strings, element containment for lists.
fn contains(condition: &RuleCondition, field_value: &Value) -> bool {
    match field_value {
        Value::String(haystack) => match condition.value.as_str() {
            Some(needle) => haystack.contains(needle),
            None => {
                tracing::warn!(
                    field = %condition.field,
                    "Malformed condition: contains needle is not a string"
                );
                false
            }
        },
        Value::Array(items) => items.iter().any(|v| values_equal(v, &condition.value)),
        _ => false,
    }
}

/// Regular-expression match over string fields.
fn regex_matches(condition: &RuleCondition, field_value: &Value) -> bool {
    let (haystack, pattern) = match (field_value.as_str(), condition.value.as_str()) {
        (Some(h), Some(p)) => (h, p),
        _ => return false,
    };
    match regex::Regex::new(pattern) {
        Ok(re) => re.is_match(haystack),
        Err(e) => {
            tracing::warn!(
                field = %condition.field,
                pattern,
                "Malformed condition: invalid regex: {e}"
            );
            false
        }
    }
}
