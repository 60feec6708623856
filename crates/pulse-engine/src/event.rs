//! Flat event representation consumed by the rule evaluator.

use std::collections::HashMap;

use serde_json::Value;

use pulse_entity::Notification;

/// A flat field/value map derived from a draft notification plus any
/// source-system payload fields.
#[derive(Debug, Clone, Default)]
pub struct Event {
    fields: HashMap<String, Value>,
}

impl Event {
    /// Create an empty event.
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive the standard fields from a draft notification.
    pub fn from_notification(notification: &Notification) -> Self {
        let mut event = Self::new();
        event.insert("type", Value::from(notification.kind.as_str()));
        event.insert("priority", Value::from(notification.priority.as_str()));
        event.insert("title", Value::from(notification.title.clone()));
        event.insert("message", Value::from(notification.message.clone()));
        event.insert("recipient", Value::from(notification.recipient.to_string()));
        event.insert("tenant", Value::from(notification.tenant_id.to_string()));
        if let Some(meta) = &notification.metadata {
            if let Some(source) = &meta.source {
                event.insert("source", Value::from(source.clone()));
            }
            if let Some(entity) = &meta.related_entity {
                event.insert("related_entity", Value::from(entity.clone()));
            }
            if !meta.tags.is_empty() {
                event.insert("tags", Value::from(meta.tags.clone()));
            }
        }
        event
    }

    /// Set a field.
    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.fields.insert(field.into(), value);
    }

    /// Set a field, builder-style.
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.insert(field, value);
        self
    }

    /// Read a field.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Iterate over all fields.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}
