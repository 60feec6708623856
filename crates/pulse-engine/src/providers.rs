//! Read-only configuration providers consumed during dispatch.
//!
//! Rules and preferences are owned by tenant/user configuration; the
//! engine sees them through these seams. In-memory implementations
//! cover tests and single-node deployments; a durable deployment backs
//! them with its persistence layer.

use async_trait::async_trait;
use dashmap::DashMap;

use pulse_core::result::AppResult;
use pulse_core::types::{TenantId, UserId};
use pulse_entity::{Preference, Rule};

/// Supplies the enabled rules of a tenant.
#[async_trait]
pub trait RuleProvider: Send + Sync + std::fmt::Debug {
    /// All rules of the tenant, in insertion order.
    async fn rules_for(&self, tenant: TenantId) -> AppResult<Vec<Rule>>;
}

/// Supplies per-user delivery preferences.
#[async_trait]
pub trait PreferenceProvider: Send + Sync + std::fmt::Debug {
    /// The user's preference, or defaults when none is stored.
    async fn preferences(&self, user: UserId) -> AppResult<Preference>;
}

/// In-memory rule provider.
#[derive(Debug, Default)]
pub struct MemoryRules {
    rules: DashMap<TenantId, Vec<Rule>>,
}

impl MemoryRules {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rule for its tenant.
    pub fn add(&self, rule: Rule) {
        self.rules.entry(rule.tenant_id).or_default().push(rule);
    }

    /// Replace a tenant's rule set.
    pub fn set(&self, tenant: TenantId, rules: Vec<Rule>) {
        self.rules.insert(tenant, rules);
    }
}

#[async_trait]
impl RuleProvider for MemoryRules {
    async fn rules_for(&self, tenant: TenantId) -> AppResult<Vec<Rule>> {
        Ok(self
            .rules
            .get(&tenant)
            .map(|r| r.clone())
            .unwrap_or_default())
    }
}

/// In-memory preference provider.
#[derive(Debug, Default)]
pub struct MemoryPreferences {
    preferences: DashMap<UserId, Preference>,
}

impl MemoryPreferences {
    /// Create an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a user's preference.
    pub fn set(&self, preference: Preference) {
        self.preferences.insert(preference.user_id, preference);
    }
}

#[async_trait]
impl PreferenceProvider for MemoryPreferences {
    async fn preferences(&self, user: UserId) -> AppResult<Preference> {
        Ok(self
            .preferences
            .get(&user)
            .map(|p| p.clone())
            .unwrap_or_else(|| Preference::new(user)))
    }
}
