//! Policy model and persistence
//!
//! A [`PolicySet`] holds every group membership and every permission rule.
//! It is persisted as one unit through a [`PolicyAdapter`]: the engine loads
//! the whole set at startup and saves the whole set after each change.

pub mod sled_adapter;

pub use sled_adapter::{SledPolicyAdapter, POLICY_TREE};

use crate::action::ActionMatcher;
use crate::error::Result;
use crate::resource::ResourcePattern;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Allow rule binding a subject or group to a resource pattern and verbs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionRule {
    pub subject: String,
    pub resource: ResourcePattern,
    pub action: ActionMatcher,
}

impl PermissionRule {
    pub fn new(subject: impl Into<String>, resource: ResourcePattern, action: ActionMatcher) -> Self {
        Self {
            subject: subject.into(),
            resource,
            action,
        }
    }

    /// `path` must already be canonical
    pub fn matches(&self, path: &str, method: &str) -> bool {
        self.resource.matches(path) && self.action.matches(method)
    }
}

/// Complete policy state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    /// subject -> groups it is a direct member of
    pub memberships: BTreeMap<String, BTreeSet<String>>,
    /// Allow rules in insertion order
    pub rules: Vec<PermissionRule>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the membership already existed
    pub fn add_membership(&mut self, subject: &str, group: &str) -> bool {
        self.memberships
            .entry(subject.to_string())
            .or_default()
            .insert(group.to_string())
    }

    /// Remove one membership. If `group` is left without members it is
    /// deleted along with its rules.
    pub fn remove_membership(&mut self, subject: &str, group: &str) -> bool {
        let removed = match self.memberships.get_mut(subject) {
            Some(groups) => {
                let removed = groups.remove(group);
                if groups.is_empty() {
                    self.memberships.remove(subject);
                }
                removed
            }
            None => false,
        };

        if removed && self.members_of(group).is_empty() {
            self.remove_group(group);
        }
        removed
    }

    /// Remove every membership into `group` and every rule scoped to it
    pub fn remove_group(&mut self, group: &str) -> bool {
        let mut changed = false;

        self.memberships.retain(|_, groups| {
            changed |= groups.remove(group);
            !groups.is_empty()
        });

        let before = self.rules.len();
        self.rules.retain(|rule| rule.subject != group);
        changed |= self.rules.len() != before;

        changed
    }

    /// Returns false if an identical rule already existed
    pub fn add_rule(&mut self, rule: PermissionRule) -> bool {
        if self.rules.contains(&rule) {
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn remove_rule(&mut self, rule: &PermissionRule) -> bool {
        let before = self.rules.len();
        self.rules.retain(|existing| existing != rule);
        self.rules.len() != before
    }

    /// Direct members of `group`, ordered
    pub fn members_of(&self, group: &str) -> Vec<String> {
        self.memberships
            .iter()
            .filter(|(_, groups)| groups.contains(group))
            .map(|(subject, _)| subject.clone())
            .collect()
    }

    /// Every group that has at least one member
    pub fn groups(&self) -> BTreeSet<String> {
        self.memberships.values().flatten().cloned().collect()
    }

    /// Every subject that is a member of some group
    pub fn users(&self) -> BTreeSet<String> {
        self.memberships.keys().cloned().collect()
    }

    /// Every subject or group named by a rule
    pub fn subjects(&self) -> BTreeSet<String> {
        self.rules.iter().map(|rule| rule.subject.clone()).collect()
    }

    /// (subject, group) pairs
    pub fn role_map(&self) -> Vec<(String, String)> {
        self.memberships
            .iter()
            .flat_map(|(subject, groups)| {
                groups
                    .iter()
                    .map(move |group| (subject.clone(), group.clone()))
            })
            .collect()
    }
}

/// Load-all / save-all persistence for a [`PolicySet`]
#[async_trait]
pub trait PolicyAdapter: Send + Sync {
    /// Load the stored policy; an empty set if nothing has been saved
    async fn load(&self) -> Result<PolicySet>;

    /// Replace the stored policy
    async fn save(&self, policy: &PolicySet) -> Result<()>;
}

/// In-memory policy adapter
pub struct MemoryPolicyAdapter {
    policy: Arc<RwLock<PolicySet>>,
}

impl MemoryPolicyAdapter {
    pub fn new() -> Self {
        Self::with_policy(PolicySet::new())
    }

    pub fn with_policy(policy: PolicySet) -> Self {
        Self {
            policy: Arc::new(RwLock::new(policy)),
        }
    }
}

impl Default for MemoryPolicyAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PolicyAdapter for MemoryPolicyAdapter {
    async fn load(&self) -> Result<PolicySet> {
        Ok(self.policy.read().await.clone())
    }

    async fn save(&self, policy: &PolicySet) -> Result<()> {
        *self.policy.write().await = policy.clone();
        Ok(())
    }
}
