//! Role/group based permission engine
//!
//! Holds the current [`PolicySet`] behind a reader/writer lock. Any number of
//! `authorize` calls run concurrently; mutations are serialized against each
//! other and against readers.
//!
//! # Mutation
//!
//! ```text
//! write lock → clone policy → apply change → adapter.save(clone) → publish
//! ```
//!
//! The change is published only after the save succeeds, so a failed save
//! leaves the engine exactly as it was, and a caller that gets `Ok` back
//! observes its own write on the next read.

pub mod resolver;

pub use resolver::GroupResolver;

use crate::action::ActionMatcher;
use crate::error::{AuthzError, Result};
use crate::policy::{MemoryPolicyAdapter, PermissionRule, PolicyAdapter, PolicySet};
use crate::resource::{is_canonical_path, ResourcePattern};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

/// Permission engine configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Cache transitive group resolution per subject
    pub cache_group_resolution: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_group_resolution: true,
        }
    }
}

pub struct PermissionEngine {
    policy: RwLock<PolicySet>,
    adapter: Arc<dyn PolicyAdapter>,
    resolver: GroupResolver,
}

impl PermissionEngine {
    /// Create an engine with the policy currently stored in `adapter`
    pub async fn new(adapter: Arc<dyn PolicyAdapter>) -> Result<Self> {
        Self::with_config(EngineConfig::default(), adapter).await
    }

    pub async fn with_config(config: EngineConfig, adapter: Arc<dyn PolicyAdapter>) -> Result<Self> {
        let policy = adapter.load().await?;

        info!(
            memberships = policy.memberships.len(),
            rules = policy.rules.len(),
            cache = config.cache_group_resolution,
            "PermissionEngine initialized"
        );

        Ok(Self {
            policy: RwLock::new(policy),
            adapter,
            resolver: GroupResolver::new(config.cache_group_resolution),
        })
    }

    /// Engine with nothing persisted beyond the process
    pub async fn in_memory() -> Result<Self> {
        Self::new(Arc::new(MemoryPolicyAdapter::new())).await
    }

    /// Add `subject` to `group`, creating the group if needed.
    /// Returns false if the membership already existed.
    pub async fn add_subject_to_role(&self, subject: &str, group: &str) -> Result<bool> {
        require_name("subject", subject)?;
        require_name("group", group)?;

        self.apply("add_subject_to_role", |policy| {
            policy.add_membership(subject, group)
        })
        .await
    }

    pub async fn add_user_to_group(&self, user: &str, group: &str) -> Result<bool> {
        self.add_subject_to_role(user, group).await
    }

    /// Remove a membership. Removing the last member deletes the group and
    /// its rules. Returns false if there was no such membership.
    pub async fn delete_subject_from_role(&self, subject: &str, group: &str) -> Result<bool> {
        self.apply("delete_subject_from_role", |policy| {
            policy.remove_membership(subject, group)
        })
        .await
    }

    /// Remove a group, all memberships into it and all rules scoped to it
    pub async fn delete_group(&self, group: &str) -> Result<bool> {
        self.apply("delete_group", |policy| policy.remove_group(group))
            .await
    }

    /// Allow `subject` (a user, API user or group) the given verbs on
    /// `resource`. Returns false if the identical rule already existed.
    pub async fn add_permission<S: AsRef<str> + Sync>(
        &self,
        subject: &str,
        resource: &str,
        actions: &[S],
    ) -> Result<bool> {
        let rule = build_rule(subject, resource, actions)?;

        self.apply("add_permission", move |policy| policy.add_rule(rule))
            .await
    }

    /// Remove the rule matching exactly. Returns false if none did.
    pub async fn delete_permission<S: AsRef<str> + Sync>(
        &self,
        subject: &str,
        resource: &str,
        actions: &[S],
    ) -> Result<bool> {
        let rule = build_rule(subject, resource, actions)?;

        self.apply("delete_permission", move |policy| policy.remove_rule(&rule))
            .await
    }

    /// True iff a rule bound to `subject`, or to a group it belongs to
    /// directly or transitively, matches both `resource` and `action`.
    ///
    /// `resource` must already be canonical (see [`is_canonical_path`]);
    /// dot segments or doubled slashes deny rather than being rewritten.
    pub async fn authorize(&self, subject: &str, resource: &str, action: &str) -> bool {
        if subject.is_empty() {
            return false;
        }
        if !is_canonical_path(resource) {
            debug!(subject, resource, "Denied non-canonical resource");
            return false;
        }

        let policy = self.policy.read().await;
        let groups = self.resolver.resolve(subject, &policy);

        let allowed = policy.rules.iter().any(|rule| {
            (rule.subject == subject || groups.contains(&rule.subject))
                && rule.matches(resource, action)
        });

        if !allowed {
            debug!(subject, resource, action, "No matching rule");
        }
        allowed
    }

    /// Every group with at least one member
    pub async fn groups(&self) -> Vec<String> {
        self.policy.read().await.groups().into_iter().collect()
    }

    /// Every subject with at least one membership
    pub async fn users(&self) -> Vec<String> {
        self.policy.read().await.users().into_iter().collect()
    }

    /// Every subject or group named by a rule
    pub async fn subjects(&self) -> Vec<String> {
        self.policy.read().await.subjects().into_iter().collect()
    }

    /// (subject, group) membership pairs
    pub async fn role_map(&self) -> Vec<(String, String)> {
        self.policy.read().await.role_map()
    }

    pub async fn permissions(&self) -> Vec<PermissionRule> {
        self.policy.read().await.rules.clone()
    }

    /// Direct members of `group`
    pub async fn members_of(&self, group: &str) -> Vec<String> {
        self.policy.read().await.members_of(group)
    }

    /// Groups `subject` belongs to, transitively
    pub async fn groups_for(&self, subject: &str) -> Vec<String> {
        let policy = self.policy.read().await;
        self.resolver
            .resolve(subject, &policy)
            .iter()
            .cloned()
            .collect()
    }

    /// Snapshot of the full policy
    pub async fn policy(&self) -> PolicySet {
        self.policy.read().await.clone()
    }

    /// Replace the in-memory policy with what the adapter holds
    pub async fn reload(&self) -> Result<()> {
        let mut policy = self.policy.write().await;
        *policy = self.adapter.load().await?;
        self.resolver.invalidate();
        info!(rules = policy.rules.len(), "Policy reloaded");
        Ok(())
    }

    async fn apply<F>(&self, operation: &'static str, change: F) -> Result<bool>
    where
        F: FnOnce(&mut PolicySet) -> bool,
    {
        let mut policy = self.policy.write().await;

        let mut next = policy.clone();
        if !change(&mut next) {
            debug!(operation, "Policy unchanged");
            return Ok(false);
        }

        if let Err(e) = self.adapter.save(&next).await {
            error!(operation, error = %e, "Failed to persist policy");
            return Err(e);
        }

        *policy = next;
        self.resolver.invalidate();

        info!(operation, rules = policy.rules.len(), "Policy updated");
        Ok(true)
    }
}

fn require_name(what: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(AuthzError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn build_rule<S: AsRef<str>>(subject: &str, resource: &str, actions: &[S]) -> Result<PermissionRule> {
    require_name("subject", subject)?;
    let resource = ResourcePattern::new(resource)?;
    let action = ActionMatcher::from_actions(actions)?;
    Ok(PermissionRule::new(subject, resource, action))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_direct_rule() {
        let engine = PermissionEngine::in_memory().await.unwrap();
        engine.add_permission("svc1", "/api/", &["GET"]).await.unwrap();

        assert!(engine.authorize("svc1", "/api/data", "GET").await);
        assert!(!engine.authorize("svc1", "/api/data", "POST").await);
        assert!(!engine.authorize("svc2", "/api/data", "GET").await);
        assert!(!engine.authorize("", "/api/data", "GET").await);
    }

    #[tokio::test]
    async fn test_idempotent_mutations_report_change() {
        let engine = PermissionEngine::in_memory().await.unwrap();
        assert!(engine.add_subject_to_role("root", "admin").await.unwrap());
        assert!(!engine.add_subject_to_role("root", "admin").await.unwrap());
        assert!(engine.add_permission("admin", "/", &["ALL"]).await.unwrap());
        assert!(!engine.add_permission("admin", "/", &["ALL"]).await.unwrap());
        assert!(engine.delete_permission("admin", "/", &["ALL"]).await.unwrap());
        assert!(!engine.delete_permission("admin", "/", &["ALL"]).await.unwrap());
    }

    #[tokio::test]
    async fn test_empty_names_rejected() {
        let engine = PermissionEngine::in_memory().await.unwrap();
        assert!(matches!(
            engine.add_subject_to_role("", "admin").await,
            Err(AuthzError::InvalidInput(_))
        ));
        assert!(matches!(
            engine.add_permission("", "/", &["GET"]).await,
            Err(AuthzError::InvalidInput(_))
        ));
    }
}
