//! Sled-backed policy persistence
//!
//! The whole [`PolicySet`] is stored as a single encoded value under one key
//! of the `policy` keyspace, so a save replaces the previous set atomically.

use super::{PolicyAdapter, PolicySet};
use crate::error::Result;
use async_trait::async_trait;
use gatehouse_core::codec;
use gatehouse_vault::CredentialStore;
use tracing::{debug, error};

/// Keyspace holding the policy snapshot
pub const POLICY_TREE: &str = "policy";

const SNAPSHOT_KEY: &[u8] = b"snapshot";

pub struct SledPolicyAdapter {
    tree: ::sled::Tree,
}

impl SledPolicyAdapter {
    /// Store policy alongside the credentials
    pub fn new(store: &CredentialStore) -> Result<Self> {
        Ok(Self::from_tree(store.open_tree(POLICY_TREE)?))
    }

    pub fn from_tree(tree: ::sled::Tree) -> Self {
        Self { tree }
    }
}

#[async_trait]
impl PolicyAdapter for SledPolicyAdapter {
    async fn load(&self) -> Result<PolicySet> {
        let Some(bytes) = self.tree.get(SNAPSHOT_KEY)? else {
            debug!("No stored policy, starting empty");
            return Ok(PolicySet::new());
        };

        let policy: PolicySet = codec::decode(&bytes).map_err(|e| {
            error!(error = %e, "Stored policy could not be decoded");
            e
        })?;

        debug!(
            memberships = policy.memberships.len(),
            rules = policy.rules.len(),
            "Policy loaded"
        );
        Ok(policy)
    }

    async fn save(&self, policy: &PolicySet) -> Result<()> {
        let bytes = codec::encode(policy)?;
        self.tree.insert(SNAPSHOT_KEY, bytes)?;
        self.tree.flush_async().await?;
        Ok(())
    }
}
