//! Transitive group resolution with caching
//!
//! Groups may themselves be members of groups. Resolution walks the
//! membership graph breadth-first with a visited set, so cycles terminate.
//! Results are cached per subject in a [`DashMap`] and the whole cache is
//! dropped whenever the policy changes.

use crate::policy::PolicySet;
use dashmap::DashMap;
use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

pub struct GroupResolver {
    cache: Option<DashMap<String, Arc<BTreeSet<String>>>>,
}

impl GroupResolver {
    pub fn new(enable_cache: bool) -> Self {
        Self {
            cache: enable_cache.then(DashMap::new),
        }
    }

    /// All groups `subject` belongs to, directly or through other groups.
    /// The subject itself is never included.
    pub fn resolve(&self, subject: &str, policy: &PolicySet) -> Arc<BTreeSet<String>> {
        if let Some(cache) = &self.cache {
            if let Some(groups) = cache.get(subject) {
                return groups.clone();
            }
        }

        let groups = Arc::new(Self::walk(subject, policy));

        if let Some(cache) = &self.cache {
            cache.insert(subject.to_string(), groups.clone());
        }
        groups
    }

    pub fn invalidate(&self) {
        if let Some(cache) = &self.cache {
            cache.clear();
        }
    }

    pub fn cached_subjects(&self) -> usize {
        self.cache.as_ref().map(|cache| cache.len()).unwrap_or(0)
    }

    fn walk(subject: &str, policy: &PolicySet) -> BTreeSet<String> {
        let mut groups = BTreeSet::new();
        let mut queue = VecDeque::from([subject.to_string()]);

        while let Some(current) = queue.pop_front() {
            let Some(direct) = policy.memberships.get(&current) else {
                continue;
            };
            for group in direct {
                if group != subject && groups.insert(group.clone()) {
                    queue.push_back(group.clone());
                }
            }
        }

        groups
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitive_resolution() {
        let mut policy = PolicySet::new();
        policy.add_membership("alice", "dev");
        policy.add_membership("dev", "staff");
        policy.add_membership("staff", "everyone");

        let resolver = GroupResolver::new(true);
        let groups = resolver.resolve("alice", &policy);
        assert_eq!(
            groups.iter().cloned().collect::<Vec<_>>(),
            vec!["dev", "everyone", "staff"]
        );
        assert!(resolver.resolve("nobody", &policy).is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        let mut policy = PolicySet::new();
        policy.add_membership("a", "b");
        policy.add_membership("b", "c");
        policy.add_membership("c", "a");

        let groups = GroupResolver::new(false).resolve("a", &policy);
        assert_eq!(groups.len(), 2);
        assert!(!groups.contains("a"));
    }

    #[test]
    fn test_invalidate_clears_cache() {
        let mut policy = PolicySet::new();
        policy.add_membership("alice", "dev");

        let resolver = GroupResolver::new(true);
        resolver.resolve("alice", &policy);
        assert_eq!(resolver.cached_subjects(), 1);

        resolver.invalidate();
        assert_eq!(resolver.cached_subjects(), 0);
        assert_eq!(GroupResolver::new(false).cached_subjects(), 0);
    }
}
