//! HTTP verbs and action matchers
//!
//! A permission rule names the verbs it allows either symbolically
//! (`["GET", "POST"]`, `["ALL"]`) or, once stored, as a pattern string
//! (`(GET|POST)`, `.*`). [`ActionMatcher`] is the typed form of both.

use crate::error::{AuthzError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

/// Symbolic action meaning every verb
pub const ALL_ACTIONS: &str = "ALL";

/// Stored pattern for [`ActionMatcher::All`]
const ALL_PATTERN: &str = ".*";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum HttpVerb {
    Get,
    Head,
    Options,
    Patch,
    Post,
    Put,
    Delete,
}

impl HttpVerb {
    pub const ALL: [HttpVerb; 7] = [
        HttpVerb::Get,
        HttpVerb::Head,
        HttpVerb::Options,
        HttpVerb::Patch,
        HttpVerb::Post,
        HttpVerb::Put,
        HttpVerb::Delete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
        }
    }
}

impl FromStr for HttpVerb {
    type Err = AuthzError;

    /// Exact, case-sensitive match on the wire form of the verb
    fn from_str(s: &str) -> Result<Self> {
        HttpVerb::ALL
            .iter()
            .copied()
            .find(|verb| verb.as_str() == s)
            .ok_or_else(|| AuthzError::InvalidInput(format!("unknown HTTP verb: {}", s)))
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compiled set of verbs a rule allows. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ActionMatcher {
    All,
    Verbs(BTreeSet<HttpVerb>),
}

impl ActionMatcher {
    /// Convert a symbolic action set.
    ///
    /// `ALL` anywhere in the set yields [`ActionMatcher::All`]. Unknown verbs
    /// are skipped; a set with nothing left is `InvalidInput`.
    pub fn from_actions<S: AsRef<str>>(actions: &[S]) -> Result<Self> {
        let mut verbs = BTreeSet::new();

        for action in actions {
            let action = action.as_ref();
            if action == ALL_ACTIONS {
                return Ok(ActionMatcher::All);
            }
            match action.parse::<HttpVerb>() {
                Ok(verb) => {
                    verbs.insert(verb);
                }
                Err(_) => warn!(action, "Ignoring unknown action"),
            }
        }

        if verbs.is_empty() {
            return Err(AuthzError::InvalidInput(
                "action set must name at least one known verb".into(),
            ));
        }

        Ok(ActionMatcher::Verbs(verbs))
    }

    pub fn matches(&self, method: &str) -> bool {
        match self {
            ActionMatcher::All => true,
            ActionMatcher::Verbs(verbs) => method
                .parse::<HttpVerb>()
                .map(|verb| verbs.contains(&verb))
                .unwrap_or(false),
        }
    }

    /// Stored form: `.*` or `(GET|POST)`
    pub fn pattern(&self) -> String {
        match self {
            ActionMatcher::All => ALL_PATTERN.to_string(),
            ActionMatcher::Verbs(verbs) => {
                let names: Vec<&str> = verbs.iter().map(HttpVerb::as_str).collect();
                format!("({})", names.join("|"))
            }
        }
    }

    /// Parse the stored form produced by [`ActionMatcher::pattern`]
    pub fn from_pattern(pattern: &str) -> Result<Self> {
        if pattern == ALL_PATTERN {
            return Ok(ActionMatcher::All);
        }

        let inner = pattern
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| AuthzError::InvalidInput(format!("bad action pattern: {}", pattern)))?;

        let verbs = inner
            .split('|')
            .map(str::parse::<HttpVerb>)
            .collect::<Result<BTreeSet<_>>>()?;

        if verbs.is_empty() {
            return Err(AuthzError::InvalidInput("empty action pattern".into()));
        }
        Ok(ActionMatcher::Verbs(verbs))
    }
}

impl fmt::Display for ActionMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.pattern())
    }
}

impl TryFrom<String> for ActionMatcher {
    type Error = AuthzError;

    fn try_from(pattern: String) -> Result<Self> {
        ActionMatcher::from_pattern(&pattern)
    }
}

impl From<ActionMatcher> for String {
    fn from(matcher: ActionMatcher) -> Self {
        matcher.pattern()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_empty_set_rejected() {
        let empty: [&str; 0] = [];
        assert!(matches!(
            ActionMatcher::from_actions(&empty),
            Err(AuthzError::InvalidInput(_))
        ));
        assert!(matches!(
            ActionMatcher::from_actions(&["FETCH", "get"]),
            Err(AuthzError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_all_matches_every_verb() {
        let matcher = ActionMatcher::from_actions(&["GET", "ALL"]).unwrap();
        assert_eq!(matcher, ActionMatcher::All);
        for verb in HttpVerb::ALL {
            assert!(matcher.matches(verb.as_str()));
        }
        assert_eq!(matcher.pattern(), ".*");
    }

    #[test]
    fn test_named_verbs_match_exactly() {
        let matcher = ActionMatcher::from_actions(&["GET", "POST"]).unwrap();
        assert!(matcher.matches("GET"));
        assert!(matcher.matches("POST"));
        for rejected in ["PUT", "DELETE", "PATCH", "HEAD", "OPTIONS", "get", "GETX", ""] {
            assert!(!matcher.matches(rejected), "{} should not match", rejected);
        }
        assert_eq!(matcher.pattern(), "(GET|POST)");
    }

    #[test]
    fn test_unknown_verbs_ignored() {
        let matcher = ActionMatcher::from_actions(&["BREW", "GET"]).unwrap();
        assert_eq!(matcher.pattern(), "(GET)");
    }

    #[test]
    fn test_from_pattern_rejects_garbage() {
        for bad in ["", "()", "GET", "(GET|BREW)", "(GET", "^.*$"] {
            assert!(ActionMatcher::from_pattern(bad).is_err(), "{}", bad);
        }
    }

    fn verb_subset() -> impl Strategy<Value = Vec<HttpVerb>> {
        prop::sample::subsequence(HttpVerb::ALL.to_vec(), 1..=HttpVerb::ALL.len())
    }

    proptest! {
        #[test]
        fn matcher_accepts_exactly_named_verbs(named in verb_subset()) {
            let names: Vec<&str> = named.iter().map(HttpVerb::as_str).collect();
            let matcher = ActionMatcher::from_actions(&names).unwrap();

            for verb in HttpVerb::ALL {
                prop_assert_eq!(matcher.matches(verb.as_str()), named.contains(&verb));
            }
        }

        #[test]
        fn stored_pattern_parses_back(named in verb_subset()) {
            let names: Vec<&str> = named.iter().map(HttpVerb::as_str).collect();
            let matcher = ActionMatcher::from_actions(&names).unwrap();
            prop_assert_eq!(ActionMatcher::from_pattern(&matcher.pattern()).unwrap(), matcher);
        }
    }
}
