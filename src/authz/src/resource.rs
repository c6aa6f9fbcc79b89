//! Resource patterns and request path normalisation

use crate::error::{AuthzError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Clean a request path before matching.
///
/// Collapses duplicate slashes and resolves `.` and `..` segments; `..` never
/// climbs above the root. A trailing slash is kept. Returns `None` for a path
/// that is not absolute.
pub fn normalize_path(path: &str) -> Option<String> {
    if !path.starts_with('/') {
        return None;
    }

    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut cleaned = String::with_capacity(path.len());
    for segment in &segments {
        cleaned.push('/');
        cleaned.push_str(segment);
    }

    let trailing = path.ends_with('/') || path.ends_with("/.") || path.ends_with("/..");
    if cleaned.is_empty() || trailing {
        cleaned.push('/');
    }

    Some(cleaned)
}

/// True iff `path` is absolute and already in the form [`normalize_path`]
/// produces.
///
/// Routers dispatch on the raw path, so a decision is only made for a path
/// that both sides read the same way.
pub fn is_canonical_path(path: &str) -> bool {
    normalize_path(path).is_some_and(|cleaned| cleaned == path)
}

/// Path pattern a rule applies to.
///
/// The pattern is a regular expression anchored at the start of the
/// canonical request path, so `/` covers everything and `/api/` covers
/// `/api/` and everything below it.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourcePattern {
    source: String,
    regex: Regex,
}

impl ResourcePattern {
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let source = pattern.into();
        if !source.starts_with('/') {
            return Err(AuthzError::InvalidInput(format!(
                "resource must start with /: {}",
                source
            )));
        }

        let regex = Regex::new(&format!("^(?:{})", source))
            .map_err(|e| AuthzError::InvalidInput(format!("bad resource pattern {}: {}", source, e)))?;

        Ok(Self { source, regex })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Match against an already canonical path
    pub fn matches(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }
}

impl PartialEq for ResourcePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

impl Eq for ResourcePattern {}

impl fmt::Debug for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResourcePattern").field(&self.source).finish()
    }
}

impl fmt::Display for ResourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl TryFrom<String> for ResourcePattern {
    type Error = AuthzError;

    fn try_from(source: String) -> Result<Self> {
        ResourcePattern::new(source)
    }
}

impl From<ResourcePattern> for String {
    fn from(pattern: ResourcePattern) -> Self {
        pattern.source
    }
}
