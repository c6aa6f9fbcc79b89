//! Identity types shared across the vault and the authorizer

use serde::{Deserialize, Serialize};
use std::fmt;

/// Header carrying the API key. Its presence alone selects API-key mode.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Subject name used when no authenticated identity can be resolved
pub const ANONYMOUS_SUBJECT: &str = "anonymous";

/// Unique name of a UI user; also the user's storage key
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserName(String);

impl UserName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key bytes for the users keyspace
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UserName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for UserName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// Opaque bearer secret identifying an API user.
///
/// `Debug` and `Display` never print the secret.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw secret. Callers must not log it.
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Key bytes for the api_keys keyspace
    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl fmt::Display for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Identity bound to a server-side session.
///
/// Serialized as JSON (`{"user_name":"root"}`) when stored in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_name: UserName,
}

impl Identity {
    pub fn new(user_name: impl Into<UserName>) -> Self {
        Self {
            user_name: user_name.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::new(ANONYMOUS_SUBJECT)
    }

    /// An identity with an empty name carries no authority
    pub fn is_empty(&self) -> bool {
        self.user_name.is_empty()
    }

    pub fn subject(&self) -> &str {
        self.user_name.as_str()
    }

    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| crate::CoreError::codec(e.to_string()))
    }

    pub fn from_json(bytes: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| crate::CoreError::codec(e.to_string()))
    }
}
