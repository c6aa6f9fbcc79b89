//! Session capability and the typed identity bound to it
//!
//! The session transport (cookies, signing, expiry) belongs to the
//! surrounding server. This crate only consumes the capability described by
//! [`SessionBinder`] and layers a typed [`Identity`] on top of it.

pub mod memory;

pub use memory::MemorySessions;

use crate::error::Result;
use async_trait::async_trait;
use gatehouse_core::Identity;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Session key the identity is stored under
pub const IDENTITY_KEY: &str = "user";

/// Opaque handle of a server-side session
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Server-tracked session store.
///
/// Writing to an unknown token starts a session under that token.
#[async_trait]
pub trait SessionBinder: Send + Sync {
    async fn add(&self, token: &SessionToken, key: &str, value: Vec<u8>) -> Result<()>;

    async fn load(&self, token: &SessionToken, key: &str) -> Result<Option<Vec<u8>>>;

    /// Move the session to a fresh token and invalidate the old one
    async fn renew(&self, token: &SessionToken) -> Result<SessionToken>;

    async fn destroy(&self, token: &SessionToken) -> Result<()>;

    /// Read a value and remove it from the session
    async fn pop_load(&self, token: &SessionToken, key: &str) -> Result<Option<Vec<u8>>>;
}

#[async_trait]
impl<T: SessionBinder + ?Sized> SessionBinder for Arc<T> {
    async fn add(&self, token: &SessionToken, key: &str, value: Vec<u8>) -> Result<()> {
        (**self).add(token, key, value).await
    }

    async fn load(&self, token: &SessionToken, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).load(token, key).await
    }

    async fn renew(&self, token: &SessionToken) -> Result<SessionToken> {
        (**self).renew(token).await
    }

    async fn destroy(&self, token: &SessionToken) -> Result<()> {
        (**self).destroy(token).await
    }

    async fn pop_load(&self, token: &SessionToken, key: &str) -> Result<Option<Vec<u8>>> {
        (**self).pop_load(token, key).await
    }
}

/// Typed identity layer over any [`SessionBinder`]
#[derive(Clone)]
pub struct IdentitySession<S> {
    binder: S,
}

impl<S: SessionBinder> IdentitySession<S> {
    pub fn new(binder: S) -> Self {
        Self { binder }
    }

    pub fn binder(&self) -> &S {
        &self.binder
    }

    pub async fn bind(&self, token: &SessionToken, identity: &Identity) -> Result<()> {
        self.binder
            .add(token, IDENTITY_KEY, identity.to_json()?)
            .await
    }

    /// The bound identity. A missing or undecodable value is `None`.
    pub async fn identity(&self, token: &SessionToken) -> Result<Option<Identity>> {
        let Some(bytes) = self.binder.load(token, IDENTITY_KEY).await? else {
            return Ok(None);
        };
        Ok(decode_identity(&bytes))
    }

    /// Read the identity and unbind it
    pub async fn take(&self, token: &SessionToken) -> Result<Option<Identity>> {
        let Some(bytes) = self.binder.pop_load(token, IDENTITY_KEY).await? else {
            return Ok(None);
        };
        Ok(decode_identity(&bytes))
    }

    pub async fn renew(&self, token: &SessionToken) -> Result<SessionToken> {
        self.binder.renew(token).await
    }

    pub async fn destroy(&self, token: &SessionToken) -> Result<()> {
        self.binder.destroy(token).await
    }
}

fn decode_identity(bytes: &[u8]) -> Option<Identity> {
    match Identity::from_json(bytes) {
        Ok(identity) if !identity.is_empty() => Some(identity),
        Ok(_) => None,
        Err(e) => {
            warn!(error = %e, "Discarding undecodable session identity");
            None
        }
    }
}
