//! In-process session store

use super::{SessionBinder, SessionToken};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use gatehouse_core::secret;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Random bytes in a generated token
const TOKEN_BYTES: usize = 32;

type SessionData = HashMap<String, Vec<u8>>;

/// [`SessionBinder`] keeping every session in memory. Cheap to clone; clones
/// share state.
#[derive(Clone, Default)]
pub struct MemorySessions {
    sessions: Arc<DashMap<String, SessionData>>,
}

impl MemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an empty session under a fresh token
    pub fn start(&self) -> Result<SessionToken> {
        let token = generate_token()?;
        self.sessions
            .insert(token.as_str().to_string(), SessionData::new());
        Ok(token)
    }

    pub fn contains(&self, token: &SessionToken) -> bool {
        self.sessions.contains_key(token.as_str())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

fn generate_token() -> Result<SessionToken> {
    Ok(SessionToken::new(secret::generate_random_string(TOKEN_BYTES)?))
}

#[async_trait]
impl SessionBinder for MemorySessions {
    async fn add(&self, token: &SessionToken, key: &str, value: Vec<u8>) -> Result<()> {
        self.sessions
            .entry(token.as_str().to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn load(&self, token: &SessionToken, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .sessions
            .get(token.as_str())
            .and_then(|data| data.get(key).cloned()))
    }

    async fn renew(&self, token: &SessionToken) -> Result<SessionToken> {
        let data = self
            .sessions
            .remove(token.as_str())
            .map(|(_, data)| data)
            .unwrap_or_default();

        let renewed = generate_token()?;
        self.sessions.insert(renewed.as_str().to_string(), data);

        debug!("Session token renewed");
        Ok(renewed)
    }

    async fn destroy(&self, token: &SessionToken) -> Result<()> {
        self.sessions.remove(token.as_str());
        Ok(())
    }

    async fn pop_load(&self, token: &SessionToken, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .sessions
            .get_mut(token.as_str())
            .and_then(|mut data| data.remove(key)))
    }
}
