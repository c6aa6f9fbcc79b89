//! API users and bearer key resolution

use crate::error::{Result, VaultError};
use crate::storage::{CredentialStore, Namespace};
use gatehouse_core::{secret, ApiKey};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Random bytes in a generated key (512 bits)
pub const API_KEY_BYTES: usize = 64;

/// Random bytes in an admin-facing ID
pub const API_ID_BYTES: usize = 16;

/// Shortest externally supplied key accepted by `create_with_key`
pub const MIN_PROVISIONED_KEY_LEN: usize = 32;

// never put a key in an error message
const API_USER_LABEL: &str = "api user";

/// A machine identity authenticated by bearer key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiUser {
    pub key: ApiKey,
    /// Human label; also the subject the permission engine sees
    pub name: String,
    /// Secondary identifier for admin lookup, unrelated to the key
    pub id: Vec<u8>,
    pub last_address: String,
    /// Groups this API user belonged to when an admin flow last recorded
    /// them. Never consulted for decisions and not kept current by policy
    /// changes; `RequestAuthorizer::refresh_api_user_roles` rewrites it.
    pub roles: Vec<String>,
}

impl ApiUser {
    /// Admin-facing form of the ID
    pub fn id_base64(&self) -> String {
        secret::encode_base64(&self.id)
    }
}

/// Generate a fresh base64-encoded API key
pub fn generate_api_key() -> Result<ApiKey> {
    Ok(ApiKey::new(secret::generate_random_string(API_KEY_BYTES)?))
}

pub trait ApiUserService: Send + Sync {
    /// Create an API user with a generated key and ID
    fn create(&self, name: &str) -> Result<ApiUser>;

    /// Import an API user whose key was issued elsewhere
    fn create_with_key(&self, api_user: ApiUser) -> Result<ApiUser>;

    /// Keyed lookup; the hot authorization path
    fn api_user(&self, key: &ApiKey) -> Result<ApiUser>;

    /// Linear scan by base64 ID. Admin use only.
    fn api_user_by_id(&self, id: &str) -> Result<ApiUser>;

    fn api_users(&self) -> Result<Vec<ApiUser>>;

    /// Replace name, last address and roles. Key and ID never change.
    fn update(&self, api_user: &ApiUser) -> Result<ApiUser>;

    fn record_access(&self, key: &ApiKey, address: &str) -> Result<()>;

    /// Remove an API user. Removing an absent key succeeds.
    fn delete(&self, key: &ApiKey) -> Result<()>;
}

/// [`ApiUserService`] over the `api_keys` keyspace of a [`CredentialStore`]
#[derive(Clone)]
pub struct ApiKeyAuthenticator {
    api_keys: Namespace,
}

impl ApiKeyAuthenticator {
    pub fn new(store: &CredentialStore) -> Self {
        Self {
            api_keys: store.api_keys().clone(),
        }
    }

    fn insert(&self, api_user: &ApiUser) -> Result<()> {
        self.api_keys
            .insert_new(api_user.key.as_bytes(), API_USER_LABEL, api_user)
    }
}

impl ApiUserService for ApiKeyAuthenticator {
    fn create(&self, name: &str) -> Result<ApiUser> {
        let api_user = ApiUser {
            key: generate_api_key()?,
            name: name.to_string(),
            id: secret::generate_random_bytes(API_ID_BYTES)?,
            last_address: String::new(),
            roles: Vec::new(),
        };

        self.insert(&api_user)?;

        info!(name, id = %api_user.id_base64(), "API user created");
        Ok(api_user)
    }

    fn create_with_key(&self, mut api_user: ApiUser) -> Result<ApiUser> {
        if api_user.key.len() < MIN_PROVISIONED_KEY_LEN {
            return Err(VaultError::InvalidInput(format!(
                "api key must be at least {} characters",
                MIN_PROVISIONED_KEY_LEN
            )));
        }
        if api_user.id.is_empty() {
            api_user.id = secret::generate_random_bytes(API_ID_BYTES)?;
        }

        self.insert(&api_user)?;

        info!(name = %api_user.name, id = %api_user.id_base64(), "API user imported");
        Ok(api_user)
    }

    fn api_user(&self, key: &ApiKey) -> Result<ApiUser> {
        if key.is_empty() {
            return Err(VaultError::NotFound(API_USER_LABEL.into()));
        }
        self.api_keys
            .get::<ApiUser>(key.as_bytes())?
            .ok_or_else(|| VaultError::NotFound(API_USER_LABEL.into()))
    }

    fn api_user_by_id(&self, id: &str) -> Result<ApiUser> {
        let wanted = secret::decode_base64(id)?;

        let mut found = None;
        let mut visited = 0usize;
        self.api_keys.for_each(|candidate: ApiUser| {
            visited += 1;
            let matched = secret::constant_time_eq(&candidate.id, &wanted);
            if matched && found.is_none() {
                found = Some(candidate);
            }
        })?;

        debug!(visited, matched = found.is_some(), "API user ID scan complete");
        found.ok_or_else(|| VaultError::NotFound(API_USER_LABEL.into()))
    }

    fn api_users(&self) -> Result<Vec<ApiUser>> {
        self.api_keys.records()
    }

    fn update(&self, api_user: &ApiUser) -> Result<ApiUser> {
        let updated = self.api_keys.update(
            api_user.key.as_bytes(),
            API_USER_LABEL,
            |mut stored: ApiUser| {
                stored.name = api_user.name.clone();
                stored.last_address = api_user.last_address.clone();
                stored.roles = api_user.roles.clone();
                Ok(stored)
            },
        )?;

        info!(name = %updated.name, id = %updated.id_base64(), "API user updated");
        Ok(updated)
    }

    fn record_access(&self, key: &ApiKey, address: &str) -> Result<()> {
        self.api_keys
            .update(key.as_bytes(), API_USER_LABEL, |mut stored: ApiUser| {
                stored.last_address = address.to_string();
                Ok(stored)
            })?;
        Ok(())
    }

    fn delete(&self, key: &ApiKey) -> Result<()> {
        if self.api_keys.delete(key.as_bytes())? {
            info!("API user deleted");
        } else {
            debug!("Delete of absent API user ignored");
        }
        Ok(())
    }
}
