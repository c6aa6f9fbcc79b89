//! Sled-backed credential store
//!
//! Two independent keyspaces live in one sled database:
//!
//! - `users`:    UserName bytes -> encoded user record
//! - `api_keys`: ApiKey bytes   -> encoded API user record
//!
//! Every logical mutation runs in a single sled transaction against one
//! keyspace, so a reader sees either the previous record or the new one.

use crate::config::StoreConfig;
use crate::error::{Result, VaultError};
use gatehouse_core::codec;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::transaction::ConflictableTransactionError;
use std::sync::Arc;
use tracing::{debug, info};

/// Keyspace holding UI users
pub const USERS_TREE: &str = "users";

/// Keyspace holding API users
pub const API_KEYS_TREE: &str = "api_keys";

/// Handle to the credential database. Cheap to clone.
#[derive(Clone)]
pub struct CredentialStore {
    db: sled::Db,
    users: Namespace,
    api_keys: Namespace,
}

impl CredentialStore {
    /// Open or create the store described by `config`
    pub fn open(config: StoreConfig) -> Result<Self> {
        let db = sled::Config::new()
            .path(&config.path)
            .cache_capacity(config.cache_capacity)
            .flush_every_ms(config.flush_every_ms)
            .temporary(config.temporary)
            .open()?;

        let sync = Arc::new(config.sync_writes);
        let users = Namespace::new(USERS_TREE, db.open_tree(USERS_TREE)?, sync.clone());
        let api_keys = Namespace::new(API_KEYS_TREE, db.open_tree(API_KEYS_TREE)?, sync);

        info!(path = %config.path.display(), "Credential store opened");

        Ok(Self { db, users, api_keys })
    }

    /// Open a throwaway store that is removed when dropped
    pub fn open_temporary() -> Result<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        let sync = Arc::new(false);
        let users = Namespace::new(USERS_TREE, db.open_tree(USERS_TREE)?, sync.clone());
        let api_keys = Namespace::new(API_KEYS_TREE, db.open_tree(API_KEYS_TREE)?, sync);
        Ok(Self { db, users, api_keys })
    }

    pub fn users(&self) -> &Namespace {
        &self.users
    }

    pub fn api_keys(&self) -> &Namespace {
        &self.api_keys
    }

    /// Open an additional keyspace in the same database (e.g. for policy)
    pub fn open_tree(&self, name: &str) -> Result<sled::Tree> {
        Ok(self.db.open_tree(name)?)
    }

    /// Force all pending writes to disk
    pub fn flush(&self) -> Result<()> {
        let bytes = self.db.flush()?;
        debug!(bytes, "Credential store flushed");
        Ok(())
    }
}

/// One keyspace of encoded records
#[derive(Clone)]
pub struct Namespace {
    name: &'static str,
    tree: sled::Tree,
    sync_writes: Arc<bool>,
}

impl Namespace {
    fn new(name: &'static str, tree: sled::Tree, sync_writes: Arc<bool>) -> Self {
        Self {
            name,
            tree,
            sync_writes,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Read and decode one record. A record that fails to decode is
    /// `Corruption`, never `None`.
    pub fn get<T: DeserializeOwned>(&self, key: &[u8]) -> Result<Option<T>> {
        match self.tree.get(key)? {
            Some(bytes) => Ok(Some(codec::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn contains(&self, key: &[u8]) -> Result<bool> {
        Ok(self.tree.contains_key(key)?)
    }

    /// Unconditionally write one record
    pub fn put<T: Serialize>(&self, key: &[u8], record: &T) -> Result<()> {
        let bytes = codec::encode(record)?;
        self.tree.insert(key, bytes)?;
        self.committed()
    }

    /// Remove a record. Removing an absent key is not an error; the return
    /// value reports whether anything was removed.
    pub fn delete(&self, key: &[u8]) -> Result<bool> {
        let removed = self.tree.remove(key)?.is_some();
        self.committed()?;
        Ok(removed)
    }

    /// Decode every record in key order
    pub fn records<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let mut records = Vec::new();
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            records.push(codec::decode(&bytes)?);
        }
        Ok(records)
    }

    /// Visit every record in key order, stopping at the first error
    pub fn for_each<T, F>(&self, mut visit: F) -> Result<()>
    where
        T: DeserializeOwned,
        F: FnMut(T),
    {
        for entry in self.tree.iter() {
            let (_, bytes) = entry?;
            visit(codec::decode(&bytes)?);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Insert a record only if the key is vacant, atomically.
    ///
    /// `label` names the record in the `AlreadyExists` error; it must not be
    /// a secret.
    pub fn insert_new<T: Serialize>(&self, key: &[u8], label: &str, record: &T) -> Result<()> {
        let bytes = codec::encode(record)?;

        self.tree.transaction(|tx| {
            if tx.get(key)?.is_some() {
                return Err(ConflictableTransactionError::Abort(VaultError::AlreadyExists(
                    label.to_string(),
                )));
            }
            tx.insert(key, bytes.clone())?;
            Ok(())
        })?;

        self.committed()
    }

    /// Load, mutate and persist one record in a single transaction.
    ///
    /// If the record is absent, fails to decode, or `mutate` returns an error,
    /// nothing is written.
    pub fn update<T, F>(&self, key: &[u8], label: &str, mutate: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(T) -> Result<T>,
    {
        let updated = self.tree.transaction(|tx| {
            let Some(bytes) = tx.get(key)? else {
                return Err(ConflictableTransactionError::Abort(VaultError::NotFound(
                    label.to_string(),
                )));
            };

            let record: T = codec::decode(&bytes)
                .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;
            let record = mutate(record).map_err(ConflictableTransactionError::Abort)?;
            let encoded = codec::encode(&record)
                .map_err(|e| ConflictableTransactionError::Abort(e.into()))?;

            tx.insert(key, encoded)?;
            Ok(record)
        })?;

        self.committed()?;
        Ok(updated)
    }

    /// Raw bytes of a record, for stability checks
    pub fn raw(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.tree.get(key)?.map(|bytes| bytes.to_vec()))
    }

    fn committed(&self) -> Result<()> {
        if *self.sync_writes {
            self.tree.flush()?;
        }
        Ok(())
    }
}
