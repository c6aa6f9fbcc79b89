//! UI users and password authentication

use crate::config::PasswordConfig;
use crate::error::{Result, VaultError};
use crate::password::PasswordScheme;
use crate::storage::{CredentialStore, Namespace};
use gatehouse_core::UserName;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A UI user as seen outside the vault. Carries no password material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub user_name: UserName,
    pub first_name: String,
    pub last_name: String,
    /// Client address of the last successful login
    pub last_address: String,
}

impl User {
    pub fn new(user_name: impl Into<UserName>) -> Self {
        Self {
            user_name: user_name.into(),
            first_name: String::new(),
            last_name: String::new(),
            last_address: String::new(),
        }
    }

    pub fn with_names(mut self, first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }
}

/// Stored form of a user
#[derive(Clone, Serialize, Deserialize)]
struct UserRecord {
    user_name: UserName,
    first_name: String,
    last_name: String,
    last_address: String,
    /// PHC string produced by [`PasswordScheme::hash`]
    password_hash: String,
}

impl UserRecord {
    fn view(&self) -> User {
        User {
            user_name: self.user_name.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            last_address: self.last_address.clone(),
        }
    }
}

/// User management and password verification
pub trait UserService: Send + Sync {
    /// Create a user; fails with `AlreadyExists` if the name is taken
    fn create(&self, user: &User, password: &str) -> Result<User>;

    fn user(&self, name: &UserName) -> Result<User>;

    /// All users, ordered by name
    fn users(&self) -> Result<Vec<User>>;

    /// Replace first name, last name and last address, keeping the password
    fn update(&self, user: &User) -> Result<User>;

    fn record_login(&self, name: &UserName, address: &str) -> Result<()>;

    /// Remove a user. Removing an absent user succeeds.
    fn delete(&self, name: &UserName) -> Result<()>;

    /// `NotFound` for an unknown name, `InvalidCredential` for a wrong password
    fn authenticate(&self, name: &UserName, password: &str) -> Result<User>;

    /// Set a new password given proof of the current one
    fn change_password(&self, name: &UserName, current: &str, new: &str) -> Result<()>;

    /// Set a new password without proof of the current one (privileged)
    fn reset_password(&self, name: &UserName, new: &str) -> Result<()>;
}

/// [`UserService`] over the `users` keyspace of a [`CredentialStore`]
#[derive(Clone)]
pub struct PasswordAuthenticator {
    users: Namespace,
    scheme: PasswordScheme,
}

impl PasswordAuthenticator {
    pub fn new(store: &CredentialStore, config: PasswordConfig) -> Result<Self> {
        Ok(Self {
            users: store.users().clone(),
            scheme: PasswordScheme::new(config)?,
        })
    }

    fn validate_name(name: &UserName) -> Result<()> {
        if name.is_empty() {
            return Err(VaultError::InvalidInput("user name must not be empty".into()));
        }
        Ok(())
    }

    fn validate_password(password: &str) -> Result<()> {
        if password.is_empty() {
            return Err(VaultError::InvalidInput("password must not be empty".into()));
        }
        Ok(())
    }

    /// Install `replacement` only while the stored hash is still `expected`.
    /// A hash changed in the meantime means `expected` was verified against
    /// a password that no longer applies.
    fn swap_password_hash(&self, name: &UserName, expected: &str, replacement: String) -> Result<()> {
        self.users
            .update(name.as_bytes(), name.as_str(), |mut record: UserRecord| {
                if record.password_hash != expected {
                    debug!(user = %name, "Password changed concurrently");
                    return Err(VaultError::InvalidCredential);
                }
                record.password_hash = replacement.clone();
                Ok(record)
            })?;
        Ok(())
    }
}

impl UserService for PasswordAuthenticator {
    fn create(&self, user: &User, password: &str) -> Result<User> {
        Self::validate_name(&user.user_name)?;
        Self::validate_password(password)?;

        let record = UserRecord {
            user_name: user.user_name.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            last_address: user.last_address.clone(),
            password_hash: self.scheme.hash(password)?,
        };

        self.users
            .insert_new(user.user_name.as_bytes(), user.user_name.as_str(), &record)?;

        info!(user = %user.user_name, "User created");
        Ok(record.view())
    }

    fn user(&self, name: &UserName) -> Result<User> {
        self.users
            .get::<UserRecord>(name.as_bytes())?
            .map(|record| record.view())
            .ok_or_else(|| VaultError::NotFound(name.to_string()))
    }

    fn users(&self) -> Result<Vec<User>> {
        let records: Vec<UserRecord> = self.users.records()?;
        Ok(records.iter().map(UserRecord::view).collect())
    }

    fn update(&self, user: &User) -> Result<User> {
        Self::validate_name(&user.user_name)?;

        let record = self.users.update(
            user.user_name.as_bytes(),
            user.user_name.as_str(),
            |mut record: UserRecord| {
                record.first_name = user.first_name.clone();
                record.last_name = user.last_name.clone();
                record.last_address = user.last_address.clone();
                Ok(record)
            },
        )?;

        info!(user = %user.user_name, "User updated");
        Ok(record.view())
    }

    fn record_login(&self, name: &UserName, address: &str) -> Result<()> {
        self.users
            .update(name.as_bytes(), name.as_str(), |mut record: UserRecord| {
                record.last_address = address.to_string();
                Ok(record)
            })?;
        debug!(user = %name, address, "Login recorded");
        Ok(())
    }

    fn delete(&self, name: &UserName) -> Result<()> {
        if self.users.delete(name.as_bytes())? {
            info!(user = %name, "User deleted");
        } else {
            debug!(user = %name, "Delete of absent user ignored");
        }
        Ok(())
    }

    fn authenticate(&self, name: &UserName, password: &str) -> Result<User> {
        let record = match self.users.get::<UserRecord>(name.as_bytes())? {
            Some(record) => record,
            None => {
                self.scheme.verify_dummy(password);
                debug!(user = %name, "Authentication failed: unknown user");
                return Err(VaultError::NotFound(name.to_string()));
            }
        };

        match self.scheme.verify(password, &record.password_hash) {
            Ok(()) => Ok(record.view()),
            Err(VaultError::InvalidCredential) => {
                debug!(user = %name, "Authentication failed: wrong password");
                Err(VaultError::InvalidCredential)
            }
            Err(e) => {
                warn!(user = %name, error = %e, "Stored password hash unusable");
                Err(e)
            }
        }
    }

    fn change_password(&self, name: &UserName, current: &str, new: &str) -> Result<()> {
        Self::validate_password(new)?;

        // argon2 work stays outside the sled transaction
        let stored = self
            .users
            .get::<UserRecord>(name.as_bytes())?
            .ok_or_else(|| VaultError::NotFound(name.to_string()))?;
        self.scheme.verify(current, &stored.password_hash)?;
        let password_hash = self.scheme.hash(new)?;

        self.swap_password_hash(name, &stored.password_hash, password_hash)?;

        info!(user = %name, "Password changed");
        Ok(())
    }

    fn reset_password(&self, name: &UserName, new: &str) -> Result<()> {
        Self::validate_password(new)?;

        // hashed once; the transaction closure may run more than once
        let password_hash = self.scheme.hash(new)?;
        self.users
            .update(name.as_bytes(), name.as_str(), |mut record: UserRecord| {
                record.password_hash = password_hash.clone();
                Ok(record)
            })?;

        info!(user = %name, "Password reset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> (CredentialStore, PasswordAuthenticator) {
        let store = CredentialStore::open_temporary().unwrap();
        let service =
            PasswordAuthenticator::new(&store, PasswordConfig::insecure_for_tests()).unwrap();
        (store, service)
    }

    #[test]
    fn test_view_never_carries_hash() {
        let (_store, service) = service();
        let user = service.create(&User::new("root"), "password").unwrap();
        let bytes = gatehouse_core::codec::encode(&user).unwrap();
        assert!(!bytes.windows(13).any(|w| w == b"password_hash"));
        assert!(!bytes.windows(6).any(|w| w == b"argon2"));
    }

    #[test]
    fn test_empty_name_and_password_rejected() {
        let (_store, service) = service();
        assert!(matches!(
            service.create(&User::new(""), "password"),
            Err(VaultError::InvalidInput(_))
        ));
        assert!(matches!(
            service.create(&User::new("root"), ""),
            Err(VaultError::InvalidInput(_))
        ));
        assert!(service.users().unwrap().is_empty());
    }

    #[test]
    fn test_stale_hash_is_not_swapped() {
        let (store, service) = service();
        let name = UserName::from("root");
        service.create(&User::new("root"), "password").unwrap();
        let verified: UserRecord = store.users().get(name.as_bytes()).unwrap().unwrap();

        // a reset lands between verification and the swap
        service.reset_password(&name, "reset").unwrap();
        let after_reset = store.users().raw(name.as_bytes()).unwrap();

        let replacement = service.scheme.hash("changed").unwrap();
        assert!(matches!(
            service.swap_password_hash(&name, &verified.password_hash, replacement),
            Err(VaultError::InvalidCredential)
        ));
        assert_eq!(store.users().raw(name.as_bytes()).unwrap(), after_reset);
        assert!(service.authenticate(&name, "reset").is_ok());
        assert!(service.authenticate(&name, "changed").is_err());
    }

    #[test]
    fn test_change_password_swaps_hash() {
        let (_store, service) = service();
        let name = UserName::from("root");
        service.create(&User::new("root"), "password").unwrap();

        service.change_password(&name, "password", "changed").unwrap();
        assert!(service.authenticate(&name, "changed").is_ok());
        assert!(matches!(
            service.change_password(&name, "password", "again"),
            Err(VaultError::InvalidCredential)
        ));
        assert!(matches!(
            service.change_password(&UserName::from("ghost"), "password", "again"),
            Err(VaultError::NotFound(_))
        ));
    }

    #[test]
    fn test_record_login_keeps_password() {
        let (_store, service) = service();
        let name = UserName::from("root");
        service.create(&User::new("root"), "password").unwrap();

        service.record_login(&name, "10.0.0.1").unwrap();
        assert_eq!(service.user(&name).unwrap().last_address, "10.0.0.1");
        assert!(service.authenticate(&name, "password").is_ok());
    }
}
