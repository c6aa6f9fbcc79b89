//! # Gatehouse Vault
//!
//! Durable credential storage for UI users and API users.
//!
//! ## Features
//!
//! - **Crash-consistent storage**: sled keyspaces, one transaction per mutation
//! - **Password hashing**: argon2id PHC strings with tunable cost
//! - **API keys**: 512-bit generated bearer keys, constant-time ID scan
//!
//! ## Module Structure
//!
//! ```text
//! vault/
//! ├── storage/   - CredentialStore and its keyspaces
//! ├── password/  - argon2id hashing and verification
//! ├── user/      - UserService / PasswordAuthenticator
//! ├── api_user/  - ApiUserService / ApiKeyAuthenticator
//! ├── config/    - StoreConfig, PasswordConfig
//! └── error/     - VaultError
//! ```

pub mod api_user;
pub mod config;
pub mod error;
pub mod password;
pub mod storage;
pub mod user;

pub use api_user::{ApiKeyAuthenticator, ApiUser, ApiUserService};
pub use config::{PasswordConfig, StoreConfig};
pub use error::{Result, VaultError};
pub use storage::CredentialStore;
pub use user::{PasswordAuthenticator, User, UserService};
