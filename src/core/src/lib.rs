//! # Gatehouse Core
//!
//! Shared types and helpers for the Gatehouse access-control subsystem.
//! The vault and authz crates both build on these so that identities,
//! stored records and secrets look the same on every side of the boundary.
//!
//! ## Module Structure
//!
//! ```text
//! core/
//! ├── types/   - UserName, ApiKey, Identity and the fixed protocol constants
//! ├── codec/   - stable self-describing binary encoding for persisted records
//! ├── secret/  - CSPRNG-backed secret generation, constant-time comparison
//! └── error/   - CoreError
//! ```

pub mod codec;
pub mod error;
pub mod secret;
pub mod types;

pub use error::{CoreError, Result};
pub use types::{ApiKey, Identity, UserName, ANONYMOUS_SUBJECT, API_KEY_HEADER};
