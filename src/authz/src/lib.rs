//! # Gatehouse Authorization
//!
//! Decides, for every inbound request, whether the caller may perform the
//! request's method on the request's path.
//!
//! ## Features
//!
//! - **Allow-only RBAC**: subjects inherit rules through (transitive) groups
//! - **Two credential paths**: bearer API key or server-side session, never mixed
//! - **Fail-safe**: every unresolved or ambiguous step denies
//! - **Durable policy**: whole-set snapshots in the credential database
//!
//! ## Example
//!
//! ```rust,no_run
//! use gatehouse_authz::PermissionEngine;
//!
//! # async fn example() -> gatehouse_authz::Result<()> {
//! let engine = PermissionEngine::in_memory().await?;
//!
//! engine.add_subject_to_role("root", "admin").await?;
//! engine.add_permission("admin", "/", &["ALL"]).await?;
//!
//! assert!(engine.authorize("root", "/admin/users/list", "GET").await);
//! assert!(!engine.authorize("anonymous", "/admin/users/list", "GET").await);
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod authorizer;
pub mod engine;
pub mod error;
pub mod login;
pub mod middleware;
pub mod policy;
pub mod resource;
pub mod session;

pub use action::{ActionMatcher, HttpVerb, ALL_ACTIONS};
pub use authorizer::{
    AccessDecision, AccessMode, AccessRequest, AnonymousAccess, AuthorizerConfig,
    RequestAuthorizer,
};
pub use engine::{EngineConfig, PermissionEngine};
pub use error::{AuthzError, Result};
pub use login::LoginService;
pub use middleware::require_authorization;
pub use policy::{MemoryPolicyAdapter, PermissionRule, PolicyAdapter, PolicySet, SledPolicyAdapter};
pub use resource::{is_canonical_path, normalize_path, ResourcePattern};
pub use session::{IdentitySession, MemorySessions, SessionBinder, SessionToken};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
