//! Per-request authorization decision
//!
//! ```text
//! request ── x-api-key present? ──yes──► ApiUserService ──► subject = api user name
//!                 │                          (unresolved ⇒ deny, no fallback)
//!                 no
//!                 ▼
//!           session identity ──► subject = user name, or the anonymous policy
//!                 │
//!                 ▼
//!   PermissionEngine::authorize(subject, path, method) ──► allow / deny
//! ```
//!
//! Every failed or ambiguous step ends in deny. Nothing on the decision path
//! writes state; [`RequestAuthorizer::refresh_api_user_roles`] is an admin
//! operation.

use crate::engine::PermissionEngine;
use crate::error::Result;
use gatehouse_core::{ApiKey, Identity, ANONYMOUS_SUBJECT, API_KEY_HEADER};
use gatehouse_vault::{ApiUser, ApiUserService, VaultError};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// How requests without an authenticated identity are treated
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnonymousAccess {
    /// Deny without consulting the engine
    #[default]
    Deny,
    /// Authorize as this subject, so rules granted to it apply
    Subject(String),
}

impl AnonymousAccess {
    /// Treat anonymous callers as the `anonymous` subject
    pub fn anonymous_subject() -> Self {
        AnonymousAccess::Subject(ANONYMOUS_SUBJECT.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthorizerConfig {
    /// Header carrying the API key
    pub api_key_header: String,

    pub anonymous: AnonymousAccess,

    /// Where denied session requests are sent
    pub login_path: String,
}

impl Default for AuthorizerConfig {
    fn default() -> Self {
        Self {
            api_key_header: API_KEY_HEADER.to_string(),
            anonymous: AnonymousAccess::Deny,
            login_path: "/login".to_string(),
        }
    }
}

/// What the routing layer knows about a request
#[derive(Debug, Clone, Copy)]
pub struct AccessRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    /// Value of the API key header, if the header was present at all
    pub api_key: Option<&'a str>,
    /// Identity bound to the caller's session
    pub identity: Option<&'a Identity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ApiKey,
    Session,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDecision {
    pub allowed: bool,
    pub mode: AccessMode,
    /// Subject the engine was asked about, if one was resolved
    pub subject: Option<String>,
}

impl AccessDecision {
    fn deny(mode: AccessMode, subject: Option<String>) -> Self {
        Self {
            allowed: false,
            mode,
            subject,
        }
    }
}

pub struct RequestAuthorizer {
    engine: Arc<PermissionEngine>,
    api_users: Arc<dyn ApiUserService>,
    config: AuthorizerConfig,
}

impl RequestAuthorizer {
    pub fn new(engine: Arc<PermissionEngine>, api_users: Arc<dyn ApiUserService>) -> Self {
        Self::with_config(AuthorizerConfig::default(), engine, api_users)
    }

    pub fn with_config(
        config: AuthorizerConfig,
        engine: Arc<PermissionEngine>,
        api_users: Arc<dyn ApiUserService>,
    ) -> Self {
        Self {
            engine,
            api_users,
            config,
        }
    }

    pub fn config(&self) -> &AuthorizerConfig {
        &self.config
    }

    pub fn engine(&self) -> &Arc<PermissionEngine> {
        &self.engine
    }

    pub async fn authorize(&self, request: &AccessRequest<'_>) -> AccessDecision {
        match request.api_key {
            Some(key) => self.authorize_api_key(key, request).await,
            None => self.authorize_session(request).await,
        }
    }

    /// Boolean form for routing layers that only need allow/deny
    pub async fn is_allowed(
        &self,
        method: &str,
        path: &str,
        api_key: Option<&str>,
        identity: Option<&Identity>,
    ) -> bool {
        self.authorize(&AccessRequest {
            method,
            path,
            api_key,
            identity,
        })
        .await
        .allowed
    }

    /// Rewrite the API user's recorded `roles` from the engine's current
    /// transitive groups. Call after changing the API user's memberships.
    pub async fn refresh_api_user_roles(&self, key: &ApiKey) -> Result<ApiUser> {
        let mut api_user = self.api_users.api_user(key)?;
        api_user.roles = self.engine.groups_for(&api_user.name).await;
        let api_user = self.api_users.update(&api_user)?;

        info!(api_user = %api_user.name, roles = ?api_user.roles, "API user roles refreshed");
        Ok(api_user)
    }

    async fn authorize_api_key(&self, key: &str, request: &AccessRequest<'_>) -> AccessDecision {
        let api_user = match self.api_users.api_user(&ApiKey::new(key)) {
            Ok(api_user) => api_user,
            Err(VaultError::NotFound(_)) => {
                debug!(path = request.path, "Unknown API key");
                return AccessDecision::deny(AccessMode::ApiKey, None);
            }
            Err(e) => {
                error!(error = %e, "API key lookup failed");
                return AccessDecision::deny(AccessMode::ApiKey, None);
            }
        };

        if api_user.name.is_empty() {
            debug!(path = request.path, "API user has no name");
            return AccessDecision::deny(AccessMode::ApiKey, None);
        }

        self.decide(AccessMode::ApiKey, api_user.name, request).await
    }

    async fn authorize_session(&self, request: &AccessRequest<'_>) -> AccessDecision {
        let identity = request.identity.filter(|identity| !identity.is_empty());

        let subject = match (identity, &self.config.anonymous) {
            (Some(identity), _) => identity.subject().to_string(),
            (None, AnonymousAccess::Subject(subject)) => subject.clone(),
            (None, AnonymousAccess::Deny) => {
                debug!(path = request.path, "Anonymous request denied");
                return AccessDecision::deny(AccessMode::Session, None);
            }
        };

        self.decide(AccessMode::Session, subject, request).await
    }

    async fn decide(&self, mode: AccessMode, subject: String, request: &AccessRequest<'_>) -> AccessDecision {
        let allowed = self
            .engine
            .authorize(&subject, request.path, request.method)
            .await;

        if !allowed {
            debug!(
                subject = %subject,
                method = request.method,
                path = request.path,
                "Request denied"
            );
        }

        AccessDecision {
            allowed,
            mode,
            subject: Some(subject),
        }
    }
}
