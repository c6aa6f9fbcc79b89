//! Login and logout for session users

use crate::error::{AuthzError, Result};
use crate::session::{IdentitySession, SessionBinder, SessionToken};
use gatehouse_core::{Identity, UserName};
use gatehouse_vault::UserService;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct LoginService<S> {
    users: Arc<dyn UserService>,
    sessions: IdentitySession<S>,
}

impl<S: SessionBinder> LoginService<S> {
    pub fn new(users: Arc<dyn UserService>, sessions: S) -> Self {
        Self {
            users,
            sessions: IdentitySession::new(sessions),
        }
    }

    pub fn sessions(&self) -> &IdentitySession<S> {
        &self.sessions
    }

    /// Authenticate and bind the user to a renewed session token, then
    /// record `address` as the user's last address.
    ///
    /// Unknown user and wrong password both come back as
    /// `AuthenticationFailed`. The returned token replaces `token`.
    pub async fn login(
        &self,
        token: &SessionToken,
        name: &str,
        password: &str,
        address: &str,
    ) -> Result<SessionToken> {
        let user_name = UserName::from(name);

        let user = match self.users.authenticate(&user_name, password) {
            Ok(user) => user,
            Err(e) if e.is_authentication_failure() => {
                debug!(user = %user_name, reason = %e, "Login rejected");
                return Err(AuthzError::AuthenticationFailed);
            }
            Err(e) => {
                warn!(user = %user_name, error = %e, "Login failed");
                return Err(e.into());
            }
        };

        let renewed = self.sessions.renew(token).await?;
        self.sessions
            .bind(&renewed, &Identity::new(user.user_name.clone()))
            .await?;

        // the address is only recorded for a login that actually bound
        if let Err(e) = self.users.record_login(&user.user_name, address) {
            warn!(user = %user.user_name, error = %e, "Recording login failed");
            self.sessions.destroy(&renewed).await?;
            return Err(e.into());
        }

        info!(user = %user.user_name, address, "User logged in");
        Ok(renewed)
    }

    pub async fn logout(&self, token: &SessionToken) -> Result<()> {
        if let Some(identity) = self.sessions.identity(token).await? {
            info!(user = %identity.user_name, "User logged out");
        }
        self.sessions.destroy(token).await
    }

    /// Identity bound to `token`, if any
    pub async fn identity(&self, token: &SessionToken) -> Result<Option<Identity>> {
        self.sessions.identity(token).await
    }
}
