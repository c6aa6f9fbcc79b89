//! Login flow tests

use async_trait::async_trait;
use gatehouse_authz::{AuthzError, LoginService, MemorySessions, SessionBinder, SessionToken};
use gatehouse_core::{Identity, UserName};
use gatehouse_vault::{
    CredentialStore, PasswordAuthenticator, PasswordConfig, User, UserService,
};
use std::sync::Arc;

/// Sessions whose token renewal always fails
struct RenewFails(MemorySessions);

#[async_trait]
impl SessionBinder for RenewFails {
    async fn add(&self, token: &SessionToken, key: &str, value: Vec<u8>) -> gatehouse_authz::Result<()> {
        self.0.add(token, key, value).await
    }

    async fn load(&self, token: &SessionToken, key: &str) -> gatehouse_authz::Result<Option<Vec<u8>>> {
        self.0.load(token, key).await
    }

    async fn renew(&self, _token: &SessionToken) -> gatehouse_authz::Result<SessionToken> {
        Err(AuthzError::Session("renewal unavailable".into()))
    }

    async fn destroy(&self, token: &SessionToken) -> gatehouse_authz::Result<()> {
        self.0.destroy(token).await
    }

    async fn pop_load(&self, token: &SessionToken, key: &str) -> gatehouse_authz::Result<Option<Vec<u8>>> {
        self.0.pop_load(token, key).await
    }
}

struct Fixture {
    _store: CredentialStore,
    users: Arc<PasswordAuthenticator>,
    sessions: MemorySessions,
    login: LoginService<MemorySessions>,
}

fn fixture() -> Fixture {
    let store = CredentialStore::open_temporary().unwrap();
    let users =
        Arc::new(PasswordAuthenticator::new(&store, PasswordConfig::insecure_for_tests()).unwrap());
    users.create(&User::new("root"), "password").unwrap();

    let sessions = MemorySessions::new();
    let login = LoginService::new(users.clone(), sessions.clone());
    Fixture {
        _store: store,
        users,
        sessions,
        login,
    }
}

#[tokio::test]
async fn test_login_renews_token_and_binds_identity() {
    let fx = fixture();
    let anonymous = fx.sessions.start().unwrap();

    let token = fx
        .login
        .login(&anonymous, "root", "password", "203.0.113.9")
        .await
        .unwrap();

    assert_ne!(token, anonymous);
    assert!(!fx.sessions.contains(&anonymous));
    assert_eq!(
        fx.login.identity(&token).await.unwrap(),
        Some(Identity::new("root"))
    );
    assert_eq!(
        fx.users.user(&UserName::from("root")).unwrap().last_address,
        "203.0.113.9"
    );
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let fx = fixture();
    let token = fx.sessions.start().unwrap();

    let wrong_password = fx.login.login(&token, "root", "nope", "x").await;
    let unknown_user = fx.login.login(&token, "ghost", "password", "x").await;

    assert!(matches!(wrong_password, Err(AuthzError::AuthenticationFailed)));
    assert!(matches!(unknown_user, Err(AuthzError::AuthenticationFailed)));
    assert_eq!(
        wrong_password.unwrap_err().to_string(),
        unknown_user.unwrap_err().to_string()
    );

    // nothing bound, token untouched
    assert!(fx.sessions.contains(&token));
    assert_eq!(fx.login.identity(&token).await.unwrap(), None);
    assert_eq!(
        fx.users.user(&UserName::from("root")).unwrap().last_address,
        ""
    );
}

#[tokio::test]
async fn test_failed_renewal_records_no_address() {
    let store = CredentialStore::open_temporary().unwrap();
    let users =
        Arc::new(PasswordAuthenticator::new(&store, PasswordConfig::insecure_for_tests()).unwrap());
    users.create(&User::new("root"), "password").unwrap();

    let sessions = MemorySessions::new();
    let login = LoginService::new(users.clone(), RenewFails(sessions.clone()));
    let token = sessions.start().unwrap();

    let result = login.login(&token, "root", "password", "198.51.100.4").await;
    assert!(matches!(result, Err(AuthzError::Session(_))));
    assert_eq!(login.identity(&token).await.unwrap(), None);
    assert_eq!(
        users.user(&UserName::from("root")).unwrap().last_address,
        ""
    );
}

#[tokio::test]
async fn test_logout_destroys_session() {
    let fx = fixture();
    let start = fx.sessions.start().unwrap();
    let token = fx.login.login(&start, "root", "password", "x").await.unwrap();

    fx.login.logout(&token).await.unwrap();
    assert_eq!(fx.login.identity(&token).await.unwrap(), None);
    assert!(fx.sessions.is_empty());

    // logging out twice is harmless
    fx.login.logout(&token).await.unwrap();
}

#[tokio::test]
async fn test_shared_binder_through_arc() {
    let store = CredentialStore::open_temporary().unwrap();
    let users =
        Arc::new(PasswordAuthenticator::new(&store, PasswordConfig::insecure_for_tests()).unwrap());
    users.create(&User::new("root"), "password").unwrap();

    let binder: Arc<dyn SessionBinder> = Arc::new(MemorySessions::new());
    let login = LoginService::new(users, binder.clone());

    let token = login
        .login(&SessionToken::new("fresh"), "root", "password", "x")
        .await
        .unwrap();
    assert!(binder.load(&token, "user").await.unwrap().is_some());
}
