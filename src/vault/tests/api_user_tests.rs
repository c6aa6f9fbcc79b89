//! API key authenticator integration tests

use gatehouse_core::{secret, ApiKey};
use gatehouse_vault::api_user::{API_ID_BYTES, MIN_PROVISIONED_KEY_LEN};
use gatehouse_vault::{
    ApiKeyAuthenticator, ApiUser, ApiUserService, CredentialStore, StoreConfig, VaultError,
};
use tempfile::TempDir;

fn open(dir: &TempDir) -> (CredentialStore, ApiKeyAuthenticator) {
    let store = CredentialStore::open(StoreConfig::at_path(dir.path().join("db"))).unwrap();
    let api_users = ApiKeyAuthenticator::new(&store);
    (store, api_users)
}

fn provisioned(key: &str, name: &str) -> ApiUser {
    ApiUser {
        key: ApiKey::new(key),
        name: name.to_string(),
        id: Vec::new(),
        last_address: String::new(),
        roles: Vec::new(),
    }
}

// ============================================================================
// CREATE / LOOKUP
// ============================================================================

#[test]
fn test_create_and_lookup_by_key() {
    let dir = TempDir::new().unwrap();
    let (_store, api_users) = open(&dir);

    let svc = api_users.create("svc1").unwrap();
    assert_eq!(svc.id.len(), API_ID_BYTES);
    assert!(svc.key.len() >= 64);

    let found = api_users.api_user(&svc.key).unwrap();
    assert_eq!(found, svc);

    assert!(matches!(
        api_users.api_user(&ApiKey::new("unrelated")),
        Err(VaultError::NotFound(_))
    ));
}

#[test]
fn test_generated_keys_and_ids_are_distinct() {
    let dir = TempDir::new().unwrap();
    let (_store, api_users) = open(&dir);

    let a = api_users.create("svc").unwrap();
    let b = api_users.create("svc").unwrap();
    assert_ne!(a.key, b.key);
    assert_ne!(a.id, b.id);
    assert_eq!(api_users.api_users().unwrap().len(), 2);
}

#[test]
fn test_provisioned_key_duplicate_rejected() {
    let dir = TempDir::new().unwrap();
    let (store, api_users) = open(&dir);
    let key = "k".repeat(MIN_PROVISIONED_KEY_LEN);

    let first = api_users.create_with_key(provisioned(&key, "first")).unwrap();
    assert_eq!(first.id.len(), API_ID_BYTES);
    let before = store.api_keys().raw(key.as_bytes()).unwrap();

    let err = api_users
        .create_with_key(provisioned(&key, "second"))
        .unwrap_err();
    assert!(matches!(err, VaultError::AlreadyExists(_)));
    assert_eq!(store.api_keys().raw(key.as_bytes()).unwrap(), before);
    assert_eq!(api_users.api_user(&ApiKey::new(key)).unwrap().name, "first");
}

#[test]
fn test_short_provisioned_key_rejected() {
    let dir = TempDir::new().unwrap();
    let (_store, api_users) = open(&dir);

    let err = api_users
        .create_with_key(provisioned("short", "svc"))
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidInput(_)));
    assert!(api_users.api_users().unwrap().is_empty());
}

// ============================================================================
// ID SCAN
// ============================================================================

#[test]
fn test_lookup_by_id() {
    let dir = TempDir::new().unwrap();
    let (_store, api_users) = open(&dir);

    let created: Vec<ApiUser> = (0..5)
        .map(|i| api_users.create(&format!("svc{}", i)).unwrap())
        .collect();

    for api_user in &created {
        let found = api_users.api_user_by_id(&api_user.id_base64()).unwrap();
        assert_eq!(&found, api_user);
    }

    let unknown = secret::encode_base64(&[0u8; API_ID_BYTES]);
    assert!(matches!(
        api_users.api_user_by_id(&unknown),
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        api_users.api_user_by_id("not base64!"),
        Err(VaultError::InvalidInput(_))
    ));
}

// ============================================================================
// MUTATION
// ============================================================================

#[test]
fn test_update_never_changes_key_or_id() {
    let dir = TempDir::new().unwrap();
    let (_store, api_users) = open(&dir);
    let svc = api_users.create("svc1").unwrap();

    let mut edit = svc.clone();
    edit.name = "renamed".into();
    edit.roles = vec!["readers".into()];
    edit.id = vec![9, 9, 9];

    let updated = api_users.update(&edit).unwrap();
    assert_eq!(updated.key, svc.key);
    assert_eq!(updated.id, svc.id);
    assert_eq!(updated.name, "renamed");
    assert_eq!(updated.roles, vec!["readers".to_string()]);
}

#[test]
fn test_record_access_and_delete() {
    let dir = TempDir::new().unwrap();
    let (_store, api_users) = open(&dir);
    let svc = api_users.create("svc1").unwrap();

    api_users.record_access(&svc.key, "198.51.100.4").unwrap();
    assert_eq!(
        api_users.api_user(&svc.key).unwrap().last_address,
        "198.51.100.4"
    );

    api_users.delete(&svc.key).unwrap();
    api_users.delete(&svc.key).unwrap();
    assert!(matches!(
        api_users.api_user(&svc.key),
        Err(VaultError::NotFound(_))
    ));
    assert!(matches!(
        api_users.record_access(&svc.key, "198.51.100.4"),
        Err(VaultError::NotFound(_))
    ));
}

#[test]
fn test_keyspaces_are_independent() {
    let dir = TempDir::new().unwrap();
    let (store, api_users) = open(&dir);
    api_users.create("svc1").unwrap();

    assert_eq!(store.api_keys().len(), 1);
    assert!(store.users().is_empty());
}
