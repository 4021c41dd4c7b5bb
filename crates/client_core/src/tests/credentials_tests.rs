use std::sync::Arc;

use crate::{
    credentials::{
        Credential, CredentialHandle, CredentialPrompt, CredentialStore, FileCredentialStore,
        MemoryCredentialStore, PromptState, CREDENTIAL_FILE_NAME,
    },
    error::ClientError,
};

#[test]
fn credential_is_trimmed_and_redacted() {
    let credential = Credential::new("  abc123 \n").expect("credential");
    assert_eq!(credential.expose(), "abc123");
    assert_eq!(format!("{credential:?}"), "Credential(***)");
    assert!(matches!(
        Credential::new("   "),
        Err(ClientError::Validation(_))
    ));
}

#[test]
fn file_store_round_trips_under_fixed_key() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = FileCredentialStore::in_dir(&dir.path().join("nested"));
    assert!(store.load().expect("load").is_none());

    store
        .save(&Credential::new("abc123").expect("credential"))
        .expect("save");
    let raw = std::fs::read_to_string(dir.path().join("nested").join(CREDENTIAL_FILE_NAME))
        .expect("read file");
    let parsed: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(parsed["api_key"], "abc123");

    let reopened = FileCredentialStore::in_dir(&dir.path().join("nested"));
    assert_eq!(
        reopened.load().expect("load").map(|c| c.expose().to_string()),
        Some("abc123".to_string())
    );

    reopened.clear().expect("clear");
    assert!(reopened.load().expect("load").is_none());
    assert!(!reopened.path().exists());
}

#[test]
fn file_store_reports_corrupt_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CREDENTIAL_FILE_NAME);
    std::fs::write(&path, "not json").expect("write");

    let store = FileCredentialStore::new(&path);
    assert!(matches!(store.load(), Err(ClientError::Storage(_))));

    store
        .save(&Credential::new("fresh").expect("credential"))
        .expect("save overwrites");
    assert_eq!(
        store.load().expect("load").map(|c| c.expose().to_string()),
        Some("fresh".to_string())
    );
}

#[tokio::test]
async fn prompt_persists_token_across_simulated_reload() {
    let store = MemoryCredentialStore::default();

    let prompt = CredentialPrompt::initialize(
        Arc::new(store.clone()),
        CredentialHandle::default(),
    )
    .await
    .expect("init");
    assert_eq!(prompt.state().await, PromptState::Unset);

    prompt.submit("abc123").await.expect("submit");
    assert_eq!(prompt.state().await, PromptState::Set);
    drop(prompt);

    let handle = CredentialHandle::default();
    let reloaded = CredentialPrompt::initialize(Arc::new(store), Arc::clone(&handle))
        .await
        .expect("reload");
    assert_eq!(reloaded.state().await, PromptState::Set);
    assert_eq!(
        handle.read().await.as_ref().map(|c| c.expose().to_string()),
        Some("abc123".to_string())
    );
}

#[tokio::test]
async fn prompt_rejects_blank_input_and_stays_unset() {
    let store = MemoryCredentialStore::default();
    let prompt = CredentialPrompt::initialize(Arc::new(store.clone()), CredentialHandle::default())
        .await
        .expect("init");

    assert!(prompt.submit("   ").await.is_err());
    assert_eq!(prompt.state().await, PromptState::Unset);
    assert!(store.load().expect("load").is_none());
}

#[tokio::test]
async fn invalidate_rearms_prompt_and_clears_store() {
    let store = MemoryCredentialStore::default();
    store
        .save(&Credential::new("stale").expect("credential"))
        .expect("seed");
    let prompt = CredentialPrompt::initialize(Arc::new(store.clone()), CredentialHandle::default())
        .await
        .expect("init");
    assert_eq!(prompt.state().await, PromptState::Set);

    prompt.invalidate().await.expect("invalidate");
    assert_eq!(prompt.state().await, PromptState::Unset);
    assert!(store.load().expect("load").is_none());
}

#[tokio::test]
async fn prompt_starts_unset_over_corrupt_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join(CREDENTIAL_FILE_NAME), "not json").expect("write");
    let store = FileCredentialStore::in_dir(dir.path());

    let prompt = CredentialPrompt::initialize(Arc::new(store), CredentialHandle::default())
        .await
        .expect("init tolerates corrupt file");
    assert_eq!(prompt.state().await, PromptState::Unset);

    prompt.submit("fresh").await.expect("submit");
    assert_eq!(prompt.state().await, PromptState::Set);
}
