//! Behavioural tests for the vault service through its RPC handle.

use std::sync::Arc;

use serde_json::json;
use veil_core::{
    verify_direct_signature, DirectKeyIdentity, DirectKeyPair, IdentityRecord, IdentityRef,
    IdentitySecret, MembershipIdentity, SecretString,
};
use veil_vault::{
    EntryStore, KdfParams, MemoryEntryStore, VaultConfig, VaultError, VaultEvent, VaultHandle,
    VaultService,
};

fn spawn() -> (VaultHandle, Arc<MemoryEntryStore>) {
    let store = Arc::new(MemoryEntryStore::new());
    let handle = VaultService::spawn_with_store(store.clone(), KdfParams::insecure_for_tests());
    (handle, store)
}

fn direct(address: &str, public_key: &str, private_key: &str) -> IdentityRecord {
    IdentityRecord::DirectKey(DirectKeyIdentity {
        address: Some(address.into()),
        nonce: 0,
        public_key: public_key.into(),
        private_key: SecretString::new(private_key),
    })
}

fn private_key_of(record: &IdentityRecord) -> &SecretString {
    match record {
        IdentityRecord::DirectKey(d) => &d.private_key,
        other => panic!("expected direct_key, got {other:?}"),
    }
}

#[tokio::test]
async fn hunter2_scenario() {
    let (vault, _) = spawn();
    assert_eq!(vault.unlock("hunter2").await.unwrap(), 0);

    vault
        .add_identity_json(json!({
            "type": "direct_key",
            "address": "0xabc",
            "nonce": 0,
            "publicKey": "pub1",
            "privateKey": "secret1"
        }))
        .await
        .unwrap();

    let listed = vault.list_identities().await.unwrap();
    assert_eq!(listed.len(), 1);
    match &listed[0] {
        IdentityRecord::DirectKey(d) => {
            assert_eq!(d.public_key, "pub1");
            assert!(d.private_key.is_empty());
        }
        other => panic!("unexpected {other:?}"),
    }

    let fetched = vault.get_by_address("0xabc").await.unwrap().unwrap();
    let handle = private_key_of(&fetched);
    assert!(!handle.is_empty());
    assert_ne!(handle.expose_secret(), "secret1");
    assert!(!handle.expose_secret().contains("secret1"));

    let revealed = vault
        .reveal_private_key(handle.expose_secret())
        .await
        .unwrap();
    assert_eq!(revealed.expose_secret(), "secret1");
}

#[tokio::test]
async fn unlock_with_other_passphrase_fails_whole_vault() {
    let (vault, _) = spawn();
    vault.unlock("hunter2").await.unwrap();
    vault.add_identity(direct("0xabc", "pub1", "secret1")).await.unwrap();
    vault.add_identity(direct("0xdef", "pub2", "secret2")).await.unwrap();
    vault.lock().await.unwrap();

    let err = vault.unlock("hunter3").await.unwrap_err();
    assert!(matches!(err, VaultError::Decryption(_)), "got {err:?}");
    assert!(!vault.status().await.unwrap().unlocked);

    assert_eq!(vault.unlock("hunter2").await.unwrap(), 2);
}

#[tokio::test]
async fn mixed_passphrase_entries_are_all_or_nothing() {
    let (vault, store) = spawn();
    vault.unlock("one").await.unwrap();
    vault.add_identity(direct("0xa", "pub1", "k1")).await.unwrap();
    vault.lock().await.unwrap();
    vault.unlock("one").await.unwrap();

    // Simulate corrupted state: one entry under a different passphrase.
    let foreign = veil_vault::crypto::encrypt_private_key(
        &SecretString::new("two"),
        &SecretString::new("k2"),
        &KdfParams::insecure_for_tests(),
    )
    .unwrap();
    store
        .upsert(veil_vault::VaultEntry {
            address: Some("0xb".into()),
            nonce: 0,
            public_key: "pub2".into(),
            encrypted_private_key: foreign,
        })
        .unwrap();
    vault.lock().await.unwrap();

    assert!(matches!(
        vault.unlock("one").await,
        Err(VaultError::Decryption(_))
    ));
    assert!(matches!(
        vault.unlock("two").await,
        Err(VaultError::Decryption(_))
    ));
    assert!(!vault.status().await.unwrap().unlocked);
}

#[tokio::test]
async fn add_identity_twice_overwrites() {
    let (vault, _) = spawn();
    vault.unlock("p").await.unwrap();
    vault.add_identity(direct("0xabc", "pub1", "first")).await.unwrap();
    vault.add_identity(direct("0xabc", "pub1", "second")).await.unwrap();

    assert_eq!(vault.list_identities().await.unwrap().len(), 1);
    let fetched = vault.get_by_address("0xabc").await.unwrap().unwrap();
    let revealed = vault
        .reveal_private_key(private_key_of(&fetched).expose_secret())
        .await
        .unwrap();
    assert_eq!(revealed.expose_secret(), "second");
}

fn public_key_of(record: &IdentityRecord) -> &str {
    match record {
        IdentityRecord::DirectKey(d) => &d.public_key,
        other => panic!("expected direct_key, got {other:?}"),
    }
}

#[tokio::test]
async fn shared_address_resolves_to_whoever_still_holds_it() {
    let (vault, _) = spawn();
    vault.unlock("p").await.unwrap();
    vault.add_identity(direct("0xAAA", "pub1", "k1")).await.unwrap();
    vault.add_identity(direct("0xaaa", "pub2", "k2")).await.unwrap();

    vault.add_identity(direct("0xbbb", "pub1", "k1")).await.unwrap();
    let fetched = vault.get_by_address("0xaaa").await.unwrap().unwrap();
    assert_eq!(public_key_of(&fetched), "pub2");

    vault.add_identity(direct("0xbbb", "pub2", "k2")).await.unwrap();
    assert!(vault.get_by_address("0xAAA").await.unwrap().is_none());
    let fetched = vault.get_by_address("0xBBB").await.unwrap().unwrap();
    assert_eq!(public_key_of(&fetched), "pub2");
}

#[tokio::test]
async fn add_on_locked_vault_fails_and_changes_nothing() {
    let (vault, store) = spawn();
    vault.unlock("p").await.unwrap();
    vault.add_identity(direct("0xabc", "pub1", "k")).await.unwrap();
    vault.lock().await.unwrap();
    let before = store.load_all().unwrap();

    let err = vault
        .add_identity(direct("0xdef", "pub2", "k2"))
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::Locked));
    assert_eq!(store.load_all().unwrap(), before);
}

#[tokio::test]
async fn validation_rejects_incomplete_records() {
    let (vault, _) = spawn();
    vault.unlock("p").await.unwrap();

    let missing_private = vault.add_identity(direct("0xa", "pub1", "")).await;
    assert!(matches!(missing_private, Err(VaultError::Validation(_))));

    let missing_public = vault.add_identity(direct("0xa", " ", "k")).await;
    assert!(matches!(missing_public, Err(VaultError::Validation(_))));

    let negative_nonce = vault
        .add_identity_json(json!({
            "type": "direct_key", "nonce": -3, "publicKey": "p", "privateKey": "k"
        }))
        .await;
    assert!(matches!(negative_nonce, Err(VaultError::Validation(_))));

    let secret = IdentitySecret::generate();
    let membership = IdentityRecord::Membership(MembershipIdentity::from_secret(
        &secret, 0, None, "twitter", "gold",
    ));
    assert!(matches!(
        vault.add_identity(membership).await,
        Err(VaultError::Validation(_))
    ));
    assert!(vault.list_identities().await.unwrap().is_empty());
}

#[tokio::test]
async fn reads_work_while_locked_without_secrets() {
    let (vault, _) = spawn();
    vault.unlock("p").await.unwrap();
    vault.add_identity(direct("0xabc", "pub1", "k")).await.unwrap();
    let unlocked_handle = vault.get_by_address("0xabc").await.unwrap().unwrap();
    vault.lock().await.unwrap();

    let listed = vault.list_identities().await.unwrap();
    assert_eq!(listed.len(), 1);
    let fetched = vault.get_by_address("0xabc").await.unwrap().unwrap();
    assert!(private_key_of(&fetched).is_empty());
    assert!(vault.get_by_address("0xnone").await.unwrap().is_none());

    // Handles from the previous session are dead.
    vault.unlock("p").await.unwrap();
    let stale = vault
        .reveal_private_key(private_key_of(&unlocked_handle).expose_secret())
        .await;
    assert!(matches!(stale, Err(VaultError::Decryption(_))));
}

#[tokio::test]
async fn selection_does_not_require_unlock() {
    let (vault, _) = spawn();
    vault.unlock("p").await.unwrap();
    vault.add_identity(direct("0xabc", "pub1", "k")).await.unwrap();
    vault.lock().await.unwrap();

    vault
        .select_identity(IdentityRef::PublicKey("pub1".into()))
        .await
        .unwrap();
    let status = vault.status().await.unwrap();
    assert!(!status.unlocked);
    assert_eq!(status.selected, Some(IdentityRef::PublicKey("pub1".into())));
    let current = status.current_identity.unwrap();
    assert!(private_key_of(&current).is_empty());

    let commitment = IdentitySecret::generate().commitment();
    vault
        .select_identity(IdentityRef::Commitment(commitment))
        .await
        .unwrap();
    let status = vault.status().await.unwrap();
    assert_eq!(status.selected, Some(IdentityRef::Commitment(commitment)));
    assert!(status.current_identity.is_none());

    let unknown = vault
        .select_identity(IdentityRef::PublicKey("nope".into()))
        .await;
    assert!(matches!(unknown, Err(VaultError::NotFound(_))));
}

#[tokio::test]
async fn observers_see_changes() {
    let (vault, _) = spawn();
    let mut events = vault.subscribe();
    vault.unlock("p").await.unwrap();
    vault.add_identity(direct("0xabc", "pub1", "k")).await.unwrap();
    vault.lock().await.unwrap();

    assert_eq!(events.recv().await.unwrap(), VaultEvent::Unlocked);
    assert_eq!(
        events.recv().await.unwrap(),
        VaultEvent::IdentitiesChanged { count: 1 }
    );
    assert_eq!(events.recv().await.unwrap(), VaultEvent::Locked);
}

#[tokio::test]
async fn sign_inside_the_vault() {
    let (vault, _) = spawn();
    vault.unlock("p").await.unwrap();
    let kp = DirectKeyPair::generate();
    let pk = kp.public_key_hex();
    vault
        .add_identity(IdentityRecord::DirectKey(DirectKeyIdentity {
            address: None,
            nonce: 0,
            public_key: pk.clone(),
            private_key: kp.private_key(),
        }))
        .await
        .unwrap();

    let sig = vault.sign(pk.clone(), b"gm".to_vec()).await.unwrap();
    verify_direct_signature(&pk, b"gm", &sig).unwrap();

    vault.add_identity(direct("0xabc", "pub1", "secret1")).await.unwrap();
    assert!(matches!(
        vault.sign("pub1", b"gm".to_vec()).await,
        Err(VaultError::Validation(_))
    ));

    vault.lock().await.unwrap();
    assert!(matches!(
        vault.sign(pk, b"gm".to_vec()).await,
        Err(VaultError::Locked)
    ));
}

#[tokio::test]
async fn empty_passphrase_rejected() {
    let (vault, _) = spawn();
    assert!(matches!(
        vault.unlock("").await,
        Err(VaultError::Validation(_))
    ));
}

#[tokio::test]
async fn file_backed_vault_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = VaultConfig {
        path: Some(dir.path().join("vault.json")),
        kdf: KdfParams::insecure_for_tests(),
    };

    {
        let vault = VaultService::spawn(&config).unwrap();
        vault.unlock("hunter2").await.unwrap();
        vault.add_identity(direct("0xabc", "pub1", "secret1")).await.unwrap();
    }

    let raw = std::fs::read_to_string(dir.path().join("vault.json")).unwrap();
    assert!(raw.contains("encryptedPrivateKey"));
    assert!(!raw.contains("secret1"));

    let vault = VaultService::spawn(&config).unwrap();
    assert!(!vault.status().await.unwrap().unlocked);
    assert!(vault.unlock("wrong").await.is_err());
    assert_eq!(vault.unlock("hunter2").await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_callers_get_their_own_answers() {
    let (vault, _) = spawn();
    vault.unlock("p").await.unwrap();
    let mut tasks = Vec::new();
    for i in 0..8 {
        let vault = vault.clone();
        tasks.push(tokio::spawn(async move {
            let address = format!("0x{i}");
            vault
                .add_identity(direct(&address, &format!("pub{i}"), "k"))
                .await
                .unwrap();
            vault.get_by_address(address.clone()).await.unwrap().unwrap()
        }));
    }
    for (i, task) in tasks.into_iter().enumerate() {
        let record = task.await.unwrap();
        assert_eq!(record.address(), Some(format!("0x{i}").as_str()));
    }
    assert_eq!(vault.list_identities().await.unwrap().len(), 8);
}
