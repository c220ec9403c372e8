//! End-to-end identity derivation: one wallet signature, every variant.

use veil_core::{
    verify_direct_signature, CanonicalBytes, DirectKeyIdentity, DirectKeyPair, FieldElement,
    IdentityKind, IdentityRecord, IdentityRef, IdentitySecret, MembershipIdentity, MerklePath,
    MessageDigest, SecretString,
};

const WALLET_SIG: &[u8] = b"0x5f2a...signed-identity-creation-message";

#[test]
fn signature_reproduces_membership_identity() {
    let first = IdentitySecret::from_signature(WALLET_SIG, 0).unwrap();
    let record = MembershipIdentity::from_secret(&first, 0, Some("0xabc".into()), "twitter", "gold");

    // Reload from the serialized secret and confirm it is the same leaf.
    let reparsed = IdentitySecret::parse(record.serialized_secret.expose_secret()).unwrap();
    assert_eq!(reparsed.commitment(), record.identity_commitment);

    let again = IdentitySecret::from_signature(WALLET_SIG, 0).unwrap();
    assert_eq!(again.commitment(), record.identity_commitment);
}

#[test]
fn direct_key_identity_signs_canonical_messages() {
    let kp = DirectKeyPair::from_signature(WALLET_SIG, 0).unwrap();
    let record = IdentityRecord::DirectKey(DirectKeyIdentity {
        address: Some("0xabc".into()),
        nonce: 0,
        public_key: kp.public_key_hex(),
        private_key: kp.private_key(),
    });
    assert_eq!(record.kind(), IdentityKind::DirectKey);

    let msg = serde_json::json!({"content": "gm", "type": "POST"});
    let bytes = CanonicalBytes::new(&msg).unwrap();
    let sig = kp.sign(bytes.as_bytes());
    let IdentityRef::PublicKey(pk) = record.reference() else {
        panic!("direct-key identities are referenced by public key");
    };
    verify_direct_signature(&pk, bytes.as_bytes(), &sig).unwrap();
}

#[test]
fn cached_path_belongs_to_commitment() {
    let secret = IdentitySecret::generate();
    let mut record = IdentityRecord::Membership(MembershipIdentity::from_secret(
        &secret, 1, None, "github", "silver",
    ));
    let group = record.group().unwrap().group_id();
    let path = MerklePath {
        siblings: vec![FieldElement::from_u64(11); 20],
        path_indices: vec![0; 20],
        root: FieldElement::from_u64(12345),
        leaf: *secret.commitment().as_field(),
        group: group.clone(),
    };
    path.validate().unwrap();
    assert!(path.is_for(&secret.commitment()));
    record.set_identity_path(Some(path));
    assert_eq!(record.identity_path().unwrap().group, group);
}

#[test]
fn digests_differ_per_message() {
    let a = MessageDigest::of_value(&serde_json::json!({"content": "a"})).unwrap();
    let b = MessageDigest::of_value(&serde_json::json!({"content": "b"})).unwrap();
    assert_ne!(a.to_field(), b.to_field());
}

#[test]
fn secret_string_is_transparent_on_the_wire() {
    let s = SecretString::new("abc");
    assert_eq!(serde_json::to_string(&s).unwrap(), "\"abc\"");
    assert_eq!(format!("{s:?}"), "SecretString([REDACTED])");
}
