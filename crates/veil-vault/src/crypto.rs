//! # Vault Cryptography
//!
//! - **Key derivation**: Argon2id over the passphrase with a per-entry
//!   random 16-byte salt.
//! - **Encryption**: ChaCha20-Poly1305 with a random 12-byte nonce.
//!
//! ## At-Rest Format
//!
//! `v1:` followed by hex of `salt (16) || nonce (12) || ciphertext+tag`.
//!
//! ## Session Sealing
//!
//! Reads never return at-rest ciphertext. While unlocked, the vault hands
//! out `sealed:v1:` handles: the at-rest value re-encrypted under a random
//! key that lives only as long as the current unlock. Locking the vault
//! drops the key, so old handles become useless.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::aead::Aead;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use veil_core::SecretString;
use zeroize::Zeroizing;

use crate::config::KdfParams;
use crate::error::VaultError;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;

const AT_REST_PREFIX: &str = "v1:";
const SEALED_PREFIX: &str = "sealed:v1:";

fn derive_key(
    passphrase: &SecretString,
    salt: &[u8],
    kdf: &KdfParams,
) -> Result<Zeroizing<[u8; 32]>, VaultError> {
    let params = Params::new(kdf.memory_kib, kdf.iterations, kdf.parallelism, Some(32))
        .map_err(|e| VaultError::Crypto(format!("invalid Argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = Zeroizing::new([0u8; 32]);
    argon2
        .hash_password_into(passphrase.expose_secret().as_bytes(), salt, &mut key[..])
        .map_err(|e| VaultError::Crypto(format!("key derivation failed: {e}")))?;
    Ok(key)
}

fn random_bytes<const N: usize>() -> [u8; N] {
    let mut bytes = [0u8; N];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// Encrypt a private key for storage.
pub fn encrypt_private_key(
    passphrase: &SecretString,
    private_key: &SecretString,
    kdf: &KdfParams,
) -> Result<String, VaultError> {
    let salt: [u8; SALT_LEN] = random_bytes();
    let nonce: [u8; NONCE_LEN] = random_bytes();
    let key = derive_key(passphrase, &salt, kdf)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(
            Nonce::from_slice(&nonce),
            private_key.expose_secret().as_bytes(),
        )
        .map_err(|e| VaultError::Crypto(format!("encryption failed: {e}")))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(format!("{AT_REST_PREFIX}{}", hex::encode(blob)))
}

/// Decrypt a stored private key. A wrong passphrase yields
/// [`VaultError::Decryption`].
pub fn decrypt_private_key(
    passphrase: &SecretString,
    encrypted: &str,
    kdf: &KdfParams,
) -> Result<SecretString, VaultError> {
    let blob = encrypted
        .strip_prefix(AT_REST_PREFIX)
        .ok_or_else(|| VaultError::Storage("unknown encrypted key format".into()))
        .and_then(|h| {
            hex::decode(h).map_err(|e| VaultError::Storage(format!("encrypted key is not hex: {e}")))
        })?;
    if blob.len() <= SALT_LEN + NONCE_LEN {
        return Err(VaultError::Storage("encrypted key is truncated".into()));
    }
    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(passphrase, salt, kdf)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let plaintext = Zeroizing::new(
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| VaultError::Decryption("wrong passphrase".into()))?,
    );
    let text = std::str::from_utf8(&plaintext)
        .map_err(|_| VaultError::Storage("decrypted key is not UTF-8".into()))?;
    Ok(SecretString::new(text))
}

/// Per-unlock sealing key. Zeroized on drop.
pub struct SessionSealer {
    key: Zeroizing<[u8; 32]>,
}

impl SessionSealer {
    pub fn new() -> Self {
        Self {
            key: Zeroizing::new(random_bytes()),
        }
    }

    /// Seal a value into an opaque handle.
    pub fn seal(&self, value: &str) -> Result<String, VaultError> {
        let nonce: [u8; NONCE_LEN] = random_bytes();
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key[..]));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), value.as_bytes())
            .map_err(|e| VaultError::Crypto(format!("sealing failed: {e}")))?;
        let mut blob = nonce.to_vec();
        blob.extend_from_slice(&ciphertext);
        Ok(format!("{SEALED_PREFIX}{}", hex::encode(blob)))
    }

    /// Open a handle produced by [`SessionSealer::seal`] on this sealer.
    pub fn open(&self, handle: &str) -> Result<String, VaultError> {
        let not_ours = || VaultError::Decryption("handle does not belong to this session".into());
        let blob = handle
            .strip_prefix(SEALED_PREFIX)
            .and_then(|h| hex::decode(h).ok())
            .filter(|b| b.len() > NONCE_LEN)
            .ok_or_else(not_ours)?;
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);
        let cipher = ChaCha20Poly1305::new(Key::from_slice(&self.key[..]));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| not_ours())?;
        String::from_utf8(plaintext).map_err(|_| not_ours())
    }
}

impl Default for SessionSealer {
    fn default() -> Self {
        Self::new()
    }
}
