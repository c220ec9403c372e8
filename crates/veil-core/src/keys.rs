//! # Direct-Key Keypairs
//!
//! Direct-key identities authenticate messages with an Ed25519 signature
//! instead of a membership proof. The private key is the 32-byte seed,
//! hex-encoded; the public key is the 32-byte verifying key, hex-encoded.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::IdentityError;
use crate::identity::SecretString;

const DOMAIN_DIRECT_KEY: &[u8] = b"veil/direct-key";

/// An Ed25519 keypair for a Direct-key identity. Zeroized on drop.
pub struct DirectKeyPair {
    key: SigningKey,
}

impl DirectKeyPair {
    /// Fresh random keypair.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut rand::rngs::OsRng),
        }
    }

    /// Deterministic keypair from a wallet signature and nonce.
    pub fn from_signature(signature: &[u8], nonce: u64) -> Result<Self, IdentityError> {
        if signature.is_empty() {
            return Err(IdentityError::Signature(
                "signature must not be empty".to_string(),
            ));
        }
        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_DIRECT_KEY);
        hasher.update(nonce.to_be_bytes());
        hasher.update(signature);
        let mut seed = [0u8; 32];
        seed.copy_from_slice(&hasher.finalize());
        let key = SigningKey::from_bytes(&seed);
        zeroize::Zeroize::zeroize(&mut seed);
        Ok(Self { key })
    }

    /// Load from a 64-character hex seed.
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self, IdentityError> {
        let mut bytes = hex::decode(seed_hex)
            .map_err(|e| IdentityError::Signature(format!("private key is not hex: {e}")))?;
        let seed: [u8; 32] = bytes.as_slice().try_into().map_err(|_| {
            IdentityError::Signature(format!(
                "expected 32 bytes (64 hex chars), got {} bytes",
                bytes.len()
            ))
        })?;
        zeroize::Zeroize::zeroize(&mut bytes);
        Ok(Self {
            key: SigningKey::from_bytes(&seed),
        })
    }

    /// Hex-encoded verifying key.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().as_bytes())
    }

    /// Hex-encoded seed, wrapped so it never prints.
    pub fn private_key(&self) -> SecretString {
        SecretString::new(hex::encode(self.key.to_bytes()))
    }

    /// Sign `payload`, returning the 64-byte signature as hex.
    pub fn sign(&self, payload: &[u8]) -> String {
        hex::encode(self.key.sign(payload).to_bytes())
    }
}

impl std::fmt::Debug for DirectKeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectKeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Verify a hex signature over `payload` against a hex public key.
pub fn verify_direct_signature(
    public_key_hex: &str,
    payload: &[u8],
    signature_hex: &str,
) -> Result<(), IdentityError> {
    let pk_bytes: [u8; 32] = hex::decode(public_key_hex)
        .map_err(|e| IdentityError::Signature(format!("public key is not hex: {e}")))?
        .try_into()
        .map_err(|_| IdentityError::Signature("public key must be 32 bytes".to_string()))?;
    let vk = VerifyingKey::from_bytes(&pk_bytes)
        .map_err(|e| IdentityError::Signature(format!("invalid public key: {e}")))?;
    let sig_bytes: [u8; 64] = hex::decode(signature_hex)
        .map_err(|e| IdentityError::Signature(format!("signature is not hex: {e}")))?
        .try_into()
        .map_err(|_| IdentityError::Signature("signature must be 64 bytes".to_string()))?;
    vk.verify(payload, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| IdentityError::Signature("signature does not verify".to_string()))
}
