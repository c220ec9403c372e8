//! # Vault Service
//!
//! The vault runs as a single tokio task that owns the lock state, the
//! selection, and the entry store. Callers talk to it only through a
//! [`VaultHandle`], which sends [`VaultRequest`]s over an mpsc channel and
//! waits for the correlated [`VaultResponse`].
//!
//! Requests are processed one at a time, so `unlock` and `add_identity`
//! can never interleave against a stale passphrase. Argon2 work runs on the
//! blocking pool to keep the runtime's worker threads free.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use uuid::Uuid;
use veil_core::{
    DirectKeyIdentity, DirectKeyPair, IdentityRecord, IdentityRef, SecretString,
};

use crate::config::{KdfParams, VaultConfig};
use crate::crypto::{decrypt_private_key, encrypt_private_key, SessionSealer};
use crate::error::VaultError;
use crate::protocol::{
    VaultCommand, VaultEvent, VaultReply, VaultRequest, VaultResponse, VaultStatus,
};
use crate::store::{EntryStore, JsonFileEntryStore, MemoryEntryStore, VaultEntry};

const REQUEST_QUEUE: usize = 64;
const EVENT_BUFFER: usize = 64;

/// Volatile passphrase state. Never persisted.
#[derive(Default)]
struct LockState {
    passphrase: Option<SecretString>,
    sealer: Option<SessionSealer>,
}

impl LockState {
    fn unlocked(passphrase: SecretString) -> Self {
        Self {
            passphrase: Some(passphrase),
            sealer: Some(SessionSealer::new()),
        }
    }

    fn passphrase(&self) -> Result<&SecretString, VaultError> {
        self.passphrase.as_ref().ok_or(VaultError::Locked)
    }

    fn sealer(&self) -> Result<&SessionSealer, VaultError> {
        self.sealer.as_ref().ok_or(VaultError::Locked)
    }

    fn is_unlocked(&self) -> bool {
        self.passphrase.is_some()
    }
}

/// The task-side half of the vault.
pub struct VaultService {
    store: Arc<dyn EntryStore>,
    kdf: KdfParams,
    lock: LockState,
    selected: Option<IdentityRef>,
    events: broadcast::Sender<VaultEvent>,
}

impl VaultService {
    /// Open the configured store and start the service.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(config: &VaultConfig) -> Result<VaultHandle, VaultError> {
        let store: Arc<dyn EntryStore> = match &config.path {
            Some(path) => Arc::new(JsonFileEntryStore::open(path)?),
            None => Arc::new(MemoryEntryStore::new()),
        };
        Ok(Self::spawn_with_store(store, config.kdf))
    }

    /// Start the service over an explicit store.
    pub fn spawn_with_store(store: Arc<dyn EntryStore>, kdf: KdfParams) -> VaultHandle {
        let (tx, rx) = mpsc::channel(REQUEST_QUEUE);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let service = Self {
            store,
            kdf,
            lock: LockState::default(),
            selected: None,
            events: events.clone(),
        };
        tokio::spawn(service.run(rx));
        VaultHandle { tx, events }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<VaultRequest>) {
        tracing::debug!("vault service started");
        while let Some(request) = rx.recv().await {
            let op = request.command.name();
            let result = self.handle(request.command).await;
            match &result {
                Ok(_) => tracing::debug!(request_id = %request.id, op, "vault request ok"),
                Err(e) => tracing::warn!(request_id = %request.id, op, error = %e, "vault request failed"),
            }
            // The caller may have given up; nothing to do then.
            let _ = request.reply.send(VaultResponse {
                id: request.id,
                result,
            });
        }
        tracing::debug!("vault service stopped");
    }

    async fn handle(&mut self, command: VaultCommand) -> Result<VaultReply, VaultError> {
        match command {
            VaultCommand::Unlock { passphrase } => self.unlock(passphrase).await,
            VaultCommand::Lock => {
                self.lock = LockState::default();
                self.emit(VaultEvent::Locked);
                Ok(VaultReply::Done)
            }
            VaultCommand::AddIdentity { record } => self.add_identity(record).await,
            VaultCommand::ListIdentities => {
                let records = self.store.load_all()?.into_iter().map(redacted).collect();
                Ok(VaultReply::Identities(records))
            }
            VaultCommand::GetByAddress { address } => self.get_by_address(&address),
            VaultCommand::SelectIdentity { reference } => self.select(reference),
            VaultCommand::Status => self.status().map(VaultReply::Status),
            VaultCommand::RevealPrivateKey { handle } => self.reveal(&handle).await,
            VaultCommand::Sign {
                public_key,
                payload,
            } => self.sign(&public_key, payload).await,
        }
    }

    async fn unlock(&mut self, passphrase: SecretString) -> Result<VaultReply, VaultError> {
        if passphrase.is_empty() {
            return Err(VaultError::Validation("passphrase must not be empty".into()));
        }
        let entries = self.store.load_all()?;
        let count = entries.len();
        let kdf = self.kdf;
        let candidate = passphrase.clone();
        blocking(move || {
            for entry in &entries {
                decrypt_private_key(&candidate, &entry.encrypted_private_key, &kdf).map_err(
                    |e| match e {
                        VaultError::Decryption(_) => VaultError::Decryption(format!(
                            "passphrase does not decrypt identity {}",
                            entry.public_key
                        )),
                        other => other,
                    },
                )?;
            }
            Ok(())
        })
        .await?;

        self.lock = LockState::unlocked(passphrase);
        tracing::info!(entries = count, "vault unlocked");
        self.emit(VaultEvent::Unlocked);
        Ok(VaultReply::Unlocked { entries: count })
    }

    async fn add_identity(&mut self, record: IdentityRecord) -> Result<VaultReply, VaultError> {
        let passphrase = self.lock.passphrase()?.clone();
        let kind = record.kind();
        let IdentityRecord::DirectKey(identity) = record else {
            return Err(VaultError::Validation(format!(
                "only direct_key identities are stored in the vault, got {kind}"
            )));
        };
        if identity.public_key.trim().is_empty() {
            return Err(VaultError::Validation("publicKey is required".into()));
        }
        if identity.private_key.is_empty() {
            return Err(VaultError::Validation("privateKey is required".into()));
        }

        let DirectKeyIdentity {
            address,
            nonce,
            public_key,
            private_key,
        } = identity;
        let kdf = self.kdf;
        let encrypted_private_key =
            blocking(move || encrypt_private_key(&passphrase, &private_key, &kdf)).await?;

        self.store.upsert(VaultEntry {
            address,
            nonce,
            public_key: public_key.clone(),
            encrypted_private_key,
        })?;
        let count = self.store.load_all()?.len();
        tracing::info!(public_key = %public_key, count, "identity stored");
        self.emit(VaultEvent::IdentitiesChanged { count });
        Ok(VaultReply::Done)
    }

    fn get_by_address(&self, address: &str) -> Result<VaultReply, VaultError> {
        let Some(entry) = self.store.find_by_address(address)? else {
            return Ok(VaultReply::Identity(None));
        };
        let sealed = match self.lock.sealer() {
            Ok(sealer) => Some(SecretString::new(sealer.seal(&entry.encrypted_private_key)?)),
            Err(_) => None,
        };
        let mut record = redacted(entry);
        if let (Some(handle), IdentityRecord::DirectKey(identity)) = (sealed, &mut record) {
            identity.private_key = handle;
        }
        Ok(VaultReply::Identity(Some(record)))
    }

    fn select(&mut self, reference: IdentityRef) -> Result<VaultReply, VaultError> {
        if let IdentityRef::PublicKey(pk) = &reference {
            if self.store.get(pk)?.is_none() {
                return Err(VaultError::NotFound(pk.clone()));
            }
        }
        self.selected = Some(reference.clone());
        self.emit(VaultEvent::SelectionChanged(Some(reference)));
        Ok(VaultReply::Done)
    }

    fn status(&self) -> Result<VaultStatus, VaultError> {
        let current_identity = match &self.selected {
            Some(IdentityRef::PublicKey(pk)) => self.store.get(pk)?.map(redacted),
            _ => None,
        };
        Ok(VaultStatus {
            unlocked: self.lock.is_unlocked(),
            selected: self.selected.clone(),
            current_identity,
        })
    }

    async fn reveal(&self, handle: &str) -> Result<VaultReply, VaultError> {
        let passphrase = self.lock.passphrase()?.clone();
        let encrypted = self.lock.sealer()?.open(handle)?;
        let kdf = self.kdf;
        let secret = blocking(move || decrypt_private_key(&passphrase, &encrypted, &kdf)).await?;
        Ok(VaultReply::Secret(secret))
    }

    async fn sign(&self, public_key: &str, payload: Vec<u8>) -> Result<VaultReply, VaultError> {
        let passphrase = self.lock.passphrase()?.clone();
        let entry = self
            .store
            .get(public_key)?
            .ok_or_else(|| VaultError::NotFound(public_key.to_string()))?;
        let kdf = self.kdf;
        let signature = blocking(move || {
            let seed = decrypt_private_key(&passphrase, &entry.encrypted_private_key, &kdf)?;
            let keypair = DirectKeyPair::from_seed_hex(seed.expose_secret()).map_err(|_| {
                VaultError::Validation("privateKey is not an Ed25519 seed".into())
            })?;
            Ok(keypair.sign(&payload))
        })
        .await?;
        Ok(VaultReply::Signature(signature))
    }

    fn emit(&self, event: VaultEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

fn redacted(entry: VaultEntry) -> IdentityRecord {
    IdentityRecord::DirectKey(DirectKeyIdentity {
        address: entry.address,
        nonce: entry.nonce,
        public_key: entry.public_key,
        private_key: SecretString::empty(),
    })
}

async fn blocking<T, F>(f: F) -> Result<T, VaultError>
where
    F: FnOnce() -> Result<T, VaultError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| VaultError::Unavailable(format!("vault worker failed: {e}")))?
}

// ─── Handle ────────────────────────────────────────────────────────────

/// Caller-side half of the vault. Cheap to clone.
#[derive(Debug, Clone)]
pub struct VaultHandle {
    tx: mpsc::Sender<VaultRequest>,
    events: broadcast::Sender<VaultEvent>,
}

impl VaultHandle {
    /// Send one command and wait for its correlated response.
    pub async fn call(&self, command: VaultCommand) -> Result<VaultReply, VaultError> {
        let id = Uuid::new_v4();
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(VaultRequest { id, command, reply })
            .await
            .map_err(|_| VaultError::Unavailable("vault service stopped".into()))?;
        let response = rx
            .await
            .map_err(|_| VaultError::Unavailable("vault service dropped the request".into()))?;
        if response.id != id {
            return Err(VaultError::Unavailable(format!(
                "correlation id mismatch: sent {id}, got {}",
                response.id
            )));
        }
        response.result
    }

    /// Verify `passphrase` against every stored entry and unlock.
    ///
    /// Returns the number of entries verified; zero means the vault holds
    /// no identities yet.
    pub async fn unlock(&self, passphrase: impl Into<String>) -> Result<usize, VaultError> {
        let passphrase = SecretString::new(passphrase);
        match self.call(VaultCommand::Unlock { passphrase }).await? {
            VaultReply::Unlocked { entries } => Ok(entries),
            other => Err(unexpected("unlock", other)),
        }
    }

    pub async fn lock(&self) -> Result<(), VaultError> {
        self.expect_done("lock", VaultCommand::Lock).await
    }

    /// Encrypt and store a Direct-key identity, replacing any entry with
    /// the same public key.
    pub async fn add_identity(&self, record: IdentityRecord) -> Result<(), VaultError> {
        self.expect_done("add_identity", VaultCommand::AddIdentity { record })
            .await
    }

    /// Parse an untrusted JSON record, then [`add_identity`](Self::add_identity).
    pub async fn add_identity_json(&self, value: serde_json::Value) -> Result<(), VaultError> {
        let record = IdentityRecord::from_json(value)?;
        self.add_identity(record).await
    }

    /// Stored identities with `privateKey` empty. Works while locked.
    pub async fn list_identities(&self) -> Result<Vec<IdentityRecord>, VaultError> {
        match self.call(VaultCommand::ListIdentities).await? {
            VaultReply::Identities(records) => Ok(records),
            other => Err(unexpected("list_identities", other)),
        }
    }

    /// Look up by address. While unlocked, `privateKey` holds a sealed
    /// handle for [`reveal_private_key`](Self::reveal_private_key); while
    /// locked it is empty.
    pub async fn get_by_address(
        &self,
        address: impl Into<String>,
    ) -> Result<Option<IdentityRecord>, VaultError> {
        let address = address.into();
        match self.call(VaultCommand::GetByAddress { address }).await? {
            VaultReply::Identity(record) => Ok(record),
            other => Err(unexpected("get_by_address", other)),
        }
    }

    pub async fn select_identity(&self, reference: IdentityRef) -> Result<(), VaultError> {
        self.expect_done("select_identity", VaultCommand::SelectIdentity { reference })
            .await
    }

    pub async fn status(&self) -> Result<VaultStatus, VaultError> {
        match self.call(VaultCommand::Status).await? {
            VaultReply::Status(status) => Ok(status),
            other => Err(unexpected("status", other)),
        }
    }

    /// Open a sealed handle from [`get_by_address`](Self::get_by_address).
    pub async fn reveal_private_key(
        &self,
        handle: impl Into<String>,
    ) -> Result<SecretString, VaultError> {
        let handle = handle.into();
        match self.call(VaultCommand::RevealPrivateKey { handle }).await? {
            VaultReply::Secret(secret) => Ok(secret),
            other => Err(unexpected("reveal_private_key", other)),
        }
    }

    /// Sign `payload` with a stored Direct-key identity. Returns hex.
    pub async fn sign(
        &self,
        public_key: impl Into<String>,
        payload: Vec<u8>,
    ) -> Result<String, VaultError> {
        let public_key = public_key.into();
        match self.call(VaultCommand::Sign { public_key, payload }).await? {
            VaultReply::Signature(sig) => Ok(sig),
            other => Err(unexpected("sign", other)),
        }
    }

    /// Receive [`VaultEvent`]s from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<VaultEvent> {
        self.events.subscribe()
    }

    async fn expect_done(&self, op: &str, command: VaultCommand) -> Result<(), VaultError> {
        match self.call(command).await? {
            VaultReply::Done => Ok(()),
            other => Err(unexpected(op, other)),
        }
    }
}

fn unexpected(op: &str, reply: VaultReply) -> VaultError {
    let kind = match reply {
        VaultReply::Unlocked { .. } => "unlocked",
        VaultReply::Done => "done",
        VaultReply::Identities(_) => "identities",
        VaultReply::Identity(_) => "identity",
        VaultReply::Status(_) => "status",
        VaultReply::Secret(_) => "secret",
        VaultReply::Signature(_) => "signature",
    };
    VaultError::Unavailable(format!("unexpected {kind} reply to {op}"))
}
