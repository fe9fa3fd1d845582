//! In-memory collaborator implementations shared by unit tests

use std::collections::HashMap;
use std::time::Duration;

use sha2::{Digest, Sha256};

use crate::callbacks::{
    CredentialStore, CryptoError, GeneratedKey, KeyStore, StoreError, UpResult, UserPresence,
    UvMethod, UvResult, UvType,
};
use crate::store::rp_id_hash;
use crate::types::{
    Credential, CredProtect, KeyHandle, PinHash, MAX_PIN_RETRIES, SHA256_SIZE,
};

/// Volatile credential and PIN storage
#[derive(Default)]
pub struct MemoryStore {
    creds: Vec<Credential>,
    pin_hash: Option<PinHash>,
    retries: u8,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            creds: Vec::new(),
            pin_hash: None,
            retries: MAX_PIN_RETRIES,
        }
    }
}

impl CredentialStore for MemoryStore {
    fn init(&mut self) -> Result<(), StoreError> {
        Ok(())
    }

    fn store(&mut self, credential: &Credential) -> Result<(), StoreError> {
        self.creds.retain(|c| c.id != credential.id);
        self.creds.push(credential.clone());
        Ok(())
    }

    fn load(&self, credential_id: &[u8]) -> Result<Credential, StoreError> {
        self.creds
            .iter()
            .find(|c| c.id == credential_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    fn remove(&mut self, credential_id: &[u8]) -> Result<(), StoreError> {
        let before = self.creds.len();
        self.creds.retain(|c| c.id != credential_id);
        if self.creds.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    fn find_by_rp(&self, rp_id_hash: &[u8; SHA256_SIZE]) -> Result<Vec<Credential>, StoreError> {
        Ok(self
            .creds
            .iter()
            .filter(|c| &c.rp_id_hash == rp_id_hash)
            .cloned()
            .collect())
    }

    fn all(&self) -> Result<Vec<Credential>, StoreError> {
        Ok(self.creds.clone())
    }

    fn count(&self) -> Result<usize, StoreError> {
        Ok(self.creds.len())
    }

    fn increment_sign_count(&mut self, credential_id: &[u8]) -> Result<u32, StoreError> {
        let cred = self
            .creds
            .iter_mut()
            .find(|c| c.id == credential_id)
            .ok_or(StoreError::NotFound)?;
        cred.sign_count = cred.sign_count.saturating_add(1);
        Ok(cred.sign_count)
    }

    fn wipe_all(&mut self) -> Result<(), StoreError> {
        self.creds.clear();
        self.pin_hash = None;
        self.retries = MAX_PIN_RETRIES;
        Ok(())
    }

    fn pin_hash(&self) -> Result<Option<PinHash>, StoreError> {
        Ok(self.pin_hash.clone())
    }

    fn set_pin_hash(&mut self, hash: Option<&PinHash>) -> Result<(), StoreError> {
        self.pin_hash = hash.cloned();
        Ok(())
    }

    fn pin_retries(&self) -> Result<u8, StoreError> {
        Ok(self.retries)
    }

    fn decrement_pin_retries(&mut self) -> Result<u8, StoreError> {
        self.retries = self.retries.saturating_sub(1);
        Ok(self.retries)
    }

    fn reset_pin_retries(&mut self) -> Result<(), StoreError> {
        self.retries = MAX_PIN_RETRIES;
        Ok(())
    }
}

/// Software key backend with deterministic fake signatures
#[derive(Default)]
pub struct SoftKeys {
    next_handle: u32,
    keys: HashMap<u32, i32>,
}

impl SoftKeys {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key_count(&self) -> usize {
        self.keys.len()
    }
}

impl KeyStore for SoftKeys {
    fn generate_key(&mut self, algorithm: crate::types::CoseAlgorithm) -> Result<GeneratedKey, CryptoError> {
        self.next_handle += 1;
        self.keys.insert(self.next_handle, algorithm.to_i32());
        let mut public_key = vec![0xA5; 4];
        public_key.extend_from_slice(&self.next_handle.to_be_bytes());
        Ok(GeneratedKey {
            handle: KeyHandle(self.next_handle),
            public_key,
        })
    }

    fn sign(&self, handle: KeyHandle, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if !self.keys.contains_key(&handle.0) {
            return Err(CryptoError::InvalidKey);
        }
        let mut hasher = Sha256::new();
        hasher.update(handle.0.to_be_bytes());
        hasher.update(data);
        Ok(hasher.finalize().to_vec())
    }

    fn destroy_key(&mut self, handle: KeyHandle) -> Result<(), CryptoError> {
        self.keys
            .remove(&handle.0)
            .map(|_| ())
            .ok_or(CryptoError::InvalidKey)
    }
}

/// Presence sensor returning a fixed outcome
pub struct StaticPresence(pub UpResult);

impl UserPresence for StaticPresence {
    fn wait(&mut self, _timeout: Duration) -> UpResult {
        self.0
    }
}

/// UV method returning a fixed outcome
pub struct StaticUv {
    pub kind: UvType,
    pub configured: bool,
    pub outcome: UvResult,
}

impl UvMethod for StaticUv {
    fn uv_type(&self) -> UvType {
        self.kind
    }

    fn is_configured(&self) -> bool {
        self.configured
    }

    fn verify(&mut self, _timeout: Duration) -> UvResult {
        self.outcome
    }
}

/// Build a credential record for tests
pub fn test_credential(id: &[u8], rp_id: &str, user_id: &[u8], discoverable: bool) -> Credential {
    Credential {
        id: id.to_vec(),
        rp_id_hash: rp_id_hash(rp_id),
        rp_id: rp_id.to_string(),
        rp_name: None,
        user_id: user_id.to_vec(),
        user_name: None,
        user_display_name: None,
        key: KeyHandle(1),
        algorithm: -7,
        sign_count: 0,
        discoverable,
        cred_protect: CredProtect::UserVerificationOptional,
    }
}
