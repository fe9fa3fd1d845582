//! Credential store adapter
//!
//! Wraps the platform `CredentialStore` driver with the protocol-level
//! rules: input bounds, discoverable-credential uniqueness, capacity, and
//! translation of driver errors into wire statuses.

use sha2::{Digest, Sha256};

use crate::callbacks::{CredentialStore, StoreError};
use crate::status::{Result, StatusCode};
use crate::types::{Credential, CREDENTIAL_ID_MAX_SIZE, PinHash, SHA256_SIZE, USER_ID_MAX_SIZE};

/// SHA-256 of a relying party identifier
pub fn rp_id_hash(rp_id: &str) -> [u8; SHA256_SIZE] {
    let digest = Sha256::digest(rp_id.as_bytes());
    let mut out = [0u8; SHA256_SIZE];
    out.copy_from_slice(&digest);
    out
}

/// Protocol-level view over the storage driver
pub struct StoreAdapter<S: CredentialStore> {
    inner: S,
    capacity: usize,
}

impl<S: CredentialStore> StoreAdapter<S> {
    /// Wrap a storage driver with a credential capacity limit
    pub fn new(inner: S, capacity: usize) -> Self {
        Self { inner, capacity }
    }

    /// Initialize the backing store
    pub fn init(&mut self) -> Result<()> {
        self.inner.init()?;
        Ok(())
    }

    /// Configured credential capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of stored credentials
    pub fn count(&self) -> Result<usize> {
        Ok(self.inner.count()?)
    }

    /// Estimated remaining capacity
    pub fn remaining(&self) -> Result<usize> {
        Ok(self.capacity.saturating_sub(self.count()?))
    }

    /// Persist a new credential
    ///
    /// A discoverable credential replaces any existing discoverable
    /// credential for the same (RP hash, user handle); the replaced record
    /// is returned so the caller can destroy its signing key. At capacity,
    /// fails with `KeyStoreFull`.
    pub fn persist_new(&mut self, credential: &Credential) -> Result<Option<Credential>> {
        if credential.id.is_empty() || credential.id.len() > CREDENTIAL_ID_MAX_SIZE {
            return Err(StatusCode::InvalidLength);
        }
        if credential.user_id.len() > USER_ID_MAX_SIZE {
            return Err(StatusCode::InvalidLength);
        }

        let replaced = if credential.discoverable {
            self.inner
                .find_by_rp(&credential.rp_id_hash)?
                .into_iter()
                .find(|c| c.discoverable && c.user_id == credential.user_id)
        } else {
            None
        };

        if let Some(old) = &replaced {
            self.inner.remove(&old.id)?;
        } else if self.count()? >= self.capacity {
            return Err(StatusCode::KeyStoreFull);
        }

        match self.inner.store(credential) {
            Ok(()) => Ok(replaced),
            Err(StoreError::NoSpace) => Err(StatusCode::KeyStoreFull),
            Err(e) => Err(e.into()),
        }
    }

    /// Load a credential by ID
    pub fn load(&self, credential_id: &[u8]) -> Result<Credential> {
        Ok(self.inner.load(credential_id)?)
    }

    /// Remove a credential, returning the removed record
    pub fn remove(&mut self, credential_id: &[u8]) -> Result<Credential> {
        let credential = self.inner.load(credential_id)?;
        self.inner.remove(credential_id)?;
        Ok(credential)
    }

    /// All credentials for one relying party hash
    pub fn find_by_rp(&self, rp_id_hash: &[u8; SHA256_SIZE]) -> Result<Vec<Credential>> {
        Ok(self.inner.find_by_rp(rp_id_hash)?)
    }

    /// All stored credentials
    pub fn all(&self) -> Result<Vec<Credential>> {
        Ok(self.inner.all()?)
    }

    /// Advance a credential's signature counter, returning the new value
    pub fn next_sign_count(&mut self, credential_id: &[u8]) -> Result<u32> {
        Ok(self.inner.increment_sign_count(credential_id)?)
    }

    /// Destroy all credential records and PIN state
    pub fn wipe_all(&mut self) -> Result<()> {
        self.inner.wipe_all()?;
        Ok(())
    }

    /// Current PIN hash, if set
    pub fn pin_hash(&self) -> Result<Option<PinHash>> {
        Ok(self.inner.pin_hash()?)
    }

    /// Set or clear the PIN hash
    pub fn set_pin_hash(&mut self, hash: Option<&PinHash>) -> Result<()> {
        self.inner.set_pin_hash(hash)?;
        Ok(())
    }

    /// Remaining PIN retries
    pub fn pin_retries(&self) -> Result<u8> {
        Ok(self.inner.pin_retries()?)
    }

    /// Decrement the PIN retry counter, returning the new value
    pub fn decrement_pin_retries(&mut self) -> Result<u8> {
        Ok(self.inner.decrement_pin_retries()?)
    }

    /// Reset the PIN retry counter to its maximum
    pub fn reset_pin_retries(&mut self) -> Result<()> {
        self.inner.reset_pin_retries()?;
        Ok(())
    }
}
