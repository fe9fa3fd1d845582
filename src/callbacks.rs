//! Collaborator contracts
//!
//! Traits implemented by the platform around the protocol core: persistent
//! credential storage, the cryptographic key backend, user-verification
//! method drivers, and the user-presence sensor. Each contract carries its
//! own error type, translated into a wire status at the boundary so driver
//! detail never leaks to the host.

use std::time::Duration;

use thiserror::Error;

use crate::status::StatusCode;
use crate::types::{CoseAlgorithm, Credential, KeyHandle, PinHash, SHA256_SIZE};

/// Storage driver errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No record with the given ID
    #[error("record not found")]
    NotFound,

    /// Storage capacity exhausted
    #[error("storage full")]
    NoSpace,

    /// Persisted data failed validation
    #[error("stored data corrupt")]
    Corrupt,

    /// Underlying I/O failure
    #[error("storage I/O error: {0}")]
    Io(String),
}

impl From<StoreError> for StatusCode {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => Self::NoCredentials,
            StoreError::NoSpace => Self::KeyStoreFull,
            StoreError::Corrupt => Self::Other,
            StoreError::Io(_) => Self::Other,
        }
    }
}

/// Crypto backend errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// Algorithm not supported by the backend
    #[error("unsupported algorithm")]
    UnsupportedAlgorithm,

    /// Key handle does not refer to a usable key
    #[error("invalid key handle")]
    InvalidKey,

    /// Signing operation failed
    #[error("signing failed")]
    SignatureFailed,

    /// Backend-specific failure
    #[error("crypto backend error: {0}")]
    Backend(String),
}

impl From<CryptoError> for StatusCode {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::UnsupportedAlgorithm => Self::UnsupportedAlgorithm,
            CryptoError::InvalidKey => Self::InvalidCredential,
            CryptoError::SignatureFailed => Self::Other,
            CryptoError::Backend(_) => Self::Other,
        }
    }
}

/// Result of a user presence check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpResult {
    /// User denied the operation
    Denied,
    /// User accepted (presence confirmed)
    Accepted,
    /// Operation timed out waiting for user
    Timeout,
}

impl UpResult {
    /// Check if user presence was confirmed
    pub fn is_accepted(self) -> bool {
        self == Self::Accepted
    }
}

/// Result of a user verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvResult {
    /// User verification denied
    Denied,
    /// User verification accepted
    Accepted,
    /// User verification accepted with user presence also confirmed
    AcceptedWithUp,
    /// Operation timed out
    Timeout,
}

impl UvResult {
    /// Check if user verification succeeded
    pub fn is_verified(self) -> bool {
        matches!(self, Self::Accepted | Self::AcceptedWithUp)
    }

    /// Check if user presence was also confirmed
    pub fn has_up(self) -> bool {
        self == Self::AcceptedWithUp
    }
}

/// Kind of user verification a method performs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvType {
    /// No verification (placeholder method)
    None,
    /// PIN entry on the device
    Pin,
    /// Biometric sensor
    Biometric,
}

/// Persistent credential and PIN-state storage
///
/// Credential records are opaque to the driver. The signature counter and
/// the PIN retry counter are mutated through single contract operations so
/// the read-modify-write happens inside the driver, never in the caller.
pub trait CredentialStore {
    /// Initialize the backing store (mount, validate)
    fn init(&mut self) -> Result<(), StoreError>;

    /// Persist a credential record, replacing any record with the same ID
    fn store(&mut self, credential: &Credential) -> Result<(), StoreError>;

    /// Load a credential by ID
    fn load(&self, credential_id: &[u8]) -> Result<Credential, StoreError>;

    /// Remove a credential by ID
    fn remove(&mut self, credential_id: &[u8]) -> Result<(), StoreError>;

    /// All credentials whose RP hash matches
    fn find_by_rp(&self, rp_id_hash: &[u8; SHA256_SIZE]) -> Result<Vec<Credential>, StoreError>;

    /// All stored credentials
    fn all(&self) -> Result<Vec<Credential>, StoreError>;

    /// Number of stored credentials
    fn count(&self) -> Result<usize, StoreError>;

    /// Atomically increment a credential's signature counter
    ///
    /// Returns the value after the increment.
    fn increment_sign_count(&mut self, credential_id: &[u8]) -> Result<u32, StoreError>;

    /// Destroy every credential record and PIN state
    fn wipe_all(&mut self) -> Result<(), StoreError>;

    /// Current PIN hash, if a PIN is set
    fn pin_hash(&self) -> Result<Option<PinHash>, StoreError>;

    /// Set or clear the PIN hash
    fn set_pin_hash(&mut self, hash: Option<&PinHash>) -> Result<(), StoreError>;

    /// Remaining PIN retry attempts
    fn pin_retries(&self) -> Result<u8, StoreError>;

    /// Atomically decrement the PIN retry counter, saturating at zero
    ///
    /// Returns the value after the decrement.
    fn decrement_pin_retries(&mut self) -> Result<u8, StoreError>;

    /// Reset the PIN retry counter to its maximum
    fn reset_pin_retries(&mut self) -> Result<(), StoreError>;
}

/// A freshly generated signing key
#[derive(Debug, Clone)]
pub struct GeneratedKey {
    /// Opaque handle for later sign/destroy calls
    pub handle: KeyHandle,

    /// COSE-encoded public key
    pub public_key: Vec<u8>,
}

/// Cryptographic key backend
///
/// Private keys never cross this boundary; the core holds handles only.
pub trait KeyStore {
    /// Generate a signing key for the given algorithm
    fn generate_key(&mut self, algorithm: CoseAlgorithm) -> Result<GeneratedKey, CryptoError>;

    /// Sign `data` with the key behind `handle`
    fn sign(&self, handle: KeyHandle, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Destroy the key behind `handle`
    fn destroy_key(&mut self, handle: KeyHandle) -> Result<(), CryptoError>;
}

/// A user verification method driver (e.g. a fingerprint sensor)
///
/// `verify` blocks up to `timeout`; drivers enforce their own deadline and
/// report `UvResult::Timeout` when it elapses.
pub trait UvMethod: Send {
    /// Kind of verification this method performs
    fn uv_type(&self) -> UvType;

    /// Whether the method is enrolled and usable
    fn is_configured(&self) -> bool;

    /// Run one verification attempt
    fn verify(&mut self, timeout: Duration) -> UvResult;
}

/// The user presence sensor (e.g. a capacitive button)
pub trait UserPresence: Send {
    /// Block until the user confirms presence or `timeout` elapses
    fn wait(&mut self, timeout: Duration) -> UpResult;
}
