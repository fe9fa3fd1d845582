//! Core data types
//!
//! Domain structures shared across command handlers, plus the size limits
//! the device enforces on wire inputs. All persisted types support serde
//! so storage backends can encode them.

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Maximum credential ID size in bytes
pub const CREDENTIAL_ID_MAX_SIZE: usize = 128;

/// Maximum user handle size in bytes
pub const USER_ID_MAX_SIZE: usize = 64;

/// AAGUID size in bytes
pub const AAGUID_SIZE: usize = 16;

/// SHA-256 digest size in bytes
pub const SHA256_SIZE: usize = 32;

/// Maximum relying party identifier length
pub const RP_ID_MAX_LEN: usize = 128;

/// Maximum relying party name length
pub const RP_NAME_MAX_LEN: usize = 64;

/// Maximum user name length
pub const USER_NAME_MAX_LEN: usize = 64;

/// Maximum user display name length
pub const DISPLAY_NAME_MAX_LEN: usize = 64;

/// Maximum PIN retry attempts before blocking
pub const MAX_PIN_RETRIES: u8 = 8;

/// Minimum PIN length in Unicode code points
pub const MIN_PIN_LENGTH: u8 = 4;

/// Maximum PIN length in Unicode code points
pub const MAX_PIN_LENGTH: u8 = 63;

/// Transport capability bits reported in device info
pub const TRANSPORT_USB: u8 = 1 << 0;
/// BLE transport bit
pub const TRANSPORT_BLE: u8 = 1 << 1;
/// NFC transport bit
pub const TRANSPORT_NFC: u8 = 1 << 2;

/// Relying Party information
///
/// Represents a web service that uses FIDO2 for authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelyingParty {
    /// Relying party identifier (e.g., "example.com")
    pub id: String,

    /// Human-readable name (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl RelyingParty {
    /// Create a new RelyingParty with just an ID
    pub fn new(id: String) -> Self {
        Self { id, name: None }
    }

    /// Create a new RelyingParty with ID and name
    pub fn with_name(id: String, name: String) -> Self {
        Self {
            id,
            name: Some(name),
        }
    }
}

/// User information
///
/// Represents the user account being registered or authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User handle - opaque identifier for the user
    #[serde(with = "serde_bytes")]
    pub id: Vec<u8>,

    /// Human-readable username (optional in some contexts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Human-readable display name (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl User {
    /// Create a new User with just an ID
    pub fn new(id: Vec<u8>) -> Self {
        Self {
            id,
            name: None,
            display_name: None,
        }
    }

    /// Create a new User with all fields
    pub fn with_details(id: Vec<u8>, name: String, display_name: String) -> Self {
        Self {
            id,
            name: Some(name),
            display_name: Some(display_name),
        }
    }
}

/// COSE algorithm identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum CoseAlgorithm {
    /// ES256 (ECDSA with P-256 and SHA-256)
    ES256 = -7,
    /// EdDSA (Ed25519)
    EdDSA = -8,
}

impl CoseAlgorithm {
    /// Convert to i32 value
    pub fn to_i32(self) -> i32 {
        self as i32
    }

    /// Create from i32 value
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            -7 => Some(Self::ES256),
            -8 => Some(Self::EdDSA),
            _ => None,
        }
    }
}

/// Credential protection policy
///
/// Defines the visibility rules for a credential during assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum CredProtect {
    /// User verification optional
    UserVerificationOptional = 0x01,
    /// User verification optional with credential ID list
    UserVerificationOptionalWithCredentialIdList = 0x02,
    /// User verification required
    UserVerificationRequired = 0x03,
}

impl CredProtect {
    /// Convert to u8 value
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Create from u8 value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::UserVerificationOptional),
            0x02 => Some(Self::UserVerificationOptionalWithCredentialIdList),
            0x03 => Some(Self::UserVerificationRequired),
            _ => None,
        }
    }
}

impl Default for CredProtect {
    fn default() -> Self {
        Self::UserVerificationOptional
    }
}

/// Opaque handle to a signing key held by the crypto backend
///
/// The core never sees private key material; it refers to keys by this
/// handle when signing or destroying them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyHandle(pub u32);

/// SHA-256 hash of a PIN
///
/// The only PIN material the core handles. Zeroed on drop, compared in
/// constant time.
#[derive(Debug, Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct PinHash(pub [u8; SHA256_SIZE]);

impl PinHash {
    /// Constant-time equality against another hash
    pub fn ct_eq(&self, other: &PinHash) -> bool {
        self.0[..].ct_eq(&other.0[..]).into()
    }
}

/// Credential record stored by the authenticator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Credential ID
    #[serde(with = "serde_bytes")]
    pub id: Vec<u8>,

    /// SHA-256 of the relying party identifier
    pub rp_id_hash: [u8; SHA256_SIZE],

    /// Relying party identifier
    pub rp_id: String,

    /// Relying party name
    pub rp_name: Option<String>,

    /// User handle
    #[serde(with = "serde_bytes")]
    pub user_id: Vec<u8>,

    /// User name
    pub user_name: Option<String>,

    /// User display name
    pub user_display_name: Option<String>,

    /// Handle to the signing key in the crypto backend
    pub key: KeyHandle,

    /// COSE algorithm identifier
    pub algorithm: i32,

    /// Signature counter
    pub sign_count: u32,

    /// Whether this is a discoverable credential
    pub discoverable: bool,

    /// Credential protection level
    pub cred_protect: CredProtect,
}

/// Device capability snapshot returned by get-info
///
/// Derived from configuration and current state, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Supported protocol versions
    pub versions: Vec<String>,

    /// Supported extensions
    pub extensions: Vec<String>,

    /// Authenticator attestation GUID
    pub aaguid: [u8; AAGUID_SIZE],

    /// Maximum number of stored discoverable credentials
    pub max_credential_count: usize,

    /// Maximum credential ID length accepted
    pub max_credential_id_length: usize,

    /// Enabled transports bitmask (USB/BLE/NFC)
    pub transports: u8,

    /// Whether a PIN is currently set
    pub pin_configured: bool,

    /// Whether any user verification method is configured
    pub uv_configured: bool,

    /// Remaining PIN retry attempts
    pub pin_retries: u8,
}
