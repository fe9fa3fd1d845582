//! Decoded command requests and responses
//!
//! The wire codec lives outside this crate; it decodes CBOR into these
//! types before submission and encodes the responses afterwards. Raw PINs
//! never appear here, only their SHA-256 hashes plus the decoded PIN length
//! for policy checks.

use crate::commands::CommandCode;
use crate::types::{CredProtect, DeviceInfo, PinHash, RelyingParty, User, SHA256_SIZE};

/// SHA-256 hash of the client data, computed by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientDataHash(pub [u8; SHA256_SIZE]);

/// Options for make-credential
#[derive(Debug, Clone, Copy)]
pub struct MakeCredentialOptions {
    /// Create a discoverable (resident) credential
    pub rk: bool,
    /// Require user presence
    pub up: bool,
    /// Require user verification
    pub uv: bool,
}

impl Default for MakeCredentialOptions {
    fn default() -> Self {
        Self {
            rk: false,
            up: true,
            uv: false,
        }
    }
}

/// Options for get-assertion
#[derive(Debug, Clone, Copy)]
pub struct GetAssertionOptions {
    /// Require user presence
    pub up: bool,
    /// Require user verification
    pub uv: bool,
}

impl Default for GetAssertionOptions {
    fn default() -> Self {
        Self { up: true, uv: false }
    }
}

/// Decoded make-credential request
#[derive(Debug, Clone)]
pub struct MakeCredentialRequest {
    /// Hash of the client data
    pub client_data_hash: ClientDataHash,

    /// Relying party
    pub rp: RelyingParty,

    /// User account
    pub user: User,

    /// Acceptable COSE algorithms in preference order
    pub algorithms: Vec<i32>,

    /// Credential IDs the RP already knows for this user
    pub exclude_list: Vec<Vec<u8>>,

    /// Requested options
    pub options: MakeCredentialOptions,

    /// Requested credential protection level
    pub cred_protect: Option<CredProtect>,

    /// pinUvAuthToken proving prior PIN verification
    pub pin_uv_auth_token: Option<[u8; 32]>,
}

/// Decoded get-assertion request
#[derive(Debug, Clone)]
pub struct GetAssertionRequest {
    /// Relying party identifier
    pub rp_id: String,

    /// Hash of the client data
    pub client_data_hash: ClientDataHash,

    /// Acceptable credential IDs (empty for discoverable lookup)
    pub allow_list: Vec<Vec<u8>>,

    /// Requested options
    pub options: GetAssertionOptions,

    /// pinUvAuthToken proving prior PIN verification
    pub pin_uv_auth_token: Option<[u8; 32]>,
}

/// Decoded client-PIN subcommand
#[derive(Debug, Clone)]
pub enum ClientPinRequest {
    /// Report remaining PIN retries
    GetRetries,

    /// Set the initial PIN
    SetPin {
        /// SHA-256 of the new PIN
        new_pin_hash: PinHash,
        /// Length of the new PIN in Unicode code points
        new_pin_len: u8,
    },

    /// Change an existing PIN
    ChangePin {
        /// SHA-256 of the current PIN
        current_pin_hash: PinHash,
        /// SHA-256 of the new PIN
        new_pin_hash: PinHash,
        /// Length of the new PIN in Unicode code points
        new_pin_len: u8,
    },

    /// Verify the PIN and issue a pinUvAuthToken
    GetPinToken {
        /// SHA-256 of the PIN
        pin_hash: PinHash,
        /// Requested permission bitmask
        permissions: u8,
        /// Optional relying party to scope the token to
        rp_id: Option<String>,
    },
}

/// Credential management subcommands
#[derive(Debug, Clone)]
pub enum CredentialManagementSubcommand {
    /// Report stored and remaining credential counts
    GetCredsMetadata,

    /// Begin enumerating relying parties
    EnumerateRpsBegin,

    /// Next relying party in an open enumeration
    EnumerateRpsNext,

    /// Begin enumerating credentials for one relying party
    EnumerateCredentialsBegin {
        /// SHA-256 of the relying party identifier
        rp_id_hash: [u8; SHA256_SIZE],
    },

    /// Next credential in an open enumeration
    EnumerateCredentialsNext,

    /// Delete a credential and destroy its key
    DeleteCredential {
        /// Credential ID to delete
        credential_id: Vec<u8>,
    },
}

/// Decoded credential management request
#[derive(Debug, Clone)]
pub struct CredentialManagementRequest {
    /// Subcommand to run
    pub subcommand: CredentialManagementSubcommand,

    /// pinUvAuthToken with credential-management permission
    pub pin_uv_auth_token: Option<[u8; 32]>,
}

/// A decoded CTAP2 request
#[derive(Debug, Clone)]
pub enum Request {
    /// authenticatorMakeCredential (0x01)
    MakeCredential(MakeCredentialRequest),
    /// authenticatorGetAssertion (0x02)
    GetAssertion(GetAssertionRequest),
    /// authenticatorGetInfo (0x04)
    GetInfo,
    /// authenticatorClientPIN (0x06)
    ClientPin(ClientPinRequest),
    /// authenticatorReset (0x07)
    Reset,
    /// authenticatorGetNextAssertion (0x08)
    GetNextAssertion,
    /// authenticatorCredentialManagement (0x0A)
    CredentialManagement(CredentialManagementRequest),
}

impl Request {
    /// Wire command code of this request
    pub fn command_code(&self) -> CommandCode {
        match self {
            Self::MakeCredential(_) => CommandCode::MakeCredential,
            Self::GetAssertion(_) => CommandCode::GetAssertion,
            Self::GetInfo => CommandCode::GetInfo,
            Self::ClientPin(_) => CommandCode::ClientPin,
            Self::Reset => CommandCode::Reset,
            Self::GetNextAssertion => CommandCode::GetNextAssertion,
            Self::CredentialManagement(_) => CommandCode::CredentialManagement,
        }
    }
}

/// make-credential response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MakeCredentialResponse {
    /// New credential ID
    pub credential_id: Vec<u8>,

    /// COSE-encoded public key
    pub public_key: Vec<u8>,

    /// Authenticator data (rpIdHash || flags || signCount || attested data)
    pub authenticator_data: Vec<u8>,

    /// COSE algorithm of the new key
    pub algorithm: i32,
}

/// get-assertion / get-next-assertion response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetAssertionResponse {
    /// Credential used for the assertion
    pub credential_id: Vec<u8>,

    /// Authenticator data the signature covers
    pub authenticator_data: Vec<u8>,

    /// Signature over authenticator data || client data hash
    pub signature: Vec<u8>,

    /// User account, included for discoverable credentials
    pub user: Option<User>,

    /// Total matching credentials, included on the first assertion
    pub number_of_credentials: Option<usize>,

    /// Signature counter value reported in the authenticator data
    pub sign_count: u32,
}

/// client-PIN response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientPinResponse {
    /// Remaining retry count
    Retries {
        /// Attempts left before lockout
        retries: u8,
    },

    /// Subcommand completed with no payload
    Done,

    /// Issued pinUvAuthToken
    PinToken {
        /// Token value
        token: [u8; 32],
    },
}

/// credential management response
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialManagementResponse {
    /// Credential counts
    Metadata {
        /// Stored discoverable credentials
        existing: usize,
        /// Estimated remaining capacity
        remaining: usize,
    },

    /// One relying party from an enumeration
    Rp {
        /// Relying party
        rp: RelyingParty,
        /// SHA-256 of the RP identifier
        rp_id_hash: [u8; SHA256_SIZE],
        /// Total RPs, included on the first entry
        total: Option<usize>,
    },

    /// One credential from an enumeration
    Credential {
        /// Credential ID
        credential_id: Vec<u8>,
        /// User account
        user: User,
        /// Protection level
        cred_protect: CredProtect,
        /// Total credentials, included on the first entry
        total: Option<usize>,
    },

    /// Subcommand completed with no payload
    Done,
}

/// A CTAP2 response payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// make-credential result
    MakeCredential(MakeCredentialResponse),
    /// get-assertion result
    GetAssertion(GetAssertionResponse),
    /// get-info result
    GetInfo(DeviceInfo),
    /// client-PIN result
    ClientPin(ClientPinResponse),
    /// reset acknowledgement
    Reset,
    /// get-next-assertion result
    GetNextAssertion(GetAssertionResponse),
    /// credential management result
    CredentialManagement(CredentialManagementResponse),
}
