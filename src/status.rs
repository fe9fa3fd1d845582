//! CTAP2 status codes
//!
//! Byte values match the device wire protocol exactly. Hosts and
//! conformance tools compare these numerically, so the mapping here is
//! load-bearing.

use core::fmt;

/// CTAP2 status codes
///
/// Returned in CTAP responses to indicate success or various error conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum StatusCode {
    /// Successful completion of command
    Ok = 0x00,

    /// Invalid command
    InvalidCommand = 0x01,

    /// Invalid parameter in request
    InvalidParameter = 0x02,

    /// Invalid message or item length
    InvalidLength = 0x03,

    /// Invalid message sequencing
    InvalidSeq = 0x04,

    /// Message timed out
    Timeout = 0x05,

    /// Channel busy
    ChannelBusy = 0x06,

    /// Command requires channel lock
    LockRequired = 0x0A,

    /// Invalid channel
    InvalidChannel = 0x0B,

    /// CBOR unexpected type
    CborUnexpectedType = 0x11,

    /// Invalid CBOR encoding
    InvalidCbor = 0x12,

    /// Missing required parameter
    MissingParameter = 0x14,

    /// Limit exceeded
    LimitExceeded = 0x15,

    /// Unsupported extension
    UnsupportedExtension = 0x16,

    /// Credential excluded (already exists)
    CredentialExcluded = 0x19,

    /// Processing (e.g. waiting for user presence)
    Processing = 0x21,

    /// Invalid credential
    InvalidCredential = 0x22,

    /// User action pending
    UserActionPending = 0x23,

    /// Operation pending
    OperationPending = 0x24,

    /// No operations pending
    NoOperations = 0x25,

    /// Unsupported algorithm
    UnsupportedAlgorithm = 0x26,

    /// Operation denied by user
    OperationDenied = 0x27,

    /// Key store full
    KeyStoreFull = 0x28,

    /// Transaction cancelled by keepalive
    KeepaliveCancel = 0x2D,

    /// No credentials found
    NoCredentials = 0x2E,

    /// User action timeout
    UserActionTimeout = 0x2F,

    /// Not allowed
    NotAllowed = 0x30,

    /// PIN invalid
    PinInvalid = 0x31,

    /// PIN blocked
    PinBlocked = 0x32,

    /// PIN/UV auth parameter invalid
    PinAuthInvalid = 0x33,

    /// PIN/UV auth blocked
    PinAuthBlocked = 0x34,

    /// PIN not set
    PinNotSet = 0x35,

    /// PIN required for this operation
    PinRequired = 0x36,

    /// PIN policy violation
    PinPolicyViolation = 0x37,

    /// User verification blocked
    UvBlocked = 0x3C,

    /// User verification invalid
    UvInvalid = 0x3D,

    /// Other unspecified error
    Other = 0x7F,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::Ok => "Success",
            Self::InvalidCommand => "Invalid command",
            Self::InvalidParameter => "Invalid parameter",
            Self::InvalidLength => "Invalid length",
            Self::InvalidSeq => "Invalid sequence",
            Self::Timeout => "Timeout",
            Self::ChannelBusy => "Channel busy",
            Self::LockRequired => "Lock required",
            Self::InvalidChannel => "Invalid channel",
            Self::CborUnexpectedType => "CBOR unexpected type",
            Self::InvalidCbor => "Invalid CBOR",
            Self::MissingParameter => "Missing parameter",
            Self::LimitExceeded => "Limit exceeded",
            Self::UnsupportedExtension => "Unsupported extension",
            Self::CredentialExcluded => "Credential excluded",
            Self::Processing => "Processing",
            Self::InvalidCredential => "Invalid credential",
            Self::UserActionPending => "User action pending",
            Self::OperationPending => "Operation pending",
            Self::NoOperations => "No operations",
            Self::UnsupportedAlgorithm => "Unsupported algorithm",
            Self::OperationDenied => "Operation denied",
            Self::KeyStoreFull => "Key store full",
            Self::KeepaliveCancel => "Keepalive cancel",
            Self::NoCredentials => "No credentials",
            Self::UserActionTimeout => "User action timeout",
            Self::NotAllowed => "Not allowed",
            Self::PinInvalid => "PIN invalid",
            Self::PinBlocked => "PIN blocked",
            Self::PinAuthInvalid => "PIN auth invalid",
            Self::PinAuthBlocked => "PIN auth blocked",
            Self::PinNotSet => "PIN not set",
            Self::PinRequired => "PIN required",
            Self::PinPolicyViolation => "PIN policy violation",
            Self::UvBlocked => "UV blocked",
            Self::UvInvalid => "UV invalid",
            Self::Other => "Other error",
        };
        write!(f, "{}", msg)
    }
}

impl std::error::Error for StatusCode {}

impl StatusCode {
    /// Convert status code to byte value
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Create status code from byte value
    pub fn from_u8(value: u8) -> Self {
        match value {
            0x00 => Self::Ok,
            0x01 => Self::InvalidCommand,
            0x02 => Self::InvalidParameter,
            0x03 => Self::InvalidLength,
            0x04 => Self::InvalidSeq,
            0x05 => Self::Timeout,
            0x06 => Self::ChannelBusy,
            0x0A => Self::LockRequired,
            0x0B => Self::InvalidChannel,
            0x11 => Self::CborUnexpectedType,
            0x12 => Self::InvalidCbor,
            0x14 => Self::MissingParameter,
            0x15 => Self::LimitExceeded,
            0x16 => Self::UnsupportedExtension,
            0x19 => Self::CredentialExcluded,
            0x21 => Self::Processing,
            0x22 => Self::InvalidCredential,
            0x23 => Self::UserActionPending,
            0x24 => Self::OperationPending,
            0x25 => Self::NoOperations,
            0x26 => Self::UnsupportedAlgorithm,
            0x27 => Self::OperationDenied,
            0x28 => Self::KeyStoreFull,
            0x2D => Self::KeepaliveCancel,
            0x2E => Self::NoCredentials,
            0x2F => Self::UserActionTimeout,
            0x30 => Self::NotAllowed,
            0x31 => Self::PinInvalid,
            0x32 => Self::PinBlocked,
            0x33 => Self::PinAuthInvalid,
            0x34 => Self::PinAuthBlocked,
            0x35 => Self::PinNotSet,
            0x36 => Self::PinRequired,
            0x37 => Self::PinPolicyViolation,
            0x3C => Self::UvBlocked,
            0x3D => Self::UvInvalid,
            _ => Self::Other,
        }
    }

    /// Check if this is a success status
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> u8 {
        status.to_u8()
    }
}

impl From<u8> for StatusCode {
    fn from(value: u8) -> Self {
        Self::from_u8(value)
    }
}

/// Result type for CTAP operations
pub type Result<T> = core::result::Result<T, StatusCode>;
