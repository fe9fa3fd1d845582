//! CTAP2 command handlers
//!
//! One module per command. Handlers take the decoded request and operate
//! on the authenticator core; the dispatcher routes to them while holding
//! the transaction.

pub mod client_pin;
pub mod credential_management;
pub mod get_assertion;
pub mod get_info;
pub mod make_credential;

use crate::types::SHA256_SIZE;

/// CTAP2 command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandCode {
    /// authenticatorMakeCredential
    MakeCredential = 0x01,
    /// authenticatorGetAssertion
    GetAssertion = 0x02,
    /// authenticatorGetInfo
    GetInfo = 0x04,
    /// authenticatorClientPIN
    ClientPin = 0x06,
    /// authenticatorReset
    Reset = 0x07,
    /// authenticatorGetNextAssertion
    GetNextAssertion = 0x08,
    /// authenticatorCredentialManagement
    CredentialManagement = 0x0A,
}

impl CommandCode {
    /// Convert to byte value
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Create from byte value
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::MakeCredential),
            0x02 => Some(Self::GetAssertion),
            0x04 => Some(Self::GetInfo),
            0x06 => Some(Self::ClientPin),
            0x07 => Some(Self::Reset),
            0x08 => Some(Self::GetNextAssertion),
            0x0A => Some(Self::CredentialManagement),
            _ => None,
        }
    }
}

/// User presence flag in authenticator data
pub(crate) const FLAG_UP: u8 = 0x01;
/// User verification flag
pub(crate) const FLAG_UV: u8 = 0x04;
/// Attested credential data flag
pub(crate) const FLAG_AT: u8 = 0x40;

/// Assemble authenticator data: rpIdHash || flags || signCount (big endian)
/// followed by attested credential data when present.
pub(crate) fn build_authenticator_data(
    rp_id_hash: &[u8; SHA256_SIZE],
    flags: u8,
    sign_count: u32,
    attested: Option<&[u8]>,
) -> Vec<u8> {
    let mut data = Vec::with_capacity(37 + attested.map_or(0, |a| a.len()));
    data.extend_from_slice(rp_id_hash);
    data.push(flags);
    data.extend_from_slice(&sign_count.to_be_bytes());
    if let Some(att) = attested {
        data.extend_from_slice(att);
    }
    data
}
