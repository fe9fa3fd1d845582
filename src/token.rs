//! pinUvAuthToken management
//!
//! Tokens authorize operations after a successful PIN check. A token holds
//! a permission bitmask, an optional relying-party scope, and two clocks: a
//! 19 second usage window for starting new operations and a 10 minute hard
//! lifetime. Tokens live in RAM only; a power cycle or reset invalidates
//! them.
//!
//! Reference: FIDO2 CTAP 2.1 specification, Section 6.5.5.7

use std::time::{Duration, Instant};

use rand::RngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::status::StatusCode;

/// Window for starting new operations with a token
const USAGE_WINDOW: Duration = Duration::from_secs(19);

/// Maximum token lifetime from issue to expiration
const LIFETIME: Duration = Duration::from_secs(600);

/// pinUvAuthToken permissions
///
/// Multiple permissions can be combined with bitwise OR. The full CTAP2.1
/// bit assignment is kept so host-supplied bitmasks round-trip unchanged;
/// only the make-credential, get-assertion, and credential-management bits
/// have consumers in this core.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Allows authenticatorMakeCredential
    MakeCredential = 0x01,

    /// Allows authenticatorGetAssertion
    GetAssertion = 0x02,

    /// Allows authenticatorCredentialManagement
    CredentialManagement = 0x04,

    /// Allows authenticatorBioEnrollment
    BioEnrollment = 0x08,

    /// Allows writing to the large blob array
    LargeBlobWrite = 0x10,

    /// Allows authenticatorConfig
    AuthenticatorConfiguration = 0x20,
}

impl Permission {
    /// Convert permission to u8 bitmask value
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Check if a permission bitmask includes this permission
    pub fn is_set_in(self, permissions: u8) -> bool {
        (permissions & self.to_u8()) != 0
    }
}

/// An issued pinUvAuthToken
#[derive(Debug)]
pub struct PinUvAuthToken {
    /// The token value (32 random bytes)
    value: [u8; 32],

    /// Permission bitmask
    permissions: u8,

    /// RP scope for permissions that require one
    rp_id: Option<String>,

    /// Issue time
    issued_at: Instant,
}

impl Drop for PinUvAuthToken {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

impl PinUvAuthToken {
    fn new(value: [u8; 32], permissions: u8, rp_id: Option<String>) -> Self {
        Self {
            value,
            permissions,
            rp_id,
            issued_at: Instant::now(),
        }
    }

    /// Check if token has a specific permission
    pub fn has_permission(&self, permission: Permission) -> bool {
        permission.is_set_in(self.permissions)
    }

    fn is_alive(&self) -> bool {
        self.issued_at.elapsed() < LIFETIME
    }

    fn is_within_usage_window(&self) -> bool {
        self.issued_at.elapsed() < USAGE_WINDOW
    }

    /// Verify the token authorizes an operation
    ///
    /// Compares the presented value in constant time, then checks the
    /// clocks, the permission bit, and the RP scope. All token failures
    /// surface as `PinAuthInvalid`.
    pub fn authorize(
        &self,
        presented: &[u8; 32],
        permission: Permission,
        rp_id: Option<&str>,
    ) -> Result<(), StatusCode> {
        if !bool::from(self.value[..].ct_eq(&presented[..])) {
            return Err(StatusCode::PinAuthInvalid);
        }

        if !self.is_alive() || !self.is_within_usage_window() {
            return Err(StatusCode::PinAuthInvalid);
        }

        if !self.has_permission(permission) {
            return Err(StatusCode::PinAuthInvalid);
        }

        // RP-scoped permissions must match the token's scope when it has one
        if matches!(
            permission,
            Permission::MakeCredential | Permission::GetAssertion
        ) {
            match (&self.rp_id, rp_id) {
                (Some(scope), Some(req)) if scope == req => {}
                (None, _) => {}
                _ => return Err(StatusCode::PinAuthInvalid),
            }
        }

        Ok(())
    }
}

/// Holds the single active pinUvAuthToken
///
/// Issuing a token replaces any previous one; reset and power cycle drop it.
#[derive(Debug, Default)]
pub struct TokenStore {
    current: Option<PinUvAuthToken>,
}

impl TokenStore {
    /// Create an empty token store
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a fresh token, replacing any existing one
    pub fn issue(&mut self, permissions: u8, rp_id: Option<String>) -> [u8; 32] {
        let mut value = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut value);
        self.current = Some(PinUvAuthToken::new(value, permissions, rp_id));
        value
    }

    /// Drop the active token
    pub fn invalidate(&mut self) {
        self.current = None;
    }

    /// Whether a live token exists
    pub fn has_live_token(&self) -> bool {
        self.current.as_ref().is_some_and(|t| t.is_alive())
    }

    /// Verify a presented token value against the active token
    ///
    /// `PinRequired` when no token is active, `PinAuthInvalid` on any
    /// mismatch, expiry, missing permission, or scope violation.
    pub fn authorize(
        &mut self,
        presented: &[u8; 32],
        permission: Permission,
        rp_id: Option<&str>,
    ) -> Result<(), StatusCode> {
        match &self.current {
            Some(token) if token.is_alive() => token.authorize(presented, permission, rp_id),
            Some(_) => {
                self.current = None;
                Err(StatusCode::PinRequired)
            }
            None => Err(StatusCode::PinRequired),
        }
    }
}
