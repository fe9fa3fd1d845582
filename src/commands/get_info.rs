//! authenticatorGetInfo (0x04)
//!
//! Pure composition over configuration and controller state; no gates and
//! no error paths beyond storage access.

use crate::authenticator::Authenticator;
use crate::callbacks::{CredentialStore, KeyStore};
use crate::status::Result;
use crate::types::DeviceInfo;

pub(crate) fn handle<S: CredentialStore, K: KeyStore>(
    auth: &Authenticator<S, K>,
) -> Result<DeviceInfo> {
    auth.device_info()
}
