//! CTAP2 command-processing core for an embedded FIDO2 authenticator
//!
//! This crate implements the authenticator side of the CTAP2 protocol:
//! credential registration, assertions, device capability reporting, PIN
//! management, credential management, and factory reset, with the device's
//! security invariants enforced in one place (single active transaction,
//! monotonic signature counters, PIN retry lockout, user interaction before
//! privileged actions).
//!
//! The platform supplies the pieces that touch hardware or the wire through
//! traits in [`callbacks`] and [`transport`]: persistent storage, the
//! cryptographic key backend, user verification drivers, the presence
//! sensor, and transport framing. The CBOR codec also lives outside; the
//! core consumes decoded [`request::Request`] values and produces
//! [`request::Response`] values.
//!
//! # Example
//!
//! ```no_run
//! use fido2_core::{Authenticator, AuthenticatorConfig, Device, Request, TransportRegistry};
//! # use fido2_core::{CredentialStore, KeyStore, UserPresence};
//! # fn assemble<S: CredentialStore, K: KeyStore>(
//! #     store: S,
//! #     keys: K,
//! #     presence: Box<dyn UserPresence>,
//! # ) -> fido2_core::Result<()> {
//! let config = AuthenticatorConfig::new().with_max_credential_count(25);
//! let authenticator = Authenticator::new(config, store, keys, presence, vec![]);
//! let device = Device::new(authenticator, TransportRegistry::new());
//! device.init()?;
//! let info = device.submit(Request::GetInfo, 1)?;
//! # Ok(())
//! # }
//! ```

pub mod authenticator;
pub mod callbacks;
pub mod commands;
pub mod device;
pub mod dispatcher;
pub mod pin_uv;
pub mod request;
pub mod status;
pub mod store;
pub mod token;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use authenticator::{Authenticator, AuthenticatorConfig};
pub use callbacks::{
    CredentialStore, CryptoError, GeneratedKey, KeyStore, StoreError, UpResult, UserPresence,
    UvMethod, UvResult, UvType,
};
pub use commands::CommandCode;
pub use device::Device;
pub use dispatcher::{CancelToken, ChannelId, Dispatcher};
pub use request::{Request, Response};
pub use status::{Result, StatusCode};
pub use token::Permission;
pub use transport::{Transport, TransportError, TransportRegistry};
pub use types::{Credential, CredProtect, DeviceInfo, KeyHandle, PinHash, RelyingParty, User};
