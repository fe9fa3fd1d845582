//! Authenticator core state
//!
//! `Authenticator` owns the collaborators and per-boot protocol state and
//! executes decoded requests. It never touches the wire; the dispatcher
//! hands it one request at a time under the transaction lock.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::callbacks::{CredentialStore, KeyStore, UserPresence, UvMethod};
use crate::commands;
use crate::dispatcher::CancelToken;
use crate::pin_uv::PinUvController;
use crate::request::{ClientDataHash, Request, Response};
use crate::status::Result;
use crate::store::StoreAdapter;
use crate::token::TokenStore;
use crate::types::{
    Credential, DeviceInfo, RelyingParty, AAGUID_SIZE, CREDENTIAL_ID_MAX_SIZE, SHA256_SIZE,
};

/// Authenticator configuration
///
/// Policy timeouts are device constants, never taken from the request.
#[derive(Debug, Clone)]
pub struct AuthenticatorConfig {
    /// Authenticator attestation GUID
    pub aaguid: [u8; AAGUID_SIZE],

    /// Maximum number of stored credentials
    pub max_credential_count: usize,

    /// Maximum credential ID length accepted from peers
    pub max_credential_id_length: usize,

    /// Enabled transport bits reported in device info
    pub transports: u8,

    /// Supported protocol versions
    pub versions: Vec<String>,

    /// Supported extensions
    pub extensions: Vec<String>,

    /// User presence wait limit
    pub up_timeout: Duration,

    /// User verification wait limit
    pub uv_timeout: Duration,

    /// Presence wait limit for factory reset
    pub reset_timeout: Duration,

    /// How long pending get-next-assertion state stays valid
    pub assertion_state_lifetime: Duration,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticatorConfig {
    /// Create a configuration with default policy values
    pub fn new() -> Self {
        Self {
            aaguid: [0u8; AAGUID_SIZE],
            max_credential_count: 25,
            max_credential_id_length: CREDENTIAL_ID_MAX_SIZE,
            transports: 0,
            versions: vec!["FIDO_2_0".to_string(), "FIDO_2_1".to_string()],
            extensions: vec!["credProtect".to_string()],
            up_timeout: Duration::from_secs(30),
            uv_timeout: Duration::from_secs(30),
            reset_timeout: Duration::from_secs(10),
            assertion_state_lifetime: Duration::from_secs(30),
        }
    }

    /// Set the AAGUID
    pub fn with_aaguid(mut self, aaguid: [u8; AAGUID_SIZE]) -> Self {
        self.aaguid = aaguid;
        self
    }

    /// Set the credential capacity
    pub fn with_max_credential_count(mut self, count: usize) -> Self {
        self.max_credential_count = count;
        self
    }

    /// Set the transports bitmask
    pub fn with_transports(mut self, transports: u8) -> Self {
        self.transports = transports;
        self
    }

    /// Set the user presence timeout
    pub fn with_up_timeout(mut self, timeout: Duration) -> Self {
        self.up_timeout = timeout;
        self
    }

    /// Set the user verification timeout
    pub fn with_uv_timeout(mut self, timeout: Duration) -> Self {
        self.uv_timeout = timeout;
        self
    }

    /// Set the reset presence timeout
    pub fn with_reset_timeout(mut self, timeout: Duration) -> Self {
        self.reset_timeout = timeout;
        self
    }
}

/// Candidates retained for get-next-assertion
pub(crate) struct AssertionState {
    /// Client data hash of the originating request
    pub client_data_hash: ClientDataHash,

    /// Remaining candidates in return order
    pub credentials: Vec<Credential>,

    /// Gates already passed by the originating request
    pub up_done: bool,
    /// Whether user verification was performed
    pub uv_done: bool,

    /// When the first assertion was issued
    pub issued_at: Instant,
}

/// Open relying-party enumeration for credential management
pub(crate) struct RpEnumeration {
    /// Remaining entries: relying party plus its ID hash
    pub entries: Vec<(RelyingParty, [u8; SHA256_SIZE])>,
}

/// Open credential enumeration for credential management
pub(crate) struct CredEnumeration {
    /// Remaining credentials
    pub credentials: Vec<Credential>,
}

/// The authenticator core
pub struct Authenticator<S: CredentialStore, K: KeyStore> {
    pub(crate) config: AuthenticatorConfig,
    pub(crate) store: StoreAdapter<S>,
    pub(crate) keys: K,
    pub(crate) pin_uv: PinUvController,
    pub(crate) tokens: TokenStore,
    pub(crate) assertion_state: Option<AssertionState>,
    pub(crate) rp_enumeration: Option<RpEnumeration>,
    pub(crate) cred_enumeration: Option<CredEnumeration>,
}

impl<S: CredentialStore, K: KeyStore> Authenticator<S, K> {
    /// Assemble an authenticator from its collaborators
    pub fn new(
        config: AuthenticatorConfig,
        store: S,
        keys: K,
        presence: Box<dyn UserPresence>,
        uv_methods: Vec<Box<dyn UvMethod>>,
    ) -> Self {
        let capacity = config.max_credential_count;
        Self {
            config,
            store: StoreAdapter::new(store, capacity),
            keys,
            pin_uv: PinUvController::new(presence, uv_methods),
            tokens: TokenStore::new(),
            assertion_state: None,
            rp_enumeration: None,
            cred_enumeration: None,
        }
    }

    /// Initialize the backing store
    pub fn init(&mut self) -> Result<()> {
        self.store.init()?;
        info!(
            "authenticator ready, {} credential(s) stored",
            self.store.count()?
        );
        Ok(())
    }

    /// Execute one decoded request
    ///
    /// Any command other than get-next-assertion discards pending
    /// assertion state.
    pub fn handle(&mut self, request: Request, cancel: &CancelToken) -> Result<Response> {
        if !matches!(request, Request::GetNextAssertion) {
            self.assertion_state = None;
        }

        match request {
            Request::MakeCredential(req) => {
                commands::make_credential::handle(self, req, cancel).map(Response::MakeCredential)
            }
            Request::GetAssertion(req) => {
                commands::get_assertion::handle(self, req, cancel).map(Response::GetAssertion)
            }
            Request::GetInfo => commands::get_info::handle(self).map(Response::GetInfo),
            Request::ClientPin(req) => {
                commands::client_pin::handle(self, req).map(Response::ClientPin)
            }
            Request::Reset => self.reset(cancel).map(|_| Response::Reset),
            Request::GetNextAssertion => {
                commands::get_assertion::handle_next(self).map(Response::GetNextAssertion)
            }
            Request::CredentialManagement(req) => {
                commands::credential_management::handle(self, req)
                    .map(Response::CredentialManagement)
            }
        }
    }

    /// Factory reset
    ///
    /// Requires fresh user presence within the reset window, then destroys
    /// every signing key, wipes the store (credentials and PIN state), and
    /// drops all volatile protocol state. Idempotent.
    pub fn reset(&mut self, cancel: &CancelToken) -> Result<()> {
        self.pin_uv
            .check_user_presence(self.config.reset_timeout, cancel)?;

        for credential in self.store.all()? {
            if self.keys.destroy_key(credential.key).is_err() {
                warn!("key for credential already destroyed");
            }
        }
        self.store.wipe_all()?;
        self.tokens.invalidate();
        self.assertion_state = None;
        self.rp_enumeration = None;
        self.cred_enumeration = None;
        info!("factory reset complete");
        Ok(())
    }

    /// Snapshot of device capabilities and current state
    pub fn device_info(&self) -> Result<DeviceInfo> {
        Ok(DeviceInfo {
            versions: self.config.versions.clone(),
            extensions: self.config.extensions.clone(),
            aaguid: self.config.aaguid,
            max_credential_count: self.store.capacity(),
            max_credential_id_length: self.config.max_credential_id_length,
            transports: self.config.transports,
            pin_configured: self.store.pin_hash()?.is_some(),
            uv_configured: self.pin_uv.uv_configured(),
            pin_retries: self.store.pin_retries()?,
        })
    }

    /// Pending assertion state if still fresh, clearing it when expired
    pub(crate) fn take_live_assertion_state(&mut self) -> Option<AssertionState> {
        let state = self.assertion_state.take()?;
        if state.issued_at.elapsed() > self.config.assertion_state_lifetime {
            return None;
        }
        Some(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::{UpResult, UvResult, UvType};
    use crate::status::StatusCode;
    use crate::testutil::{test_credential, MemoryStore, SoftKeys, StaticPresence, StaticUv};
    use crate::types::{PinHash, MAX_PIN_RETRIES, TRANSPORT_USB};

    fn authenticator(up: UpResult) -> Authenticator<MemoryStore, SoftKeys> {
        Authenticator::new(
            AuthenticatorConfig::new().with_transports(TRANSPORT_USB),
            MemoryStore::new(),
            SoftKeys::new(),
            Box::new(StaticPresence(up)),
            vec![],
        )
    }

    #[test]
    fn test_config_builder() {
        let config = AuthenticatorConfig::new()
            .with_aaguid([7u8; AAGUID_SIZE])
            .with_max_credential_count(10)
            .with_up_timeout(Duration::from_secs(5));

        assert_eq!(config.aaguid, [7u8; AAGUID_SIZE]);
        assert_eq!(config.max_credential_count, 10);
        assert_eq!(config.up_timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_device_info_reflects_state() {
        let mut auth = authenticator(UpResult::Accepted);
        auth.init().unwrap();

        let info = auth.device_info().unwrap();
        assert!(!info.pin_configured);
        assert!(!info.uv_configured);
        assert_eq!(info.pin_retries, MAX_PIN_RETRIES);
        assert_eq!(info.transports, TRANSPORT_USB);

        auth.store.set_pin_hash(Some(&PinHash([1u8; 32]))).unwrap();
        assert!(auth.device_info().unwrap().pin_configured);
    }

    #[test]
    fn test_device_info_uv_configured() {
        let auth = Authenticator::new(
            AuthenticatorConfig::new(),
            MemoryStore::new(),
            SoftKeys::new(),
            Box::new(StaticPresence(UpResult::Accepted)),
            vec![Box::new(StaticUv {
                kind: UvType::Biometric,
                configured: true,
                outcome: UvResult::Accepted,
            })],
        );
        assert!(auth.device_info().unwrap().uv_configured);
    }

    #[test]
    fn test_reset_requires_presence() {
        let mut auth = authenticator(UpResult::Timeout);
        assert_eq!(
            auth.reset(&CancelToken::new()),
            Err(StatusCode::UserActionTimeout)
        );
    }

    #[test]
    fn test_reset_wipes_everything() {
        let mut auth = authenticator(UpResult::Accepted);
        auth.store
            .persist_new(&test_credential(b"c1", "example.com", b"u1", true))
            .unwrap();
        auth.store.set_pin_hash(Some(&PinHash([1u8; 32]))).unwrap();
        auth.store.decrement_pin_retries().unwrap();
        auth.tokens.issue(0x01, None);

        auth.reset(&CancelToken::new()).unwrap();

        assert_eq!(auth.store.count().unwrap(), 0);
        assert!(auth.store.pin_hash().unwrap().is_none());
        assert_eq!(auth.store.pin_retries().unwrap(), MAX_PIN_RETRIES);
        assert!(!auth.tokens.has_live_token());

        // Second reset on an empty device succeeds
        auth.reset(&CancelToken::new()).unwrap();
    }

    #[test]
    fn test_other_commands_discard_assertion_state() {
        let mut auth = authenticator(UpResult::Accepted);
        auth.assertion_state = Some(AssertionState {
            client_data_hash: ClientDataHash([0u8; 32]),
            credentials: vec![test_credential(b"c1", "example.com", b"u1", true)],
            up_done: true,
            uv_done: false,
            issued_at: Instant::now(),
        });

        auth.handle(Request::GetInfo, &CancelToken::new()).unwrap();
        assert!(auth.assertion_state.is_none());
    }

    #[test]
    fn test_assertion_state_expires() {
        let mut auth = authenticator(UpResult::Accepted);
        auth.assertion_state = Some(AssertionState {
            client_data_hash: ClientDataHash([0u8; 32]),
            credentials: vec![test_credential(b"c1", "example.com", b"u1", true)],
            up_done: true,
            uv_done: false,
            issued_at: Instant::now() - Duration::from_secs(60),
        });

        assert!(auth.take_live_assertion_state().is_none());
    }
}
