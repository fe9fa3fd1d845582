//! Device lifecycle
//!
//! Top-level entry points the firmware calls: initialize storage, bring
//! transports up and down, and submit decoded requests into the dispatcher.

use log::info;

use crate::authenticator::Authenticator;
use crate::callbacks::{CredentialStore, KeyStore};
use crate::dispatcher::{ChannelId, Dispatcher};
use crate::request::{Request, Response};
use crate::status::Result;
use crate::transport::TransportRegistry;
use crate::types::DeviceInfo;

/// The assembled authenticator device
pub struct Device<S: CredentialStore, K: KeyStore> {
    dispatcher: Dispatcher<S, K>,
    transports: TransportRegistry,
    started: bool,
}

impl<S: CredentialStore, K: KeyStore> Device<S, K> {
    /// Assemble a device from its core and transports
    pub fn new(authenticator: Authenticator<S, K>, transports: TransportRegistry) -> Self {
        Self {
            dispatcher: Dispatcher::new(authenticator),
            transports,
            started: false,
        }
    }

    /// Initialize persistent storage
    pub fn init(&self) -> Result<()> {
        self.dispatcher.init()
    }

    /// Bring transports up
    ///
    /// Per-transport failures are logged and skipped; the device runs with
    /// whatever came up.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Ok(());
        }
        let running = self.transports.start_all();
        info!(
            "device started, {}/{} transport(s) running",
            running,
            self.transports.len()
        );
        self.started = true;
        Ok(())
    }

    /// Bring transports down
    pub fn stop(&mut self) {
        if !self.started {
            return;
        }
        self.transports.shutdown_all();
        self.started = false;
        info!("device stopped");
    }

    /// Submit one decoded request on a channel
    pub fn submit(&self, request: Request, channel: ChannelId) -> Result<Response> {
        self.dispatcher.submit(request, channel)
    }

    /// Cancel the active transaction on a channel
    pub fn cancel(&self, channel: ChannelId) -> Result<()> {
        self.dispatcher.cancel(channel)
    }

    /// Device capability snapshot
    pub fn info(&self) -> Result<DeviceInfo> {
        self.dispatcher.device_info()
    }

    /// Access the dispatcher, for transport glue
    pub fn dispatcher(&self) -> &Dispatcher<S, K> {
        &self.dispatcher
    }
}

impl<S: CredentialStore, K: KeyStore> Drop for Device<S, K> {
    fn drop(&mut self) {
        self.stop();
    }
}
