//! Command dispatch and the transaction lock
//!
//! A single transaction may be in flight at any time. `submit` claims the
//! slot without blocking and rejects concurrent callers with `ChannelBusy`;
//! a drop guard releases the slot on every return path. `cancel` flags the
//! active transaction so blocking waits can unwind with `KeepaliveCancel`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::authenticator::Authenticator;
use crate::callbacks::{CredentialStore, KeyStore};
use crate::commands::CommandCode;
use crate::request::{Request, Response};
use crate::status::{Result, StatusCode};
use crate::types::DeviceInfo;

/// Logical channel a request arrived on
pub type ChannelId = u32;

/// Cooperative cancellation flag shared with the active transaction
///
/// Polled at blocking boundaries; setting it never interrupts a running
/// driver call, it takes effect at the next poll.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

struct Transaction {
    command: CommandCode,
    channel: ChannelId,
    cancel: CancelToken,
}

/// Routes decoded requests into the authenticator core
///
/// Shared by reference across transport threads; interior mutability keeps
/// the busy check and the core state consistent.
pub struct Dispatcher<S: CredentialStore, K: KeyStore> {
    active: Mutex<Option<Transaction>>,
    core: Mutex<Authenticator<S, K>>,
}

struct TransactionGuard<'a> {
    slot: &'a Mutex<Option<Transaction>>,
}

impl Drop for TransactionGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}

impl<S: CredentialStore, K: KeyStore> Dispatcher<S, K> {
    /// Wrap an authenticator core
    pub fn new(authenticator: Authenticator<S, K>) -> Self {
        Self {
            active: Mutex::new(None),
            core: Mutex::new(authenticator),
        }
    }

    /// Initialize the core's backing store
    pub fn init(&self) -> Result<()> {
        self.core.lock().map_err(|_| StatusCode::Other)?.init()
    }

    /// Execute one request as the device's single transaction
    ///
    /// Returns `ChannelBusy` immediately when another transaction holds the
    /// slot, regardless of channel.
    pub fn submit(&self, request: Request, channel: ChannelId) -> Result<Response> {
        let command = request.command_code();
        let cancel = {
            let mut slot = self.active.lock().map_err(|_| StatusCode::Other)?;
            if let Some(active) = &*slot {
                warn!(
                    "rejecting command {:#04x} on channel {}: transaction active on channel {}",
                    command.to_u8(),
                    channel,
                    active.channel
                );
                return Err(StatusCode::ChannelBusy);
            }
            let cancel = CancelToken::new();
            *slot = Some(Transaction {
                command,
                channel,
                cancel: cancel.clone(),
            });
            cancel
        };

        let _guard = TransactionGuard { slot: &self.active };
        debug!(
            "executing command {:#04x} on channel {}",
            command.to_u8(),
            channel
        );

        let mut core = self.core.lock().map_err(|_| StatusCode::Other)?;
        core.handle(request, &cancel)
    }

    /// Cancel the active transaction on `channel`
    ///
    /// A no-op when no transaction is active; `InvalidChannel` when the
    /// active transaction belongs to a different channel.
    pub fn cancel(&self, channel: ChannelId) -> Result<()> {
        let slot = self.active.lock().map_err(|_| StatusCode::Other)?;
        match &*slot {
            Some(active) if active.channel == channel => {
                debug!(
                    "cancelling command {:#04x} on channel {}",
                    active.command.to_u8(),
                    channel
                );
                active.cancel.cancel();
                Ok(())
            }
            Some(_) => Err(StatusCode::InvalidChannel),
            None => Ok(()),
        }
    }

    /// Device info without claiming the transaction slot
    pub fn device_info(&self) -> Result<DeviceInfo> {
        self.core
            .lock()
            .map_err(|_| StatusCode::Other)?
            .device_info()
    }
}
