//! Transport contract and runtime registry
//!
//! Transports frame CTAP messages over a physical link (USB HID, BLE,
//! NFC). The registry initializes each transport independently so one
//! failed link never takes down the others.

use std::time::Duration;

use log::{info, warn};
use thiserror::Error;

/// Transport driver errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// Link not present or not initialized
    #[error("transport unavailable")]
    Unavailable,

    /// No frame arrived within the timeout
    #[error("receive timed out")]
    Timeout,

    /// Frame exceeds the driver's buffer
    #[error("frame too large")]
    TooLarge,

    /// Underlying I/O failure
    #[error("transport I/O error: {0}")]
    Io(String),
}

/// A CTAP transport driver
///
/// `Send + Sync` so an assembled device can be shared across the threads
/// serving each link.
pub trait Transport: Send + Sync {
    /// Short name for logs ("usb", "ble", "nfc")
    fn name(&self) -> &str;

    /// Bring the link up
    fn init(&mut self) -> Result<(), TransportError>;

    /// Send one response frame
    fn send(&mut self, data: &[u8]) -> Result<(), TransportError>;

    /// Receive one request frame into `buf`, returning its length
    fn recv(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize, TransportError>;

    /// Bring the link down
    fn shutdown(&mut self) -> Result<(), TransportError>;
}

struct Entry {
    transport: Box<dyn Transport>,
    running: bool,
}

/// Registered transports and their run state
#[derive(Default)]
pub struct TransportRegistry {
    entries: Vec<Entry>,
}

impl TransportRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a transport; takes effect at the next `start_all`
    pub fn register(&mut self, transport: Box<dyn Transport>) {
        self.entries.push(Entry {
            transport,
            running: false,
        });
    }

    /// Initialize every registered transport
    ///
    /// Failures are logged per transport and do not stop the others.
    /// Returns the number of transports running afterwards.
    pub fn start_all(&mut self) -> usize {
        for entry in &mut self.entries {
            if entry.running {
                continue;
            }
            match entry.transport.init() {
                Ok(()) => {
                    info!("transport {} up", entry.transport.name());
                    entry.running = true;
                }
                Err(e) => {
                    warn!("transport {} failed to start: {}", entry.transport.name(), e);
                }
            }
        }
        self.running_count()
    }

    /// Shut down every running transport
    pub fn shutdown_all(&mut self) {
        for entry in &mut self.entries {
            if !entry.running {
                continue;
            }
            if let Err(e) = entry.transport.shutdown() {
                warn!("transport {} shutdown failed: {}", entry.transport.name(), e);
            }
            entry.running = false;
        }
    }

    /// Number of transports currently running
    pub fn running_count(&self) -> usize {
        self.entries.iter().filter(|e| e.running).count()
    }

    /// Number of registered transports
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
