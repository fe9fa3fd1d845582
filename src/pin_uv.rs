//! PIN and user-verification state controller
//!
//! Owns the user-presence sensor and the registered UV method drivers, and
//! enforces the PIN policy against the persisted PIN state: retry counter
//! decremented before any failure is reported, reset to maximum on success,
//! hard lockout at zero until factory reset.

use std::time::{Duration, Instant};

use log::{info, warn};

use crate::callbacks::{CredentialStore, UpResult, UserPresence, UvMethod, UvResult};
use crate::dispatcher::CancelToken;
use crate::status::{Result, StatusCode};
use crate::store::StoreAdapter;
use crate::types::{PinHash, MAX_PIN_LENGTH, MIN_PIN_LENGTH};

/// Outcome of running the registered UV methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvOutcome {
    /// A method verified the user
    Verified,
    /// A method verified the user and confirmed presence
    VerifiedWithUp,
    /// No registered method is configured
    NotConfigured,
    /// Every configured method denied the user
    Denied,
    /// The shared deadline elapsed
    TimedOut,
    /// The transaction was cancelled
    Cancelled,
}

/// User presence and verification gates plus PIN policy
pub struct PinUvController {
    presence: Box<dyn UserPresence>,
    uv_methods: Vec<Box<dyn UvMethod>>,
}

impl PinUvController {
    /// Create a controller over a presence sensor and UV methods
    ///
    /// Methods are tried in registration order.
    pub fn new(presence: Box<dyn UserPresence>, uv_methods: Vec<Box<dyn UvMethod>>) -> Self {
        Self {
            presence,
            uv_methods,
        }
    }

    /// Whether any registered UV method is configured
    pub fn uv_configured(&self) -> bool {
        self.uv_methods.iter().any(|m| m.is_configured())
    }

    /// Verify a presented PIN hash against the persisted PIN state
    ///
    /// The retry counter is decremented in storage before the mismatch is
    /// reported, so a power cycle cannot recover a burned attempt.
    pub fn verify_pin<S: CredentialStore>(
        &self,
        store: &mut StoreAdapter<S>,
        presented: &PinHash,
    ) -> Result<()> {
        let stored = match store.pin_hash()? {
            Some(hash) => hash,
            None => return Err(StatusCode::PinNotSet),
        };

        if store.pin_retries()? == 0 {
            return Err(StatusCode::PinBlocked);
        }

        if stored.ct_eq(presented) {
            store.reset_pin_retries()?;
            return Ok(());
        }

        let remaining = store.decrement_pin_retries()?;
        if remaining == 0 {
            warn!("PIN blocked after exhausting retries");
            Err(StatusCode::PinBlocked)
        } else {
            warn!("PIN mismatch, {} retries remaining", remaining);
            Err(StatusCode::PinInvalid)
        }
    }

    /// Set the initial PIN
    ///
    /// Fails with `PinAuthInvalid` when a PIN already exists; use
    /// `change_pin` instead. `new_pin_len` is the decoded PIN length in
    /// Unicode code points.
    pub fn set_pin<S: CredentialStore>(
        &self,
        store: &mut StoreAdapter<S>,
        new_pin_hash: &PinHash,
        new_pin_len: u8,
    ) -> Result<()> {
        check_pin_policy(new_pin_len)?;
        if store.pin_hash()?.is_some() {
            return Err(StatusCode::PinAuthInvalid);
        }
        store.set_pin_hash(Some(new_pin_hash))?;
        store.reset_pin_retries()?;
        info!("PIN set");
        Ok(())
    }

    /// Change an existing PIN after verifying the current one
    pub fn change_pin<S: CredentialStore>(
        &self,
        store: &mut StoreAdapter<S>,
        current_pin_hash: &PinHash,
        new_pin_hash: &PinHash,
        new_pin_len: u8,
    ) -> Result<()> {
        check_pin_policy(new_pin_len)?;
        self.verify_pin(store, current_pin_hash)?;
        store.set_pin_hash(Some(new_pin_hash))?;
        store.reset_pin_retries()?;
        info!("PIN changed");
        Ok(())
    }

    /// Block for user presence
    pub fn check_user_presence(&mut self, timeout: Duration, cancel: &CancelToken) -> Result<()> {
        if cancel.is_cancelled() {
            return Err(StatusCode::KeepaliveCancel);
        }
        let result = self.presence.wait(timeout);
        if cancel.is_cancelled() {
            return Err(StatusCode::KeepaliveCancel);
        }
        match result {
            UpResult::Accepted => Ok(()),
            UpResult::Denied => Err(StatusCode::OperationDenied),
            UpResult::Timeout => Err(StatusCode::UserActionTimeout),
        }
    }

    /// Run the registered UV methods under one shared deadline
    pub fn perform_uv(&mut self, timeout: Duration, cancel: &CancelToken) -> Result<UvOutcome> {
        if !self.uv_configured() {
            return Ok(UvOutcome::NotConfigured);
        }

        let deadline = Instant::now() + timeout;
        let mut any_denied = false;

        for method in self.uv_methods.iter_mut().filter(|m| m.is_configured()) {
            if cancel.is_cancelled() {
                return Ok(UvOutcome::Cancelled);
            }
            let remaining = match deadline.checked_duration_since(Instant::now()) {
                Some(d) if !d.is_zero() => d,
                _ => return Ok(UvOutcome::TimedOut),
            };

            match method.verify(remaining) {
                UvResult::Accepted => return Ok(UvOutcome::Verified),
                UvResult::AcceptedWithUp => return Ok(UvOutcome::VerifiedWithUp),
                UvResult::Denied => any_denied = true,
                UvResult::Timeout => {}
            }
        }

        if cancel.is_cancelled() {
            Ok(UvOutcome::Cancelled)
        } else if any_denied {
            Ok(UvOutcome::Denied)
        } else {
            Ok(UvOutcome::TimedOut)
        }
    }
}

fn check_pin_policy(pin_len: u8) -> Result<()> {
    if pin_len < MIN_PIN_LENGTH || pin_len > MAX_PIN_LENGTH {
        return Err(StatusCode::PinPolicyViolation);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callbacks::UvType;
    use crate::testutil::{MemoryStore, StaticPresence, StaticUv};
    use crate::types::MAX_PIN_RETRIES;

    fn controller(up: UpResult, uv: Vec<Box<dyn UvMethod>>) -> PinUvController {
        PinUvController::new(Box::new(StaticPresence(up)), uv)
    }

    fn store() -> StoreAdapter<MemoryStore> {
        StoreAdapter::new(MemoryStore::new(), 8)
    }

    fn hash(byte: u8) -> PinHash {
        PinHash([byte; 32])
    }

    #[test]
    fn test_verify_without_pin_set() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();
        assert_eq!(
            ctrl.verify_pin(&mut store, &hash(1)),
            Err(StatusCode::PinNotSet)
        );
    }

    #[test]
    fn test_set_and_verify_pin() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();

        ctrl.set_pin(&mut store, &hash(1), 4).unwrap();
        assert!(ctrl.verify_pin(&mut store, &hash(1)).is_ok());
        assert_eq!(
            ctrl.verify_pin(&mut store, &hash(2)),
            Err(StatusCode::PinInvalid)
        );
    }

    #[test]
    fn test_set_pin_twice_rejected() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();

        ctrl.set_pin(&mut store, &hash(1), 4).unwrap();
        assert_eq!(
            ctrl.set_pin(&mut store, &hash(2), 4),
            Err(StatusCode::PinAuthInvalid)
        );
    }

    #[test]
    fn test_pin_policy_length() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();

        assert_eq!(
            ctrl.set_pin(&mut store, &hash(1), 3),
            Err(StatusCode::PinPolicyViolation)
        );
        assert_eq!(
            ctrl.set_pin(&mut store, &hash(1), 64),
            Err(StatusCode::PinPolicyViolation)
        );
        assert!(ctrl.set_pin(&mut store, &hash(1), 63).is_ok());
    }

    #[test]
    fn test_change_pin() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();

        ctrl.set_pin(&mut store, &hash(1), 4).unwrap();
        ctrl.change_pin(&mut store, &hash(1), &hash(2), 6).unwrap();
        assert!(ctrl.verify_pin(&mut store, &hash(2)).is_ok());
        assert_eq!(
            ctrl.verify_pin(&mut store, &hash(1)),
            Err(StatusCode::PinInvalid)
        );
    }

    #[test]
    fn test_change_pin_wrong_current_burns_retry() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();

        ctrl.set_pin(&mut store, &hash(1), 4).unwrap();
        assert_eq!(
            ctrl.change_pin(&mut store, &hash(9), &hash(2), 4),
            Err(StatusCode::PinInvalid)
        );
        assert_eq!(store.pin_retries().unwrap(), MAX_PIN_RETRIES - 1);
    }

    #[test]
    fn test_lockout_after_max_failures() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();
        ctrl.set_pin(&mut store, &hash(1), 4).unwrap();

        for i in 0..MAX_PIN_RETRIES {
            let expected = if i == MAX_PIN_RETRIES - 1 {
                StatusCode::PinBlocked
            } else {
                StatusCode::PinInvalid
            };
            assert_eq!(ctrl.verify_pin(&mut store, &hash(9)), Err(expected));
        }

        // Correct PIN no longer accepted once blocked
        assert_eq!(
            ctrl.verify_pin(&mut store, &hash(1)),
            Err(StatusCode::PinBlocked)
        );
    }

    #[test]
    fn test_retries_reset_on_success() {
        let ctrl = controller(UpResult::Accepted, vec![]);
        let mut store = store();
        ctrl.set_pin(&mut store, &hash(1), 4).unwrap();

        ctrl.verify_pin(&mut store, &hash(9)).unwrap_err();
        ctrl.verify_pin(&mut store, &hash(9)).unwrap_err();
        ctrl.verify_pin(&mut store, &hash(1)).unwrap();
        assert_eq!(store.pin_retries().unwrap(), MAX_PIN_RETRIES);
    }

    #[test]
    fn test_user_presence_outcomes() {
        let cancel = CancelToken::new();
        let timeout = Duration::from_millis(10);

        let mut ctrl = controller(UpResult::Accepted, vec![]);
        assert!(ctrl.check_user_presence(timeout, &cancel).is_ok());

        let mut ctrl = controller(UpResult::Denied, vec![]);
        assert_eq!(
            ctrl.check_user_presence(timeout, &cancel),
            Err(StatusCode::OperationDenied)
        );

        let mut ctrl = controller(UpResult::Timeout, vec![]);
        assert_eq!(
            ctrl.check_user_presence(timeout, &cancel),
            Err(StatusCode::UserActionTimeout)
        );
    }

    #[test]
    fn test_user_presence_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut ctrl = controller(UpResult::Accepted, vec![]);
        assert_eq!(
            ctrl.check_user_presence(Duration::from_millis(10), &cancel),
            Err(StatusCode::KeepaliveCancel)
        );
    }

    #[test]
    fn test_uv_not_configured() {
        let mut ctrl = controller(
            UpResult::Accepted,
            vec![Box::new(StaticUv {
                kind: UvType::Biometric,
                configured: false,
                outcome: UvResult::Accepted,
            })],
        );
        let outcome = ctrl
            .perform_uv(Duration::from_millis(10), &CancelToken::new())
            .unwrap();
        assert_eq!(outcome, UvOutcome::NotConfigured);
    }

    #[test]
    fn test_uv_first_configured_method_wins() {
        let mut ctrl = controller(
            UpResult::Accepted,
            vec![
                Box::new(StaticUv {
                    kind: UvType::Pin,
                    configured: false,
                    outcome: UvResult::Denied,
                }),
                Box::new(StaticUv {
                    kind: UvType::Biometric,
                    configured: true,
                    outcome: UvResult::AcceptedWithUp,
                }),
            ],
        );
        let outcome = ctrl
            .perform_uv(Duration::from_millis(10), &CancelToken::new())
            .unwrap();
        assert_eq!(outcome, UvOutcome::VerifiedWithUp);
    }

    #[test]
    fn test_uv_all_denied() {
        let mut ctrl = controller(
            UpResult::Accepted,
            vec![Box::new(StaticUv {
                kind: UvType::Biometric,
                configured: true,
                outcome: UvResult::Denied,
            })],
        );
        let outcome = ctrl
            .perform_uv(Duration::from_millis(10), &CancelToken::new())
            .unwrap();
        assert_eq!(outcome, UvOutcome::Denied);
    }

    #[test]
    fn test_uv_cancelled() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut ctrl = controller(
            UpResult::Accepted,
            vec![Box::new(StaticUv {
                kind: UvType::Biometric,
                configured: true,
                outcome: UvResult::Accepted,
            })],
        );
        let outcome = ctrl.perform_uv(Duration::from_millis(10), &cancel).unwrap();
        assert_eq!(outcome, UvOutcome::Cancelled);
    }
}
