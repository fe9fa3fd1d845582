//! authenticatorClientPIN (0x06)
//!
//! Subcommands: get-retries, set-PIN, change-PIN, get-pin-token. The codec
//! collaborator decrypts the PIN material; handlers only ever see 32-byte
//! hashes plus the decoded PIN length.

use crate::authenticator::Authenticator;
use crate::callbacks::{CredentialStore, KeyStore};
use crate::request::{ClientPinRequest, ClientPinResponse};
use crate::status::{Result, StatusCode};

pub(crate) fn handle<S: CredentialStore, K: KeyStore>(
    auth: &mut Authenticator<S, K>,
    req: ClientPinRequest,
) -> Result<ClientPinResponse> {
    match req {
        ClientPinRequest::GetRetries => Ok(ClientPinResponse::Retries {
            retries: auth.store.pin_retries()?,
        }),

        ClientPinRequest::SetPin {
            new_pin_hash,
            new_pin_len,
        } => {
            auth.pin_uv
                .set_pin(&mut auth.store, &new_pin_hash, new_pin_len)?;
            Ok(ClientPinResponse::Done)
        }

        ClientPinRequest::ChangePin {
            current_pin_hash,
            new_pin_hash,
            new_pin_len,
        } => {
            auth.pin_uv.change_pin(
                &mut auth.store,
                &current_pin_hash,
                &new_pin_hash,
                new_pin_len,
            )?;
            // Tokens minted under the old PIN stop working
            auth.tokens.invalidate();
            Ok(ClientPinResponse::Done)
        }

        ClientPinRequest::GetPinToken {
            pin_hash,
            permissions,
            rp_id,
        } => {
            if permissions == 0 {
                return Err(StatusCode::InvalidParameter);
            }
            auth.pin_uv.verify_pin(&mut auth.store, &pin_hash)?;
            let token = auth.tokens.issue(permissions, rp_id);
            Ok(ClientPinResponse::PinToken { token })
        }
    }
}
