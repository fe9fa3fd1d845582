//! authenticatorGetAssertion (0x02) and authenticatorGetNextAssertion (0x08)
//!
//! Resolves candidate credentials, enforces credProtect visibility, gates
//! on UP/UV, advances the signature counter through the storage contract,
//! and signs authenticator data || client data hash. Remaining candidates
//! are retained for get-next-assertion until they expire or another
//! command runs.

use std::time::Instant;

use crate::authenticator::{AssertionState, Authenticator};
use crate::callbacks::{CredentialStore, KeyStore};
use crate::commands::{build_authenticator_data, FLAG_UP, FLAG_UV};
use crate::dispatcher::CancelToken;
use crate::pin_uv::UvOutcome;
use crate::request::{ClientDataHash, GetAssertionRequest, GetAssertionResponse};
use crate::status::{Result, StatusCode};
use crate::store::rp_id_hash;
use crate::token::Permission;
use crate::types::{CredProtect, Credential, User, RP_ID_MAX_LEN};

pub(crate) fn handle<S: CredentialStore, K: KeyStore>(
    auth: &mut Authenticator<S, K>,
    req: GetAssertionRequest,
    cancel: &CancelToken,
) -> Result<GetAssertionResponse> {
    if req.rp_id.is_empty() || req.rp_id.len() > RP_ID_MAX_LEN {
        return Err(StatusCode::InvalidLength);
    }

    let rp_hash = rp_id_hash(&req.rp_id);

    // Step 1: PIN/UV authorization
    let mut uv_done = false;
    let mut up_done = false;
    if let Some(token) = &req.pin_uv_auth_token {
        auth.tokens
            .authorize(token, Permission::GetAssertion, Some(&req.rp_id))?;
        uv_done = true;
    }

    if req.options.uv && !uv_done {
        match auth.pin_uv.perform_uv(auth.config.uv_timeout, cancel)? {
            UvOutcome::Verified => uv_done = true,
            UvOutcome::VerifiedWithUp => {
                uv_done = true;
                up_done = true;
            }
            UvOutcome::NotConfigured => return Err(StatusCode::InvalidParameter),
            UvOutcome::Denied => return Err(StatusCode::OperationDenied),
            UvOutcome::TimedOut => return Err(StatusCode::UserActionTimeout),
            UvOutcome::Cancelled => return Err(StatusCode::KeepaliveCancel),
        }
    }

    // Step 2: resolve candidates
    let mut candidates = if req.allow_list.is_empty() {
        auth.store
            .find_by_rp(&rp_hash)?
            .into_iter()
            .filter(|c| c.discoverable)
            .collect::<Vec<_>>()
    } else {
        let mut found = Vec::new();
        for id in &req.allow_list {
            if let Ok(cred) = auth.store.load(id) {
                if cred.rp_id_hash == rp_hash {
                    found.push(cred);
                }
            }
        }
        found
    };

    // Step 3: credProtect visibility. Level 2 stays hidden without an
    // allow list; level 3 is kept and forces verification below.
    let with_allow_list = !req.allow_list.is_empty();
    candidates.retain(|c| match c.cred_protect {
        CredProtect::UserVerificationOptional | CredProtect::UserVerificationRequired => true,
        CredProtect::UserVerificationOptionalWithCredentialIdList => with_allow_list || uv_done,
    });

    if candidates.is_empty() {
        return Err(StatusCode::NoCredentials);
    }

    // Step 4: a protected credential forces verification even when the
    // caller did not ask for it
    if !uv_done
        && candidates
            .iter()
            .any(|c| c.cred_protect == CredProtect::UserVerificationRequired)
    {
        match auth.pin_uv.perform_uv(auth.config.uv_timeout, cancel)? {
            UvOutcome::Verified => uv_done = true,
            UvOutcome::VerifiedWithUp => {
                uv_done = true;
                up_done = true;
            }
            UvOutcome::NotConfigured => return Err(StatusCode::OperationDenied),
            UvOutcome::Denied => return Err(StatusCode::OperationDenied),
            UvOutcome::TimedOut => return Err(StatusCode::UserActionTimeout),
            UvOutcome::Cancelled => return Err(StatusCode::KeepaliveCancel),
        }
    }

    // Step 5: user presence
    if req.options.up && !up_done {
        auth.pin_uv
            .check_user_presence(auth.config.up_timeout, cancel)?;
        up_done = true;
    }

    // Step 6: sign with the first candidate, retain the rest
    let total = candidates.len();
    let first = candidates.remove(0);
    let response = sign_assertion(
        auth,
        &first,
        &req.client_data_hash,
        up_done,
        uv_done,
        Some(total),
    )?;

    if !candidates.is_empty() {
        auth.assertion_state = Some(AssertionState {
            client_data_hash: req.client_data_hash,
            credentials: candidates,
            up_done,
            uv_done,
            issued_at: Instant::now(),
        });
    }

    Ok(response)
}

pub(crate) fn handle_next<S: CredentialStore, K: KeyStore>(
    auth: &mut Authenticator<S, K>,
) -> Result<GetAssertionResponse> {
    let mut state = auth
        .take_live_assertion_state()
        .ok_or(StatusCode::NotAllowed)?;

    let credential = state.credentials.remove(0);
    let response = sign_assertion(
        auth,
        &credential,
        &state.client_data_hash,
        state.up_done,
        state.uv_done,
        None,
    )?;

    if !state.credentials.is_empty() {
        auth.assertion_state = Some(state);
    }

    Ok(response)
}

fn sign_assertion<S: CredentialStore, K: KeyStore>(
    auth: &mut Authenticator<S, K>,
    credential: &Credential,
    client_data_hash: &ClientDataHash,
    up_done: bool,
    uv_done: bool,
    number_of_credentials: Option<usize>,
) -> Result<GetAssertionResponse> {
    // Counter moves in storage before anything is signed, so a reported
    // value can never repeat.
    let sign_count = auth.store.next_sign_count(&credential.id)?;

    let mut flags = 0u8;
    if up_done {
        flags |= FLAG_UP;
    }
    if uv_done {
        flags |= FLAG_UV;
    }

    let authenticator_data =
        build_authenticator_data(&credential.rp_id_hash, flags, sign_count, None);

    let mut message = authenticator_data.clone();
    message.extend_from_slice(&client_data_hash.0);
    let signature = auth.keys.sign(credential.key, &message)?;

    let user = if credential.discoverable {
        Some(User {
            id: credential.user_id.clone(),
            name: credential.user_name.clone(),
            display_name: credential.user_display_name.clone(),
        })
    } else {
        None
    };

    Ok(GetAssertionResponse {
        credential_id: credential.id.clone(),
        authenticator_data,
        signature,
        user,
        number_of_credentials,
        sign_count,
    })
}
