//! authenticatorMakeCredential (0x01)
//!
//! Registers a new credential: algorithm negotiation, PIN/UV policy,
//! exclude-list refusal, key generation through the crypto backend, and
//! persistence with the signature counter at zero.

use rand::RngCore;

use crate::authenticator::Authenticator;
use crate::callbacks::{CredentialStore, KeyStore};
use crate::commands::{build_authenticator_data, FLAG_AT, FLAG_UP, FLAG_UV};
use crate::dispatcher::CancelToken;
use crate::pin_uv::UvOutcome;
use crate::request::{MakeCredentialRequest, MakeCredentialResponse};
use crate::status::{Result, StatusCode};
use crate::store::rp_id_hash;
use crate::token::Permission;
use crate::types::{
    CoseAlgorithm, CredProtect, Credential, DISPLAY_NAME_MAX_LEN, RP_ID_MAX_LEN, RP_NAME_MAX_LEN,
    USER_ID_MAX_SIZE, USER_NAME_MAX_LEN,
};

/// Length of generated credential IDs
const CREDENTIAL_ID_LEN: usize = 32;

pub(crate) fn handle<S: CredentialStore, K: KeyStore>(
    auth: &mut Authenticator<S, K>,
    req: MakeCredentialRequest,
    cancel: &CancelToken,
) -> Result<MakeCredentialResponse> {
    validate_lengths(&req)?;

    // Step 1: pick the first algorithm the backend supports
    let algorithm = req
        .algorithms
        .iter()
        .find_map(|a| CoseAlgorithm::from_i32(*a))
        .ok_or(StatusCode::UnsupportedAlgorithm)?;

    // Registration always involves the user; a host cannot opt out
    if !req.options.up {
        return Err(StatusCode::InvalidParameter);
    }

    // Step 2: PIN/UV authorization. With a PIN set, registration needs a
    // token; the token also satisfies the uv option.
    let mut uv_done = false;
    if let Some(token) = &req.pin_uv_auth_token {
        auth.tokens
            .authorize(token, Permission::MakeCredential, Some(&req.rp.id))?;
        uv_done = true;
    } else if auth.store.pin_hash()?.is_some() {
        return Err(StatusCode::PinRequired);
    }

    if req.options.uv && !uv_done && !auth.pin_uv.uv_configured() {
        return Err(StatusCode::InvalidParameter);
    }

    // Step 3: user verification when requested
    let mut up_done = false;
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

    // Step 4: user presence, before anything about stored state is
    // disclosed. A verification method that already confirmed presence
    // covers it.
    if !up_done {
        auth.pin_uv
            .check_user_presence(auth.config.up_timeout, cancel)?;
        up_done = true;
    }

    let rp_hash = rp_id_hash(&req.rp.id);

    // Step 5: exclude list. Presence is confirmed by now; with a
    // verification method configured the match must also pass UV before
    // existence is disclosed.
    if !req.exclude_list.is_empty() {
        let existing = auth.store.find_by_rp(&rp_hash)?;
        let excluded = req
            .exclude_list
            .iter()
            .any(|id| existing.iter().any(|c| &c.id == id));
        if excluded {
            if !uv_done && auth.pin_uv.uv_configured() {
                match auth.pin_uv.perform_uv(auth.config.uv_timeout, cancel)? {
                    UvOutcome::Verified | UvOutcome::VerifiedWithUp => {}
                    UvOutcome::Cancelled => return Err(StatusCode::KeepaliveCancel),
                    UvOutcome::TimedOut => return Err(StatusCode::UserActionTimeout),
                    _ => return Err(StatusCode::OperationDenied),
                }
            }
            return Err(StatusCode::CredentialExcluded);
        }
    }

    // Step 6: generate the key and persist the credential
    let key = auth.keys.generate_key(algorithm)?;

    let mut id = vec![0u8; CREDENTIAL_ID_LEN];
    rand::thread_rng().fill_bytes(&mut id);

    let credential = Credential {
        id: id.clone(),
        rp_id_hash: rp_hash,
        rp_id: req.rp.id.clone(),
        rp_name: req.rp.name.clone(),
        user_id: req.user.id.clone(),
        user_name: req.user.name.clone(),
        user_display_name: req.user.display_name.clone(),
        key: key.handle,
        algorithm: algorithm.to_i32(),
        sign_count: 0,
        discoverable: req.options.rk,
        cred_protect: req.cred_protect.unwrap_or(CredProtect::UserVerificationOptional),
    };

    match auth.store.persist_new(&credential) {
        Ok(Some(replaced)) => {
            // Re-registration for the same account; the old key is gone
            let _ = auth.keys.destroy_key(replaced.key);
        }
        Ok(None) => {}
        Err(e) => {
            let _ = auth.keys.destroy_key(key.handle);
            return Err(e);
        }
    }

    let mut flags = FLAG_AT;
    if up_done {
        flags |= FLAG_UP;
    }
    if uv_done {
        flags |= FLAG_UV;
    }

    let attested = attested_credential_data(&auth.config.aaguid, &id, &key.public_key);
    let authenticator_data = build_authenticator_data(&rp_hash, flags, 0, Some(&attested));

    Ok(MakeCredentialResponse {
        credential_id: id,
        public_key: key.public_key,
        authenticator_data,
        algorithm: algorithm.to_i32(),
    })
}

fn validate_lengths(req: &MakeCredentialRequest) -> Result<()> {
    if req.rp.id.is_empty() || req.rp.id.len() > RP_ID_MAX_LEN {
        return Err(StatusCode::InvalidLength);
    }
    if req.user.id.is_empty() || req.user.id.len() > USER_ID_MAX_SIZE {
        return Err(StatusCode::InvalidLength);
    }
    let too_long = |s: &Option<String>, max: usize| s.as_ref().is_some_and(|v| v.len() > max);
    if too_long(&req.rp.name, RP_NAME_MAX_LEN)
        || too_long(&req.user.name, USER_NAME_MAX_LEN)
        || too_long(&req.user.display_name, DISPLAY_NAME_MAX_LEN)
    {
        return Err(StatusCode::InvalidLength);
    }
    Ok(())
}

/// aaguid || credentialIdLength (BE u16) || credentialId || publicKey
fn attested_credential_data(aaguid: &[u8; 16], credential_id: &[u8], public_key: &[u8]) -> Vec<u8> {
    let mut data = Vec::with_capacity(18 + credential_id.len() + public_key.len());
    data.extend_from_slice(aaguid);
    data.extend_from_slice(&(credential_id.len() as u16).to_be_bytes());
    data.extend_from_slice(credential_id);
    data.extend_from_slice(public_key);
    data
}
