//! authenticatorCredentialManagement (0x0A)
//!
//! Token-gated maintenance of discoverable credentials: counts, RP and
//! credential enumeration, and deletion. Enumeration cursors live in the
//! core and survive between subcommands until reset or replacement.

use crate::authenticator::{Authenticator, CredEnumeration, RpEnumeration};
use crate::callbacks::{CredentialStore, KeyStore};
use crate::request::{
    CredentialManagementRequest, CredentialManagementResponse, CredentialManagementSubcommand,
};
use crate::status::{Result, StatusCode};
use crate::token::Permission;
use crate::types::{RelyingParty, User};

pub(crate) fn handle<S: CredentialStore, K: KeyStore>(
    auth: &mut Authenticator<S, K>,
    req: CredentialManagementRequest,
) -> Result<CredentialManagementResponse> {
    let token = req.pin_uv_auth_token.ok_or(StatusCode::PinRequired)?;
    auth.tokens
        .authorize(&token, Permission::CredentialManagement, None)?;

    match req.subcommand {
        CredentialManagementSubcommand::GetCredsMetadata => {
            Ok(CredentialManagementResponse::Metadata {
                existing: auth.store.count()?,
                remaining: auth.store.remaining()?,
            })
        }

        CredentialManagementSubcommand::EnumerateRpsBegin => {
            let mut entries: Vec<(RelyingParty, [u8; 32])> = Vec::new();
            for cred in auth.store.all()? {
                if !cred.discoverable {
                    continue;
                }
                if entries.iter().any(|(_, hash)| hash == &cred.rp_id_hash) {
                    continue;
                }
                entries.push((
                    RelyingParty {
                        id: cred.rp_id.clone(),
                        name: cred.rp_name.clone(),
                    },
                    cred.rp_id_hash,
                ));
            }
            if entries.is_empty() {
                return Err(StatusCode::NoCredentials);
            }

            let total = entries.len();
            let (rp, rp_id_hash) = entries.remove(0);
            auth.rp_enumeration = Some(RpEnumeration { entries });
            Ok(CredentialManagementResponse::Rp {
                rp,
                rp_id_hash,
                total: Some(total),
            })
        }

        CredentialManagementSubcommand::EnumerateRpsNext => {
            let state = auth
                .rp_enumeration
                .as_mut()
                .ok_or(StatusCode::NotAllowed)?;
            if state.entries.is_empty() {
                auth.rp_enumeration = None;
                return Err(StatusCode::NotAllowed);
            }
            let (rp, rp_id_hash) = state.entries.remove(0);
            Ok(CredentialManagementResponse::Rp {
                rp,
                rp_id_hash,
                total: None,
            })
        }

        CredentialManagementSubcommand::EnumerateCredentialsBegin { rp_id_hash } => {
            let mut credentials: Vec<_> = auth
                .store
                .find_by_rp(&rp_id_hash)?
                .into_iter()
                .filter(|c| c.discoverable)
                .collect();
            if credentials.is_empty() {
                return Err(StatusCode::NoCredentials);
            }

            let total = credentials.len();
            let first = credentials.remove(0);
            auth.cred_enumeration = Some(CredEnumeration { credentials });
            Ok(credential_entry(first, Some(total)))
        }

        CredentialManagementSubcommand::EnumerateCredentialsNext => {
            let state = auth
                .cred_enumeration
                .as_mut()
                .ok_or(StatusCode::NotAllowed)?;
            if state.credentials.is_empty() {
                auth.cred_enumeration = None;
                return Err(StatusCode::NotAllowed);
            }
            let next = state.credentials.remove(0);
            Ok(credential_entry(next, None))
        }

        CredentialManagementSubcommand::DeleteCredential { credential_id } => {
            let removed = auth.store.remove(&credential_id)?;
            if auth.keys.destroy_key(removed.key).is_err() {
                log::warn!("key for deleted credential already destroyed");
            }
            Ok(CredentialManagementResponse::Done)
        }
    }
}

fn credential_entry(
    credential: crate::types::Credential,
    total: Option<usize>,
) -> CredentialManagementResponse {
    CredentialManagementResponse::Credential {
        credential_id: credential.id,
        user: User {
            id: credential.user_id,
            name: credential.user_name,
            display_name: credential.user_display_name,
        },
        cred_protect: credential.cred_protect,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authenticator::AuthenticatorConfig;
    use crate::callbacks::{KeyStore as _, UpResult};
    use crate::store::rp_id_hash;
    use crate::testutil::{test_credential, MemoryStore, SoftKeys, StaticPresence};
    use crate::types::CoseAlgorithm;

    fn authenticator() -> Authenticator<MemoryStore, SoftKeys> {
        Authenticator::new(
            AuthenticatorConfig::new(),
            MemoryStore::new(),
            SoftKeys::new(),
            Box::new(StaticPresence(UpResult::Accepted)),
            vec![],
        )
    }

    fn seed(auth: &mut Authenticator<MemoryStore, SoftKeys>, id: &[u8], rp: &str, user: &[u8]) {
        let key = auth.keys.generate_key(CoseAlgorithm::ES256).unwrap();
        let mut cred = test_credential(id, rp, user, true);
        cred.key = key.handle;
        auth.store.persist_new(&cred).unwrap();
    }

    fn issue_token(auth: &mut Authenticator<MemoryStore, SoftKeys>) -> [u8; 32] {
        auth.tokens
            .issue(Permission::CredentialManagement.to_u8(), None)
    }

    fn request(
        token: Option<[u8; 32]>,
        subcommand: CredentialManagementSubcommand,
    ) -> CredentialManagementRequest {
        CredentialManagementRequest {
            subcommand,
            pin_uv_auth_token: token,
        }
    }

    #[test]
    fn test_requires_token() {
        let mut auth = authenticator();
        assert_eq!(
            handle(
                &mut auth,
                request(None, CredentialManagementSubcommand::GetCredsMetadata)
            ),
            Err(StatusCode::PinRequired)
        );
    }

    #[test]
    fn test_requires_management_permission() {
        let mut auth = authenticator();
        let token = auth.tokens.issue(Permission::GetAssertion.to_u8(), None);
        assert_eq!(
            handle(
                &mut auth,
                request(Some(token), CredentialManagementSubcommand::GetCredsMetadata)
            ),
            Err(StatusCode::PinAuthInvalid)
        );
    }

    #[test]
    fn test_metadata() {
        let mut auth = authenticator();
        seed(&mut auth, b"c1", "example.com", b"u1");
        let token = issue_token(&mut auth);

        let response = handle(
            &mut auth,
            request(Some(token), CredentialManagementSubcommand::GetCredsMetadata),
        )
        .unwrap();
        assert_eq!(
            response,
            CredentialManagementResponse::Metadata {
                existing: 1,
                remaining: auth.config.max_credential_count - 1,
            }
        );
    }

    #[test]
    fn test_enumerate_rps() {
        let mut auth = authenticator();
        seed(&mut auth, b"c1", "a.com", b"u1");
        seed(&mut auth, b"c2", "b.com", b"u2");
        seed(&mut auth, b"c3", "a.com", b"u3");
        let token = issue_token(&mut auth);

        let first = handle(
            &mut auth,
            request(Some(token), CredentialManagementSubcommand::EnumerateRpsBegin),
        )
        .unwrap();
        match first {
            CredentialManagementResponse::Rp { total, .. } => assert_eq!(total, Some(2)),
            other => panic!("unexpected response: {:?}", other),
        }

        let second = handle(
            &mut auth,
            request(Some(token), CredentialManagementSubcommand::EnumerateRpsNext),
        )
        .unwrap();
        assert!(matches!(
            second,
            CredentialManagementResponse::Rp { total: None, .. }
        ));

        assert_eq!(
            handle(
                &mut auth,
                request(Some(token), CredentialManagementSubcommand::EnumerateRpsNext)
            ),
            Err(StatusCode::NotAllowed)
        );
    }

    #[test]
    fn test_enumerate_credentials_for_rp() {
        let mut auth = authenticator();
        seed(&mut auth, b"c1", "example.com", b"u1");
        seed(&mut auth, b"c2", "example.com", b"u2");
        let token = issue_token(&mut auth);

        let first = handle(
            &mut auth,
            request(
                Some(token),
                CredentialManagementSubcommand::EnumerateCredentialsBegin {
                    rp_id_hash: rp_id_hash("example.com"),
                },
            ),
        )
        .unwrap();
        match first {
            CredentialManagementResponse::Credential { total, .. } => {
                assert_eq!(total, Some(2))
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let second = handle(
            &mut auth,
            request(
                Some(token),
                CredentialManagementSubcommand::EnumerateCredentialsNext,
            ),
        )
        .unwrap();
        assert!(matches!(
            second,
            CredentialManagementResponse::Credential { total: None, .. }
        ));
    }

    #[test]
    fn test_enumerate_unknown_rp() {
        let mut auth = authenticator();
        let token = issue_token(&mut auth);
        assert_eq!(
            handle(
                &mut auth,
                request(
                    Some(token),
                    CredentialManagementSubcommand::EnumerateCredentialsBegin {
                        rp_id_hash: rp_id_hash("missing.com"),
                    },
                ),
            ),
            Err(StatusCode::NoCredentials)
        );
    }

    #[test]
    fn test_delete_credential_destroys_key() {
        let mut auth = authenticator();
        seed(&mut auth, b"c1", "example.com", b"u1");
        let token = issue_token(&mut auth);
        assert_eq!(auth.keys.key_count(), 1);

        let response = handle(
            &mut auth,
            request(
                Some(token),
                CredentialManagementSubcommand::DeleteCredential {
                    credential_id: b"c1".to_vec(),
                },
            ),
        )
        .unwrap();
        assert_eq!(response, CredentialManagementResponse::Done);
        assert_eq!(auth.store.count().unwrap(), 0);
        assert_eq!(auth.keys.key_count(), 0);
    }

    #[test]
    fn test_delete_unknown_credential() {
        let mut auth = authenticator();
        let token = issue_token(&mut auth);
        assert_eq!(
            handle(
                &mut auth,
                request(
                    Some(token),
                    CredentialManagementSubcommand::DeleteCredential {
                        credential_id: b"missing".to_vec(),
                    },
                ),
            ),
            Err(StatusCode::NoCredentials)
        );
    }
}
