//! Bearer credential issuance for domain ServiceAccounts

use std::sync::Arc;

use tracing::{error, info};

use crate::store::ClusterStore;
use crate::{Error, TOKEN_EXPIRATION_SECONDS};

/// Requests long-lived tokens for domain principals
///
/// Tokens are requested fresh on every call and never persisted here.
pub struct CredentialIssuer {
    store: Arc<dyn ClusterStore>,
}

impl CredentialIssuer {
    /// Create an issuer using the given store
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Issue a bearer token for `principal` in the domain's namespace
    pub async fn issue_credential(&self, domain_id: &str, principal: &str) -> Result<String, Error> {
        let token = self
            .store
            .issue_token(domain_id, principal, TOKEN_EXPIRATION_SECONDS)
            .await
            .inspect_err(|e| {
                error!(domain = %domain_id, principal = %principal, error = %e, "token issuance failed");
            })?;

        if token.is_empty() {
            return Err(Error::credential(principal, "server returned empty token"));
        }

        info!(domain = %domain_id, principal = %principal, "issued service account token");
        Ok(token)
    }
}
