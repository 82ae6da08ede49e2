//! Completion marker on the Domain
//!
//! The marker is a label on the Domain object itself, so the gate survives
//! controller restarts and is cleared only by an external edit.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::json;
use tracing::{error, info};

use crate::crd::Domain;
use crate::store::ClusterStore;
use crate::{Error, AUTH_COMPLETED, DOMAIN_AUTH_LABEL};

/// Reads and commits the domain authorization completion marker
pub struct CompletionTracker {
    store: Arc<dyn ClusterStore>,
}

impl CompletionTracker {
    /// Create a tracker using the given store
    pub fn new(store: Arc<dyn ClusterStore>) -> Self {
        Self { store }
    }

    /// Returns true if the domain has already been fully provisioned
    pub fn is_done(domain: &Domain) -> bool {
        domain.is_auth_completed()
    }

    /// Master domain to record on commit, if any
    ///
    /// A partner without a master becomes its own master.
    pub fn filled_master(domain: &Domain) -> Option<&str> {
        if domain.spec.role.is_partner() && domain.spec.master_domain.is_empty() {
            domain.metadata.name.as_deref()
        } else {
            None
        }
    }

    /// Merge patch committing the completion marker
    ///
    /// Carries the completion label and, only when it is being filled,
    /// `spec.masterDomain`. Nothing else on the Domain is written.
    pub fn completion_patch(domain: &Domain) -> serde_json::Value {
        let labels = BTreeMap::from([(DOMAIN_AUTH_LABEL, AUTH_COMPLETED)]);
        let mut patch = json!({ "metadata": { "labels": labels } });
        if let Some(master) = Self::filled_master(domain) {
            patch["spec"] = json!({ "masterDomain": master });
        }
        patch
    }

    /// Persist the completion marker
    pub async fn commit(&self, domain: &Domain) -> Result<(), Error> {
        let name = domain.id()?;
        let patch = Self::completion_patch(domain);

        self.store.patch_domain(name, &patch).await.inspect_err(|e| {
            error!(domain = %name, error = %e, "failed to update domain auth label");
        })?;

        info!(domain = %name, "domain auth init completed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{DomainRole, DomainSpec};
    use crate::store::MockClusterStore;
    use kube::api::ObjectMeta;

    fn domain(name: &str, role: DomainRole, master: &str) -> Domain {
        Domain {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                uid: Some(format!("uid-{name}")),
                ..Default::default()
            },
            spec: DomainSpec {
                role,
                master_domain: master.to_string(),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_patch_sets_only_label_for_non_partner() {
        let patch = CompletionTracker::completion_patch(&domain("c", DomainRole::Other, ""));
        assert_eq!(
            patch,
            json!({"metadata": {"labels": {"kuscia.secretflow/domain-auth": "completed"}}})
        );
    }

    /// Story: a partner without a master records itself as master
    #[test]
    fn story_unmastered_partner_becomes_own_master() {
        let patch = CompletionTracker::completion_patch(&domain("a", DomainRole::Partner, ""));
        assert_eq!(
            patch,
            json!({
                "metadata": {"labels": {"kuscia.secretflow/domain-auth": "completed"}},
                "spec": {"masterDomain": "a"}
            })
        );
    }

    #[test]
    fn test_existing_master_is_not_written() {
        let d = domain("b", DomainRole::Partner, "a");
        assert_eq!(CompletionTracker::filled_master(&d), None);
        assert!(CompletionTracker::completion_patch(&d).get("spec").is_none());
    }

    /// Story: the live Domain carries fields this controller does not model
    ///
    /// Certificates, node lists and status written by other components must
    /// survive the commit, so none of them may appear in the patch, and the
    /// existing labels are left to the server-side merge.
    #[test]
    fn story_patch_never_carries_unmodelled_fields() {
        let live: Domain = serde_json::from_value(json!({
            "apiVersion": "kuscia.secretflow/v1alpha1",
            "kind": "Domain",
            "metadata": {
                "name": "alice",
                "uid": "uid-alice",
                "labels": {"team": "risk"}
            },
            "spec": {
                "role": "partner",
                "interConnProtocols": ["kuscia"],
                "cert": "LS0tLS1CRUdJTi...",
                "node": [{"name": "node-0"}]
            },
            "status": {"nodeStatuses": [{"name": "node-0", "status": "Ready"}]}
        }))
        .unwrap();

        let patch = CompletionTracker::completion_patch(&live);

        assert_eq!(
            patch,
            json!({
                "metadata": {"labels": {"kuscia.secretflow/domain-auth": "completed"}},
                "spec": {"masterDomain": "alice"}
            })
        );
    }

    #[tokio::test]
    async fn test_commit_sends_patch_for_named_domain() {
        let mut store = MockClusterStore::new();
        store
            .expect_patch_domain()
            .withf(|name, patch| {
                name == "a"
                    && patch["metadata"]["labels"][DOMAIN_AUTH_LABEL] == "completed"
                    && patch["spec"]["masterDomain"] == "a"
            })
            .times(1)
            .returning(|_, _| Ok(()));

        CompletionTracker::new(Arc::new(store))
            .commit(&domain("a", DomainRole::Partner, ""))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_commit_propagates_update_failure() {
        let mut store = MockClusterStore::new();
        store.expect_patch_domain().returning(|_, _| {
            Err(Error::from(kube::Error::Api(kube::error::ErrorResponse {
                status: "Failure".to_string(),
                message: "domains \"a\" is forbidden".to_string(),
                reason: "Forbidden".to_string(),
                code: 403,
            })))
        });

        let err = CompletionTracker::new(Arc::new(store))
            .commit(&domain("a", DomainRole::Partner, ""))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Kube { .. }));
    }
}
